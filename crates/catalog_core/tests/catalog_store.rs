use catalog_core::db::open_db_in_memory;
use catalog_core::{
    CatalogError, CatalogStore, InMemoryProductRepository, Product, ProductDraft,
    ProductRepository, ProductValidationError, SqliteProductRepository,
};
use catalog_core::model::product::MAX_PRICE;
use rust_decimal::Decimal;

// Every behaviour check runs once per backend.
macro_rules! backend_suite {
    ($($name:ident),* $(,)?) => {
        mod sqlite {
            use super::*;
            $(
                #[test]
                fn $name() {
                    let conn = open_db_in_memory().unwrap();
                    let store = CatalogStore::new(SqliteProductRepository::try_new(&conn).unwrap());
                    super::$name(&store);
                }
            )*
        }

        mod memory {
            use super::*;
            $(
                #[test]
                fn $name() {
                    let store = CatalogStore::new(InMemoryProductRepository::new());
                    super::$name(&store);
                }
            )*
        }
    };
}

backend_suite!(
    list_on_empty_catalog_is_ok,
    create_returns_persisted_fields_and_fresh_ids,
    create_rejects_invalid_drafts_without_writing,
    price_upper_bound_is_inclusive,
    get_missing_product_is_not_found,
    update_replaces_fields_and_keeps_id,
    update_missing_product_is_not_found_and_writes_nothing,
    update_with_invalid_draft_leaves_row_untouched,
    repeated_update_is_idempotent,
    update_may_replace_inventory_with_lower_value,
    adjust_inventory_seed_scenario,
    adjust_inventory_rejects_instead_of_clamping,
    adjust_inventory_on_missing_product_is_not_found,
    delete_then_get_is_not_found,
);

fn draft(name: &str, cents: i64, inventory: i32) -> ProductDraft {
    ProductDraft::new(name, Decimal::new(cents, 2), inventory)
}

fn seed<R: ProductRepository>(store: &CatalogStore<R>) -> (Product, Product) {
    let first = store.create_product(&draft("Product 1", 999, 5)).unwrap();
    let second = store.create_product(&draft("Product 2", 1599, 10)).unwrap();
    (first, second)
}

fn count<R: ProductRepository>(store: &CatalogStore<R>) -> usize {
    store.list_products().unwrap().len()
}

fn list_on_empty_catalog_is_ok<R: ProductRepository>(store: &CatalogStore<R>) {
    assert!(store.list_products().unwrap().is_empty());
}

fn create_returns_persisted_fields_and_fresh_ids<R: ProductRepository>(store: &CatalogStore<R>) {
    let (first, second) = seed(store);

    assert_ne!(first.id, second.id);
    assert_eq!(first.name, "Product 1");
    assert_eq!(first.price, Decimal::new(999, 2));
    assert_eq!(first.inventory, 5);

    let third = store.create_product(&draft("Product 3", 0, 0)).unwrap();
    assert!(third.id != first.id && third.id != second.id);
    assert_eq!(store.get_product(third.id).unwrap(), third);
}

fn create_rejects_invalid_drafts_without_writing<R: ProductRepository>(store: &CatalogStore<R>) {
    seed(store);
    let invalid = [
        (draft("ab", 100, 1), ProductValidationError::NameTooShort { chars: 2 }),
        (
            draft(&"x".repeat(61), 100, 1),
            ProductValidationError::NameTooLong { chars: 61 },
        ),
        (draft("Widget", -1, 1), ProductValidationError::NegativePrice),
        (
            draft("Widget", 100, -1),
            ProductValidationError::NegativeInventory(-1),
        ),
        (
            ProductDraft::new("Widget", Decimal::new(1001, 3), 1),
            ProductValidationError::PriceTooPrecise { scale: 3 },
        ),
        (
            draft("ab\0cdef", 100, 1),
            ProductValidationError::NameHasControlCharacter,
        ),
    ];

    for (candidate, expected) in invalid {
        let err = store.create_product(&candidate).unwrap_err();
        assert!(
            matches!(err, CatalogError::Validation(actual) if actual == expected),
            "unexpected error for {candidate:?}: {err}"
        );
        assert_eq!(count(store), 2);
    }

    let boundary_short = store.create_product(&draft("abc", 0, 0)).unwrap();
    let boundary_long = store.create_product(&draft(&"y".repeat(60), 0, 0)).unwrap();
    assert_eq!(boundary_short.name.len(), 3);
    assert_eq!(boundary_long.name.len(), 60);
}

fn price_upper_bound_is_inclusive<R: ProductRepository>(store: &CatalogStore<R>) {
    let (first, _) = seed(store);

    let at_bound = store
        .create_product(&ProductDraft::new("Priciest", MAX_PRICE, 1))
        .unwrap();
    assert_eq!(at_bound.price, Decimal::from(i32::MAX));
    assert_eq!(store.get_product(at_bound.id).unwrap().price, MAX_PRICE);

    let above = ProductDraft::new("Too pricey", MAX_PRICE + Decimal::new(1, 2), 1);
    let err = store.create_product(&above).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Validation(ProductValidationError::PriceOutOfRange)
    ));
    let err = store.update_product(first.id, &above).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Validation(ProductValidationError::PriceOutOfRange)
    ));
    assert_eq!(store.get_product(first.id).unwrap(), first);
    assert_eq!(count(store), 3);
}

fn get_missing_product_is_not_found<R: ProductRepository>(store: &CatalogStore<R>) {
    seed(store);
    let err = store.get_product(999).unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(999)));
}

fn update_replaces_fields_and_keeps_id<R: ProductRepository>(store: &CatalogStore<R>) {
    let (first, second) = seed(store);

    let updated = store
        .update_product(first.id, &draft("Renamed", 1250, 42))
        .unwrap();

    assert_eq!(updated.id, first.id);
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.price, Decimal::new(1250, 2));
    assert_eq!(updated.inventory, 42);
    assert_eq!(store.get_product(first.id).unwrap(), updated);
    assert_eq!(store.get_product(second.id).unwrap(), second);
}

fn update_missing_product_is_not_found_and_writes_nothing<R: ProductRepository>(
    store: &CatalogStore<R>,
) {
    seed(store);
    let before = store.list_products().unwrap();

    let err = store
        .update_product(404, &draft("Ghost product", 100, 1))
        .unwrap_err();

    assert!(matches!(err, CatalogError::NotFound(404)));
    assert_eq!(store.list_products().unwrap(), before);
}

fn update_with_invalid_draft_leaves_row_untouched<R: ProductRepository>(store: &CatalogStore<R>) {
    let (first, _) = seed(store);

    let err = store
        .update_product(first.id, &draft("OK name", 100, -3))
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Validation(ProductValidationError::NegativeInventory(-3))
    ));

    let err = store
        .update_product(first.id, &draft("no", 100, 3))
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));

    assert_eq!(store.get_product(first.id).unwrap(), first);
}

fn repeated_update_is_idempotent<R: ProductRepository>(store: &CatalogStore<R>) {
    let (first, _) = seed(store);
    let replacement = draft("Stable name", 500, 7);

    let once = store.update_product(first.id, &replacement).unwrap();
    let after_once = store.list_products().unwrap();
    let twice = store.update_product(first.id, &replacement).unwrap();

    assert_eq!(once, twice);
    assert_eq!(store.list_products().unwrap(), after_once);
}

fn update_may_replace_inventory_with_lower_value<R: ProductRepository>(store: &CatalogStore<R>) {
    let (_, second) = seed(store);

    let updated = store
        .update_product(second.id, &draft("Product 2", 1599, 0))
        .unwrap();

    assert_eq!(updated.inventory, 0);
}

fn adjust_inventory_seed_scenario<R: ProductRepository>(store: &CatalogStore<R>) {
    let (first, second) = seed(store);
    assert_eq!((first.id, second.id), (1, 2));

    assert_eq!(store.adjust_inventory(1, 4).unwrap().inventory, 9);
    assert_eq!(store.adjust_inventory(2, -4).unwrap().inventory, 6);

    let err = store.adjust_inventory(1, -100).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Validation(ProductValidationError::InventoryWouldBeNegative {
            current: 9,
            delta: -100
        })
    ));
    assert_eq!(store.get_product(1).unwrap().inventory, 9);

    let ids: Vec<_> = store
        .list_products()
        .unwrap()
        .into_iter()
        .map(|product| product.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

fn adjust_inventory_rejects_instead_of_clamping<R: ProductRepository>(store: &CatalogStore<R>) {
    let (first, _) = seed(store);

    let err = store.adjust_inventory(first.id, -6).unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));
    assert_eq!(store.get_product(first.id).unwrap().inventory, 5);

    let drained = store.adjust_inventory(first.id, -5).unwrap();
    assert_eq!(drained.inventory, 0);
    assert_eq!(drained.name, first.name);
    assert_eq!(drained.price, first.price);

    let err = store.adjust_inventory(first.id, i32::MIN).unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));
    assert_eq!(store.get_product(first.id).unwrap().inventory, 0);
}

fn adjust_inventory_on_missing_product_is_not_found<R: ProductRepository>(
    store: &CatalogStore<R>,
) {
    seed(store);
    let err = store.adjust_inventory(77, 1).unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(77)));
}

fn delete_then_get_is_not_found<R: ProductRepository>(store: &CatalogStore<R>) {
    let (first, second) = seed(store);

    store.delete_product(first.id).unwrap();

    assert!(matches!(
        store.get_product(first.id).unwrap_err(),
        CatalogError::NotFound(id) if id == first.id
    ));
    assert!(matches!(
        store.delete_product(first.id).unwrap_err(),
        CatalogError::NotFound(_)
    ));
    assert_eq!(store.list_products().unwrap(), vec![second]);
}

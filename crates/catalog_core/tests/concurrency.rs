use catalog_core::db::{open_db, open_db_with};
use catalog_core::{
    CatalogError, CatalogErrorKind, CatalogResult, CatalogStore, DbOptions,
    InMemoryProductRepository, Product, ProductDraft, ProductId, SqliteProductRepository,
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;

const WORKERS: usize = 8;

fn seed_file_db(path: &Path, inventory: i32) -> ProductId {
    let conn = open_db(path).unwrap();
    let store = CatalogStore::new(SqliteProductRepository::try_new(&conn).unwrap());
    store
        .create_product(&ProductDraft::new("Contended", Decimal::new(100, 2), inventory))
        .unwrap()
        .id
}

fn adjust_on_own_connections(path: &Path, id: ProductId, delta: i32) -> Vec<CatalogResult<Product>> {
    let connections: Vec<Connection> = (0..WORKERS).map(|_| open_db(path).unwrap()).collect();
    let barrier = Barrier::new(WORKERS);

    thread::scope(|scope| {
        let handles: Vec<_> = connections
            .into_iter()
            .map(|conn| {
                let barrier = &barrier;
                scope.spawn(move || {
                    let store = CatalogStore::new(SqliteProductRepository::try_new(&conn).unwrap());
                    barrier.wait();
                    store.adjust_inventory(id, delta)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    })
}

fn assert_exact_decrements(outcomes: &[CatalogResult<Product>], available: usize) {
    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(successes, available);
    for outcome in outcomes.iter().filter(|outcome| outcome.is_err()) {
        let err = outcome.as_ref().unwrap_err();
        assert_eq!(err.kind(), CatalogErrorKind::Validation, "unexpected error: {err}");
    }
}

#[test]
fn sqlite_concurrent_decrements_never_overdraw() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");
    let id = seed_file_db(&path, 5);

    let outcomes = adjust_on_own_connections(&path, id, -1);

    assert_exact_decrements(&outcomes, 5);
    let conn = open_db(&path).unwrap();
    let store = CatalogStore::new(SqliteProductRepository::try_new(&conn).unwrap());
    assert_eq!(store.get_product(id).unwrap().inventory, 0);
}

#[test]
fn sqlite_concurrent_increments_do_not_lose_updates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");
    let id = seed_file_db(&path, 0);

    let outcomes = adjust_on_own_connections(&path, id, 3);

    assert!(outcomes.iter().all(|outcome| outcome.is_ok()));
    let conn = open_db(&path).unwrap();
    let store = CatalogStore::new(SqliteProductRepository::try_new(&conn).unwrap());
    assert_eq!(store.get_product(id).unwrap().inventory, 3 * WORKERS as i32);
}

#[test]
fn sqlite_concurrent_creates_receive_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");
    drop(open_db(&path).unwrap());
    let connections: Vec<Connection> = (0..WORKERS).map(|_| open_db(&path).unwrap()).collect();

    let mut ids: Vec<ProductId> = thread::scope(|scope| {
        let handles: Vec<_> = connections
            .into_iter()
            .enumerate()
            .map(|(index, conn)| {
                scope.spawn(move || {
                    let store = CatalogStore::new(SqliteProductRepository::try_new(&conn).unwrap());
                    let draft = ProductDraft::new(format!("Product {index}"), Decimal::ONE, 1);
                    store.create_product(&draft).unwrap().id
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), WORKERS);
}

#[test]
fn memory_concurrent_decrements_never_overdraw() {
    let repo = InMemoryProductRepository::new();
    let store = CatalogStore::new(&repo);
    let id = store
        .create_product(&ProductDraft::new("Contended", Decimal::ONE, 5))
        .unwrap()
        .id;
    let barrier = Barrier::new(WORKERS);

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    store.adjust_inventory(id, -1)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_exact_decrements(&outcomes, 5);
    assert_eq!(store.get_product(id).unwrap().inventory, 0);
}

#[test]
fn held_write_lock_times_out_as_internal_error_and_reads_continue() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");
    let id = seed_file_db(&path, 5);

    let holder = open_db(&path).unwrap();
    let waiter = open_db_with(
        &path,
        &DbOptions {
            busy_timeout: Duration::from_millis(50),
        },
    )
    .unwrap();
    let store = CatalogStore::new(SqliteProductRepository::try_new(&waiter).unwrap());

    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();

    let err = store.adjust_inventory(id, -1).unwrap_err();
    assert!(matches!(err, CatalogError::Internal(_)), "unexpected error: {err}");
    assert_eq!(store.get_product(id).unwrap().inventory, 5);
    assert!(waiter.is_autocommit());

    holder.execute_batch("ROLLBACK;").unwrap();

    assert_eq!(store.adjust_inventory(id, -1).unwrap().inventory, 4);
}

//! Product repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide atomic CRUD and inventory-adjustment APIs over `products`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Mutations run inside `BEGIN IMMEDIATE` transactions: the write lock is
//!   taken before the row is read, so a read-check-write cannot interleave
//!   with another writer.
//! - Validation happens inside the transaction and before any write; an
//!   early return drops the transaction, which rolls it back.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::product::{
    price_from_cents, price_to_cents, Product, ProductDraft, ProductId, ProductValidationError,
};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PRODUCT_SELECT_SQL: &str = "SELECT
    id,
    name,
    price_cents,
    inventory
FROM products";

const REQUIRED_COLUMNS: [&str; 4] = ["id", "name", "price_cents", "inventory"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for product persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ProductValidationError),
    Db(DbError),
    NotFound(ProductId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// A writer panicked while holding the in-memory table lock.
    LockPoisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "product not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted product data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
            Self::LockPoisoned => write!(f, "product table lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProductValidationError> for RepoError {
    fn from(value: ProductValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for product operations.
///
/// Implementations must make every method a single atomic unit with respect
/// to concurrent callers mutating the same product.
pub trait ProductRepository {
    /// Returns all products ordered by `id` ascending.
    fn list_products(&self) -> RepoResult<Vec<Product>>;
    fn get_product(&self, id: ProductId) -> RepoResult<Option<Product>>;
    /// Validates `draft`, assigns a fresh id and inserts the row.
    fn create_product(&self, draft: &ProductDraft) -> RepoResult<Product>;
    /// Replaces all mutable fields of an existing product.
    fn update_product(&self, id: ProductId, draft: &ProductDraft) -> RepoResult<Product>;
    /// Adds `delta` to inventory, rejecting results below zero.
    fn adjust_inventory(&self, id: ProductId, delta: i32) -> RepoResult<Product>;
    fn delete_product(&self, id: ProductId) -> RepoResult<()>;
}

impl<R: ProductRepository + ?Sized> ProductRepository for &R {
    fn list_products(&self) -> RepoResult<Vec<Product>> {
        (**self).list_products()
    }

    fn get_product(&self, id: ProductId) -> RepoResult<Option<Product>> {
        (**self).get_product(id)
    }

    fn create_product(&self, draft: &ProductDraft) -> RepoResult<Product> {
        (**self).create_product(draft)
    }

    fn update_product(&self, id: ProductId, draft: &ProductDraft) -> RepoResult<Product> {
        (**self).update_product(id, draft)
    }

    fn adjust_inventory(&self, id: ProductId, delta: i32) -> RepoResult<Product> {
        (**self).adjust_inventory(id, delta)
    }

    fn delete_product(&self, id: ProductId) -> RepoResult<()> {
        (**self).delete_product(id)
    }
}

/// SQLite-backed product repository.
///
/// Borrows one connection; concurrent callers each hold their own
/// connection to the same database file.
pub struct SqliteProductRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProductRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   does not carry the product layout.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn begin_immediate(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl ProductRepository for SqliteProductRepository<'_> {
    fn list_products(&self) -> RepoResult<Vec<Product>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PRODUCT_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut products = Vec::new();

        while let Some(row) = rows.next()? {
            products.push(parse_product_row(row)?);
        }

        Ok(products)
    }

    fn get_product(&self, id: ProductId) -> RepoResult<Option<Product>> {
        fetch_product(self.conn, id)
    }

    fn create_product(&self, draft: &ProductDraft) -> RepoResult<Product> {
        draft.validate()?;
        let price_cents = price_to_cents(draft.price)?;

        let tx = self.begin_immediate()?;
        tx.execute(
            "INSERT INTO products (name, price_cents, inventory) VALUES (?1, ?2, ?3);",
            params![draft.name.as_str(), price_cents, draft.inventory],
        )?;
        let id = tx.last_insert_rowid();
        let created = fetch_product(&tx, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("inserted product {id} missing from read-back"))
        })?;
        tx.commit()?;

        Ok(created)
    }

    fn update_product(&self, id: ProductId, draft: &ProductDraft) -> RepoResult<Product> {
        let tx = self.begin_immediate()?;
        let mut product = fetch_product(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        product.apply_draft(draft)?;
        let price_cents = price_to_cents(product.price)?;

        tx.execute(
            "UPDATE products
             SET
                name = ?2,
                price_cents = ?3,
                inventory = ?4
             WHERE id = ?1;",
            params![
                id,
                product.name.as_str(),
                price_cents,
                product.inventory,
            ],
        )?;
        tx.commit()?;

        Ok(product)
    }

    fn adjust_inventory(&self, id: ProductId, delta: i32) -> RepoResult<Product> {
        let tx = self.begin_immediate()?;
        let mut product = fetch_product(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        product.inventory = product.inventory_after(delta)?;

        tx.execute(
            "UPDATE products SET inventory = ?2 WHERE id = ?1;",
            params![id, product.inventory],
        )?;
        tx.commit()?;

        Ok(product)
    }

    fn delete_product(&self, id: ProductId) -> RepoResult<()> {
        let tx = self.begin_immediate()?;
        let changed = tx.execute("DELETE FROM products WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        tx.commit()?;

        Ok(())
    }
}

fn fetch_product(conn: &Connection, id: ProductId) -> RepoResult<Option<Product>> {
    let mut stmt = conn.prepare(&format!("{PRODUCT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_product_row(row)?));
    }

    Ok(None)
}

fn parse_product_row(row: &Row<'_>) -> RepoResult<Product> {
    let id: ProductId = row.get("id")?;

    let inventory_value: i64 = row.get("inventory")?;
    let inventory = i32::try_from(inventory_value).map_err(|_| {
        RepoError::InvalidData(format!(
            "inventory `{inventory_value}` out of range in products.inventory for id {id}"
        ))
    })?;

    let product = Product {
        id,
        name: row.get("name")?,
        price: price_from_cents(row.get("price_cents")?),
        inventory,
    };
    product.validate().map_err(|err| {
        RepoError::InvalidData(format!("product {id} violates invariants: {err}"))
    })?;
    Ok(product)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "products")? {
        return Err(RepoError::MissingRequiredTable("products"));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "products", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "products",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{ProductRepository, RepoError, SqliteProductRepository};
    use crate::db::open_db_in_memory;
    use crate::model::product::{ProductDraft, ProductValidationError};
    use rust_decimal::Decimal;

    #[test]
    fn failed_adjustment_does_not_leave_transaction_open() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteProductRepository::try_new(&conn).unwrap();
        let product = repo
            .create_product(&ProductDraft::new("Widget", Decimal::new(100, 2), 1))
            .unwrap();

        let err = repo.adjust_inventory(product.id, -2).unwrap_err();
        assert!(matches!(
            err,
            RepoError::Validation(ProductValidationError::InventoryWouldBeNegative { .. })
        ));
        assert!(conn.is_autocommit());

        // A second immediate transaction must be able to start.
        let adjusted = repo.adjust_inventory(product.id, -1).unwrap();
        assert_eq!(adjusted.inventory, 0);
    }

    #[test]
    fn missing_row_on_delete_rolls_back() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteProductRepository::try_new(&conn).unwrap();

        let err = repo.delete_product(404).unwrap_err();
        assert!(matches!(err, RepoError::NotFound(404)));
        assert!(conn.is_autocommit());
    }
}

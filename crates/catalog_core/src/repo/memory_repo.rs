//! In-memory product repository.
//!
//! # Responsibility
//! - Back the catalog store without SQLite, for tests and embedding.
//!
//! # Invariants
//! - One mutex guards the whole table; every fetch-validate-write runs
//!   under it, which serializes mutations on the same row.
//! - Ids are handed out from a monotonic counter and never reused, even
//!   after deletes.
//! - Rows are only written after validation succeeds.

use crate::model::product::{Product, ProductDraft, ProductId};
use crate::repo::product_repo::{ProductRepository, RepoError, RepoResult};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct ProductTable {
    last_id: ProductId,
    rows: BTreeMap<ProductId, Product>,
}

/// Mutex-guarded product table.
#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    table: Mutex<ProductTable>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, ProductTable>> {
        self.table.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

impl ProductRepository for InMemoryProductRepository {
    fn list_products(&self) -> RepoResult<Vec<Product>> {
        let table = self.lock()?;
        Ok(table.rows.values().cloned().collect())
    }

    fn get_product(&self, id: ProductId) -> RepoResult<Option<Product>> {
        let table = self.lock()?;
        Ok(table.rows.get(&id).cloned())
    }

    fn create_product(&self, draft: &ProductDraft) -> RepoResult<Product> {
        let mut table = self.lock()?;
        let id = table.last_id + 1;
        let product = Product::from_draft(id, draft)?;

        table.last_id = id;
        table.rows.insert(id, product.clone());
        Ok(product)
    }

    fn update_product(&self, id: ProductId, draft: &ProductDraft) -> RepoResult<Product> {
        let mut table = self.lock()?;
        let product = table.rows.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        product.apply_draft(draft)?;
        Ok(product.clone())
    }

    fn adjust_inventory(&self, id: ProductId, delta: i32) -> RepoResult<Product> {
        let mut table = self.lock()?;
        let product = table.rows.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        product.inventory = product.inventory_after(delta)?;
        Ok(product.clone())
    }

    fn delete_product(&self, id: ProductId) -> RepoResult<()> {
        let mut table = self.lock()?;
        table
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound(id))
    }
}

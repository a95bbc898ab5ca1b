//! Catalog store use-case service.
//!
//! # Responsibility
//! - Expose the six catalog operations (list, get, create, update, adjust
//!   inventory, delete) over any `ProductRepository`.
//! - Collapse repository failures into `Validation`, `NotFound` or
//!   `Internal` outcomes.
//! - Emit one metadata-only log event per operation.
//!
//! # Invariants
//! - Atomicity is owned by the repository; this layer never splits one
//!   operation into several repository calls.
//! - No automatic retries: transient backend failures surface immediately.
//! - Product names never reach the log; ids, deltas and counts do.

use crate::model::product::{Product, ProductDraft, ProductId, ProductValidationError};
use crate::repo::product_repo::{ProductRepository, RepoError, RepoResult};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Caller-facing failure of a catalog operation.
#[derive(Debug)]
pub enum CatalogError {
    /// Caller-supplied data violates a product invariant. Nothing was written.
    Validation(ProductValidationError),
    /// The referenced product does not exist. Nothing was written.
    NotFound(ProductId),
    /// Storage failure. The transaction was rolled back.
    Internal(RepoError),
}

/// Stable classification of [`CatalogError`] for adapters and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogErrorKind {
    Validation,
    NotFound,
    Internal,
}

impl CatalogErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

impl CatalogError {
    pub fn kind(&self) -> CatalogErrorKind {
        match self {
            Self::Validation(_) => CatalogErrorKind::Validation,
            Self::NotFound(_) => CatalogErrorKind::NotFound,
            Self::Internal(_) => CatalogErrorKind::Internal,
        }
    }
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::NotFound(id) => write!(f, "product not found: {id}"),
            Self::Internal(err) => write!(f, "internal storage error: {err}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Internal(err) => Some(err),
        }
    }
}

impl From<RepoError> for CatalogError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Internal(other),
        }
    }
}

/// Transactional catalog operations over a product repository.
pub struct CatalogStore<R: ProductRepository> {
    repo: R,
}

impl<R: ProductRepository> CatalogStore<R> {
    /// Creates a store using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists every product ordered by id ascending.
    ///
    /// An empty catalog is a valid, successful result.
    pub fn list_products(&self) -> CatalogResult<Vec<Product>> {
        let started_at = Instant::now();
        let result = self.repo.list_products();
        if let Ok(products) = &result {
            debug!(
                "event=product_list module=catalog status=ok count={} duration_ms={}",
                products.len(),
                started_at.elapsed().as_millis()
            );
        }
        finish("product_list", None, started_at, result)
    }

    /// Gets one product by id.
    ///
    /// # Errors
    /// - `NotFound` when no product carries `id`.
    pub fn get_product(&self, id: ProductId) -> CatalogResult<Product> {
        let started_at = Instant::now();
        let result = self
            .repo
            .get_product(id)
            .and_then(|found| found.ok_or(RepoError::NotFound(id)));
        finish("product_get", Some(id), started_at, result)
    }

    /// Validates and inserts a new product, returning it with its assigned id.
    ///
    /// # Errors
    /// - `Validation` when `draft` violates an invariant; no row is written.
    pub fn create_product(&self, draft: &ProductDraft) -> CatalogResult<Product> {
        let started_at = Instant::now();
        let result = self.repo.create_product(draft);
        if let Ok(product) = &result {
            info!(
                "event=product_create module=catalog status=ok id={} duration_ms={}",
                product.id,
                started_at.elapsed().as_millis()
            );
        }
        finish("product_create", None, started_at, result)
    }

    /// Replaces `name`, `price` and `inventory` of an existing product.
    ///
    /// Repeating the same replacement leaves the same final state.
    ///
    /// # Errors
    /// - `NotFound` when `id` does not exist.
    /// - `Validation` when `draft` violates an invariant; the row is untouched.
    pub fn update_product(&self, id: ProductId, draft: &ProductDraft) -> CatalogResult<Product> {
        let started_at = Instant::now();
        let result = self.repo.update_product(id, draft);
        if result.is_ok() {
            info!(
                "event=product_update module=catalog status=ok id={} duration_ms={}",
                id,
                started_at.elapsed().as_millis()
            );
        }
        finish("product_update", Some(id), started_at, result)
    }

    /// Applies `delta` to a product's inventory.
    ///
    /// # Errors
    /// - `NotFound` when `id` does not exist.
    /// - `Validation` when the resulting inventory would be negative; the
    ///   stored inventory keeps its previous value.
    pub fn adjust_inventory(&self, id: ProductId, delta: i32) -> CatalogResult<Product> {
        let started_at = Instant::now();
        let result = self.repo.adjust_inventory(id, delta);
        if let Ok(product) = &result {
            info!(
                "event=inventory_adjust module=catalog status=ok id={} delta={} inventory={} duration_ms={}",
                id,
                delta,
                product.inventory,
                started_at.elapsed().as_millis()
            );
        }
        finish("inventory_adjust", Some(id), started_at, result)
    }

    /// Deletes a product by id.
    ///
    /// # Errors
    /// - `NotFound` when `id` does not exist.
    pub fn delete_product(&self, id: ProductId) -> CatalogResult<()> {
        let started_at = Instant::now();
        let result = self.repo.delete_product(id);
        if result.is_ok() {
            info!(
                "event=product_delete module=catalog status=ok id={} duration_ms={}",
                id,
                started_at.elapsed().as_millis()
            );
        }
        finish("product_delete", Some(id), started_at, result)
    }
}

fn finish<T>(
    event: &'static str,
    id: Option<ProductId>,
    started_at: Instant,
    result: RepoResult<T>,
) -> CatalogResult<T> {
    result.map_err(|err| {
        let err = CatalogError::from(err);
        let id = id.map_or_else(|| "none".to_string(), |value| value.to_string());
        let duration_ms = started_at.elapsed().as_millis();
        match err.kind() {
            CatalogErrorKind::Internal => error!(
                "event={event} module=catalog status=error id={id} duration_ms={duration_ms} error_code={} error={err}",
                err.kind().as_str()
            ),
            kind => warn!(
                "event={event} module=catalog status=rejected id={id} duration_ms={duration_ms} error_code={}",
                kind.as_str()
            ),
        }
        err
    })
}

//! Core domain logic for the product catalog.
//! This crate is the single source of truth for catalog invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{CatalogConfig, ConfigError};
pub use db::{DbError, DbOptions};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::product::{Product, ProductDraft, ProductId, ProductValidationError};
pub use repo::memory_repo::InMemoryProductRepository;
pub use repo::product_repo::{ProductRepository, RepoError, RepoResult, SqliteProductRepository};
pub use service::catalog_store::{CatalogError, CatalogErrorKind, CatalogResult, CatalogStore};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

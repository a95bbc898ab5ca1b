//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the catalog's public operations.
//! - Translate persistence failures into the caller-facing error taxonomy.

pub mod catalog_store;

//! Catalog domain model.
//!
//! # Responsibility
//! - Define the canonical product record used by every storage backend.
//! - Own the field invariants so backends cannot drift apart.
//!
//! # Invariants
//! - A `Product` is identified by a store-assigned `ProductId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod product;

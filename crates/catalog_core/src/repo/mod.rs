//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the transactional product data access contract.
//! - Isolate SQLite query details from service orchestration.
//! - Provide an in-memory backend that honours the same atomicity rules.
//!
//! # Invariants
//! - Every write validates through the product model before persistence.
//! - Each mutating call is one all-or-nothing unit: fetch, validate, write.
//! - Repository APIs return semantic errors (`NotFound`, `Validation`) in
//!   addition to transport errors.

pub mod memory_repo;
pub mod product_repo;

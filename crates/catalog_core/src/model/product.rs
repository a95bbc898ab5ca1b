//! Product domain model.
//!
//! # Responsibility
//! - Define the persisted `Product` record and the id-less `ProductDraft`
//!   used for create and full replacement.
//! - Provide the validation and inventory arithmetic every backend applies
//!   inside its transaction.
//!
//! # Invariants
//! - `name` is 3..=60 characters (Unicode scalar values) with no control
//!   characters.
//! - `price` is within `0..=MAX_PRICE` with at most two fractional digits.
//! - `inventory` is never negative.
//! - `id` is assigned by storage and never changes.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned primary key.
pub type ProductId = i64;

/// Minimum accepted product name length, in characters.
pub const NAME_MIN_CHARS: usize = 3;
/// Maximum accepted product name length, in characters.
pub const NAME_MAX_CHARS: usize = 60;
/// Number of fractional digits kept for prices.
pub const PRICE_SCALE: u32 = 2;
/// Largest accepted price.
pub const MAX_PRICE: Decimal = Decimal::from_parts(i32::MAX as u32, 0, 0, false, 0);

/// Invariant violation on caller-supplied product data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductValidationError {
    NameTooShort { chars: usize },
    NameTooLong { chars: usize },
    /// Name contains a control character such as NUL or a line break.
    NameHasControlCharacter,
    NegativePrice,
    /// Price carries more than [`PRICE_SCALE`] significant fractional digits.
    PriceTooPrecise { scale: u32 },
    /// Price is above [`MAX_PRICE`].
    PriceOutOfRange,
    NegativeInventory(i32),
    /// Applying `delta` would take inventory below zero.
    InventoryWouldBeNegative { current: i32, delta: i32 },
    /// Applying `delta` overflows the inventory range.
    InventoryOutOfRange { current: i32, delta: i32 },
}

impl Display for ProductValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NameTooShort { chars } => write!(
                f,
                "name must be at least {NAME_MIN_CHARS} characters, got {chars}"
            ),
            Self::NameTooLong { chars } => write!(
                f,
                "name must be at most {NAME_MAX_CHARS} characters, got {chars}"
            ),
            Self::NameHasControlCharacter => {
                write!(f, "name cannot contain control characters")
            }
            Self::NegativePrice => write!(f, "price cannot be negative"),
            Self::PriceTooPrecise { scale } => write!(
                f,
                "price supports at most {PRICE_SCALE} fractional digits, got {scale}"
            ),
            Self::PriceOutOfRange => write!(f, "price cannot exceed {MAX_PRICE}"),
            Self::NegativeInventory(value) => {
                write!(f, "inventory cannot be negative, got {value}")
            }
            Self::InventoryWouldBeNegative { current, delta } => write!(
                f,
                "inventory cannot be negative: current {current}, delta {delta}"
            ),
            Self::InventoryOutOfRange { current, delta } => write!(
                f,
                "inventory out of range: current {current}, delta {delta}"
            ),
        }
    }
}

impl Error for ProductValidationError {}

/// Caller-supplied product fields for create and full replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub inventory: i32,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, price: Decimal, inventory: i32) -> Self {
        Self {
            name: name.into(),
            price,
            inventory,
        }
    }

    /// Validates every field against the product invariants.
    ///
    /// # Errors
    /// - Returns the first violated invariant, checked in field order
    ///   (`name`, `price`, `inventory`).
    pub fn validate(&self) -> Result<(), ProductValidationError> {
        validate_fields(&self.name, self.price, self.inventory)
    }
}

/// Persisted catalog record.
///
/// Serialized as `{id, name, price, inventory}` with `price` as a JSON
/// number (for example `9.99`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub inventory: i32,
}

impl Product {
    /// Builds a product from a validated draft and a store-assigned id.
    ///
    /// # Errors
    /// - Returns a validation error when `draft` violates an invariant.
    pub fn from_draft(id: ProductId, draft: &ProductDraft) -> Result<Self, ProductValidationError> {
        draft.validate()?;
        Ok(Self {
            id,
            name: draft.name.clone(),
            price: canonical_price(draft.price),
            inventory: draft.inventory,
        })
    }

    /// Returns the id-less view of this product.
    pub fn draft(&self) -> ProductDraft {
        ProductDraft::new(self.name.clone(), self.price, self.inventory)
    }

    /// Re-checks invariants on an already materialized record.
    pub fn validate(&self) -> Result<(), ProductValidationError> {
        validate_fields(&self.name, self.price, self.inventory)
    }

    /// Replaces `name`, `price` and `inventory` with `draft`.
    ///
    /// # Invariants
    /// - `draft` is validated before any field is written; on error `self`
    ///   is left untouched.
    /// - `id` is never modified.
    pub fn apply_draft(&mut self, draft: &ProductDraft) -> Result<(), ProductValidationError> {
        draft.validate()?;
        self.name = draft.name.clone();
        self.price = canonical_price(draft.price);
        self.inventory = draft.inventory;
        Ok(())
    }

    /// Computes the inventory that results from applying `delta`.
    ///
    /// A result below zero is rejected, never clamped.
    pub fn inventory_after(&self, delta: i32) -> Result<i32, ProductValidationError> {
        let current = self.inventory;
        let next = current
            .checked_add(delta)
            .ok_or(ProductValidationError::InventoryOutOfRange { current, delta })?;
        if next < 0 {
            return Err(ProductValidationError::InventoryWouldBeNegative { current, delta });
        }
        Ok(next)
    }
}

/// Converts a price into fixed-point cents for storage.
///
/// # Errors
/// - `NegativePrice` for values below zero.
/// - `PriceTooPrecise` when more than two significant fractional digits remain.
/// - `PriceOutOfRange` above [`MAX_PRICE`].
pub fn price_to_cents(price: Decimal) -> Result<i64, ProductValidationError> {
    if price < Decimal::ZERO {
        return Err(ProductValidationError::NegativePrice);
    }
    if price > MAX_PRICE {
        return Err(ProductValidationError::PriceOutOfRange);
    }
    let normalized = price.normalize();
    if normalized.scale() > PRICE_SCALE {
        return Err(ProductValidationError::PriceTooPrecise {
            scale: normalized.scale(),
        });
    }
    normalized
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or(ProductValidationError::PriceOutOfRange)
}

/// Converts stored fixed-point cents back into a two-digit decimal.
pub fn price_from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, PRICE_SCALE)
}

fn canonical_price(price: Decimal) -> Decimal {
    let mut value = price.normalize();
    value.rescale(PRICE_SCALE);
    value
}

fn validate_fields(
    name: &str,
    price: Decimal,
    inventory: i32,
) -> Result<(), ProductValidationError> {
    validate_name(name)?;
    price_to_cents(price)?;
    if inventory < 0 {
        return Err(ProductValidationError::NegativeInventory(inventory));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ProductValidationError> {
    let chars = name.chars().count();
    if chars < NAME_MIN_CHARS {
        return Err(ProductValidationError::NameTooShort { chars });
    }
    if chars > NAME_MAX_CHARS {
        return Err(ProductValidationError::NameTooLong { chars });
    }
    // Must agree with the column CHECK; SQLite's length() stops at NUL.
    if name.chars().any(char::is_control) {
        return Err(ProductValidationError::NameHasControlCharacter);
    }
    Ok(())
}

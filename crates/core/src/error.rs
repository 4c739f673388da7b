//! Ledger error taxonomy.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Deterministic ledger failures.
///
/// Every mutation error is returned synchronously to the immediate caller so
/// the originating event source can retry or flag for manual intervention.
/// Presentation layers translate these kinds into user-facing text; the core
/// carries none.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A non-positive quantity (or negative cost) was supplied.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// The mutation would drive stock negative under the reject policy.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
    },

    /// A transfer named the same location as both endpoints.
    #[error("transfer endpoints are the same location")]
    SameLocation,

    /// No bill of materials exists for the sold product. Callers skip
    /// consumption logging but do not block the sale.
    #[error("no recipe found for product {0}")]
    RecipeNotFound(ProductId),

    /// A BOM line's unit belongs to a different family than the ingredient's
    /// base unit. A configuration defect, surfaced but not retried.
    #[error("unit conversion failed: {0}")]
    UnitConversion(String),

    /// Lock acquisition timed out; the caller retries with backoff.
    #[error("contention: {0}")]
    Contention(String),

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested record was not found.
    #[error("not found")]
    NotFound,
}

impl LedgerError {
    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn insufficient(requested: Decimal, available: Decimal) -> Self {
        Self::InsufficientStock {
            requested,
            available,
        }
    }

    pub fn unit_conversion(msg: impl Into<String>) -> Self {
        Self::UnitConversion(msg.into())
    }

    pub fn contention(msg: impl Into<String>) -> Self {
        Self::Contention(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

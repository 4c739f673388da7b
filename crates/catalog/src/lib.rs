//! `stockbook-catalog` — ingredient and location registry.
//!
//! Catalog records are created by catalog management and read-only from the
//! ledger's perspective. Ingredients are never deleted, only deactivated,
//! because movements reference them permanently.

pub mod ingredient;
pub mod location;
pub mod store;

pub use ingredient::Ingredient;
pub use location::Location;
pub use store::Catalog;

//! `stockbook-core` — ledger foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the ledger error taxonomy, the fixed-point
//! numeric policy, and the unit conversion table.

pub mod error;
pub mod id;
pub mod quantity;
pub mod unit;

pub use error::{LedgerError, LedgerResult};
pub use id::{BatchId, CorrelationId, IngredientId, LocationId, ModifierId, MovementId, ProductId};
pub use quantity::{COST_SCALE, QTY_SCALE, round_cost, round_qty};
pub use unit::{Unit, UnitFamily, convert};

//! Inbound and outbound payloads of the stock mutation service.
//!
//! External event flows (purchasing sync, POS sale sync, stock counts) are
//! translated into these shapes at the boundary; the service never sees the
//! upstream wire formats.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{CorrelationId, IngredientId, LocationId, ModifierId, ProductId};
use stockbook_ledger::StoredMovement;
use stockbook_recipes::SkippedLine;

/// A goods receipt from the purchasing flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseEvent {
    pub ingredient_id: IngredientId,
    pub location_id: LocationId,
    /// Received quantity in the ingredient's base unit.
    pub quantity: Decimal,
    /// Cost per base unit.
    pub unit_cost: Decimal,
    /// Upstream purchase order reference, kept for audit.
    pub purchase_ref: String,
    pub received_at: DateTime<Utc>,
}

/// A finalized sale line from the POS flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleEvent {
    /// Upstream sale-line identity; the idempotence key.
    pub correlation_id: CorrelationId,
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub quantity_sold: Decimal,
    pub modifier_ids: Vec<ModifierId>,
    pub sold_at: DateTime<Utc>,
}

/// An inter-location stock move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub ingredient_id: IngredientId,
    pub from: LocationId,
    pub to: LocationId,
    pub quantity: Decimal,
    pub requested_at: DateTime<Utc>,
}

/// Cause attached to a manual stock correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustReason {
    /// Spoilage, breakage, expiry. Always an out-flow.
    Wastage,
    /// Stock-take or data-entry correction; signed either way.
    Correction,
}

/// A physical count for one location over a closed period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSubmission {
    /// Identity of this submission; alignment corrections carry it, so a
    /// replayed submission never corrects stock twice.
    pub correlation_id: CorrelationId,
    pub location_id: LocationId,
    pub period_from: DateTime<Utc>,
    pub period_to: DateTime<Utc>,
    pub counts: Vec<(IngredientId, Decimal)>,
}

/// Result of syncing one sale line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaleOutcome {
    /// Consumption was recorded.
    Applied {
        movements: Vec<StoredMovement>,
        /// BOM lines skipped for configuration defects.
        skipped: Vec<SkippedLine>,
    },
    /// This correlation id was already applied; nothing changed.
    AlreadyApplied,
    /// The product has no bill of materials. The sale is not blocked;
    /// consumption is simply not logged.
    NoRecipe,
}

/// Current stock level for one (ingredient, location), for dashboards and
/// low-stock alerting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevelView {
    pub ingredient_id: IngredientId,
    pub location_id: LocationId,
    pub quantity: Decimal,
    /// Weighted-average unit cost.
    pub unit_cost: Decimal,
    pub below_reorder_threshold: bool,
}

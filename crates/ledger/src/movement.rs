use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{BatchId, CorrelationId, IngredientId, LocationId, MovementId};

/// Cause of a stock change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Receipt,
    Consumption,
    TransferOut,
    TransferIn,
    Wastage,
    Adjustment,
}

impl MovementKind {
    /// Stable name identifier (e.g. for logs and audit exports).
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Receipt => "receipt",
            MovementKind::Consumption => "consumption",
            MovementKind::TransferOut => "transfer_out",
            MovementKind::TransferIn => "transfer_in",
            MovementKind::Wastage => "wastage",
            MovementKind::Adjustment => "adjustment",
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable, signed quantity change with a cause, time, and cost.
///
/// Movements are facts: never updated, never deleted. Stock positions and
/// batches are materializations over them. Inflow movements carry the
/// `batch_id` they create so batches are fully reconstructable from the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub ingredient_id: IngredientId,
    pub location_id: LocationId,
    pub kind: MovementKind,
    /// Signed: positive for in-flows, negative for out-flows.
    pub quantity: Decimal,
    /// Unit cost applied to this movement (receipt cost, or the location's
    /// weighted average at the time of an outflow).
    pub unit_cost: Decimal,
    pub occurred_at: DateTime<Utc>,
    /// Links a sale, a transfer pair, or a purchase.
    pub correlation_id: Option<CorrelationId>,
    /// Batch materialized by this movement (in-flows only).
    pub batch_id: Option<BatchId>,
    /// Source purchase reference (receipts only).
    pub source_ref: Option<String>,
}

impl Movement {
    pub fn receipt(
        ingredient_id: IngredientId,
        location_id: LocationId,
        quantity: Decimal,
        unit_cost: Decimal,
        batch_id: BatchId,
        source_ref: impl Into<String>,
        correlation_id: Option<CorrelationId>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            ingredient_id,
            location_id,
            kind: MovementKind::Receipt,
            quantity,
            unit_cost,
            occurred_at,
            correlation_id,
            batch_id: Some(batch_id),
            source_ref: Some(source_ref.into()),
        }
    }

    pub fn consumption(
        ingredient_id: IngredientId,
        location_id: LocationId,
        quantity: Decimal,
        unit_cost: Decimal,
        correlation_id: CorrelationId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            ingredient_id,
            location_id,
            kind: MovementKind::Consumption,
            quantity: -quantity,
            unit_cost,
            occurred_at,
            correlation_id: Some(correlation_id),
            batch_id: None,
            source_ref: None,
        }
    }

    pub fn transfer_out(
        ingredient_id: IngredientId,
        location_id: LocationId,
        quantity: Decimal,
        unit_cost: Decimal,
        correlation_id: CorrelationId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            ingredient_id,
            location_id,
            kind: MovementKind::TransferOut,
            quantity: -quantity,
            unit_cost,
            occurred_at,
            correlation_id: Some(correlation_id),
            batch_id: None,
            source_ref: None,
        }
    }

    pub fn transfer_in(
        ingredient_id: IngredientId,
        location_id: LocationId,
        quantity: Decimal,
        unit_cost: Decimal,
        batch_id: BatchId,
        correlation_id: CorrelationId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            ingredient_id,
            location_id,
            kind: MovementKind::TransferIn,
            quantity,
            unit_cost,
            occurred_at,
            correlation_id: Some(correlation_id),
            batch_id: Some(batch_id),
            source_ref: None,
        }
    }

    /// Signed correction: wastage for spoilage, adjustment for stock-take
    /// corrections. Positive deltas carry the batch they materialize.
    /// Count-alignment corrections carry the submission's correlation id,
    /// which is what makes replayed submissions detectable.
    pub fn correction(
        kind: MovementKind,
        ingredient_id: IngredientId,
        location_id: LocationId,
        delta: Decimal,
        unit_cost: Decimal,
        batch_id: Option<BatchId>,
        correlation_id: Option<CorrelationId>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            ingredient_id,
            location_id,
            kind,
            quantity: delta,
            unit_cost,
            occurred_at,
            correlation_id,
            batch_id,
            source_ref: None,
        }
    }

    /// In-flow vs out-flow classification follows the signed quantity.
    pub fn is_inflow(&self) -> bool {
        self.quantity > Decimal::ZERO
    }
}

/// A movement committed to the log, with its assigned position.
///
/// Sequence numbers are monotonically increasing across the whole log and
/// define the replay order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMovement {
    pub sequence: u64,
    pub movement: Movement,
}

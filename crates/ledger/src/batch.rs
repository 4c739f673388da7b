use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{BatchId, IngredientId, LocationId};

/// A quantity of an ingredient received at a specific cost.
///
/// Created exactly once per receipt (or transfer-in, or positive
/// adjustment). `remaining` decreases monotonically as outflows draw from
/// the location's stock; an exhausted batch stays on record for cost-history
/// audit. Invariant: `0 ≤ remaining ≤ received`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub ingredient_id: IngredientId,
    pub location_id: LocationId,
    pub received: Decimal,
    pub unit_cost: Decimal,
    pub remaining: Decimal,
    pub received_at: DateTime<Utc>,
    pub source_ref: Option<String>,
}

impl Batch {
    pub fn new(
        id: BatchId,
        ingredient_id: IngredientId,
        location_id: LocationId,
        received: Decimal,
        unit_cost: Decimal,
        received_at: DateTime<Utc>,
        source_ref: Option<String>,
    ) -> Self {
        Self {
            id,
            ingredient_id,
            location_id,
            received,
            unit_cost,
            remaining: received,
            received_at,
            source_ref,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_zero()
    }

    /// Draw up to `requested` from this batch; returns the drawn amount.
    ///
    /// Never drives `remaining` negative — the caller spreads any leftover
    /// across other batches (cost is uniform, ordering does not matter).
    pub fn draw(&mut self, requested: Decimal) -> Decimal {
        let drawn = requested.min(self.remaining);
        self.remaining -= drawn;
        drawn
    }
}

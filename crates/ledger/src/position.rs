//! Stock position materialization.
//!
//! A `StockPosition` is the derived (ingredient, location) view: quantity on
//! hand, weighted-average unit cost, and the batches backing them. It is a
//! cache over the movement log and must always be rebuildable by replay.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{BatchId, IngredientId, LocationId};
use stockbook_costing::blend;

use crate::batch::Batch;
use crate::movement::{Movement, StoredMovement};

/// Key of one stock position.
///
/// `Ord` derives in field order — location first, then ingredient — which is
/// the fixed global order multi-key operations use when acquiring locks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub location_id: LocationId,
    pub ingredient_id: IngredientId,
}

impl StockKey {
    pub fn new(ingredient_id: IngredientId, location_id: LocationId) -> Self {
        Self {
            location_id,
            ingredient_id,
        }
    }
}

/// Derived stock state for one (ingredient, location).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockPosition {
    pub key: StockKey,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    batches: Vec<Batch>,
}

impl StockPosition {
    pub fn empty(key: StockKey) -> Self {
        Self {
            key,
            quantity: Decimal::ZERO,
            unit_cost: Decimal::ZERO,
            batches: Vec::new(),
        }
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Sum of remaining quantities across batches; must equal `quantity`
    /// whenever the position is non-negative (sum-consistency invariant).
    pub fn batch_remaining_total(&self) -> Decimal {
        self.batches.iter().map(|b| b.remaining).sum()
    }

    /// Evolve the position from one movement. Deterministic and infallible:
    /// the log is the system of record, replay must never be rejected.
    ///
    /// In-flows materialize a batch and blend the weighted-average cost.
    /// Out-flows draw batches down (order is irrelevant under uniform cost)
    /// and leave the average untouched.
    pub fn apply(&mut self, movement: &Movement) {
        debug_assert_eq!(movement.ingredient_id, self.key.ingredient_id);
        debug_assert_eq!(movement.location_id, self.key.location_id);

        if movement.is_inflow() {
            self.unit_cost = blend(
                self.quantity,
                self.unit_cost,
                movement.quantity,
                movement.unit_cost,
            );
            // Inflows normally carry their batch id; derive one from the
            // movement id otherwise so replay stays deterministic.
            let batch_id = movement
                .batch_id
                .unwrap_or_else(|| BatchId::from_uuid(*movement.id.as_uuid()));
            self.batches.push(Batch::new(
                batch_id,
                movement.ingredient_id,
                movement.location_id,
                movement.quantity,
                movement.unit_cost,
                movement.occurred_at,
                movement.source_ref.clone(),
            ));
            self.quantity += movement.quantity;
        } else {
            let mut outstanding = -movement.quantity;
            for batch in &mut self.batches {
                if outstanding.is_zero() {
                    break;
                }
                outstanding -= batch.draw(outstanding);
            }
            // Any leftover means the position went negative (allow policy);
            // batches stay at zero, quantity carries the deficit.
            self.quantity += movement.quantity;
        }
    }
}

/// Rebuild all positions from a log snapshot (offline audit/repair path).
pub fn rebuild_positions(snapshot: &[StoredMovement]) -> HashMap<StockKey, StockPosition> {
    let mut ordered: Vec<&StoredMovement> = snapshot.iter().collect();
    ordered.sort_by_key(|s| s.sequence);

    let mut positions: HashMap<StockKey, StockPosition> = HashMap::new();
    for stored in ordered {
        let key = StockKey::new(stored.movement.ingredient_id, stored.movement.location_id);
        positions
            .entry(key)
            .or_insert_with(|| StockPosition::empty(key))
            .apply(&stored.movement);
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use stockbook_core::CorrelationId;

    fn key() -> StockKey {
        StockKey::new(IngredientId::new(), LocationId::new())
    }

    fn receipt(key: StockKey, qty: Decimal, cost: Decimal) -> Movement {
        Movement::receipt(
            key.ingredient_id,
            key.location_id,
            qty,
            cost,
            BatchId::new(),
            "PO-1",
            None,
            Utc::now(),
        )
    }

    fn consume(key: StockKey, qty: Decimal, cost: Decimal) -> Movement {
        Movement::consumption(
            key.ingredient_id,
            key.location_id,
            qty,
            cost,
            CorrelationId::new(),
            Utc::now(),
        )
    }

    #[test]
    fn receipt_into_empty_position_sets_cost_and_batch() {
        let k = key();
        let mut pos = StockPosition::empty(k);
        pos.apply(&receipt(k, dec!(10), dec!(2.00)));

        assert_eq!(pos.quantity, dec!(10));
        assert_eq!(pos.unit_cost, dec!(2.00));
        assert_eq!(pos.batches().len(), 1);
        assert_eq!(pos.batch_remaining_total(), dec!(10));
    }

    #[test]
    fn second_receipt_blends_average() {
        let k = key();
        let mut pos = StockPosition::empty(k);
        pos.apply(&receipt(k, dec!(10), dec!(2.00)));
        pos.apply(&receipt(k, dec!(10), dec!(4.00)));

        assert_eq!(pos.quantity, dec!(20));
        assert_eq!(pos.unit_cost, dec!(3.00));
    }

    #[test]
    fn consumption_draws_batches_and_keeps_cost() {
        let k = key();
        let mut pos = StockPosition::empty(k);
        pos.apply(&receipt(k, dec!(6), dec!(2.00)));
        pos.apply(&receipt(k, dec!(6), dec!(2.00)));
        pos.apply(&consume(k, dec!(8), dec!(2.00)));

        assert_eq!(pos.quantity, dec!(4));
        assert_eq!(pos.unit_cost, dec!(2.00));
        assert_eq!(pos.batch_remaining_total(), dec!(4));
        // First batch exhausted, second partially drawn.
        assert!(pos.batches()[0].is_exhausted());
        assert_eq!(pos.batches()[1].remaining, dec!(4));
    }

    #[test]
    fn overdraw_keeps_batches_non_negative() {
        let k = key();
        let mut pos = StockPosition::empty(k);
        pos.apply(&receipt(k, dec!(3), dec!(1.00)));
        pos.apply(&consume(k, dec!(5), dec!(1.00)));

        assert_eq!(pos.quantity, dec!(-2));
        assert_eq!(pos.batch_remaining_total(), dec!(0));
        assert!(pos.batches().iter().all(|b| b.remaining >= Decimal::ZERO));
    }

    proptest! {
        /// Sum consistency: after any interleaving of receipts and
        /// non-overdrawing consumptions, quantity equals the batch total and
        /// the signed movement sum.
        #[test]
        fn replay_preserves_sum_consistency(ops in prop::collection::vec((any::<bool>(), 1i64..500), 1..40)) {
            let k = key();
            let mut pos = StockPosition::empty(k);
            let mut signed_total = Decimal::ZERO;

            for (is_receipt, raw) in ops {
                let qty = Decimal::new(raw, 2);
                if is_receipt {
                    let m = receipt(k, qty, dec!(1.5));
                    signed_total += m.quantity;
                    pos.apply(&m);
                } else {
                    let available = pos.quantity;
                    if available <= Decimal::ZERO {
                        continue;
                    }
                    let take = qty.min(available);
                    let m = consume(k, take, pos.unit_cost);
                    signed_total += m.quantity;
                    pos.apply(&m);
                }
            }

            prop_assert!(pos.quantity >= Decimal::ZERO);
            prop_assert_eq!(pos.quantity, pos.batch_remaining_total());
            prop_assert_eq!(pos.quantity, signed_total);
        }
    }
}

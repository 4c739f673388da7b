//! Variance computation over the movement log.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use stockbook_core::{COST_SCALE, IngredientId, LocationId};
use stockbook_ledger::StoredMovement;

use crate::report::{IngredientVariance, ReconciliationReport, VarianceClass};

/// Compare ledger-derived expected stock against a physical count for one
/// location over the closed period `[from, to)`.
///
/// `expected = opening + Σ inflows − Σ outflows`, where opening is the
/// signed movement sum strictly before `from`. The computation is read-only:
/// callers pass a consistent snapshot, and any correcting movement is a
/// separate, human-approved adjustment.
pub fn reconcile(
    snapshot: &[StoredMovement],
    location_id: LocationId,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    counts: &[(IngredientId, Decimal)],
) -> ReconciliationReport {
    #[derive(Default)]
    struct Tally {
        opening: Decimal,
        inflow: Decimal,
        outflow: Decimal,
    }

    let mut tallies: BTreeMap<IngredientId, Tally> = BTreeMap::new();
    // Every counted ingredient gets a line, movements or not.
    for (ingredient_id, _) in counts {
        tallies.entry(*ingredient_id).or_default();
    }

    for stored in snapshot {
        let m = &stored.movement;
        if m.location_id != location_id {
            continue;
        }
        let tally = tallies.entry(m.ingredient_id).or_default();
        if m.occurred_at < from {
            tally.opening += m.quantity;
        } else if m.occurred_at < to {
            if m.is_inflow() {
                tally.inflow += m.quantity;
            } else {
                tally.outflow += -m.quantity;
            }
        }
    }

    let lines = tallies
        .into_iter()
        .map(|(ingredient_id, tally)| {
            let expected = tally.opening + tally.inflow - tally.outflow;
            let counted = counts
                .iter()
                .find(|(id, _)| *id == ingredient_id)
                .map(|(_, qty)| *qty)
                .unwrap_or(Decimal::ZERO);
            let variance = counted - expected;
            let variance_pct = if expected.is_zero() {
                None
            } else {
                Some(
                    (variance / expected * Decimal::ONE_HUNDRED).round_dp_with_strategy(
                        COST_SCALE,
                        RoundingStrategy::MidpointNearestEven,
                    ),
                )
            };

            IngredientVariance {
                ingredient_id,
                opening: tally.opening,
                inflow: tally.inflow,
                outflow: tally.outflow,
                expected,
                counted,
                variance,
                variance_pct,
                class: VarianceClass::of(variance),
            }
        })
        .collect();

    ReconciliationReport {
        location_id,
        period_from: from,
        period_to: to,
        generated_at: Utc::now(),
        lines,
    }
}

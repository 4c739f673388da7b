use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{IngredientId, LocationId};

/// Classification of a signed variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceClass {
    Over,
    Under,
    Ok,
}

impl VarianceClass {
    pub fn of(variance: Decimal) -> Self {
        if variance > Decimal::ZERO {
            VarianceClass::Over
        } else if variance < Decimal::ZERO {
            VarianceClass::Under
        } else {
            VarianceClass::Ok
        }
    }
}

/// Per-ingredient reconciliation line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientVariance {
    pub ingredient_id: IngredientId,
    pub opening: Decimal,
    pub inflow: Decimal,
    pub outflow: Decimal,
    pub expected: Decimal,
    pub counted: Decimal,
    /// counted − expected.
    pub variance: Decimal,
    /// variance / expected × 100; `None` when expected is zero (undefined,
    /// not a divide-by-zero).
    pub variance_pct: Option<Decimal>,
    pub class: VarianceClass,
}

/// Immutable reconciliation result for one location and period.
///
/// A new count supersedes a prior report; reports are never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub location_id: LocationId,
    pub period_from: DateTime<Utc>,
    pub period_to: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub lines: Vec<IngredientVariance>,
}

impl ReconciliationReport {
    /// Lines whose stock diverged from the ledger-derived expectation.
    pub fn discrepancies(&self) -> impl Iterator<Item = &IngredientVariance> {
        self.lines.iter().filter(|l| l.class != VarianceClass::Ok)
    }
}

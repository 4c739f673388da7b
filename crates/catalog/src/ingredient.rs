use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{IngredientId, Unit};

/// A raw-material ingredient.
///
/// The weighted-average unit cost is **not** stored here; it is a derived
/// value maintained per (ingredient, location) in the ledger's stock
/// positions and rebuildable from the movement log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    /// Unit all batches, movements and stock positions are normalized to.
    pub base_unit: Unit,
    /// Low-stock alerting threshold, in the base unit.
    pub reorder_threshold: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Ingredient {
    pub fn new(
        id: IngredientId,
        name: impl Into<String>,
        base_unit: Unit,
        reorder_threshold: Decimal,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            base_unit,
            reorder_threshold,
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Deactivate instead of delete: historical movements keep resolving.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

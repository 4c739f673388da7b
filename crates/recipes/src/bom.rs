use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{IngredientId, ModifierId, ProductId, Unit};

/// One ingredient requirement: quantity per unit sold, in the line's unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomLine {
    pub ingredient_id: IngredientId,
    pub quantity: Decimal,
    pub unit: Unit,
}

impl BomLine {
    pub fn new(ingredient_id: IngredientId, quantity: Decimal, unit: Unit) -> Self {
        Self {
            ingredient_id,
            quantity,
            unit,
        }
    }
}

/// A recipe line, tagged by how it participates in explosion.
///
/// - `Base` lines always apply.
/// - `ModifierOverride` replaces the named base ingredient's lines when its
///   modifier is selected (e.g. oat milk instead of whole milk).
/// - `ModifierAddition` adds on top when its modifier is selected (e.g. an
///   extra espresso shot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecipeLine {
    Base(BomLine),
    ModifierOverride {
        modifier_id: ModifierId,
        /// Base-line ingredient this override replaces.
        replaces: IngredientId,
        line: BomLine,
    },
    ModifierAddition {
        modifier_id: ModifierId,
        line: BomLine,
    },
}

/// Bill of materials for one sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub product_id: ProductId,
    pub lines: Vec<RecipeLine>,
}

impl Recipe {
    pub fn new(product_id: ProductId, lines: Vec<RecipeLine>) -> Self {
        Self { product_id, lines }
    }
}

/// In-memory recipe lookup, fed by the external catalog sync.
#[derive(Debug, Default)]
pub struct RecipeBook {
    recipes: RwLock<HashMap<ProductId, Recipe>>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, recipe: Recipe) {
        if let Ok(mut map) = self.recipes.write() {
            map.insert(recipe.product_id, recipe);
        }
    }

    pub fn get(&self, product_id: ProductId) -> Option<Recipe> {
        self.recipes.read().ok()?.get(&product_id).cloned()
    }
}

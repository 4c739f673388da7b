use std::collections::HashMap;
use std::sync::RwLock;

use stockbook_core::{IngredientId, LedgerError, LedgerResult, LocationId, Unit};

use crate::ingredient::Ingredient;
use crate::location::Location;

/// In-memory catalog registry.
///
/// Thread-safe; mutation comes from catalog management flows, the ledger
/// only reads. Lookups for deactivated ingredients still succeed so that
/// historical movements and reports keep resolving.
#[derive(Debug, Default)]
pub struct Catalog {
    ingredients: RwLock<HashMap<IngredientId, Ingredient>>,
    locations: RwLock<HashMap<LocationId, Location>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_ingredient(&self, ingredient: Ingredient) {
        if let Ok(mut map) = self.ingredients.write() {
            map.insert(ingredient.id, ingredient);
        }
    }

    pub fn upsert_location(&self, location: Location) {
        if let Ok(mut map) = self.locations.write() {
            map.insert(location.id, location);
        }
    }

    pub fn ingredient(&self, id: IngredientId) -> Option<Ingredient> {
        self.ingredients.read().ok()?.get(&id).cloned()
    }

    pub fn location(&self, id: LocationId) -> Option<Location> {
        self.locations.read().ok()?.get(&id).cloned()
    }

    /// Base unit lookup used by recipe explosion and stock queries.
    pub fn base_unit(&self, id: IngredientId) -> LedgerResult<Unit> {
        self.ingredient(id)
            .map(|i| i.base_unit)
            .ok_or(LedgerError::NotFound)
    }

    pub fn deactivate_ingredient(&self, id: IngredientId) -> LedgerResult<()> {
        let mut map = self
            .ingredients
            .write()
            .map_err(|_| LedgerError::validation("catalog lock poisoned"))?;
        match map.get_mut(&id) {
            Some(ing) => {
                ing.deactivate();
                Ok(())
            }
            None => Err(LedgerError::NotFound),
        }
    }

    pub fn list_ingredients(&self) -> Vec<Ingredient> {
        self.ingredients
            .read()
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }
}

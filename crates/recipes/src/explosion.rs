//! Recipe explosion: sold product → ingredient consumption lines.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::warn;

use stockbook_catalog::Catalog;
use stockbook_core::{
    IngredientId, LedgerError, LedgerResult, ModifierId, ProductId, convert, round_qty,
};

use crate::bom::{BomLine, RecipeBook, RecipeLine};

/// One resolved consumption requirement, in the ingredient's base unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionLine {
    pub ingredient_id: IngredientId,
    pub quantity: Decimal,
}

/// A BOM line that could not be resolved. Configuration defect: surfaced to
/// an operator, consumption for the line skipped, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub ingredient_id: IngredientId,
    pub reason: LedgerError,
}

/// Result of exploding one sale line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explosion {
    pub product_id: ProductId,
    pub lines: Vec<ConsumptionLine>,
    pub skipped: Vec<SkippedLine>,
}

/// Resolve a sold product (and its selected modifiers) into ingredient
/// consumption lines.
///
/// Base lines apply first; overrides for selected modifiers replace base
/// lines of the same ingredient; additions append. Each effective line is
/// scaled by `quantity_sold` and converted into the ingredient's base unit,
/// then summed per ingredient.
///
/// Fails with `RecipeNotFound` when no BOM exists — the caller decides
/// whether to block the sale (it should not). Unit-family mismatches and
/// unknown ingredients only skip the offending line.
pub fn explode(
    recipes: &RecipeBook,
    catalog: &Catalog,
    product_id: ProductId,
    quantity_sold: Decimal,
    modifier_ids: &[ModifierId],
) -> LedgerResult<Explosion> {
    if quantity_sold <= Decimal::ZERO {
        return Err(LedgerError::invalid_quantity(format!(
            "quantity sold must be positive, got {quantity_sold}"
        )));
    }

    let recipe = recipes
        .get(product_id)
        .ok_or(LedgerError::RecipeNotFound(product_id))?;

    // Effective lines: base, minus overridden ingredients, plus selected
    // modifier lines.
    let mut effective: Vec<BomLine> = Vec::new();
    for line in &recipe.lines {
        if let RecipeLine::Base(bom) = line {
            effective.push(bom.clone());
        }
    }
    for line in &recipe.lines {
        match line {
            RecipeLine::ModifierOverride {
                modifier_id,
                replaces,
                line,
            } if selected(modifier_ids, *modifier_id) => {
                effective.retain(|b| b.ingredient_id != *replaces);
                effective.push(line.clone());
            }
            RecipeLine::ModifierAddition { modifier_id, line } if selected(modifier_ids, *modifier_id) => {
                effective.push(line.clone());
            }
            _ => {}
        }
    }

    // Scale, normalize units, sum per ingredient. BTreeMap keeps the output
    // deterministic for tests and lock ordering downstream.
    let mut totals: BTreeMap<IngredientId, Decimal> = BTreeMap::new();
    let mut skipped = Vec::new();

    for bom in effective {
        let base_unit = match catalog.base_unit(bom.ingredient_id) {
            Ok(u) => u,
            Err(reason) => {
                warn!(
                    ingredient = %bom.ingredient_id,
                    product = %product_id,
                    "skipping BOM line for unknown ingredient"
                );
                skipped.push(SkippedLine {
                    ingredient_id: bom.ingredient_id,
                    reason,
                });
                continue;
            }
        };

        match convert(bom.quantity * quantity_sold, bom.unit, base_unit) {
            Ok(qty) => {
                *totals.entry(bom.ingredient_id).or_insert(Decimal::ZERO) += qty;
            }
            Err(reason) => {
                warn!(
                    ingredient = %bom.ingredient_id,
                    product = %product_id,
                    %reason,
                    "skipping BOM line with incompatible unit family"
                );
                skipped.push(SkippedLine {
                    ingredient_id: bom.ingredient_id,
                    reason,
                });
            }
        }
    }

    let lines = totals
        .into_iter()
        .map(|(ingredient_id, quantity)| ConsumptionLine {
            ingredient_id,
            quantity: round_qty(quantity),
        })
        .collect();

    Ok(Explosion {
        product_id,
        lines,
        skipped,
    })
}

fn selected(selected: &[ModifierId], id: ModifierId) -> bool {
    selected.contains(&id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stockbook_catalog::Ingredient;
    use stockbook_core::Unit;

    use crate::bom::Recipe;

    fn setup() -> (RecipeBook, Catalog) {
        (RecipeBook::new(), Catalog::new())
    }

    fn register(catalog: &Catalog, unit: Unit) -> IngredientId {
        let id = IngredientId::new();
        catalog.upsert_ingredient(Ingredient::new(id, "ingredient", unit, dec!(0)));
        id
    }

    #[test]
    fn scales_and_normalizes_into_base_unit() {
        let (recipes, catalog) = setup();
        let beans = register(&catalog, Unit::Gram);
        let product = ProductId::new();

        // 0.02 kg per unit sold; base unit is grams.
        recipes.upsert(Recipe::new(
            product,
            vec![RecipeLine::Base(BomLine::new(beans, dec!(0.02), Unit::Kilogram))],
        ));

        let explosion = explode(&recipes, &catalog, product, dec!(3), &[]).unwrap();
        assert_eq!(explosion.lines.len(), 1);
        assert_eq!(explosion.lines[0].ingredient_id, beans);
        // 0.02 kg * 3 = 0.06 kg = 60 g, not 0.06 of a mismatched unit.
        assert_eq!(explosion.lines[0].quantity, dec!(60));
        assert!(explosion.skipped.is_empty());
    }

    #[test]
    fn missing_recipe_is_reported() {
        let (recipes, catalog) = setup();
        let product = ProductId::new();
        let err = explode(&recipes, &catalog, product, dec!(1), &[]).unwrap_err();
        assert_eq!(err, LedgerError::RecipeNotFound(product));
    }

    #[test]
    fn modifier_override_replaces_base_line() {
        let (recipes, catalog) = setup();
        let whole_milk = register(&catalog, Unit::Milliliter);
        let oat_milk = register(&catalog, Unit::Milliliter);
        let oat = ModifierId::new();
        let product = ProductId::new();

        recipes.upsert(Recipe::new(
            product,
            vec![
                RecipeLine::Base(BomLine::new(whole_milk, dec!(200), Unit::Milliliter)),
                RecipeLine::ModifierOverride {
                    modifier_id: oat,
                    replaces: whole_milk,
                    line: BomLine::new(oat_milk, dec!(200), Unit::Milliliter),
                },
            ],
        ));

        // Without the modifier: whole milk only.
        let plain = explode(&recipes, &catalog, product, dec!(1), &[]).unwrap();
        assert_eq!(plain.lines.len(), 1);
        assert_eq!(plain.lines[0].ingredient_id, whole_milk);

        // With the modifier: oat milk only, whole milk untouched.
        let with_oat = explode(&recipes, &catalog, product, dec!(1), &[oat]).unwrap();
        assert_eq!(with_oat.lines.len(), 1);
        assert_eq!(with_oat.lines[0].ingredient_id, oat_milk);
        assert_eq!(with_oat.lines[0].quantity, dec!(200));
    }

    #[test]
    fn modifier_addition_stacks_on_base() {
        let (recipes, catalog) = setup();
        let beans = register(&catalog, Unit::Gram);
        let extra_shot = ModifierId::new();
        let product = ProductId::new();

        recipes.upsert(Recipe::new(
            product,
            vec![
                RecipeLine::Base(BomLine::new(beans, dec!(18), Unit::Gram)),
                RecipeLine::ModifierAddition {
                    modifier_id: extra_shot,
                    line: BomLine::new(beans, dec!(9), Unit::Gram),
                },
            ],
        ));

        let explosion = explode(&recipes, &catalog, product, dec!(2), &[extra_shot]).unwrap();
        assert_eq!(explosion.lines.len(), 1);
        // (18 + 9) * 2
        assert_eq!(explosion.lines[0].quantity, dec!(54));
    }

    #[test]
    fn unit_family_mismatch_skips_only_that_line() {
        let (recipes, catalog) = setup();
        let beans = register(&catalog, Unit::Gram);
        let syrup = register(&catalog, Unit::Milliliter);
        let product = ProductId::new();

        recipes.upsert(Recipe::new(
            product,
            vec![
                RecipeLine::Base(BomLine::new(beans, dec!(18), Unit::Gram)),
                // Misconfigured: mass unit against a volume-based ingredient.
                RecipeLine::Base(BomLine::new(syrup, dec!(10), Unit::Gram)),
            ],
        ));

        let explosion = explode(&recipes, &catalog, product, dec!(1), &[]).unwrap();
        assert_eq!(explosion.lines.len(), 1);
        assert_eq!(explosion.lines[0].ingredient_id, beans);
        assert_eq!(explosion.skipped.len(), 1);
        assert_eq!(explosion.skipped[0].ingredient_id, syrup);
        assert!(matches!(
            explosion.skipped[0].reason,
            LedgerError::UnitConversion(_)
        ));
    }

    #[test]
    fn non_positive_sale_quantity_is_rejected() {
        let (recipes, catalog) = setup();
        let product = ProductId::new();
        recipes.upsert(Recipe::new(product, vec![]));
        let err = explode(&recipes, &catalog, product, dec!(0), &[]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidQuantity(_)));
    }
}

//! `stockbook-recipes` — bill-of-materials and recipe explosion.
//!
//! Recipes are created/updated by a sync process external to the ledger and
//! read-only here. The explosion engine turns one sold product (plus its
//! selected modifiers) into ingredient consumption lines, normalized into
//! each ingredient's base unit.

pub mod bom;
pub mod explosion;

pub use bom::{BomLine, Recipe, RecipeBook, RecipeLine};
pub use explosion::{ConsumptionLine, Explosion, SkippedLine, explode};

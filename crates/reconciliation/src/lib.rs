//! `stockbook-reconciliation` — expected-vs-counted variance reports.
//!
//! Read-only over a movement-log snapshot plus a supplied physical count.
//! A discrepancy is surfaced for human action (a manual adjustment through
//! the mutation service), never auto-corrected, so every correction keeps an
//! approver on record.

pub mod engine;
pub mod report;

pub use engine::reconcile;
pub use report::{IngredientVariance, ReconciliationReport, VarianceClass};

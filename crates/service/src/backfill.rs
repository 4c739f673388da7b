//! Historical sale back-fill.
//!
//! Re-drives finalized sale events through the mutation service, typically
//! after an outage in the POS sync. Correlation ids make the run idempotent:
//! already-applied sales are counted and skipped, contention is retried with
//! backoff, and anything else lands in the manual-review list instead of
//! aborting the run.

use anyhow::Result;
use tracing::{info, warn};

use stockbook_core::{CorrelationId, LedgerError};
use stockbook_ledger::MovementLog;

use crate::contracts::{SaleEvent, SaleOutcome};
use crate::mutation::StockMutationService;
use crate::policy::RetryPolicy;

/// Upstream source of finalized sale events (POS export, archived feed).
pub trait SaleSource {
    fn fetch(&self) -> Result<Vec<SaleEvent>>;
}

/// Outcome tally of one back-fill run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    pub applied: usize,
    pub skipped_existing: usize,
    pub skipped_no_recipe: usize,
    /// Sales that could not be applied, with the failure reason.
    pub manual_review: Vec<(CorrelationId, String)>,
}

/// Replays sale events against the mutation service.
pub struct SaleBackfill {
    retry: RetryPolicy,
}

impl SaleBackfill {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    pub fn run<L: MovementLog>(
        &self,
        service: &StockMutationService<L>,
        source: &dyn SaleSource,
    ) -> Result<BackfillReport> {
        let events = source.fetch()?;
        info!(events = events.len(), "starting sale back-fill");

        let mut report = BackfillReport::default();
        for event in events {
            match self.apply_with_retry(service, &event) {
                Ok(SaleOutcome::Applied { .. }) => report.applied += 1,
                Ok(SaleOutcome::AlreadyApplied) => report.skipped_existing += 1,
                Ok(SaleOutcome::NoRecipe) => report.skipped_no_recipe += 1,
                Err(err) => {
                    warn!(
                        correlation = %event.correlation_id,
                        error = %err,
                        "sale flagged for manual review"
                    );
                    report
                        .manual_review
                        .push((event.correlation_id, err.to_string()));
                }
            }
        }

        info!(
            applied = report.applied,
            skipped_existing = report.skipped_existing,
            skipped_no_recipe = report.skipped_no_recipe,
            manual_review = report.manual_review.len(),
            "sale back-fill finished"
        );
        Ok(report)
    }

    /// Contention is transient and retried with backoff; every other error
    /// is final for this event.
    fn apply_with_retry<L: MovementLog>(
        &self,
        service: &StockMutationService<L>,
        event: &SaleEvent,
    ) -> Result<SaleOutcome, LedgerError> {
        let mut attempt: u32 = 0;
        loop {
            match service.record_sale(event.clone()) {
                Err(LedgerError::Contention(reason)) if self.retry.should_retry(attempt + 1) => {
                    attempt += 1;
                    warn!(
                        correlation = %event.correlation_id,
                        attempt,
                        %reason,
                        "retrying contended sale"
                    );
                    std::thread::sleep(self.retry.delay_for_attempt(attempt));
                }
                other => return other,
            }
        }
    }
}

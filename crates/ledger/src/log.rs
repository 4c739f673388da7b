//! Append-only movement log.
//!
//! The log is the system of record: movements are never updated or deleted,
//! and the full history supports replay. Reads hand out snapshots taken
//! under the read lock, so a report never observes a half-committed
//! transfer.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use stockbook_core::{CorrelationId, LedgerError, LedgerResult, ProductId};

use crate::consumption::ConsumptionEvent;
use crate::movement::{Movement, StoredMovement};

/// Append-only, atomically-committing movement log.
///
/// A single `append` call is one logical transaction: either every movement
/// in the batch (and the optional consumption event) becomes visible, or
/// none do. Implementations assign monotonically increasing sequence
/// numbers across the whole log.
pub trait MovementLog: Send + Sync {
    /// Atomically commit a batch of movements, optionally together with the
    /// consumption event that correlates them to a sale.
    fn append(
        &self,
        movements: Vec<Movement>,
        consumption: Option<ConsumptionEvent>,
    ) -> LedgerResult<Vec<StoredMovement>>;

    /// Consistent point-in-time snapshot of the full log, in sequence order.
    fn snapshot(&self) -> Vec<StoredMovement>;

    /// Whether a sale correlation id has already been applied (back-fill
    /// idempotence check).
    fn has_correlation(&self, correlation_id: CorrelationId) -> bool;

    /// Consumption events, optionally filtered by product, within a period.
    fn consumption_events(
        &self,
        product_id: Option<ProductId>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<ConsumptionEvent>;
}

impl<L> MovementLog for Arc<L>
where
    L: MovementLog + ?Sized,
{
    fn append(
        &self,
        movements: Vec<Movement>,
        consumption: Option<ConsumptionEvent>,
    ) -> LedgerResult<Vec<StoredMovement>> {
        (**self).append(movements, consumption)
    }

    fn snapshot(&self) -> Vec<StoredMovement> {
        (**self).snapshot()
    }

    fn has_correlation(&self, correlation_id: CorrelationId) -> bool {
        (**self).has_correlation(correlation_id)
    }

    fn consumption_events(
        &self,
        product_id: Option<ProductId>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<ConsumptionEvent> {
        (**self).consumption_events(product_id, from, to)
    }
}

#[derive(Debug, Default)]
struct LogInner {
    movements: Vec<StoredMovement>,
    consumption_events: Vec<ConsumptionEvent>,
    applied_sales: HashSet<CorrelationId>,
    next_sequence: u64,
}

/// In-memory movement log.
///
/// Intended for tests/dev and as the reference semantics for durable
/// backends. Not optimized for large histories.
#[derive(Debug, Default)]
pub struct InMemoryMovementLog {
    inner: RwLock<LogInner>,
}

impl InMemoryMovementLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MovementLog for InMemoryMovementLog {
    fn append(
        &self,
        movements: Vec<Movement>,
        consumption: Option<ConsumptionEvent>,
    ) -> LedgerResult<Vec<StoredMovement>> {
        if movements.is_empty() {
            return Err(LedgerError::validation("empty movement batch"));
        }

        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerError::validation("movement log lock poisoned"))?;

        // Duplicate sale correlations are rejected before anything commits;
        // the whole batch is all-or-nothing.
        if let Some(event) = &consumption {
            if inner.applied_sales.contains(&event.correlation_id) {
                return Err(LedgerError::validation(format!(
                    "sale correlation {} already applied",
                    event.correlation_id
                )));
            }
        }

        let mut committed = Vec::with_capacity(movements.len());
        for movement in movements {
            inner.next_sequence += 1;
            let stored = StoredMovement {
                sequence: inner.next_sequence,
                movement,
            };
            inner.movements.push(stored.clone());
            committed.push(stored);
        }

        if let Some(event) = consumption {
            inner.applied_sales.insert(event.correlation_id);
            inner.consumption_events.push(event);
        }

        Ok(committed)
    }

    fn snapshot(&self) -> Vec<StoredMovement> {
        self.inner
            .read()
            .map(|inner| inner.movements.clone())
            .unwrap_or_default()
    }

    fn has_correlation(&self, correlation_id: CorrelationId) -> bool {
        self.inner
            .read()
            .map(|inner| inner.applied_sales.contains(&correlation_id))
            .unwrap_or(false)
    }

    fn consumption_events(
        &self,
        product_id: Option<ProductId>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<ConsumptionEvent> {
        self.inner
            .read()
            .map(|inner| {
                inner
                    .consumption_events
                    .iter()
                    .filter(|e| e.occurred_at >= from && e.occurred_at < to)
                    .filter(|e| product_id.is_none_or(|p| e.product_id == p))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Export a log snapshot as JSON lines, for offline audit/repair tooling.
pub fn export_jsonl(snapshot: &[StoredMovement]) -> LedgerResult<String> {
    let mut out = String::new();
    for stored in snapshot {
        let line = serde_json::to_string(stored)
            .map_err(|e| LedgerError::validation(format!("audit export failed: {e}")))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

/// Parse a JSON-lines audit export back into stored movements.
pub fn import_jsonl(data: &str) -> LedgerResult<Vec<StoredMovement>> {
    data.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|e| LedgerError::validation(format!("audit import failed: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use stockbook_core::{BatchId, IngredientId, LocationId, MovementId};

    use crate::position::rebuild_positions;

    fn receipt() -> Movement {
        Movement::receipt(
            IngredientId::new(),
            LocationId::new(),
            dec!(10),
            dec!(2.00),
            BatchId::new(),
            "PO-7",
            None,
            Utc::now(),
        )
    }

    #[test]
    fn append_assigns_monotonic_sequences() {
        let log = InMemoryMovementLog::new();
        let a = log.append(vec![receipt()], None).unwrap();
        let b = log.append(vec![receipt(), receipt()], None).unwrap();

        assert_eq!(a[0].sequence, 1);
        assert_eq!(b[0].sequence, 2);
        assert_eq!(b[1].sequence, 3);
        assert_eq!(log.snapshot().len(), 3);
    }

    #[test]
    fn empty_batch_is_rejected() {
        let log = InMemoryMovementLog::new();
        assert!(log.append(vec![], None).is_err());
    }

    #[test]
    fn duplicate_sale_correlation_is_rejected_atomically() {
        let log = InMemoryMovementLog::new();
        let correlation = CorrelationId::new();
        let event = ConsumptionEvent {
            correlation_id: correlation,
            product_id: ProductId::new(),
            location_id: LocationId::new(),
            quantity_sold: dec!(1),
            movement_ids: vec![MovementId::new()],
            occurred_at: Utc::now(),
        };

        log.append(vec![receipt()], Some(event.clone())).unwrap();
        assert!(log.has_correlation(correlation));

        let before = log.snapshot().len();
        let err = log.append(vec![receipt()], Some(event)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        // Nothing from the rejected batch leaked into the log.
        assert_eq!(log.snapshot().len(), before);
    }

    #[test]
    fn consumption_events_filter_by_product_and_period() {
        let log = InMemoryMovementLog::new();
        let product = ProductId::new();
        let now = Utc::now();

        let event = ConsumptionEvent {
            correlation_id: CorrelationId::new(),
            product_id: product,
            location_id: LocationId::new(),
            quantity_sold: dec!(2),
            movement_ids: vec![],
            occurred_at: now,
        };
        log.append(vec![receipt()], Some(event)).unwrap();

        let hit = log.consumption_events(
            Some(product),
            now - chrono::Duration::hours(1),
            now + chrono::Duration::hours(1),
        );
        assert_eq!(hit.len(), 1);

        let miss = log.consumption_events(
            Some(ProductId::new()),
            now - chrono::Duration::hours(1),
            now + chrono::Duration::hours(1),
        );
        assert!(miss.is_empty());
    }

    #[test]
    fn audit_export_round_trips_and_replays() {
        let log = InMemoryMovementLog::new();
        let ingredient = IngredientId::new();
        let location = LocationId::new();
        log.append(
            vec![Movement::receipt(
                ingredient,
                location,
                dec!(10),
                dec!(2.00),
                BatchId::new(),
                "PO-1",
                None,
                Utc::now(),
            )],
            None,
        )
        .unwrap();

        let snapshot = log.snapshot();
        let exported = export_jsonl(&snapshot).unwrap();
        let imported = import_jsonl(&exported).unwrap();
        assert_eq!(imported, snapshot);

        // An offline rebuild over the imported history matches the original.
        let rebuilt = rebuild_positions(&imported);
        let key = crate::position::StockKey::new(ingredient, location);
        assert_eq!(rebuilt[&key].quantity, dec!(10));
    }
}

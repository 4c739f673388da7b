//! The stock mutation choke-point.
//!
//! Every operation here follows the same shape: validate, acquire the
//! affected stock keys, enforce the negative-stock policy against the
//! in-memory positions, append one atomic movement batch to the log, then
//! evolve the positions from the committed movements. The log is the system
//! of record; positions are a cache kept in lock-step and rebuildable by
//! replay.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use stockbook_catalog::Catalog;
use stockbook_core::{
    BatchId, CorrelationId, IngredientId, LedgerError, LedgerResult, LocationId, round_cost,
    round_qty,
};
use stockbook_ledger::{
    ConsumptionEvent, Movement, MovementKind, MovementLog, StockKey, StockPosition,
    StoredMovement, rebuild_positions,
};
use stockbook_recipes::{RecipeBook, explode};
use stockbook_reconciliation::{IngredientVariance, ReconciliationReport, reconcile};

use crate::contracts::{
    AdjustReason, CountSubmission, PurchaseEvent, SaleEvent, SaleOutcome, StockLevelView,
    TransferRequest,
};
use crate::locks::{KeyLockGuard, KeyLocks};
use crate::policy::{NegativeStockPolicy, ServiceConfig};

/// Single writer to the movement log.
pub struct StockMutationService<L: MovementLog> {
    log: L,
    catalog: Arc<Catalog>,
    recipes: Arc<RecipeBook>,
    positions: RwLock<HashMap<StockKey, StockPosition>>,
    locks: KeyLocks,
    config: ServiceConfig,
}

impl<L: MovementLog> StockMutationService<L> {
    pub fn new(log: L, catalog: Arc<Catalog>, recipes: Arc<RecipeBook>, config: ServiceConfig) -> Self {
        Self {
            log,
            catalog,
            recipes,
            positions: RwLock::new(HashMap::new()),
            locks: KeyLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Record a goods receipt: a new batch plus its receipt movement.
    pub fn receive_batch(&self, event: PurchaseEvent) -> LedgerResult<BatchId> {
        // Validate after rounding: a sub-resolution quantity is as useless
        // as a zero one.
        let quantity = round_qty(event.quantity);
        let unit_cost = round_cost(event.unit_cost);
        if quantity <= Decimal::ZERO {
            return Err(LedgerError::invalid_quantity(format!(
                "receipt quantity must be positive, got {}",
                event.quantity
            )));
        }
        if unit_cost < Decimal::ZERO {
            return Err(LedgerError::invalid_quantity(format!(
                "receipt unit cost must be non-negative, got {}",
                event.unit_cost
            )));
        }

        let key = StockKey::new(event.ingredient_id, event.location_id);
        let _guard = self.lock_keys(&[key])?;

        let batch_id = BatchId::new();
        let movement = Movement::receipt(
            event.ingredient_id,
            event.location_id,
            quantity,
            unit_cost,
            batch_id,
            event.purchase_ref.clone(),
            None,
            event.received_at,
        );
        let committed = self.log.append(vec![movement], None)?;
        self.apply_committed(&committed)?;

        info!(
            ingredient = %event.ingredient_id,
            location = %event.location_id,
            batch = %batch_id,
            quantity = %event.quantity,
            source = %event.purchase_ref,
            "batch received"
        );
        Ok(batch_id)
    }

    /// Record a direct consumption (production use, staff drinks, samples).
    pub fn consume(
        &self,
        ingredient_id: IngredientId,
        location_id: LocationId,
        quantity: Decimal,
        correlation_id: CorrelationId,
    ) -> LedgerResult<StoredMovement> {
        let rounded = round_qty(quantity);
        if rounded <= Decimal::ZERO {
            return Err(LedgerError::invalid_quantity(format!(
                "consumption quantity must be positive, got {quantity}"
            )));
        }

        let key = StockKey::new(ingredient_id, location_id);
        let _guard = self.lock_keys(&[key])?;

        let unit_cost = self.guard_outflow(key, rounded)?;
        let movement =
            Movement::consumption(ingredient_id, location_id, rounded, unit_cost, correlation_id, Utc::now());
        let committed = self.log.append(vec![movement], None)?;
        self.apply_committed(&committed)?;
        committed.into_iter().next().ok_or(LedgerError::NotFound)
    }

    /// Move stock between locations.
    ///
    /// The out-flow and in-flow commit as one atomic batch under a shared
    /// correlation id. The destination batch carries the source's
    /// weighted-average cost, so value moves with the stock and the source
    /// average is untouched.
    pub fn transfer(&self, request: TransferRequest) -> LedgerResult<Vec<StoredMovement>> {
        if request.from == request.to {
            return Err(LedgerError::SameLocation);
        }
        let quantity = round_qty(request.quantity);
        if quantity <= Decimal::ZERO {
            return Err(LedgerError::invalid_quantity(format!(
                "transfer quantity must be positive, got {}",
                request.quantity
            )));
        }

        let source = StockKey::new(request.ingredient_id, request.from);
        let dest = StockKey::new(request.ingredient_id, request.to);
        let _guard = self.lock_keys(&[source, dest])?;

        let unit_cost = self.guard_outflow(source, quantity)?;
        let correlation = CorrelationId::new();
        let batch_id = BatchId::new();

        let committed = self.log.append(
            vec![
                Movement::transfer_out(
                    request.ingredient_id,
                    request.from,
                    quantity,
                    unit_cost,
                    correlation,
                    request.requested_at,
                ),
                Movement::transfer_in(
                    request.ingredient_id,
                    request.to,
                    quantity,
                    unit_cost,
                    batch_id,
                    correlation,
                    request.requested_at,
                ),
            ],
            None,
        )?;
        self.apply_committed(&committed)?;

        info!(
            ingredient = %request.ingredient_id,
            from = %request.from,
            to = %request.to,
            quantity = %quantity,
            unit_cost = %unit_cost,
            "stock transferred"
        );
        Ok(committed)
    }

    /// Record a manual correction: wastage (always an out-flow) or a signed
    /// stock-take correction. Positive corrections materialize a batch at
    /// the location's current weighted-average cost, keeping the batch total
    /// in step with the position quantity.
    pub fn adjust(
        &self,
        ingredient_id: IngredientId,
        location_id: LocationId,
        delta: Decimal,
        reason: AdjustReason,
    ) -> LedgerResult<StoredMovement> {
        let rounded = round_qty(delta);
        if rounded.is_zero() {
            return Err(LedgerError::invalid_quantity(format!(
                "adjustment delta must be non-zero, got {delta}"
            )));
        }
        if reason == AdjustReason::Wastage && rounded > Decimal::ZERO {
            return Err(LedgerError::invalid_quantity(format!(
                "wastage must reduce stock, got +{delta}"
            )));
        }

        let key = StockKey::new(ingredient_id, location_id);
        let _guard = self.lock_keys(&[key])?;

        let delta = rounded;
        let unit_cost = if delta < Decimal::ZERO {
            self.guard_outflow(key, -delta)?
        } else {
            self.current_cost(key)
        };
        let kind = match reason {
            AdjustReason::Wastage => MovementKind::Wastage,
            AdjustReason::Correction => MovementKind::Adjustment,
        };
        let batch_id = (delta > Decimal::ZERO).then(BatchId::new);

        let movement = Movement::correction(
            kind,
            ingredient_id,
            location_id,
            delta,
            unit_cost,
            batch_id,
            None,
            Utc::now(),
        );
        let committed = self.log.append(vec![movement], None)?;
        self.apply_committed(&committed)?;

        info!(
            ingredient = %ingredient_id,
            location = %location_id,
            delta = %delta,
            kind = %kind,
            "stock adjusted"
        );
        committed.into_iter().next().ok_or(LedgerError::NotFound)
    }

    /// Sync one finalized sale line: explode the recipe and record the
    /// resulting consumption movements atomically.
    ///
    /// Idempotent on the sale's correlation id; a replayed event is a no-op.
    /// A missing recipe never blocks the sale: consumption is skipped and
    /// the outcome says so.
    pub fn record_sale(&self, sale: SaleEvent) -> LedgerResult<SaleOutcome> {
        if self.log.has_correlation(sale.correlation_id) {
            return Ok(SaleOutcome::AlreadyApplied);
        }

        let explosion = match explode(
            &self.recipes,
            &self.catalog,
            sale.product_id,
            sale.quantity_sold,
            &sale.modifier_ids,
        ) {
            Ok(explosion) => explosion,
            Err(LedgerError::RecipeNotFound(product)) => {
                warn!(
                    product = %product,
                    correlation = %sale.correlation_id,
                    "sale has no recipe; consumption not logged"
                );
                return Ok(SaleOutcome::NoRecipe);
            }
            Err(other) => return Err(other),
        };

        if explosion.lines.is_empty() {
            warn!(
                product = %sale.product_id,
                correlation = %sale.correlation_id,
                "recipe exploded to no usable lines; consumption not logged"
            );
            return Ok(SaleOutcome::Applied {
                movements: Vec::new(),
                skipped: explosion.skipped,
            });
        }

        let keys: Vec<StockKey> = explosion
            .lines
            .iter()
            .map(|line| StockKey::new(line.ingredient_id, sale.location_id))
            .collect();
        let _guard = self.lock_keys(&keys)?;

        // Idempotence recheck under the lock: a concurrent replay of the
        // same event may have won the race above.
        if self.log.has_correlation(sale.correlation_id) {
            return Ok(SaleOutcome::AlreadyApplied);
        }

        // Every line must clear the policy before anything commits.
        let mut movements = Vec::with_capacity(explosion.lines.len());
        for line in &explosion.lines {
            let key = StockKey::new(line.ingredient_id, sale.location_id);
            let unit_cost = self.guard_outflow(key, line.quantity)?;
            movements.push(Movement::consumption(
                line.ingredient_id,
                sale.location_id,
                line.quantity,
                unit_cost,
                sale.correlation_id,
                sale.sold_at,
            ));
        }

        let event = ConsumptionEvent {
            correlation_id: sale.correlation_id,
            product_id: sale.product_id,
            location_id: sale.location_id,
            quantity_sold: sale.quantity_sold,
            movement_ids: movements.iter().map(|m| m.id).collect(),
            occurred_at: sale.sold_at,
        };
        let committed = self.log.append(movements, Some(event))?;
        self.apply_committed(&committed)?;

        info!(
            product = %sale.product_id,
            correlation = %sale.correlation_id,
            lines = committed.len(),
            skipped = explosion.skipped.len(),
            "sale consumption recorded"
        );
        Ok(SaleOutcome::Applied {
            movements: committed,
            skipped: explosion.skipped,
        })
    }

    /// Reconcile a physical count against the ledger for one location and
    /// period. When the service is configured to align, every discrepancy
    /// is closed with correction movements committed as one atomic batch.
    ///
    /// Alignment is idempotent on the submission's correlation id: replaying
    /// the same submission re-issues the report but never corrects stock
    /// twice.
    pub fn submit_count(&self, submission: CountSubmission) -> LedgerResult<ReconciliationReport> {
        let report = reconcile(
            &self.log.snapshot(),
            submission.location_id,
            submission.period_from,
            submission.period_to,
            &submission.counts,
        );

        if self.config.align_to_count {
            self.align_to_count(&submission, &report)?;
        }

        Ok(report)
    }

    /// Close every reported discrepancy with a correction movement, all in
    /// one log append. Every line clears the policy before anything commits,
    /// so a rejected line leaves stock untouched.
    fn align_to_count(
        &self,
        submission: &CountSubmission,
        report: &ReconciliationReport,
    ) -> LedgerResult<()> {
        let lines: Vec<&IngredientVariance> = report.discrepancies().collect();
        if lines.is_empty() {
            return Ok(());
        }

        let keys: Vec<StockKey> = lines
            .iter()
            .map(|line| StockKey::new(line.ingredient_id, submission.location_id))
            .collect();
        let _guard = self.lock_keys(&keys)?;

        // Corrections are stamped at alignment time, outside the counted
        // window, so the correlation id is what marks this submission as
        // already applied.
        if self.is_aligned(submission.correlation_id) {
            info!(
                location = %submission.location_id,
                correlation = %submission.correlation_id,
                "count submission already aligned; skipping"
            );
            return Ok(());
        }

        let now = Utc::now();
        let mut movements = Vec::with_capacity(lines.len());
        for line in lines {
            let delta = round_qty(line.variance);
            if delta.is_zero() {
                continue;
            }
            let key = StockKey::new(line.ingredient_id, submission.location_id);
            let unit_cost = if delta < Decimal::ZERO {
                self.guard_outflow(key, -delta)?
            } else {
                self.current_cost(key)
            };
            movements.push(Movement::correction(
                MovementKind::Adjustment,
                line.ingredient_id,
                submission.location_id,
                delta,
                unit_cost,
                (delta > Decimal::ZERO).then(BatchId::new),
                Some(submission.correlation_id),
                now,
            ));
        }
        if movements.is_empty() {
            return Ok(());
        }

        let committed = self.log.append(movements, None)?;
        self.apply_committed(&committed)?;

        info!(
            location = %submission.location_id,
            correlation = %submission.correlation_id,
            lines = committed.len(),
            "count variances aligned"
        );
        Ok(())
    }

    fn is_aligned(&self, correlation_id: CorrelationId) -> bool {
        self.log
            .snapshot()
            .iter()
            .any(|stored| stored.movement.correlation_id == Some(correlation_id))
    }

    /// Current stock levels, optionally scoped to one location.
    pub fn stock_levels(&self, location_id: Option<LocationId>) -> Vec<StockLevelView> {
        let positions = match self.positions.read() {
            Ok(positions) => positions,
            Err(_) => return Vec::new(),
        };

        let mut levels: Vec<StockLevelView> = positions
            .values()
            .filter(|p| location_id.is_none_or(|l| p.key.location_id == l))
            .map(|p| {
                let threshold = self
                    .catalog
                    .ingredient(p.key.ingredient_id)
                    .map(|i| i.reorder_threshold)
                    .unwrap_or(Decimal::ZERO);
                StockLevelView {
                    ingredient_id: p.key.ingredient_id,
                    location_id: p.key.location_id,
                    quantity: p.quantity,
                    unit_cost: p.unit_cost,
                    below_reorder_threshold: p.quantity < threshold,
                }
            })
            .collect();
        levels.sort_by_key(|l| (l.location_id, l.ingredient_id));
        levels
    }

    /// Discard the position cache and rebuild it from the full log.
    pub fn rebuild(&self) -> LedgerResult<()> {
        let rebuilt = rebuild_positions(&self.log.snapshot());
        let mut positions = self
            .positions
            .write()
            .map_err(|_| LedgerError::validation("position cache lock poisoned"))?;
        *positions = rebuilt;
        Ok(())
    }

    /// Snapshot of one position, for reporting and tests.
    pub fn position(&self, ingredient_id: IngredientId, location_id: LocationId) -> Option<StockPosition> {
        self.positions
            .read()
            .ok()?
            .get(&StockKey::new(ingredient_id, location_id))
            .cloned()
    }

    fn lock_keys(&self, keys: &[StockKey]) -> LedgerResult<KeyLockGuard> {
        self.locks
            .acquire(keys, self.config.lock_timeout, &self.config.lock_backoff)
    }

    /// Policy gate for out-flows. Returns the weighted-average unit cost the
    /// out-flow will be valued at.
    fn guard_outflow(&self, key: StockKey, requested: Decimal) -> LedgerResult<Decimal> {
        let (available, unit_cost) = self
            .positions
            .read()
            .ok()
            .and_then(|p| p.get(&key).map(|pos| (pos.quantity, pos.unit_cost)))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));

        if self.config.negative_stock == NegativeStockPolicy::Reject && requested > available {
            return Err(LedgerError::insufficient(requested, available));
        }
        Ok(unit_cost)
    }

    fn current_cost(&self, key: StockKey) -> Decimal {
        self.positions
            .read()
            .ok()
            .and_then(|p| p.get(&key).map(|pos| pos.unit_cost))
            .unwrap_or(Decimal::ZERO)
    }

    /// Evolve the position cache from committed movements. A poisoned cache
    /// lock is an error: the log still holds the movements (replay recovers
    /// the cache), but the operation must not report clean success over a
    /// diverged view.
    fn apply_committed(&self, committed: &[StoredMovement]) -> LedgerResult<()> {
        let mut positions = self
            .positions
            .write()
            .map_err(|_| LedgerError::validation("position cache lock poisoned"))?;
        for stored in committed {
            let key = StockKey::new(stored.movement.ingredient_id, stored.movement.location_id);
            positions
                .entry(key)
                .or_insert_with(|| StockPosition::empty(key))
                .apply(&stored.movement);
        }
        Ok(())
    }
}

//! `stockbook-ledger` — the durable record of every inventory-affecting event.
//!
//! The append-only movement log is the system of record. Batches and stock
//! positions are materialized views over it: disposable, and rebuildable by
//! replay at any time (offline audit/repair included).

pub mod batch;
pub mod consumption;
pub mod log;
pub mod movement;
pub mod position;

pub use batch::Batch;
pub use consumption::ConsumptionEvent;
pub use log::{InMemoryMovementLog, MovementLog, export_jsonl, import_jsonl};
pub use movement::{Movement, MovementKind, StoredMovement};
pub use position::{StockKey, StockPosition, rebuild_positions};

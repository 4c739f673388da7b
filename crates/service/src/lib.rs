//! `stockbook-service` — the stock mutation choke-point.
//!
//! Every stock-affecting operation (receive batch, consume, transfer,
//! adjust, sale sync) passes through [`StockMutationService`], which
//! enforces atomicity, the non-negative-stock policy, and per-(ingredient,
//! location) serialization. Nothing else writes to the movement log.

pub mod backfill;
pub mod contracts;
pub mod locks;
pub mod mutation;
pub mod policy;


pub use backfill::{BackfillReport, SaleBackfill, SaleSource};
pub use contracts::{
    AdjustReason, CountSubmission, PurchaseEvent, SaleEvent, SaleOutcome, StockLevelView,
    TransferRequest,
};
pub use locks::{KeyLockGuard, KeyLocks};
pub use mutation::StockMutationService;
pub use policy::{BackoffStrategy, NegativeStockPolicy, RetryPolicy, ServiceConfig};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{CorrelationId, LocationId, MovementId, ProductId};

/// Correlates one sale line to the consumption movements it produced.
///
/// Created once per sale, appended atomically with its movements, never
/// mutated. Profitability and audit queries read these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionEvent {
    pub correlation_id: CorrelationId,
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub quantity_sold: Decimal,
    pub movement_ids: Vec<MovementId>,
    pub occurred_at: DateTime<Utc>,
}

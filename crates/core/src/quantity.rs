//! Fixed-point numeric policy.
//!
//! Quantities and costs are decimals with a defined number of fractional
//! digits, never floats, so thousands of small movements cannot accumulate
//! drift. Division rounds half-to-even at the stored precision.

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits stored for quantities (e.g. 0.001 kg resolution).
pub const QTY_SCALE: u32 = 3;

/// Fractional digits stored for unit costs.
pub const COST_SCALE: u32 = 4;

/// Round a quantity to the stored precision (half-to-even).
pub fn round_qty(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(QTY_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Round a unit cost to the stored precision (half-to-even).
pub fn round_cost(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(COST_SCALE, RoundingStrategy::MidpointNearestEven)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_to_even_at_cost_scale() {
        assert_eq!(round_cost(dec!(1.00005)), dec!(1.0000));
        assert_eq!(round_cost(dec!(1.00015)), dec!(1.0002));
        assert_eq!(round_cost(dec!(2.00025)), dec!(2.0002));
    }

    #[test]
    fn rounds_half_to_even_at_qty_scale() {
        assert_eq!(round_qty(dec!(0.0605)), dec!(0.060));
        assert_eq!(round_qty(dec!(0.0615)), dec!(0.062));
    }

    #[test]
    fn already_exact_values_are_unchanged() {
        assert_eq!(round_qty(dec!(3.25)), dec!(3.25));
        assert_eq!(round_cost(dec!(3)), dec!(3));
    }
}

//! `stockbook-costing` — weighted-average costing engine.
//!
//! One blended unit cost per (ingredient, location), updated on receipt,
//! unchanged on outflow. Outflows only shrink the quantity denominator;
//! consuming without an intervening receipt never moves the average.

use rust_decimal::Decimal;

use stockbook_core::{round_cost, round_qty};

/// Blend a received batch into the current weighted average.
///
/// `new = (Q·C + q·c) / (Q + q)`, with the degenerate case `Q = 0` (or a
/// negative position under the allow-negative policy) yielding `c`. The
/// result is rounded half-to-even at the stored cost precision.
pub fn blend(
    on_hand_qty: Decimal,
    avg_cost: Decimal,
    received_qty: Decimal,
    received_cost: Decimal,
) -> Decimal {
    if on_hand_qty <= Decimal::ZERO {
        return round_cost(received_cost);
    }
    let total_qty = on_hand_qty + received_qty;
    if total_qty.is_zero() {
        return round_cost(received_cost);
    }
    round_cost((on_hand_qty * avg_cost + received_qty * received_cost) / total_qty)
}

/// Value of a movement line: quantity × unit cost, at cost precision.
pub fn extended_value(quantity: Decimal, unit_cost: Decimal) -> Decimal {
    round_cost(quantity * unit_cost)
}

/// Normalize a quantity to the stored quantity precision.
pub fn normalize_qty(quantity: Decimal) -> Decimal {
    round_qty(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn first_receipt_into_empty_location_sets_average() {
        assert_eq!(blend(dec!(0), dec!(0), dec!(10), dec!(2.00)), dec!(2.00));
    }

    #[test]
    fn second_receipt_blends_weighted_average() {
        // 10 @ 2.00 then 10 @ 4.00 -> 20 @ 3.00
        let avg = blend(dec!(10), dec!(2.00), dec!(10), dec!(4.00));
        assert_eq!(avg, dec!(3.00));
    }

    #[test]
    fn uneven_blend_rounds_at_cost_precision() {
        // (3*1.0000 + 1*2.0000) / 4 = 1.25
        assert_eq!(blend(dec!(3), dec!(1), dec!(1), dec!(2)), dec!(1.25));
        // (3*1 + 1*1.0001) / 4 = 1.000025 -> half-even at 4 dp
        assert_eq!(blend(dec!(3), dec!(1), dec!(1), dec!(1.0001)), dec!(1.0000));
    }

    #[test]
    fn negative_position_receipt_resets_average() {
        // Under the allow-negative policy the denominator is meaningless;
        // the incoming cost becomes the new average.
        assert_eq!(blend(dec!(-5), dec!(9.99), dec!(10), dec!(2.50)), dec!(2.50));
    }

    #[test]
    fn extended_value_rounds_half_even() {
        assert_eq!(extended_value(dec!(3), dec!(0.0333)), dec!(0.0999));
    }

    proptest! {
        /// Blending always lands between the two input costs (inclusive),
        /// for positive quantities.
        #[test]
        fn blended_average_is_bounded(
            q in 1i64..100_000,
            c in 0i64..1_000_000,
            rq in 1i64..100_000,
            rc in 0i64..1_000_000,
        ) {
            let on_hand = Decimal::new(q, 3);
            let avg = Decimal::new(c, 4);
            let recv = Decimal::new(rq, 3);
            let cost = Decimal::new(rc, 4);

            let blended = blend(on_hand, avg, recv, cost);
            let lo = avg.min(cost);
            let hi = avg.max(cost);
            // Half-even rounding can nudge past the bound by at most one ulp.
            let ulp = Decimal::new(1, 4);
            prop_assert!(blended >= lo - ulp && blended <= hi + ulp);
        }
    }
}

//! Unit conversion table.
//!
//! Static mapping between compatible units. Conversion is only defined
//! within a family; crossing families (mass vs volume) is a configuration
//! defect surfaced as [`LedgerError::UnitConversion`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Family of mutually convertible units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitFamily {
    Mass,
    Volume,
    Count,
}

impl core::fmt::Display for UnitFamily {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            UnitFamily::Mass => "mass",
            UnitFamily::Volume => "volume",
            UnitFamily::Count => "count",
        };
        f.write_str(s)
    }
}

/// Measurement unit for ingredient quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Gram,
    Kilogram,
    Milliliter,
    Liter,
    Piece,
}

impl Unit {
    pub fn family(&self) -> UnitFamily {
        match self {
            Unit::Gram | Unit::Kilogram => UnitFamily::Mass,
            Unit::Milliliter | Unit::Liter => UnitFamily::Volume,
            Unit::Piece => UnitFamily::Count,
        }
    }

    /// Exact factor to the family's base unit (gram, milliliter, piece).
    fn factor_to_base(&self) -> Decimal {
        match self {
            Unit::Gram | Unit::Milliliter | Unit::Piece => Decimal::ONE,
            Unit::Kilogram | Unit::Liter => dec!(1000),
        }
    }
}

impl core::fmt::Display for Unit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Milliliter => "ml",
            Unit::Liter => "l",
            Unit::Piece => "pc",
        };
        f.write_str(s)
    }
}

/// Convert a quantity between compatible units.
///
/// Factors are exact powers of ten, so no rounding happens here; callers
/// round at the stored precision when persisting.
pub fn convert(quantity: Decimal, from: Unit, to: Unit) -> LedgerResult<Decimal> {
    if from.family() != to.family() {
        return Err(LedgerError::unit_conversion(format!(
            "cannot convert {from} ({}) to {to} ({})",
            from.family(),
            to.family()
        )));
    }
    Ok(quantity * from.factor_to_base() / to.factor_to_base())
}

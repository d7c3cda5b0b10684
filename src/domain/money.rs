//! Lossless monetary numeric type backed by rust_decimal.
//!
//! Used for deal amounts, quota amounts, commission rates (0-1 fractions) and
//! attainment percentages. Rounding is always an explicit parameter; there is
//! no ambient precision configuration.

use rust_decimal::{Decimal as RustDecimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rounding mode applied when quantizing a monetary value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round half away from zero ("round half up" for positive amounts).
    /// The mode used for commission write-back.
    HalfUp,
    /// Banker's rounding.
    HalfEven,
}

impl Rounding {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Rounding::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            Rounding::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

/// Lossless decimal value for monetary calculations.
///
/// Backed by rust_decimal to avoid floating-point drift across many small
/// deals. Serializes to JSON number by default; persisted as a canonical
/// string.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Money {
    /// Create a Money from a RustDecimal.
    pub fn new(value: RustDecimal) -> Self {
        Money(value)
    }

    /// Parse a Money from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Money)
    }

    /// Format as a canonical string (no exponent notation, no trailing zeros).
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    /// Get the underlying RustDecimal.
    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Money(RustDecimal::ZERO)
    }

    /// The multiplicative identity (1).
    pub fn one() -> Self {
        Money(RustDecimal::ONE)
    }

    /// The value 100, used for percentage conversions.
    pub fn hundred() -> Self {
        Money(RustDecimal::ONE_HUNDRED)
    }

    /// Construct from an integer number of whole units.
    pub fn from_i64(value: i64) -> Self {
        Money(RustDecimal::from(value))
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Round to `dp` decimal places with an explicit rounding mode.
    pub fn round(&self, dp: u32, rounding: Rounding) -> Self {
        Money(self.0.round_dp_with_strategy(dp, rounding.strategy()))
    }

    /// Apply a rate fraction to this amount, quantized to 2 decimal places.
    ///
    /// This is the commission write-back operation: `amount * rate`, rounded
    /// per-deal so that individually rounded commissions never accumulate
    /// binary-float drift.
    pub fn apply_rate(&self, rate: Money, rounding: Rounding) -> Self {
        Money(self.0 * rate.0).round(2, rounding)
    }

    /// Attainment of `self` (total sales) against a quota, as a percentage.
    ///
    /// Returns 0 when the quota is zero rather than dividing by zero.
    pub fn attainment_percent(&self, quota: Money) -> Money {
        if quota.is_zero() {
            return Money::zero();
        }
        Money(self.0 / quota.0 * RustDecimal::ONE_HUNDRED)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Money {
    fn from(value: RustDecimal) -> Self {
        Money(value)
    }
}

impl From<Money> for RustDecimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Money {
    type Output = Money;

    fn mul(self, rhs: Money) -> Money {
        Money(self.0 * rhs.0)
    }
}

impl std::ops::Div for Money {
    type Output = Money;

    fn div(self, rhs: Money) -> Money {
        Money(self.0 / rhs.0)
    }
}

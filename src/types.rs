// 1.0: all the primitives live here. nothing in the derivation works without these types.
// symbols, sides, basis points, timestamps, and the decimal helpers every formula leans on.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

// asset or market key, e.g. "USDC" or "SOL-PERP".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Long = profit when price goes up. Short = profit when price goes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Long => dec!(1),
            Side::Short => dec!(-1),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Side::Long)
    }
}

// 1.1: basis points. 100 bps = 1%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bps(i32);

impl Bps {
    pub fn new(bps: i32) -> Self {
        Self(bps)
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(self.0 as i64, 4)
    }
}

// 1.2: millisecond timestamp. stamped on a snapshot when it is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

// 1.3: the float projection. UI only, never feed the result back into risk math.
pub trait DisplayNumber {
    fn to_display_number(&self) -> f64;
}

impl DisplayNumber for Decimal {
    fn to_display_number(&self) -> f64 {
        self.to_f64().unwrap_or(0.0)
    }
}

/// Divides `numerator` by `denominator`, returning `fallback` when the
/// denominator is zero or the quotient overflows.
pub fn ratio_or(numerator: Decimal, denominator: Decimal, fallback: Decimal) -> Decimal {
    if denominator.is_zero() {
        return fallback;
    }
    numerator.checked_div(denominator).unwrap_or(fallback)
}

/// Clamps `value` into `[low, high]`.
pub fn clamp(value: Decimal, low: Decimal, high: Decimal) -> Decimal {
    value.max(low).min(high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn side_helpers() {
        assert_eq!(Side::Long.sign(), dec!(1));
        assert_eq!(Side::Short.sign(), dec!(-1));
        assert_eq!(Side::Long.opposite(), Side::Short);
        assert!(Side::Long.is_long());
        assert!(!Side::Short.is_long());
    }

    #[test]
    fn bps_conversion() {
        assert_eq!(Bps::new(100).as_fraction(), dec!(0.01)); // 1%
        assert_eq!(Bps::new(10).as_fraction(), dec!(0.001));
    }

    #[test]
    fn ratio_guards_zero_denominator() {
        assert_eq!(ratio_or(dec!(5), dec!(0), dec!(1)), dec!(1));
        assert_eq!(ratio_or(dec!(5), dec!(2), dec!(1)), dec!(2.5));
        assert_eq!(ratio_or(Decimal::MAX, dec!(0.0001), dec!(7)), dec!(7));
    }

    #[test]
    fn display_projection() {
        assert_eq!(dec!(1.5).to_display_number(), 1.5);
        assert_eq!(dec!(-1000).to_display_number(), -1000.0);
    }

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp(dec!(150), dec!(0), dec!(100)), dec!(100));
        assert_eq!(clamp(dec!(-3), dec!(0), dec!(100)), dec!(0));
        assert_eq!(clamp(dec!(42), dec!(0), dec!(100)), dec!(42));
    }
}

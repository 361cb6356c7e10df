use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use crate::error::LedgerError;

/// Signed money amount stored as **integer cents**.
///
/// Every amount in the ledger (expense totals, split shares, balances,
/// settlements) goes through this type so sums reconcile exactly.
/// On the wire it is a plain decimal number (`33.34`).
///
/// ```rust
/// use splitledger::Money;
///
/// let share = Money::from_decimal(33.336).unwrap();
/// assert_eq!(share.cents(), 3334);
/// assert_eq!(share.to_string(), "33.34");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);
    /// Smallest representable currency unit.
    pub const CENT: Money = Money(1);
    /// Largest amount a single expense or payment may carry. Group totals
    /// stay far inside the `i64` range below it.
    pub const MAX_AMOUNT: Money = Money::units(1_000_000_000);

    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Whole currency units, e.g. `Money::units(300)` is 300.00.
    #[must_use]
    pub const fn units(units: i64) -> Self {
        Self(units * 100)
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Converts a decimal amount, rounding half away from zero to the cent.
    ///
    /// Fails on NaN, infinities and values outside the `i64` cent range.
    pub fn from_decimal(value: f64) -> Result<Self, LedgerError> {
        if !value.is_finite() {
            return Err(LedgerError::Validation(format!(
                "amount {value} is not a finite number"
            )));
        }
        let cents = (value * 100.0).round();
        if cents.abs() >= i64::MAX as f64 {
            return Err(LedgerError::Validation(format!(
                "amount {value} is out of range"
            )));
        }
        Ok(Self(cents as i64))
    }

    #[must_use]
    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Money::from_decimal(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(5).to_string(), "0.05");
        assert_eq!(Money::units(300).to_string(), "300.00");
        assert_eq!(Money::new(-3334).to_string(), "-33.34");
    }

    #[test]
    fn from_decimal_rounds_to_the_cent() {
        assert_eq!(Money::from_decimal(0.1 + 0.2).unwrap(), Money::new(30));
        assert_eq!(Money::from_decimal(19.999).unwrap(), Money::units(20));
        assert_eq!(Money::from_decimal(-0.016).unwrap(), Money::new(-2));
        assert!(Money::from_decimal(f64::NAN).is_err());
        assert!(Money::from_decimal(f64::INFINITY).is_err());
    }

    #[test]
    fn json_uses_decimal_numbers() {
        let money: Money = serde_json::from_str("33.34").unwrap();
        assert_eq!(money.cents(), 3334);
        assert_eq!(serde_json::to_string(&Money::units(100)).unwrap(), "100.0");
    }

    #[test]
    fn max_amount_is_a_billion() {
        assert_eq!(Money::MAX_AMOUNT.to_string(), "1000000000.00");
        assert_eq!(Money::from_decimal(1e9).unwrap(), Money::MAX_AMOUNT);
    }

    #[test]
    fn sums_over_iterators() {
        let shares = [Money::new(3334), Money::new(3333), Money::new(3333)];
        assert_eq!(shares.iter().sum::<Money>(), Money::units(100));
    }
}

use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Sub},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// The currency used when the configuration does not say otherwise.
pub const DEFAULT_CURRENCY_CODE: &str = "INR";

//--------------------------------------        Money        ---------------------------------------------------------
/// An amount of money in minor currency units (paise, cents, ...).
///
/// Prices are frozen into orders as `Money` values, so the representation must be exact. The unchecked operators are
/// kept for aggregating values that are already known to be in range (e.g. summing stored line totals). Anything that
/// derives a price from catalog data goes through [`Money::checked_add`] and [`Money::checked_mul`].
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Monetary arithmetic overflowed: {0}")]
pub struct MoneyOverflowError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Money) -> Result<Money, MoneyOverflowError> {
        self.0.checked_add(rhs.0).map(Self).ok_or_else(|| MoneyOverflowError(format!("{self} + {rhs}")))
    }

    pub fn checked_mul(self, quantity: i64) -> Result<Money, MoneyOverflowError> {
        self.0.checked_mul(quantity).map(Self).ok_or_else(|| MoneyOverflowError(format!("{self} x {quantity}")))
    }
}

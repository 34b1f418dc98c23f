//! Money value object.
//!
//! Amounts are held as integer minor units (cents / poisha). Intermediate
//! arithmetic that involves fractional quantities or rates happens in
//! [`Decimal`] and is rounded exactly once, half away from zero, when it is
//! turned back into `Money`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};

use super::ValidationError;

/// A monetary amount in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Self = Self(0);

    /// Creates money from minor units.
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates money from whole major units.
    pub const fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    /// Rounds a decimal amount to two places, half away from zero.
    pub fn from_decimal(amount: Decimal) -> Result<Self, ValidationError> {
        amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(Self)
            .ok_or_else(out_of_range)
    }

    /// Returns the amount in minor units.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the amount as an exact two-place decimal.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Multiplies by a decimal factor, rounding the product once.
    pub fn times(&self, factor: Decimal) -> Result<Self, ValidationError> {
        let product = self.to_decimal().checked_mul(factor).ok_or_else(out_of_range)?;
        Self::from_decimal(product)
    }

    pub fn checked_add(self, rhs: Money) -> Result<Self, ValidationError> {
        self.0.checked_add(rhs.0).map(Self).ok_or_else(out_of_range)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

fn out_of_range() -> ValidationError {
    ValidationError::invalid_format("amount", "amount out of range")
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::from_decimal(amount).map_err(serde::de::Error::custom)
    }
}

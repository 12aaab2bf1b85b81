//! Money value object.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};

/// Money amount represented in minor units (cents) to avoid floating point issues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Highest unit price a product may be listed at (1,000,000.00).
    pub const MAX_PRICE: Money = Money {
        cents: 100_000_000,
    };

    /// Creates a new Money amount from a whole-unit value.
    pub fn from_dollars(dollars: i64) -> Self {
        Self {
            cents: dollars.saturating_mul(100),
        }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the whole-unit portion.
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        (self.cents % 100).abs()
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity, failing if the result is out of range.
    pub fn checked_multiply(&self, quantity: u32) -> Result<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
            .ok_or_else(out_of_range)
    }

    /// Adds two amounts, failing if the result is out of range.
    pub fn checked_add(&self, other: Money) -> Result<Money> {
        self.cents
            .checked_add(other.cents)
            .map(Money::from_cents)
            .ok_or_else(out_of_range)
    }

    /// Subtracts an amount, failing if the result is out of range.
    pub fn checked_sub(&self, other: Money) -> Result<Money> {
        self.cents
            .checked_sub(other.cents)
            .map(Money::from_cents)
            .ok_or_else(out_of_range)
    }

    /// Subtracts an amount, clamping at the bounds of `i64`.
    pub fn saturating_sub(&self, other: Money) -> Money {
        Money {
            cents: self.cents.saturating_sub(other.cents),
        }
    }

    /// Sums amounts, failing if any partial sum is out of range.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Result<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Returns `percent`% of this amount, rounded half-up to the cent.
    pub fn percentage(&self, percent: u32) -> Money {
        let scaled = i128::from(self.cents) * i128::from(percent);
        let rounded = if scaled >= 0 {
            (scaled + 50) / 100
        } else {
            (scaled - 50) / 100
        };
        Money {
            cents: rounded.clamp(i64::MIN.into(), i64::MAX.into()) as i64,
        }
    }
}

fn out_of_range() -> DomainError {
    DomainError::InvalidInput("amount is out of range".to_string())
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-{}.{:02}", self.dollars().unsigned_abs(), self.cents_part())
        } else {
            write!(f, "{}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

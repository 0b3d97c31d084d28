//! Type-safe money representation using decimal arithmetic.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::points::Points;

/// Errors from arithmetic between [`Money`] values.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoneyError {
    /// The two operands carry different currencies.
    #[error("currency mismatch: {left:?} vs {right:?}")]
    CurrencyMismatch {
        /// Currency of the left operand.
        left: CurrencyCode,
        /// Currency of the right operand.
        right: CurrencyCode,
    },
}

/// A monetary amount with currency information.
///
/// Amounts are expressed in the currency's major unit (e.g. won, dollars)
/// and never re-derived client-side from catalog prices — they come from
/// the backend's pricing preview and stay as quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's major unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency_code,
        }
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Subtract another amount of the same currency.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::CurrencyMismatch`] if the currencies differ.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, MoneyError> {
        if self.currency_code != other.currency_code {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency_code,
                right: other.currency_code,
            });
        }
        Ok(Self::new(self.amount - other.amount, self.currency_code))
    }

    /// Subtract a point redemption (one point per major unit).
    ///
    /// The result may be negative; callers that require a non-negative
    /// settlement amount must bound the redemption with the point guard
    /// first.
    #[must_use]
    pub fn redeem_points(&self, points: Points) -> Self {
        Self::new(self.amount - Decimal::from(points), self.currency_code)
    }

    /// The largest whole point redemption this amount can absorb without
    /// going negative.
    #[must_use]
    pub fn point_capacity(&self) -> Points {
        if self.amount <= Decimal::ZERO {
            return Points::ZERO;
        }
        // A Decimal too large for u64 would saturate; order totals never
        // get near that range.
        Points::new(self.amount.trunc().to_u64().unwrap_or(u64::MAX))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:?}", self.amount, self.currency_code)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    KRW,
    USD,
    JPY,
    EUR,
}

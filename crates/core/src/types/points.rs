//! Loyalty point balances and redemptions.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A quantity of loyalty points.
///
/// One point redeems one major currency unit at settlement. The wrapper is
/// a `u64`, so a point quantity is non-negative by construction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Points(u64);

impl Points {
    /// Zero points.
    pub const ZERO: Self = Self(0);

    /// Create a point quantity.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the underlying count.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this is zero points.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Points {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Points> for u64 {
    fn from(points: Points) -> Self {
        points.0
    }
}

impl From<Points> for Decimal {
    fn from(points: Points) -> Self {
        Self::from(points.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(Points::new(5000) > Points::new(4999));
        assert_eq!(Points::new(100).min(Points::new(40)), Points::new(40));
    }

    #[test]
    fn test_decimal_conversion() {
        assert_eq!(Decimal::from(Points::new(5000)), Decimal::from(5000_u64));
    }
}

//! Loyalty-point redemption guard.

use perilla_core::{Money, Points};

/// Outcome of validating a requested point redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redemption {
    /// The redemption actually applied.
    pub applied: Points,
    /// Whether the request was pulled back to the nearest valid bound.
    pub clamped: bool,
}

/// Bound a requested redemption by the buyer's balance and the payable
/// amount.
///
/// A redemption may not exceed the balance, and may not exceed the payable
/// amount (the settlement can never go below zero). Out-of-bound requests
/// are clamped to the nearest valid value and flagged, so the caller can
/// choose between clamp-and-warn and reject. Deterministic, no I/O.
#[must_use]
pub fn validate_redemption(
    requested: Points,
    balance: Points,
    final_amount: &Money,
) -> Redemption {
    let cap = balance.min(final_amount.point_capacity());
    if requested <= cap {
        Redemption {
            applied: requested,
            clamped: false,
        }
    } else {
        Redemption {
            applied: cap,
            clamped: true,
        }
    }
}

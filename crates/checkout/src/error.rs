//! Locally-recovered checkout errors.
//!
//! These are the failures the flow surfaces as `Err` from its public API:
//! validation problems and actions attempted in the wrong step. They never
//! change the state machine and never trigger a network call. Failures of
//! the collaborating services are not errors here — they are states
//! (`PreviewFailed`, `GatewayFailed`, ...) carrying their own context.

use perilla_core::ItemId;
use thiserror::Error;

/// A request the flow refused without contacting any service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Checkout was started with no lines.
    #[error("nothing selected to check out")]
    EmptySelection,

    /// A line carried a zero quantity.
    #[error("invalid quantity for item {0}")]
    InvalidQuantity(ItemId),

    /// Payment was submitted before a method was chosen.
    #[error("a payment method must be selected before paying")]
    MissingPaymentMethod,

    /// The redemption on record would push the settlement below zero.
    #[error("point redemption exceeds the payable amount")]
    NegativeSettlement,

    /// A new attempt was started while one is past the point of no return.
    #[error("another payment attempt is still in flight")]
    AttemptInFlight,

    /// The action does not apply to the current step.
    #[error("{action} is not available during {step}")]
    UnavailableDuring {
        /// What the caller tried to do.
        action: &'static str,
        /// The step the flow was in.
        step: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            CheckoutError::EmptySelection.to_string(),
            "nothing selected to check out"
        );
        assert_eq!(
            CheckoutError::InvalidQuantity(ItemId::new("itm-9")).to_string(),
            "invalid quantity for item itm-9"
        );
        assert_eq!(
            CheckoutError::UnavailableDuring {
                action: "abort",
                step: "verifying",
            }
            .to_string(),
            "abort is not available during verifying"
        );
    }
}

//! The checkout state machine's states and pure transition decisions.

use perilla_core::{MerchantOrderRef, Money, OrderId, OrderLine, PaymentMethod, Points, TransactionId};
use thiserror::Error;

use crate::collaborators::{CallError, GatewayError, VerificationFailure};
use crate::types::{GatewayResult, GatewayStatus, OrderDraft, OrderPreview};

/// Mutable client state between preview and submission.
///
/// Frozen into an [`OrderDraft`] the moment payment is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutDraft {
    /// The frozen line selection.
    pub lines: Vec<OrderLine>,
    /// The pricing snapshot for this attempt.
    pub preview: OrderPreview,
    /// Points the buyer wants to redeem. Always within the guard's bounds.
    pub points_used: Points,
    /// The selected payment method, once chosen.
    pub payment_method: Option<PaymentMethod>,
    /// Free-text delivery note.
    pub delivery_instruction: String,
}

impl CheckoutDraft {
    pub(crate) fn from_preview(lines: Vec<OrderLine>, preview: OrderPreview) -> Self {
        Self {
            lines,
            preview,
            points_used: Points::ZERO,
            payment_method: None,
            delivery_instruction: String::new(),
        }
    }

    /// The amount the gateway will be asked to charge: the payable amount
    /// minus the point redemption. Recomputed locally on every edit.
    #[must_use]
    pub fn settlement_amount(&self) -> Money {
        self.preview.final_amount.redeem_points(self.points_used)
    }
}

/// Why a payment attempt produced no trusted charge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayFailure {
    /// The gateway declined the charge.
    #[error("payment was declined")]
    Declined,

    /// The user cancelled inside the payment app.
    #[error("payment was cancelled")]
    Cancelled,

    /// The delegate reported no result at all.
    #[error("payment ended without a result")]
    Abandoned,

    /// The callback carried a different attempt's reference — a stale or
    /// duplicate delivery, never trusted.
    #[error("gateway result belongs to a different attempt ({received})")]
    RefMismatch {
        /// The reference the callback actually carried.
        received: MerchantOrderRef,
    },

    /// The gateway SDK failed internally.
    #[error("gateway failure: {0}")]
    Sdk(String),
}

/// Whether money is known to have moved, for user messaging.
///
/// Shown with every failure so the buyer never assumes "it failed" and
/// purchases again when the charge actually went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundsStatus {
    /// Nothing was charged.
    NotCharged,
    /// The gateway reported a charge but it could not be verified.
    Indeterminate,
    /// The charge is verified; money has moved.
    Charged,
}

/// A discriminated snapshot of the checkout state machine.
///
/// Each variant carries exactly the data that step owns; the UI renders
/// from these snapshots and never mutates them.
#[derive(Debug, Clone)]
pub enum CheckoutState {
    /// No checkout in progress.
    Idle,

    /// Waiting for the pricing preview.
    PreviewLoading {
        lines: Vec<OrderLine>,
    },

    /// The preview call failed; retryable.
    PreviewFailed {
        lines: Vec<OrderLine>,
        error: CallError,
    },

    /// Preview loaded; no edits yet (zero points, no method).
    PreviewReady {
        draft: CheckoutDraft,
    },

    /// The buyer is editing points, method, or delivery note.
    AwaitingPaymentSelection {
        draft: CheckoutDraft,
    },

    /// Control handed to the payment delegate. Unbounded duration.
    AwaitingGatewayResult {
        draft: CheckoutDraft,
        order_ref: MerchantOrderRef,
        amount: Money,
    },

    /// The gateway produced no trusted charge for this attempt.
    GatewayFailed {
        draft: CheckoutDraft,
        order_ref: MerchantOrderRef,
        failure: GatewayFailure,
    },

    /// Asking the backend to confirm the charge is genuine and unconsumed.
    Verifying {
        draft: CheckoutDraft,
        order_ref: MerchantOrderRef,
        transaction_id: TransactionId,
        amount: Money,
    },

    /// The charge could not be trusted; fatal for this attempt.
    VerificationFailed {
        order_ref: MerchantOrderRef,
        transaction_id: TransactionId,
        failure: VerificationFailure,
    },

    /// Creating the order with a verified transaction reference.
    CreatingOrder {
        order: OrderDraft,
        attempt: u32,
    },

    /// The charge is verified but the order was not recorded; retryable
    /// with the same transaction reference, never by charging again.
    OrderCreationFailed {
        order: OrderDraft,
        attempts: u32,
        error: CallError,
    },

    /// The order exists.
    Completed {
        order_id: OrderId,
        order_ref: MerchantOrderRef,
        transaction_id: TransactionId,
    },
}

impl CheckoutState {
    /// Short step name for logging and messaging.
    #[must_use]
    pub const fn step(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PreviewLoading { .. } => "preview loading",
            Self::PreviewFailed { .. } => "preview failed",
            Self::PreviewReady { .. } => "preview ready",
            Self::AwaitingPaymentSelection { .. } => "payment selection",
            Self::AwaitingGatewayResult { .. } => "awaiting gateway result",
            Self::GatewayFailed { .. } => "gateway failed",
            Self::Verifying { .. } => "verifying",
            Self::VerificationFailed { .. } => "verification failed",
            Self::CreatingOrder { .. } => "creating order",
            Self::OrderCreationFailed { .. } => "order creation failed",
            Self::Completed { .. } => "completed",
        }
    }

    /// Whether the attempt is past the point of no return: money may be
    /// moving, so no new attempt may start and abort is refused.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::AwaitingGatewayResult { .. } | Self::Verifying { .. } | Self::CreatingOrder { .. }
        )
    }

    /// Whether money is known to have moved in this state.
    #[must_use]
    pub const fn funds_status(&self) -> FundsStatus {
        match self {
            Self::Idle
            | Self::PreviewLoading { .. }
            | Self::PreviewFailed { .. }
            | Self::PreviewReady { .. }
            | Self::AwaitingPaymentSelection { .. }
            | Self::AwaitingGatewayResult { .. }
            | Self::GatewayFailed { .. } => FundsStatus::NotCharged,
            Self::Verifying { .. } | Self::VerificationFailed { .. } => FundsStatus::Indeterminate,
            Self::CreatingOrder { .. }
            | Self::OrderCreationFailed { .. }
            | Self::Completed { .. } => FundsStatus::Charged,
        }
    }

    /// The gateway transaction tied to this state, for support diagnostics.
    #[must_use]
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match self {
            Self::Verifying { transaction_id, .. }
            | Self::VerificationFailed { transaction_id, .. }
            | Self::Completed { transaction_id, .. } => Some(transaction_id),
            Self::CreatingOrder { order, .. } | Self::OrderCreationFailed { order, .. } => {
                Some(&order.transaction_id)
            }
            _ => None,
        }
    }

    /// The attempt's merchant order reference, if one has been minted.
    #[must_use]
    pub fn order_ref(&self) -> Option<&MerchantOrderRef> {
        match self {
            Self::AwaitingGatewayResult { order_ref, .. }
            | Self::GatewayFailed { order_ref, .. }
            | Self::Verifying { order_ref, .. }
            | Self::VerificationFailed { order_ref, .. }
            | Self::Completed { order_ref, .. } => Some(order_ref),
            Self::CreatingOrder { order, .. } | Self::OrderCreationFailed { order, .. } => {
                Some(&order.order_ref)
            }
            _ => None,
        }
    }
}

/// Decide what a gateway outcome means for the current attempt.
///
/// A result whose reference does not match the attempt's is never trusted,
/// whatever its status says — it may be a stale or duplicate callback for
/// some other attempt.
pub(crate) fn classify_gateway_outcome(
    expected: &MerchantOrderRef,
    outcome: Result<GatewayResult, GatewayError>,
) -> Result<TransactionId, GatewayFailure> {
    let result = match outcome {
        Ok(result) => result,
        Err(GatewayError::NoResult) => return Err(GatewayFailure::Abandoned),
        Err(GatewayError::Sdk(message)) => return Err(GatewayFailure::Sdk(message)),
    };

    if result.order_ref != *expected {
        return Err(GatewayFailure::RefMismatch {
            received: result.order_ref,
        });
    }

    match result.status {
        GatewayStatus::Success => Ok(result.transaction_id),
        GatewayStatus::Failure => Err(GatewayFailure::Declined),
        GatewayStatus::Cancelled => Err(GatewayFailure::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use perilla_core::CurrencyCode;
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::BuyerContact;

    fn preview() -> OrderPreview {
        let krw = |amount: i64| Money::new(Decimal::from(amount), CurrencyCode::KRW);
        OrderPreview {
            lines: vec![OrderLine::new("itm-1", "M", 1).unwrap()],
            total_amount: krw(50000),
            discount_amount: krw(5000),
            final_amount: krw(45000),
            expected_points_earned: Points::new(450),
            buyer_point_balance: Points::new(5000),
            buyer_contact: BuyerContact {
                name: "Kim".to_string(),
                phone: "010-0000-0000".to_string(),
                address: "Seoul".to_string(),
            },
        }
    }

    fn result(order_ref: &MerchantOrderRef, status: GatewayStatus) -> GatewayResult {
        GatewayResult {
            transaction_id: TransactionId::new("tx-1"),
            order_ref: order_ref.clone(),
            status,
        }
    }

    #[test]
    fn test_settlement_recomputes_from_points() {
        let mut draft = CheckoutDraft::from_preview(preview().lines.clone(), preview());
        assert_eq!(draft.settlement_amount().amount, Decimal::from(45000));

        draft.points_used = Points::new(5000);
        assert_eq!(draft.settlement_amount().amount, Decimal::from(40000));
    }

    #[test]
    fn test_success_with_matching_ref_proceeds() {
        let expected = MerchantOrderRef::new("mo-1");
        let tx = classify_gateway_outcome(&expected, Ok(result(&expected, GatewayStatus::Success)))
            .unwrap();
        assert_eq!(tx, TransactionId::new("tx-1"));
    }

    #[test]
    fn test_mismatched_ref_never_proceeds_even_on_success() {
        let expected = MerchantOrderRef::new("mo-1");
        let stale = MerchantOrderRef::new("mo-0");
        let failure =
            classify_gateway_outcome(&expected, Ok(result(&stale, GatewayStatus::Success)))
                .unwrap_err();
        assert_eq!(failure, GatewayFailure::RefMismatch { received: stale });
    }

    #[test]
    fn test_declined_and_cancelled_map_to_failures() {
        let expected = MerchantOrderRef::new("mo-1");
        assert_eq!(
            classify_gateway_outcome(&expected, Ok(result(&expected, GatewayStatus::Failure)))
                .unwrap_err(),
            GatewayFailure::Declined
        );
        assert_eq!(
            classify_gateway_outcome(&expected, Ok(result(&expected, GatewayStatus::Cancelled)))
                .unwrap_err(),
            GatewayFailure::Cancelled
        );
    }

    #[test]
    fn test_no_result_maps_to_abandoned() {
        let expected = MerchantOrderRef::new("mo-1");
        assert_eq!(
            classify_gateway_outcome(&expected, Err(GatewayError::NoResult)).unwrap_err(),
            GatewayFailure::Abandoned
        );
    }

    #[test]
    fn test_funds_status_communicates_known_movement() {
        assert_eq!(CheckoutState::Idle.funds_status(), FundsStatus::NotCharged);

        let draft = CheckoutDraft::from_preview(preview().lines.clone(), preview());
        let gateway_failed = CheckoutState::GatewayFailed {
            draft,
            order_ref: MerchantOrderRef::new("mo-1"),
            failure: GatewayFailure::Cancelled,
        };
        assert_eq!(gateway_failed.funds_status(), FundsStatus::NotCharged);

        let verification_failed = CheckoutState::VerificationFailed {
            order_ref: MerchantOrderRef::new("mo-1"),
            transaction_id: TransactionId::new("tx-1"),
            failure: VerificationFailure::AlreadyConsumed,
        };
        assert_eq!(
            verification_failed.funds_status(),
            FundsStatus::Indeterminate
        );
    }

    #[test]
    fn test_in_flight_states() {
        let draft = CheckoutDraft::from_preview(preview().lines.clone(), preview());
        let waiting = CheckoutState::AwaitingGatewayResult {
            draft: draft.clone(),
            order_ref: MerchantOrderRef::new("mo-1"),
            amount: preview().final_amount,
        };
        assert!(waiting.is_in_flight());
        assert!(!CheckoutState::Idle.is_in_flight());
        assert!(!CheckoutState::PreviewReady { draft }.is_in_flight());
    }

    #[test]
    fn test_failure_states_keep_transaction_context() {
        let failed = CheckoutState::VerificationFailed {
            order_ref: MerchantOrderRef::new("mo-1"),
            transaction_id: TransactionId::new("tx-1"),
            failure: VerificationFailure::NotFound,
        };
        assert_eq!(failed.transaction_id(), Some(&TransactionId::new("tx-1")));
        assert_eq!(failed.order_ref(), Some(&MerchantOrderRef::new("mo-1")));
    }
}

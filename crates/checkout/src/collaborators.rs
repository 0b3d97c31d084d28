//! Contracts of the services the checkout flow coordinates.
//!
//! Every network dependency of the orchestrator is one of these traits, so
//! the whole flow can run against deterministic stubs in tests. The HTTP
//! implementations live in [`crate::backend`]; the gateway bridge lives in
//! [`crate::gateway`].

use async_trait::async_trait;
use perilla_core::{MerchantOrderRef, Money, OrderId, OrderLine, TransactionId};
use thiserror::Error;

use crate::context::SessionContext;
use crate::types::{ChargeRequest, GatewayResult, OrderDraft, OrderPreview};

/// A backend call that did not produce a usable response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The call exceeded its time bound.
    #[error("request timed out")]
    Timeout,

    /// The request never completed (DNS, connection reset, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("rejected by server: {0}")]
    Rejected(String),

    /// The server answered 2xx but the body was not what the contract says.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl CallError {
    /// Whether retrying the identical request can plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network(_))
    }
}

/// Why a settlement could not be verified.
///
/// All kinds take the flow to the same failed state, but the kind is kept:
/// `AlreadyConsumed` means a duplicate gateway callback, and the order may
/// already exist under a prior attempt — support messaging must not treat
/// that like a genuine failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    /// The backend has no record of the transaction.
    #[error("transaction not found")]
    NotFound,

    /// The charged amount does not match the requested settlement.
    #[error("charged amount does not match the requested settlement")]
    AmountMismatch,

    /// The transaction was already used to create an order.
    #[error("transaction already consumed by a previous order")]
    AlreadyConsumed,

    /// The verification call itself failed.
    #[error("network error: {0}")]
    Network(String),
}

/// The payment delegate failed to produce any result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The external payment app finished without reporting back — the user
    /// abandoned it, or the callback was lost.
    #[error("payment ended without a result")]
    NoResult,

    /// The gateway SDK reported an internal error.
    #[error("gateway failure: {0}")]
    Sdk(String),
}

/// Prices a line selection and reports the buyer's point balance.
#[async_trait]
pub trait PricingPreview: Send + Sync {
    /// Produce the read-only pricing snapshot for one checkout attempt.
    async fn preview(
        &self,
        ctx: &SessionContext,
        lines: &[OrderLine],
    ) -> Result<OrderPreview, CallError>;
}

/// Moves money through the external payment gateway.
///
/// A single awaited call of indeterminate duration — the user may leave
/// the app to authenticate with a third party, so callers must not apply
/// a timeout.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge the settlement amount and wait for the gateway's verdict.
    async fn charge(&self, request: ChargeRequest) -> Result<GatewayResult, GatewayError>;
}

/// Confirms a gateway transaction is genuine, unconsumed, and for the
/// expected amount, before the client trusts it.
#[async_trait]
pub trait SettlementVerifier: Send + Sync {
    /// Verify one transaction against the amount the client requested.
    async fn verify_settlement(
        &self,
        ctx: &SessionContext,
        transaction_id: &TransactionId,
        order_ref: &MerchantOrderRef,
        expected: &Money,
    ) -> Result<(), VerificationFailure>;
}

/// Durably creates the order on the backend.
#[async_trait]
pub trait OrderWriter: Send + Sync {
    /// Create the order; idempotent on the draft's merchant order
    /// reference, so identical retries return the same order id.
    async fn create_order(
        &self,
        ctx: &SessionContext,
        draft: &OrderDraft,
    ) -> Result<OrderId, CallError>;
}

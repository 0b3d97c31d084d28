//! Domain types produced and consumed by the checkout flow.

use perilla_core::{
    MerchantOrderRef, Money, OrderLine, PaymentMethod, Points, TransactionId,
};
use serde::{Deserialize, Serialize};

/// Read-only pricing snapshot for one checkout attempt.
///
/// Produced by the backend's pricing preview and never re-derived
/// client-side from catalog prices, so the client cannot drift from what
/// the server will actually charge. Discarded when the attempt ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPreview {
    /// The lines being priced, echoed back by the server.
    pub lines: Vec<OrderLine>,
    /// Sum of line prices before discounts.
    pub total_amount: Money,
    /// Total discount applied by the server.
    pub discount_amount: Money,
    /// Amount payable before point redemption.
    pub final_amount: Money,
    /// Points the buyer will earn if the order completes.
    pub expected_points_earned: Points,
    /// The buyer's current point balance.
    pub buyer_point_balance: Points,
    /// Delivery contact snapshot from the buyer's profile.
    pub buyer_contact: BuyerContact,
}

/// Delivery contact details returned with the preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerContact {
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// What the orchestrator hands the payment delegate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    /// The settlement amount (after point redemption), never the
    /// pre-discount total.
    pub amount: Money,
    /// The selected payment method.
    pub method: PaymentMethod,
    /// Idempotency key for this attempt; the gateway must echo it back.
    pub order_ref: MerchantOrderRef,
}

/// Outcome reported by the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResult {
    /// Gateway-side transaction identifier.
    pub transaction_id: TransactionId,
    /// The merchant order reference the gateway was asked to echo.
    pub order_ref: MerchantOrderRef,
    /// Whether the charge went through.
    pub status: GatewayStatus,
}

/// Gateway-reported charge status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayStatus {
    Success,
    Failure,
    Cancelled,
}

/// The frozen payload for order creation.
///
/// Safe to resend verbatim: the backend deduplicates on the merchant order
/// reference, so a retry after a lost response cannot create a second
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    /// The frozen line selection.
    pub lines: Vec<OrderLine>,
    /// The settlement amount actually charged.
    pub amount_due: Money,
    /// Points redeemed against the order.
    pub points_used: Points,
    /// How the settlement amount was charged.
    pub payment_method: PaymentMethod,
    /// Free-text delivery note. Empty when the buyer left none.
    pub delivery_instruction: String,
    /// The verified gateway transaction.
    pub transaction_id: TransactionId,
    /// Idempotency key of the attempt.
    pub order_ref: MerchantOrderRef,
}

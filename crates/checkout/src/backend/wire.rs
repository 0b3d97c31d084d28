//! Wire shapes for the shop backend's JSON API, with conversions to and
//! from the domain types. The backend speaks camelCase; the domain stays
//! idiomatic Rust.

use perilla_core::{CurrencyCode, ItemId, Money, OrderLine, PaymentMethod, Points, VariantKey};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{BuyerContact, OrderDraft, OrderPreview};

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MoneyBody {
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

impl From<&Money> for MoneyBody {
    fn from(money: &Money) -> Self {
        Self {
            amount: money.amount,
            currency: money.currency_code,
        }
    }
}

impl From<MoneyBody> for Money {
    fn from(body: MoneyBody) -> Self {
        Self::new(body.amount, body.currency)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LineBody {
    pub item_id: String,
    pub variant_key: String,
    pub quantity: u32,
}

impl From<&OrderLine> for LineBody {
    fn from(line: &OrderLine) -> Self {
        Self {
            item_id: line.item_id.as_str().to_owned(),
            variant_key: line.variant_key.as_str().to_owned(),
            quantity: line.quantity,
        }
    }
}

impl From<LineBody> for OrderLine {
    fn from(body: LineBody) -> Self {
        Self {
            item_id: ItemId::new(body.item_id),
            variant_key: VariantKey::new(body.variant_key),
            quantity: body.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PreviewRequest {
    pub lines: Vec<LineBody>,
}

impl PreviewRequest {
    pub(crate) fn from_lines(lines: &[OrderLine]) -> Self {
        Self {
            lines: lines.iter().map(LineBody::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContactBody {
    pub name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PreviewResponse {
    pub lines: Vec<LineBody>,
    pub total_amount: MoneyBody,
    pub discount_amount: MoneyBody,
    pub final_amount: MoneyBody,
    pub expected_points_earned: u64,
    pub buyer_point_balance: u64,
    pub buyer_contact: ContactBody,
}

pub(crate) fn convert_preview(response: PreviewResponse) -> OrderPreview {
    OrderPreview {
        lines: response.lines.into_iter().map(OrderLine::from).collect(),
        total_amount: response.total_amount.into(),
        discount_amount: response.discount_amount.into(),
        final_amount: response.final_amount.into(),
        expected_points_earned: Points::new(response.expected_points_earned),
        buyer_point_balance: Points::new(response.buyer_point_balance),
        buyer_contact: BuyerContact {
            name: response.buyer_contact.name,
            phone: response.buyer_contact.phone,
            address: response.buyer_contact.address,
        },
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerifyRequest {
    pub transaction_id: String,
    pub merchant_order_ref: String,
    pub amount: MoneyBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateOrderRequest {
    pub lines: Vec<LineBody>,
    pub final_amount: MoneyBody,
    pub points_used: u64,
    pub payment_method: PaymentMethod,
    pub delivery_instruction: String,
    pub transaction_id: String,
    pub merchant_order_ref: String,
}

impl From<&OrderDraft> for CreateOrderRequest {
    fn from(draft: &OrderDraft) -> Self {
        Self {
            lines: draft.lines.iter().map(LineBody::from).collect(),
            final_amount: MoneyBody::from(&draft.amount_due),
            points_used: draft.points_used.get(),
            payment_method: draft.payment_method,
            delivery_instruction: draft.delivery_instruction.clone(),
            transaction_id: draft.transaction_id.as_str().to_owned(),
            merchant_order_ref: draft.order_ref.as_str().to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateOrderResponse {
    pub order_id: String,
}

/// Error payload the backend attaches to non-success statuses.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

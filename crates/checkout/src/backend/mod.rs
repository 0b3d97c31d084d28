//! Shop backend API client.
//!
//! Implements the pricing-preview, settlement-verification, and
//! order-creation contracts over JSON/HTTPS with `reqwest`. The buyer's
//! credential arrives per call in a [`SessionContext`]; the client itself
//! holds no session state.

mod wire;

use std::sync::Arc;

use async_trait::async_trait;
use perilla_core::{MerchantOrderRef, Money, OrderId, OrderLine, TransactionId};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use crate::collaborators::{
    CallError, OrderWriter, PricingPreview, SettlementVerifier, VerificationFailure,
};
use crate::config::CheckoutConfig;
use crate::context::SessionContext;
use crate::types::{OrderDraft, OrderPreview};

use wire::{
    CreateOrderRequest, CreateOrderResponse, ErrorBody, MoneyBody, PreviewRequest,
    PreviewResponse, VerifyRequest, convert_preview,
};

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the shop backend API.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    http: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// The per-request timeout comes from the configuration, so even a
    /// stalled connection surfaces as a retryable failure instead of a
    /// hang.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &CheckoutConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.api_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                http,
                base_url: config.backend_url.clone(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.inner.base_url.clone();
        let trimmed = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{trimmed}/{path}"));
        url
    }

    /// POST a JSON body and parse a JSON response.
    async fn post_json<B, T>(
        &self,
        ctx: &SessionContext,
        path: &str,
        body: &B,
    ) -> Result<T, CallError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .inner
            .http
            .post(self.endpoint(path))
            .bearer_auth(ctx.access_token().expose_secret())
            .json(body)
            .send()
            .await
            .map_err(call_error)?;

        let status = response.status();
        // Read the body as text first for better error diagnostics
        let text = response.text().await.map_err(call_error)?;

        if !status.is_success() {
            let snippet: String = text.chars().take(200).collect();
            tracing::error!(
                status = %status,
                body = %snippet,
                "backend returned non-success status"
            );
            return Err(CallError::Rejected(format!("HTTP {status}: {snippet}")));
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "failed to parse backend response"
            );
            CallError::InvalidResponse(e.to_string())
        })
    }

    /// POST the verification request and map the response to the typed
    /// verification outcome.
    async fn post_verify(
        &self,
        ctx: &SessionContext,
        request: &VerifyRequest,
    ) -> Result<(), VerificationFailure> {
        let response = self
            .inner
            .http
            .post(self.endpoint("payments/verify"))
            .bearer_auth(ctx.access_token().expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| VerificationFailure::Network(call_error(e).to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response
            .text()
            .await
            .map_err(|e| VerificationFailure::Network(call_error(e).to_string()))?;
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

        let failure = match (status, body.code.as_str()) {
            (reqwest::StatusCode::NOT_FOUND, _) | (_, "NOT_FOUND") => {
                VerificationFailure::NotFound
            }
            (reqwest::StatusCode::CONFLICT, _) | (_, "ALREADY_CONSUMED") => {
                VerificationFailure::AlreadyConsumed
            }
            (reqwest::StatusCode::UNPROCESSABLE_ENTITY, _) | (_, "AMOUNT_MISMATCH") => {
                VerificationFailure::AmountMismatch
            }
            _ => {
                let snippet: String = text.chars().take(200).collect();
                VerificationFailure::Network(format!("HTTP {status}: {snippet}"))
            }
        };
        Err(failure)
    }
}

/// Map a transport error to the call taxonomy.
fn call_error(error: reqwest::Error) -> CallError {
    if error.is_timeout() {
        CallError::Timeout
    } else {
        CallError::Network(error.to_string())
    }
}

// =============================================================================
// Collaborator Contracts
// =============================================================================

#[async_trait]
impl PricingPreview for BackendClient {
    #[instrument(skip_all, fields(line_count = lines.len()))]
    async fn preview(
        &self,
        ctx: &SessionContext,
        lines: &[OrderLine],
    ) -> Result<OrderPreview, CallError> {
        let request = PreviewRequest::from_lines(lines);
        let response: PreviewResponse = self.post_json(ctx, "checkout/preview", &request).await?;
        Ok(convert_preview(response))
    }
}

#[async_trait]
impl SettlementVerifier for BackendClient {
    #[instrument(skip_all, fields(transaction_id = %transaction_id, order_ref = %order_ref))]
    async fn verify_settlement(
        &self,
        ctx: &SessionContext,
        transaction_id: &TransactionId,
        order_ref: &MerchantOrderRef,
        expected: &Money,
    ) -> Result<(), VerificationFailure> {
        let request = VerifyRequest {
            transaction_id: transaction_id.as_str().to_owned(),
            merchant_order_ref: order_ref.as_str().to_owned(),
            amount: MoneyBody::from(expected),
        };
        self.post_verify(ctx, &request).await
    }
}

#[async_trait]
impl OrderWriter for BackendClient {
    #[instrument(skip_all, fields(order_ref = %draft.order_ref, transaction_id = %draft.transaction_id))]
    async fn create_order(
        &self,
        ctx: &SessionContext,
        draft: &OrderDraft,
    ) -> Result<OrderId, CallError> {
        let request = CreateOrderRequest::from(draft);
        let response: CreateOrderResponse = self.post_json(ctx, "orders", &request).await?;
        Ok(OrderId::new(response.order_id))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(base: &str) -> CheckoutConfig {
        CheckoutConfig {
            backend_url: Url::parse(base).unwrap(),
            api_timeout: Duration::from_secs(10),
            create_order_retries: 2,
        }
    }

    #[test]
    fn test_endpoint_joins_without_doubled_slashes() {
        let client = BackendClient::new(&config("https://api.perilla.shop")).unwrap();
        assert_eq!(
            client.endpoint("payments/verify").as_str(),
            "https://api.perilla.shop/payments/verify"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let client = BackendClient::new(&config("https://api.perilla.shop/v2/")).unwrap();
        assert_eq!(
            client.endpoint("orders").as_str(),
            "https://api.perilla.shop/v2/orders"
        );
    }
}

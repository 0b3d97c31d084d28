//! HTTP-level tests of the backend client against a mock server.
//!
//! Pins the wire contract: request shapes, auth header, and the mapping
//! from HTTP statuses to the typed call and verification failures.

use std::time::Duration;

use perilla_core::{MerchantOrderRef, PaymentMethod, Points, TransactionId};
use perilla_checkout::{
    BackendClient, CallError, CheckoutConfig, OrderDraft, OrderWriter, PricingPreview,
    SettlementVerifier, VerificationFailure,
};
use perilla_integration_tests::{krw, sample_lines, test_context};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> BackendClient {
    client_with_timeout(server, Duration::from_secs(10))
}

fn client_with_timeout(server: &MockServer, api_timeout: Duration) -> BackendClient {
    let config = CheckoutConfig {
        backend_url: Url::parse(&server.uri()).expect("mock server uri"),
        api_timeout,
        create_order_retries: 2,
    };
    BackendClient::new(&config).expect("client")
}

fn sample_draft() -> OrderDraft {
    OrderDraft {
        lines: sample_lines(),
        amount_due: krw(40000),
        points_used: Points::new(5000),
        payment_method: PaymentMethod::Card,
        delivery_instruction: "leave at door".to_string(),
        transaction_id: TransactionId::new("tx-1"),
        order_ref: MerchantOrderRef::new("mo-1"),
    }
}

// =============================================================================
// Pricing Preview
// =============================================================================

#[tokio::test]
async fn test_preview_round_trip_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/checkout/preview"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "lines": [{"itemId": "itm-1", "variantKey": "M", "quantity": 1}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lines": [
                {"itemId": "itm-1", "variantKey": "M", "quantity": 1},
                {"itemId": "itm-2", "variantKey": "L", "quantity": 2}
            ],
            "totalAmount": {"amount": "50000", "currency": "KRW"},
            "discountAmount": {"amount": "5000", "currency": "KRW"},
            "finalAmount": {"amount": "45000", "currency": "KRW"},
            "expectedPointsEarned": 450,
            "buyerPointBalance": 5000,
            "buyerContact": {
                "name": "Kim Jiwoo",
                "phone": "010-1234-5678",
                "address": "12 Mapo-daero, Seoul"
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let preview = client
        .preview(&test_context(), &sample_lines())
        .await
        .expect("preview");

    assert_eq!(preview.final_amount, krw(45000));
    assert_eq!(preview.buyer_point_balance, Points::new(5000));
    assert_eq!(preview.lines.len(), 2);
    assert_eq!(preview.buyer_contact.name, "Kim Jiwoo");
}

#[tokio::test]
async fn test_preview_garbled_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/checkout/preview"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .preview(&test_context(), &sample_lines())
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::InvalidResponse(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_preview_server_error_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/checkout/preview"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "unknown item"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .preview(&test_context(), &sample_lines())
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::Rejected(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_slow_response_hits_client_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/checkout/preview"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = client_with_timeout(&server, Duration::from_secs(1));
    let err = client
        .preview(&test_context(), &sample_lines())
        .await
        .unwrap_err();
    assert_eq!(err, CallError::Timeout);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    // Nothing listens on this port
    let config = CheckoutConfig {
        backend_url: Url::parse("http://127.0.0.1:9").expect("url"),
        api_timeout: Duration::from_secs(2),
        create_order_retries: 0,
    };
    let client = BackendClient::new(&config).expect("client");

    let err = client
        .preview(&test_context(), &sample_lines())
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

// =============================================================================
// Settlement Verification
// =============================================================================

async fn verify_against(server: &MockServer) -> Result<(), VerificationFailure> {
    client_for(server)
        .verify_settlement(
            &test_context(),
            &TransactionId::new("tx-1"),
            &MerchantOrderRef::new("mo-1"),
            &krw(40000),
        )
        .await
}

#[tokio::test]
async fn test_verify_success_sends_expected_amount() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments/verify"))
        .and(body_partial_json(json!({
            "transactionId": "tx-1",
            "merchantOrderRef": "mo-1",
            "amount": {"amount": "40000", "currency": "KRW"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "VERIFIED"})))
        .mount(&server)
        .await;

    assert!(verify_against(&server).await.is_ok());
}

#[tokio::test]
async fn test_verify_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments/verify"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert_eq!(
        verify_against(&server).await.unwrap_err(),
        VerificationFailure::NotFound
    );
}

#[tokio::test]
async fn test_verify_already_consumed_from_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments/verify"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({"code": "ALREADY_CONSUMED", "message": "already used"})),
        )
        .mount(&server)
        .await;

    assert_eq!(
        verify_against(&server).await.unwrap_err(),
        VerificationFailure::AlreadyConsumed
    );
}

#[tokio::test]
async fn test_verify_amount_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments/verify"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({"code": "AMOUNT_MISMATCH", "message": "expected 40000"})),
        )
        .mount(&server)
        .await;

    assert_eq!(
        verify_against(&server).await.unwrap_err(),
        VerificationFailure::AmountMismatch
    );
}

#[tokio::test]
async fn test_verify_server_error_is_network_kind() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payments/verify"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(matches!(
        verify_against(&server).await.unwrap_err(),
        VerificationFailure::Network(_)
    ));
}

// =============================================================================
// Order Creation
// =============================================================================

#[tokio::test]
async fn test_create_order_returns_server_issued_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_partial_json(json!({
            "merchantOrderRef": "mo-1",
            "transactionId": "tx-1",
            "pointsUsed": 5000,
            "paymentMethod": "CARD",
            "finalAmount": {"amount": "40000", "currency": "KRW"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"orderId": "ord-88"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let order_id = client
        .create_order(&test_context(), &sample_draft())
        .await
        .expect("create order");
    assert_eq!(order_id.as_str(), "ord-88");
}

/// The backend deduplicates on the merchant order reference, so an
/// identical resend yields the same order id, not a second order.
#[tokio::test]
async fn test_create_order_resend_yields_same_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_partial_json(json!({"merchantOrderRef": "mo-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"orderId": "ord-88"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let draft = sample_draft();
    let first = client.create_order(&test_context(), &draft).await.unwrap();
    let second = client.create_order(&test_context(), &draft).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_create_order_rejection_is_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "stock exhausted"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .create_order(&test_context(), &sample_draft())
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::Rejected(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_create_order_passes_lines_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_partial_json(json!({
            "lines": [
                {"itemId": "itm-1", "variantKey": "M", "quantity": 1},
                {"itemId": "itm-2", "variantKey": "L", "quantity": 2}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"orderId": "ord-1"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let order_id = client
        .create_order(&test_context(), &sample_draft())
        .await
        .expect("create order");
    assert_eq!(order_id.as_str(), "ord-1");
}

//! Deterministic stand-ins for the checkout flow's collaborators.
//!
//! Every stub records how it was called, so tests can assert not just on
//! the final state but on which services were (and were not) contacted.
//! The order stub implements the backend's idempotency guarantee: one
//! order per merchant order reference, however many times it is asked.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use perilla_checkout::{
    CallError, ChargeRequest, CheckoutCollaborators, CheckoutFlow, FlowOptions, GatewayError,
    GatewayResult, GatewayStatus, OrderDraft, OrderPreview, OrderWriter, PaymentGateway,
    PricingPreview, SessionContext, SettlementVerifier, VerificationFailure,
};
use perilla_checkout::types::BuyerContact;
use perilla_core::{CurrencyCode, Money, OrderId, OrderLine, Points, TransactionId};
use rust_decimal::Decimal;
use secrecy::SecretString;

/// A won amount.
#[must_use]
pub fn krw(amount: i64) -> Money {
    Money::new(Decimal::from(amount), CurrencyCode::KRW)
}

/// A buyer session for tests.
#[must_use]
pub fn test_context() -> SessionContext {
    SessionContext::new("buyer-1", SecretString::from("test-token"))
}

/// A small two-line selection.
#[must_use]
pub fn sample_lines() -> Vec<OrderLine> {
    vec![
        OrderLine::new("itm-1", "M", 1).expect("valid line"),
        OrderLine::new("itm-2", "L", 2).expect("valid line"),
    ]
}

/// A preview snapshot with the given payable amount and point balance.
#[must_use]
pub fn sample_preview(final_amount: i64, balance: u64) -> OrderPreview {
    OrderPreview {
        lines: sample_lines(),
        total_amount: krw(final_amount + 5000),
        discount_amount: krw(5000),
        final_amount: krw(final_amount),
        expected_points_earned: Points::new(450),
        buyer_point_balance: Points::new(balance),
        buyer_contact: BuyerContact {
            name: "Kim Jiwoo".to_string(),
            phone: "010-1234-5678".to_string(),
            address: "12 Mapo-daero, Seoul".to_string(),
        },
    }
}

// =============================================================================
// Pricing stub
// =============================================================================

/// Serves a fixed preview, optionally failing the first N calls.
pub struct StubPricing {
    preview: OrderPreview,
    fail_first: Mutex<u32>,
    pub calls: AtomicU32,
}

impl StubPricing {
    #[must_use]
    pub fn new(preview: OrderPreview) -> Self {
        Self {
            preview,
            fail_first: Mutex::new(0),
            calls: AtomicU32::new(0),
        }
    }

    /// Fail the next `count` calls with a timeout before serving previews.
    pub fn fail_first(&self, count: u32) {
        *self.fail_first.lock().expect("lock") = count;
    }
}

#[async_trait]
impl PricingPreview for StubPricing {
    async fn preview(
        &self,
        _ctx: &SessionContext,
        _lines: &[OrderLine],
    ) -> Result<OrderPreview, CallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut remaining = self.fail_first.lock().expect("lock");
        if *remaining > 0 {
            *remaining -= 1;
            return Err(CallError::Timeout);
        }
        Ok(self.preview.clone())
    }
}

// =============================================================================
// Gateway stub
// =============================================================================

/// One scripted gateway verdict.
pub enum ScriptedCharge {
    /// Echo the request's reference with a successful transaction.
    Succeed,
    /// Report success but under some other attempt's reference.
    SucceedWithRef(perilla_core::MerchantOrderRef),
    /// Echo the reference with the given non-success status.
    Fail(GatewayStatus),
    /// Produce no result at all.
    NoResult,
    /// Never come back. Holds the flow at the gateway wait.
    Hang,
}

/// Plays back a script of charge verdicts; defaults to success.
pub struct StubGateway {
    script: Mutex<Vec<ScriptedCharge>>,
    pub charges: AtomicU32,
    pub last_request: Mutex<Option<ChargeRequest>>,
}

impl StubGateway {
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            charges: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Queue the verdict for the next charge.
    pub fn push(&self, step: ScriptedCharge) {
        self.script.lock().expect("lock").push(step);
    }
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn charge(&self, request: ChargeRequest) -> Result<GatewayResult, GatewayError> {
        let n = self.charges.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock().expect("lock") = Some(request.clone());

        let step = {
            let mut script = self.script.lock().expect("lock");
            if script.is_empty() {
                ScriptedCharge::Succeed
            } else {
                script.remove(0)
            }
        };

        match step {
            ScriptedCharge::Succeed => Ok(GatewayResult {
                transaction_id: TransactionId::new(format!("tx-{n}")),
                order_ref: request.order_ref,
                status: GatewayStatus::Success,
            }),
            ScriptedCharge::SucceedWithRef(order_ref) => Ok(GatewayResult {
                transaction_id: TransactionId::new(format!("tx-{n}")),
                order_ref,
                status: GatewayStatus::Success,
            }),
            ScriptedCharge::Fail(status) => Ok(GatewayResult {
                transaction_id: TransactionId::new(format!("tx-{n}")),
                order_ref: request.order_ref,
                status,
            }),
            ScriptedCharge::NoResult => Err(GatewayError::NoResult),
            ScriptedCharge::Hang => {
                std::future::pending::<()>().await;
                Err(GatewayError::NoResult)
            }
        }
    }
}

// =============================================================================
// Verifier stub
// =============================================================================

/// Answers every verification with a fixed outcome, after an optional
/// delay.
pub struct StubVerifier {
    outcome: Mutex<Result<(), VerificationFailure>>,
    delay: Mutex<Duration>,
    pub calls: AtomicU32,
}

impl StubVerifier {
    #[must_use]
    pub fn passing() -> Self {
        Self {
            outcome: Mutex::new(Ok(())),
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicU32::new(0),
        }
    }

    /// Answer every verification with the given failure.
    pub fn reject_with(&self, failure: VerificationFailure) {
        *self.outcome.lock().expect("lock") = Err(failure);
    }

    /// Delay every answer, to open a window for caller cancellation.
    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().expect("lock") = delay;
    }
}

#[async_trait]
impl SettlementVerifier for StubVerifier {
    async fn verify_settlement(
        &self,
        _ctx: &SessionContext,
        _transaction_id: &TransactionId,
        _order_ref: &perilla_core::MerchantOrderRef,
        _expected: &Money,
    ) -> Result<(), VerificationFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().expect("lock");
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        self.outcome.lock().expect("lock").clone()
    }
}

// =============================================================================
// Order store stub
// =============================================================================

/// In-memory order store with the backend's idempotency guarantee: one
/// order per merchant order reference. Can lose responses to simulate
/// "created but the client never heard".
pub struct StubOrders {
    created: Mutex<HashMap<String, OrderId>>,
    lose_response_first: Mutex<u32>,
    pub calls: AtomicU32,
}

impl StubOrders {
    #[must_use]
    pub fn new() -> Self {
        Self {
            created: Mutex::new(HashMap::new()),
            lose_response_first: Mutex::new(0),
            calls: AtomicU32::new(0),
        }
    }

    /// Record the order but answer the next `count` calls with a timeout,
    /// as if the response was lost in transit.
    pub fn lose_response_first(&self, count: u32) {
        *self.lose_response_first.lock().expect("lock") = count;
    }

    /// How many distinct orders exist.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.created.lock().expect("lock").len()
    }
}

impl Default for StubOrders {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderWriter for StubOrders {
    async fn create_order(
        &self,
        _ctx: &SessionContext,
        draft: &OrderDraft,
    ) -> Result<OrderId, CallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let order_id = {
            let mut created = self.created.lock().expect("lock");
            let next = created.len() + 1;
            created
                .entry(draft.order_ref.as_str().to_owned())
                .or_insert_with(|| OrderId::new(format!("ord-{next}")))
                .clone()
        };

        let mut remaining = self.lose_response_first.lock().expect("lock");
        if *remaining > 0 {
            *remaining -= 1;
            return Err(CallError::Timeout);
        }
        Ok(order_id)
    }
}

// =============================================================================
// Harness
// =============================================================================

/// A checkout flow wired to fresh stubs.
pub struct Harness {
    pub pricing: Arc<StubPricing>,
    pub gateway: Arc<StubGateway>,
    pub verifier: Arc<StubVerifier>,
    pub orders: Arc<StubOrders>,
    pub flow: CheckoutFlow,
}

impl Harness {
    /// Build a harness with instant retries and the default timeout.
    #[must_use]
    pub fn new(preview: OrderPreview) -> Self {
        Self::with_options(
            preview,
            FlowOptions {
                retry_delay: Duration::ZERO,
                ..FlowOptions::default()
            },
        )
    }

    /// Build a harness with explicit flow options.
    #[must_use]
    pub fn with_options(preview: OrderPreview, options: FlowOptions) -> Self {
        let pricing = Arc::new(StubPricing::new(preview));
        let gateway = Arc::new(StubGateway::new());
        let verifier = Arc::new(StubVerifier::passing());
        let orders = Arc::new(StubOrders::new());

        let flow = CheckoutFlow::new(
            CheckoutCollaborators {
                pricing: pricing.clone(),
                gateway: gateway.clone(),
                verifier: verifier.clone(),
                orders: orders.clone(),
            },
            test_context(),
            options,
        );

        Self {
            pricing,
            gateway,
            verifier,
            orders,
            flow,
        }
    }
}

//! The checkout orchestrator.
//!
//! One [`CheckoutFlow`] drives one checkout attempt at a time through the
//! sequence preview → point/method editing → gateway charge → settlement
//! verification → order creation. The live state is a watch channel: the
//! flow owns the sender, the UI reads snapshots via [`CheckoutFlow::state`]
//! or [`CheckoutFlow::subscribe`].
//!
//! Two rules shape the implementation:
//!
//! - Every async completion is applied through a guarded transition that
//!   checks the machine is still in the step that issued the call, so a
//!   stale completion can never clobber newer state.
//! - From the moment the gateway reports a successful charge, settlement
//!   runs on a detached task. Dropping the caller's future (the user
//!   navigated away) does not cancel verification or order creation — an
//!   orphaned charge is worse than a screen the user never saw.

pub mod points;
pub mod state;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use perilla_core::{MerchantOrderRef, Money, OrderLine, PaymentMethod, Points, TransactionId};
use tokio::sync::watch;
use tracing::instrument;

use crate::collaborators::{
    CallError, OrderWriter, PaymentGateway, PricingPreview, SettlementVerifier,
    VerificationFailure,
};
use crate::config::CheckoutConfig;
use crate::context::SessionContext;
use crate::error::CheckoutError;
use crate::types::{ChargeRequest, OrderDraft};

use points::{Redemption, validate_redemption};
use state::{CheckoutDraft, CheckoutState, GatewayFailure, classify_gateway_outcome};

/// Tuning for the orchestrator's bounded steps.
#[derive(Debug, Clone)]
pub struct FlowOptions {
    /// Time bound for preview, verification, and order creation. The
    /// gateway wait is never bounded.
    pub call_timeout: Duration,
    /// Automatic retries of order creation with the same transaction
    /// reference.
    pub create_order_retries: u32,
    /// Pause between automatic order-creation retries.
    pub retry_delay: Duration,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            create_order_retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl From<&CheckoutConfig> for FlowOptions {
    fn from(config: &CheckoutConfig) -> Self {
        Self {
            call_timeout: config.api_timeout,
            create_order_retries: config.create_order_retries,
            ..Self::default()
        }
    }
}

/// The injected services the flow coordinates.
#[derive(Clone)]
pub struct CheckoutCollaborators {
    /// Prices a line selection.
    pub pricing: Arc<dyn PricingPreview>,
    /// Moves money.
    pub gateway: Arc<dyn PaymentGateway>,
    /// Confirms gateway transactions.
    pub verifier: Arc<dyn SettlementVerifier>,
    /// Durably records orders.
    pub orders: Arc<dyn OrderWriter>,
}

/// The checkout state machine for one buyer session.
///
/// Cheaply cloneable; all clones share the same attempt state.
#[derive(Clone)]
pub struct CheckoutFlow {
    inner: Arc<FlowInner>,
}

struct FlowInner {
    collaborators: CheckoutCollaborators,
    ctx: SessionContext,
    options: FlowOptions,
    state: watch::Sender<CheckoutState>,
}

impl CheckoutFlow {
    /// Create a flow for one buyer session.
    #[must_use]
    pub fn new(
        collaborators: CheckoutCollaborators,
        ctx: SessionContext,
        options: FlowOptions,
    ) -> Self {
        let (state, _) = watch::channel(CheckoutState::Idle);
        Self {
            inner: Arc::new(FlowInner {
                collaborators,
                ctx,
                options,
                state,
            }),
        }
    }

    /// A snapshot of the current state for rendering.
    #[must_use]
    pub fn state(&self) -> CheckoutState {
        self.inner.state.borrow().clone()
    }

    /// A read-only subscription to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.inner.state.subscribe()
    }

    /// Enter checkout with a line selection and load the pricing preview.
    ///
    /// # Errors
    ///
    /// Rejects an empty selection, a zero quantity, and any call made while
    /// a payment attempt is still in flight. A failed preview is not an
    /// error — it is the `PreviewFailed` state, retryable via
    /// [`Self::retry_preview`].
    #[instrument(skip_all, fields(buyer_id = %self.inner.ctx.buyer_id()))]
    pub async fn start_checkout(
        &self,
        lines: Vec<OrderLine>,
    ) -> Result<CheckoutState, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptySelection);
        }
        if let Some(line) = lines.iter().find(|line| line.quantity == 0) {
            return Err(CheckoutError::InvalidQuantity(line.item_id.clone()));
        }

        self.inner.update(|current| {
            if current.is_in_flight() {
                return Err(CheckoutError::AttemptInFlight);
            }
            *current = CheckoutState::PreviewLoading {
                lines: lines.clone(),
            };
            Ok(())
        })?;

        tracing::info!(line_count = lines.len(), "starting checkout");
        Ok(self.run_preview(lines).await)
    }

    /// Re-run a failed pricing preview with the same selection.
    ///
    /// # Errors
    ///
    /// Only available from the `PreviewFailed` state.
    pub async fn retry_preview(&self) -> Result<CheckoutState, CheckoutError> {
        let lines = self.inner.update(|current| match current {
            CheckoutState::PreviewFailed { lines, .. } => {
                let lines = lines.clone();
                *current = CheckoutState::PreviewLoading {
                    lines: lines.clone(),
                };
                Ok(lines)
            }
            other => Err(CheckoutError::UnavailableDuring {
                action: "retrying the preview",
                step: other.step(),
            }),
        })?;
        Ok(self.run_preview(lines).await)
    }

    /// Change the point redemption, clamping to the guard's bounds.
    ///
    /// Recomputes the settlement amount locally; never touches the network.
    ///
    /// # Errors
    ///
    /// Only available while reviewing the order (between preview and
    /// payment submission).
    pub fn set_points_used(&self, requested: Points) -> Result<Redemption, CheckoutError> {
        self.inner.update(|current| match current {
            CheckoutState::PreviewReady { draft }
            | CheckoutState::AwaitingPaymentSelection { draft } => {
                let redemption = validate_redemption(
                    requested,
                    draft.preview.buyer_point_balance,
                    &draft.preview.final_amount,
                );
                if redemption.clamped {
                    tracing::debug!(
                        requested = %requested,
                        applied = %redemption.applied,
                        "point redemption clamped to valid bound"
                    );
                }
                let mut draft = draft.clone();
                draft.points_used = redemption.applied;
                *current = CheckoutState::AwaitingPaymentSelection { draft };
                Ok(redemption)
            }
            other => Err(CheckoutError::UnavailableDuring {
                action: "changing points",
                step: other.step(),
            }),
        })
    }

    /// Choose how the settlement amount will be charged.
    ///
    /// # Errors
    ///
    /// Only available while reviewing the order.
    pub fn set_payment_method(&self, method: PaymentMethod) -> Result<(), CheckoutError> {
        self.inner.update(|current| match current {
            CheckoutState::PreviewReady { draft }
            | CheckoutState::AwaitingPaymentSelection { draft } => {
                let mut draft = draft.clone();
                draft.payment_method = Some(method);
                *current = CheckoutState::AwaitingPaymentSelection { draft };
                Ok(())
            }
            other => Err(CheckoutError::UnavailableDuring {
                action: "choosing a payment method",
                step: other.step(),
            }),
        })
    }

    /// Attach a delivery note to the order being drafted.
    ///
    /// # Errors
    ///
    /// Only available while reviewing the order.
    pub fn set_delivery_instruction(
        &self,
        note: impl Into<String>,
    ) -> Result<(), CheckoutError> {
        let note = note.into();
        self.inner.update(|current| match current {
            CheckoutState::PreviewReady { draft }
            | CheckoutState::AwaitingPaymentSelection { draft } => {
                let mut draft = draft.clone();
                draft.delivery_instruction = note;
                *current = CheckoutState::AwaitingPaymentSelection { draft };
                Ok(())
            }
            other => Err(CheckoutError::UnavailableDuring {
                action: "editing the delivery note",
                step: other.step(),
            }),
        })
    }

    /// Freeze the draft, mint a fresh merchant order reference, and hand
    /// the settlement amount to the payment gateway; on a verified charge,
    /// create the order.
    ///
    /// The gateway wait is unbounded (the user may be authenticating in an
    /// external app). Once the gateway reports success, the rest of the
    /// settlement runs on a detached task: dropping this future does not
    /// cancel it.
    ///
    /// # Errors
    ///
    /// Rejects submission without a payment method, a settlement below
    /// zero, and any call outside the reviewing steps. Gateway,
    /// verification, and order-creation failures are states, not errors.
    pub async fn submit_payment(&self) -> Result<CheckoutState, CheckoutError> {
        let (draft, method, amount, order_ref) = self.inner.update(|current| match current {
            CheckoutState::PreviewReady { draft }
            | CheckoutState::AwaitingPaymentSelection { draft } => {
                let Some(method) = draft.payment_method else {
                    return Err(CheckoutError::MissingPaymentMethod);
                };
                let amount = draft.settlement_amount();
                if amount.is_negative() {
                    return Err(CheckoutError::NegativeSettlement);
                }
                let order_ref = MerchantOrderRef::mint();
                let draft = draft.clone();
                *current = CheckoutState::AwaitingGatewayResult {
                    draft: draft.clone(),
                    order_ref: order_ref.clone(),
                    amount,
                };
                Ok((draft, method, amount, order_ref))
            }
            other => Err(CheckoutError::UnavailableDuring {
                action: "submitting payment",
                step: other.step(),
            }),
        })?;

        tracing::info!(
            order_ref = %order_ref,
            amount = %amount,
            method = %method,
            "handing settlement to the payment gateway"
        );

        let outcome = self
            .inner
            .collaborators
            .gateway
            .charge(ChargeRequest {
                amount,
                method,
                order_ref: order_ref.clone(),
            })
            .await;

        let transaction_id = match classify_gateway_outcome(&order_ref, outcome) {
            Ok(transaction_id) => transaction_id,
            Err(failure) => {
                match &failure {
                    GatewayFailure::RefMismatch { received } => tracing::warn!(
                        expected = %order_ref,
                        received = %received,
                        "discarding gateway result for a different attempt"
                    ),
                    other => tracing::info!(
                        order_ref = %order_ref,
                        failure = %other,
                        "gateway reported no charge"
                    ),
                }
                self.inner.swap_if(|current| {
                    matches!(
                        current,
                        CheckoutState::AwaitingGatewayResult { order_ref: waiting, .. }
                            if *waiting == order_ref
                    )
                    .then(|| CheckoutState::GatewayFailed {
                        draft: draft.clone(),
                        order_ref: order_ref.clone(),
                        failure: failure.clone(),
                    })
                });
                return Ok(self.state());
            }
        };

        let advanced = self.inner.swap_if(|current| {
            matches!(
                current,
                CheckoutState::AwaitingGatewayResult { order_ref: waiting, .. }
                    if *waiting == order_ref
            )
            .then(|| CheckoutState::Verifying {
                draft: draft.clone(),
                order_ref: order_ref.clone(),
                transaction_id: transaction_id.clone(),
                amount,
            })
        });
        if !advanced {
            tracing::warn!(order_ref = %order_ref, "gateway result arrived for a superseded attempt");
            return Ok(self.state());
        }

        // Money has moved according to the gateway; run the rest detached
        // so caller cancellation cannot orphan the charge.
        let handle = tokio::spawn(settle(
            Arc::clone(&self.inner),
            draft,
            method,
            order_ref,
            transaction_id,
            amount,
        ));
        let _ = handle.await;
        Ok(self.state())
    }

    /// Retry order creation with the already-verified transaction
    /// reference. Never re-invokes the gateway.
    ///
    /// # Errors
    ///
    /// Only available from the `OrderCreationFailed` state.
    pub async fn retry_order_creation(&self) -> Result<CheckoutState, CheckoutError> {
        let order = self.inner.update(|current| match current {
            CheckoutState::OrderCreationFailed { order, .. } => {
                let order = order.clone();
                *current = CheckoutState::CreatingOrder {
                    order: order.clone(),
                    attempt: 1,
                };
                Ok(order)
            }
            other => Err(CheckoutError::UnavailableDuring {
                action: "retrying order creation",
                step: other.step(),
            }),
        })?;

        tracing::info!(
            order_ref = %order.order_ref,
            transaction_id = %order.transaction_id,
            "retrying order creation with the verified transaction"
        );

        let handle = tokio::spawn(create_order_with_retries(Arc::clone(&self.inner), order));
        let _ = handle.await;
        Ok(self.state())
    }

    /// Leave checkout, discarding all in-memory attempt state.
    ///
    /// # Errors
    ///
    /// Refused from the gateway wait onward — an in-flight settlement is
    /// never cancelled.
    pub fn abort(&self) -> Result<(), CheckoutError> {
        self.inner.update(|current| {
            if current.is_in_flight() {
                return Err(CheckoutError::UnavailableDuring {
                    action: "leaving checkout",
                    step: current.step(),
                });
            }
            if !matches!(current, CheckoutState::Idle) {
                tracing::info!(step = current.step(), "leaving checkout; discarding attempt state");
            }
            *current = CheckoutState::Idle;
            Ok(())
        })
    }

    /// Run the pricing preview and apply its outcome if the machine is
    /// still waiting for it.
    async fn run_preview(&self, lines: Vec<OrderLine>) -> CheckoutState {
        let result = bounded(
            self.inner.options.call_timeout,
            self.inner
                .collaborators
                .pricing
                .preview(&self.inner.ctx, &lines),
            CallError::Timeout,
        )
        .await;

        match result {
            Ok(preview) => {
                self.inner.swap_if(|current| {
                    matches!(current, CheckoutState::PreviewLoading { .. }).then(|| {
                        CheckoutState::PreviewReady {
                            draft: CheckoutDraft::from_preview(lines.clone(), preview.clone()),
                        }
                    })
                });
            }
            Err(error) => {
                tracing::warn!(%error, "pricing preview failed");
                self.inner.swap_if(|current| {
                    matches!(current, CheckoutState::PreviewLoading { .. }).then(|| {
                        CheckoutState::PreviewFailed {
                            lines: lines.clone(),
                            error: error.clone(),
                        }
                    })
                });
            }
        }
        self.state()
    }
}

impl FlowInner {
    /// Apply a fallible transition atomically against the live state.
    fn update<T>(
        &self,
        apply: impl FnOnce(&mut CheckoutState) -> Result<T, CheckoutError>,
    ) -> Result<T, CheckoutError> {
        let mut outcome = None;
        self.state.send_modify(|current| {
            outcome = Some(apply(current));
        });
        match outcome {
            Some(result) => result,
            // send_modify runs the closure synchronously, exactly once
            None => unreachable!("transition closure did not run"),
        }
    }

    /// Replace the state when the guard produces a successor; report
    /// whether it did. Used to apply async completions without letting a
    /// stale one clobber newer state.
    fn swap_if(&self, guard: impl FnOnce(&CheckoutState) -> Option<CheckoutState>) -> bool {
        self.state.send_if_modified(|current| match guard(current) {
            Some(next) => {
                *current = next;
                true
            }
            None => false,
        })
    }
}

/// Bound a backend call; the given error stands in for the elapsed timer.
async fn bounded<T, E, F>(limit: Duration, call: F, timed_out: E) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    tokio::time::timeout(limit, call).await.unwrap_or(Err(timed_out))
}

/// Verify the charge, then create the order. Runs detached from the
/// submitting caller.
#[instrument(skip_all, fields(order_ref = %order_ref, transaction_id = %transaction_id))]
async fn settle(
    inner: Arc<FlowInner>,
    draft: CheckoutDraft,
    method: PaymentMethod,
    order_ref: MerchantOrderRef,
    transaction_id: TransactionId,
    amount: Money,
) {
    let verified = bounded(
        inner.options.call_timeout,
        inner.collaborators.verifier.verify_settlement(
            &inner.ctx,
            &transaction_id,
            &order_ref,
            &amount,
        ),
        VerificationFailure::Network("verification timed out".to_string()),
    )
    .await;

    if let Err(failure) = verified {
        if failure == VerificationFailure::AlreadyConsumed {
            tracing::warn!(
                %failure,
                "duplicate gateway callback; an order may already exist for this transaction"
            );
        } else {
            tracing::error!(%failure, "settlement could not be verified; stopping before order creation");
        }
        inner.swap_if(|current| {
            matches!(
                current,
                CheckoutState::Verifying { order_ref: verifying, .. } if *verifying == order_ref
            )
            .then(|| CheckoutState::VerificationFailed {
                order_ref: order_ref.clone(),
                transaction_id: transaction_id.clone(),
                failure: failure.clone(),
            })
        });
        return;
    }

    let order = OrderDraft {
        lines: draft.lines,
        amount_due: amount,
        points_used: draft.points_used,
        payment_method: method,
        delivery_instruction: draft.delivery_instruction,
        transaction_id: transaction_id.clone(),
        order_ref: order_ref.clone(),
    };

    let advanced = inner.swap_if(|current| {
        matches!(
            current,
            CheckoutState::Verifying { order_ref: verifying, .. } if *verifying == order_ref
        )
        .then(|| CheckoutState::CreatingOrder {
            order: order.clone(),
            attempt: 1,
        })
    });
    if advanced {
        create_order_with_retries(inner, order).await;
    }
}

/// Drive order creation to completion or exhaustion, reusing the same
/// idempotent payload on every attempt.
async fn create_order_with_retries(inner: Arc<FlowInner>, order: OrderDraft) {
    let max_attempts = inner.options.create_order_retries.saturating_add(1);
    let mut attempt = 1_u32;
    loop {
        let result = bounded(
            inner.options.call_timeout,
            inner.collaborators.orders.create_order(&inner.ctx, &order),
            CallError::Timeout,
        )
        .await;

        match result {
            Ok(order_id) => {
                tracing::info!(order_id = %order_id, order_ref = %order.order_ref, "order created");
                inner.swap_if(|current| {
                    matches!(
                        current,
                        CheckoutState::CreatingOrder { order: creating, .. }
                            if creating.order_ref == order.order_ref
                    )
                    .then(|| CheckoutState::Completed {
                        order_id: order_id.clone(),
                        order_ref: order.order_ref.clone(),
                        transaction_id: order.transaction_id.clone(),
                    })
                });
                return;
            }
            Err(error) if error.is_retryable() && attempt < max_attempts => {
                attempt += 1;
                tracing::warn!(
                    %error,
                    attempt,
                    order_ref = %order.order_ref,
                    "order creation failed; retrying with the same transaction reference"
                );
                inner.swap_if(|current| {
                    matches!(
                        current,
                        CheckoutState::CreatingOrder { order: creating, .. }
                            if creating.order_ref == order.order_ref
                    )
                    .then(|| CheckoutState::CreatingOrder {
                        order: order.clone(),
                        attempt,
                    })
                });
                tokio::time::sleep(inner.options.retry_delay).await;
            }
            Err(error) => {
                tracing::error!(
                    %error,
                    attempts = attempt,
                    order_ref = %order.order_ref,
                    transaction_id = %order.transaction_id,
                    "order creation exhausted; charge is verified but no order was recorded"
                );
                inner.swap_if(|current| {
                    matches!(
                        current,
                        CheckoutState::CreatingOrder { order: creating, .. }
                            if creating.order_ref == order.order_ref
                    )
                    .then(|| CheckoutState::OrderCreationFailed {
                        order: order.clone(),
                        attempts: attempt,
                        error: error.clone(),
                    })
                });
                return;
            }
        }
    }
}

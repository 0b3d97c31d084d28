//! Callback-to-await adaptation for payment SDKs.

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::collaborators::{GatewayError, PaymentGateway};
use crate::types::{ChargeRequest, GatewayResult};

/// Hands a charge to the external payment SDK.
///
/// Implementations open the payment surface (app switch, redirect, widget)
/// and call [`ChargeCompletion::resolve`] from the SDK's completion
/// callback. Dropping the completion without resolving it means the
/// payment ended without any result.
pub trait PaymentLauncher: Send + Sync {
    /// Start the external payment for one charge request.
    fn launch(&self, request: &ChargeRequest, completion: ChargeCompletion);
}

impl<F> PaymentLauncher for F
where
    F: Fn(&ChargeRequest, ChargeCompletion) + Send + Sync,
{
    fn launch(&self, request: &ChargeRequest, completion: ChargeCompletion) {
        self(request, completion);
    }
}

/// One-shot handle the SDK callback uses to deliver its result.
pub struct ChargeCompletion {
    tx: oneshot::Sender<GatewayResult>,
}

impl ChargeCompletion {
    /// Deliver the gateway's verdict. Consumes the handle; a completion
    /// can only ever carry one result.
    pub fn resolve(self, result: GatewayResult) {
        // The awaiting side only disappears when the whole flow is gone
        let _ = self.tx.send(result);
    }
}

/// [`PaymentGateway`] implementation over a callback-driven launcher.
pub struct BridgedGateway<L> {
    launcher: L,
}

impl<L: PaymentLauncher> BridgedGateway<L> {
    /// Wrap a launcher into an awaitable gateway.
    pub const fn new(launcher: L) -> Self {
        Self { launcher }
    }
}

#[async_trait]
impl<L: PaymentLauncher> PaymentGateway for BridgedGateway<L> {
    async fn charge(&self, request: ChargeRequest) -> Result<GatewayResult, GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.launcher.launch(&request, ChargeCompletion { tx });
        rx.await.map_err(|_| GatewayError::NoResult)
    }
}

//! Payment gateway integration.
//!
//! The real gateway is an external SDK that opens a payment surface and
//! reports back through a completion callback. The flow only ever sees the
//! [`crate::collaborators::PaymentGateway`] trait — a single awaited call —
//! and the callback adaptation is isolated in [`bridge`].

mod bridge;

pub use bridge::{BridgedGateway, ChargeCompletion, PaymentLauncher};

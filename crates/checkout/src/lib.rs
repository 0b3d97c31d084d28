//! Perilla Checkout - The checkout-and-settlement flow engine.
//!
//! Turns a line selection into a priced order, reconciles the buyer's
//! loyalty-point balance, delegates money movement to an external payment
//! gateway, verifies the gateway's result, and durably creates an order
//! exactly once.
//!
//! # Architecture
//!
//! - [`flow::CheckoutFlow`] is an explicit state machine: one
//!   [`flow::state::CheckoutState`] variant per step, pure transition
//!   decisions, and a watch channel exposing read-only snapshots to the UI.
//! - Every network dependency is a trait in [`collaborators`], so the whole
//!   flow runs against deterministic stubs in tests. [`backend`] provides
//!   the HTTP implementations; [`gateway`] bridges the callback-driven
//!   payment SDK into a single awaited call.
//! - The buyer's credential travels explicitly as a
//!   [`context::SessionContext`] — no ambient session state.
//!
//! # Example
//!
//! ```rust,ignore
//! use perilla_checkout::{CheckoutCollaborators, CheckoutFlow, FlowOptions, SessionContext};
//!
//! let flow = CheckoutFlow::new(collaborators, ctx, FlowOptions::default());
//!
//! flow.start_checkout(lines).await?;
//! flow.set_points_used(Points::new(5000))?;
//! flow.set_payment_method(PaymentMethod::Card)?;
//! let state = flow.submit_payment().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod flow;
pub mod gateway;
pub mod types;

pub use backend::BackendClient;
pub use collaborators::{
    CallError, GatewayError, OrderWriter, PaymentGateway, PricingPreview, SettlementVerifier,
    VerificationFailure,
};
pub use config::{CheckoutConfig, ConfigError};
pub use context::SessionContext;
pub use error::CheckoutError;
pub use flow::points::{Redemption, validate_redemption};
pub use flow::state::{CheckoutDraft, CheckoutState, FundsStatus, GatewayFailure};
pub use flow::{CheckoutCollaborators, CheckoutFlow, FlowOptions};
pub use gateway::{BridgedGateway, ChargeCompletion, PaymentLauncher};
pub use types::{
    BuyerContact, ChargeRequest, GatewayResult, GatewayStatus, OrderDraft, OrderPreview,
};

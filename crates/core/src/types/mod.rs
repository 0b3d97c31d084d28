//! Core types for Perilla.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod line;
pub mod money;
pub mod payment;
pub mod points;

pub use id::*;
pub use line::{OrderLine, OrderLineError};
pub use money::{CurrencyCode, Money, MoneyError};
pub use payment::PaymentMethod;
pub use points::Points;

//! Perilla Core - Shared types library.
//!
//! This crate provides common types used across all Perilla components:
//! - `checkout` - The checkout-and-settlement flow engine
//! - `integration-tests` - Cross-crate scenario tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe tokens, money, points, and
//!   payment methods

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

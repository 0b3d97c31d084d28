//! Newtype tokens for type-safe entity references.
//!
//! Use the `define_token!` macro to create type-safe wrappers around the
//! opaque string identifiers the backend and the payment gateway hand out,
//! so that a transaction id can never be passed where an order id belongs.

use chrono::Utc;
use uuid::Uuid;

/// Macro to define a type-safe string token wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>` and `From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use perilla_core::define_token;
/// define_token!(ReceiptId);
/// define_token!(RefundId);
///
/// let receipt = ReceiptId::new("rcpt-1");
/// let refund = RefundId::new("rfnd-1");
///
/// // These are different types, so this won't compile:
/// // let _: ReceiptId = refund;
/// ```
#[macro_export]
macro_rules! define_token {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new token from a string value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the token as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the token and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

// Define standard entity tokens
define_token!(ItemId);
define_token!(VariantKey);
define_token!(OrderId);
define_token!(TransactionId);
define_token!(MerchantOrderRef);

impl MerchantOrderRef {
    /// Mint a fresh merchant order reference for a new checkout attempt.
    ///
    /// The reference is the idempotency key tying a gateway callback (and
    /// every call that follows it) to exactly one attempt, so it must be
    /// unique per mint. It combines a UTC timestamp with a random v4 UUID.
    #[must_use]
    pub fn mint() -> Self {
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        Self(format!("mo-{stamp}-{}", Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let id = ItemId::new("itm-42");
        assert_eq!(id.as_str(), "itm-42");
        assert_eq!(id.to_string(), "itm-42");
        assert_eq!(ItemId::from("itm-42"), id);
        assert_eq!(id.into_inner(), "itm-42");
    }

    #[test]
    fn test_tokens_are_distinct_types() {
        // Compile-time property; exercise equality within one type only
        assert_ne!(OrderId::new("a"), OrderId::new("b"));
        assert_eq!(TransactionId::new("t"), TransactionId::new("t"));
    }

    #[test]
    fn test_mint_produces_unique_refs() {
        let a = MerchantOrderRef::mint();
        let b = MerchantOrderRef::mint();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("mo-"));
    }

    #[test]
    fn test_token_serde_transparent() {
        let id = OrderId::new("ord-7");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ord-7\"");
        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}

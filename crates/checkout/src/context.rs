//! Per-session buyer credentials.
//!
//! The buyer's credential is threaded explicitly into every backend call
//! instead of living in ambient global state, which keeps the flow pure
//! and lets tests pass any context they like.

use secrecy::SecretString;

/// An authenticated buyer session.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct SessionContext {
    buyer_id: String,
    access_token: SecretString,
}

impl SessionContext {
    /// Create a session context for an authenticated buyer.
    #[must_use]
    pub fn new(buyer_id: impl Into<String>, access_token: SecretString) -> Self {
        Self {
            buyer_id: buyer_id.into(),
            access_token,
        }
    }

    /// The buyer's identifier.
    #[must_use]
    pub fn buyer_id(&self) -> &str {
        &self.buyer_id
    }

    /// The bearer token for backend calls.
    #[must_use]
    pub const fn access_token(&self) -> &SecretString {
        &self.access_token
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("buyer_id", &self.buyer_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let ctx = SessionContext::new("buyer-1", SecretString::from("super_secret_token"));
        let debug_output = format!("{ctx:?}");

        assert!(debug_output.contains("buyer-1"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_token"));
    }
}

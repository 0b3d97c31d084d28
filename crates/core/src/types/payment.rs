//! Payment method selection.

use serde::{Deserialize, Serialize};

/// How the settlement amount is charged.
///
/// Matches the method identifiers the payment gateway accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Credit or debit card.
    Card,
    /// External wallet application (redirect flow).
    WalletPay,
    /// Direct bank transfer.
    BankTransfer,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Card => write!(f, "card"),
            Self::WalletPay => write!(f, "wallet_pay"),
            Self::BankTransfer => write!(f, "bank_transfer"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "wallet_pay" => Ok(Self::WalletPay),
            "bank_transfer" => Ok(Self::BankTransfer),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_uses_gateway_identifiers() {
        let json = serde_json::to_string(&PaymentMethod::WalletPay).unwrap();
        assert_eq!(json, "\"WALLET_PAY\"");
        let back: PaymentMethod = serde_json::from_str("\"CARD\"").unwrap();
        assert_eq!(back, PaymentMethod::Card);
    }

    #[test]
    fn test_display_from_str_round_trip() {
        for method in [
            PaymentMethod::Card,
            PaymentMethod::WalletPay,
            PaymentMethod::BankTransfer,
        ] {
            let parsed: PaymentMethod = method.to_string().parse().unwrap();
            assert_eq!(parsed, method);
        }
    }
}

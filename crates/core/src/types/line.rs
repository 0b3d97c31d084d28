//! Order line items.

use serde::{Deserialize, Serialize};

use crate::types::id::{ItemId, VariantKey};

/// Errors that can occur when building an [`OrderLine`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderLineError {
    /// The quantity was zero.
    #[error("quantity must be at least 1")]
    ZeroQuantity,
}

/// One item selection inside a checkout.
///
/// Lines are immutable once checkout begins; editing the selection restarts
/// the flow with a fresh pricing preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The catalog item being purchased.
    pub item_id: ItemId,
    /// The selected variant (e.g. size).
    pub variant_key: VariantKey,
    /// How many units. Always at least 1.
    pub quantity: u32,
}

impl OrderLine {
    /// Build a line, rejecting a zero quantity.
    ///
    /// # Errors
    ///
    /// Returns [`OrderLineError::ZeroQuantity`] if `quantity` is 0.
    pub fn new(
        item_id: impl Into<ItemId>,
        variant_key: impl Into<VariantKey>,
        quantity: u32,
    ) -> Result<Self, OrderLineError> {
        if quantity == 0 {
            return Err(OrderLineError::ZeroQuantity);
        }
        Ok(Self {
            item_id: item_id.into(),
            variant_key: variant_key.into(),
            quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_positive_quantity() {
        let line = OrderLine::new("itm-1", "M", 2).unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.item_id.as_str(), "itm-1");
    }

    #[test]
    fn test_new_rejects_zero_quantity() {
        assert_eq!(
            OrderLine::new("itm-1", "M", 0).unwrap_err(),
            OrderLineError::ZeroQuantity
        );
    }
}

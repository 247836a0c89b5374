use serde::Serialize;

use crate::models::Money;

/// Totals derived from the cart's line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CartSummary {
    pub subtotal: Money,
    pub platform_fee: Money,
    pub total: Money,
    pub total_item_count: u32,
}

/// Result of adding a product to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// Quantity of the line after the add.
    pub quantity: u32,
    /// Units dropped because the line hit the maximum quantity.
    pub dropped: u32,
}

impl AddOutcome {
    pub fn was_clamped(&self) -> bool {
        self.dropped > 0
    }
}

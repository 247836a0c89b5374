use std::collections::BTreeMap;

use tokio::sync::broadcast;

use crate::{
    dto::cart::{AddOutcome, CartSummary},
    error::{AppError, AppResult, FieldErrors},
    events::{EventBus, StoreEvent},
    models::{LineItem, Money, ProductRef},
};

pub const MIN_QUANTITY: u32 = 1;
pub const MAX_QUANTITY: u32 = 50;
pub const PLATFORM_FEE_PERCENT: i64 = 5;
pub const MINIMUM_PLATFORM_FEE: Money = Money::from_cents(199);

/// In-memory cart: at most one line per product, every quantity in
/// `MIN_QUANTITY..=MAX_QUANTITY`.
#[derive(Debug, Default)]
pub struct Cart {
    items: Vec<LineItem>,
    quantity_errors: BTreeMap<String, String>,
    events: EventBus,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: EventBus) -> Self {
        Self {
            items: Vec::new(),
            quantity_errors: BTreeMap::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, product_id: &str) -> Option<&LineItem> {
        self.items.iter().find(|item| item.product.id == product_id)
    }

    pub fn add_item(&mut self, product: ProductRef, quantity: u32) -> AppResult<AddOutcome> {
        if product.id.trim().is_empty() {
            return Err(AppError::InvalidProduct("product id is required".to_string()));
        }
        if product.price.is_negative() {
            return Err(AppError::InvalidProduct(format!(
                "product {} has a negative price",
                product.id
            )));
        }

        let requested = quantity.max(MIN_QUANTITY);
        let outcome = match self.items.iter_mut().find(|i| i.product.id == product.id) {
            Some(existing) => {
                let wanted = existing.quantity.saturating_add(requested);
                existing.quantity = wanted.min(MAX_QUANTITY);
                AddOutcome {
                    quantity: existing.quantity,
                    dropped: wanted - existing.quantity,
                }
            }
            None => {
                let stored = requested.min(MAX_QUANTITY);
                self.items.push(LineItem {
                    product,
                    quantity: stored,
                });
                AddOutcome {
                    quantity: stored,
                    dropped: requested - stored,
                }
            }
        };

        if outcome.was_clamped() {
            tracing::warn!(
                dropped = outcome.dropped,
                max = MAX_QUANTITY,
                "cart quantity clamped"
            );
        }
        self.notify();
        Ok(outcome)
    }

    /// Removing a product that is not in the cart is a no-op.
    pub fn remove_item(&mut self, product_id: &str) {
        let before = self.items.len();
        self.items.retain(|item| item.product.id != product_id);
        self.quantity_errors.remove(product_id);
        if self.items.len() != before {
            self.notify();
        }
    }

    /// Replaces a line's quantity with the integer parsed from `raw`.
    ///
    /// Rejected input leaves the stored quantity untouched and records a
    /// field error for the line until a valid value is entered.
    pub fn update_quantity(&mut self, product_id: &str, raw: &str) -> AppResult<u32> {
        let Some(index) = self.items.iter().position(|i| i.product.id == product_id) else {
            return Err(AppError::NotFound);
        };

        let quantity = match parse_quantity(raw) {
            Ok(quantity) => quantity,
            Err(message) => {
                self.quantity_errors
                    .insert(product_id.to_string(), message.clone());
                return Err(AppError::Validation(FieldErrors::single(
                    product_id, message,
                )));
            }
        };

        self.quantity_errors.remove(product_id);
        self.items[index].quantity = quantity;
        self.notify();
        Ok(quantity)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.quantity_errors.clear();
        self.notify();
    }

    /// Outstanding per-line quantity errors, keyed by product id.
    pub fn quantity_errors(&self) -> &BTreeMap<String, String> {
        &self.quantity_errors
    }

    pub fn has_quantity_errors(&self) -> bool {
        !self.quantity_errors.is_empty()
    }

    pub fn summary(&self) -> CartSummary {
        summarize(&self.items)
    }

    fn notify(&self) {
        self.events.emit(StoreEvent::CartChanged {
            total_item_count: self.items.iter().map(|i| i.quantity).sum(),
        });
    }
}

fn parse_quantity(raw: &str) -> Result<u32, String> {
    let bound_message =
        || format!("Quantity must be between {MIN_QUANTITY} and {MAX_QUANTITY}");
    let parsed: i64 = raw
        .trim()
        .parse()
        .map_err(|_| "Please enter a valid number".to_string())?;
    if parsed < i64::from(MIN_QUANTITY) || parsed > i64::from(MAX_QUANTITY) {
        return Err(bound_message());
    }
    Ok(parsed as u32)
}

pub fn platform_fee(subtotal: Money) -> Money {
    subtotal.percent(PLATFORM_FEE_PERCENT).max(MINIMUM_PLATFORM_FEE)
}

/// Derives the totals for a set of line items. An empty cart owes nothing.
pub fn summarize(items: &[LineItem]) -> CartSummary {
    if items.is_empty() {
        return CartSummary::default();
    }
    let subtotal: Money = items.iter().map(LineItem::line_total).sum();
    let fee = platform_fee(subtotal);
    CartSummary {
        subtotal,
        platform_fee: fee,
        total: subtotal + fee,
        total_item_count: items.iter().map(|i| i.quantity).sum(),
    }
}

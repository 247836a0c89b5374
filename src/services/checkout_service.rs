use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::orders::{CheckoutRequest, OrderConfirmation},
    error::{AppError, AppResult, CheckoutBlocked},
    services::cart_service::Cart,
};

/// Checks whether the cart may proceed to checkout. The cart is left as is
/// when blocked, so a user sent to log in comes back to the same items.
pub fn ensure_ready(cart: &Cart, authenticated: bool) -> AppResult<()> {
    if !authenticated {
        return Err(AppError::CheckoutBlocked(CheckoutBlocked::LoginRequired));
    }
    if cart.is_empty() {
        return Err(AppError::CheckoutBlocked(CheckoutBlocked::EmptyCart));
    }
    if cart.has_quantity_errors() {
        return Err(AppError::CheckoutBlocked(CheckoutBlocked::QuantityErrors));
    }
    Ok(())
}

/// Places an order for the cart's contents. Payment is simulated; on success
/// the cart is emptied.
pub fn place_order(
    cart: &mut Cart,
    authenticated: bool,
    request: CheckoutRequest,
) -> AppResult<OrderConfirmation> {
    ensure_ready(cart, authenticated)?;
    request.shipping.validate().into_result()?;

    let order_id = Uuid::new_v4();
    let confirmation = OrderConfirmation {
        order_id,
        invoice_number: build_invoice_number(order_id),
        items: cart.items().to_vec(),
        summary: cart.summary(),
        shipping: request.shipping,
        payment_method: request.payment_method,
        placed_at: Utc::now(),
    };

    cart.clear();
    tracing::info!(
        invoice = %confirmation.invoice_number,
        total = %confirmation.summary.total,
        payment = confirmation.payment_method.label(),
        "order placed"
    );
    Ok(confirmation)
}

fn build_invoice_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.simple().to_string();
    format!("INV-{}-{}", date, &suffix[..8])
}

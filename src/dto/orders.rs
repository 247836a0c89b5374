use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    dto::{auth::is_plausible_email, cart::CartSummary},
    error::FieldErrors,
    models::LineItem,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingInfo {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let required = [
            ("first_name", &self.first_name, "First name is required"),
            ("last_name", &self.last_name, "Last name is required"),
            ("email", &self.email, "Email is required"),
            ("address", &self.address, "Address is required"),
            ("city", &self.city, "City is required"),
            ("postal_code", &self.postal_code, "Postal code is required"),
            ("country", &self.country, "Country is required"),
        ];
        for (field, value, message) in required {
            if value.trim().is_empty() {
                errors.add(field, message);
            }
        }
        if !self.email.trim().is_empty() && !is_plausible_email(&self.email) {
            errors.add("email", "Email is invalid");
        }
        errors
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    Paypal,
    BankTransfer,
}

impl PaymentMethod {
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::Paypal => "PayPal",
            PaymentMethod::BankTransfer => "Bank Transfer",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub shipping: ShippingInfo,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderConfirmation {
    pub order_id: Uuid,
    pub invoice_number: String,
    pub items: Vec<LineItem>,
    pub summary: CartSummary,
    pub shipping: ShippingInfo,
    pub payment_method: PaymentMethod,
    pub placed_at: DateTime<Utc>,
}

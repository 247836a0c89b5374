use std::{collections::BTreeMap, fmt};

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::http::HttpResponse;

/// Field-scoped client-side validation failures, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Keeps the first message recorded for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_result(self) -> AppResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|(field, msg)| format!("{field}: {msg}"))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

/// Error body returned by the remote API, kept verbatim.
///
/// The API answers either with a single message (`{"detail": ".."}`,
/// `{"error": ".."}`, a bare string) or with a map of field name to messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorPayload {
    Message(String),
    Messages(Vec<String>),
    Fields(BTreeMap<String, Vec<String>>),
}

const MESSAGE_KEYS: [&str; 3] = ["detail", "error", "message"];
const GENERAL_FIELD_KEYS: [&str; 3] = ["non_field_errors", "detail", "error"];

impl ErrorPayload {
    pub fn message(message: impl Into<String>) -> Self {
        ErrorPayload::Message(message.into())
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => ErrorPayload::Message(s.clone()),
            Value::Array(items) => ErrorPayload::Messages(items.iter().map(value_text).collect()),
            Value::Object(map) => {
                if map.len() == 1 {
                    for key in MESSAGE_KEYS {
                        if let Some(Value::String(s)) = map.get(key) {
                            return ErrorPayload::Message(s.clone());
                        }
                    }
                }
                let fields = map
                    .iter()
                    .map(|(field, v)| {
                        let messages = match v {
                            Value::Array(items) => items.iter().map(value_text).collect(),
                            other => vec![value_text(other)],
                        };
                        (field.clone(), messages)
                    })
                    .collect();
                ErrorPayload::Fields(fields)
            }
            other => ErrorPayload::Message(value_text(other)),
        }
    }

    pub fn from_body(status: StatusCode, body: &[u8]) -> Self {
        if let Ok(value) = serde_json::from_slice::<Value>(body) {
            return Self::from_json(&value);
        }
        let text = String::from_utf8_lossy(body).trim().to_string();
        if text.is_empty() {
            ErrorPayload::Message(
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string(),
            )
        } else {
            ErrorPayload::Message(text)
        }
    }

    /// Flattens the payload into display strings.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ErrorPayload::Message(m) => vec![m.clone()],
            ErrorPayload::Messages(ms) => ms.clone(),
            ErrorPayload::Fields(fields) => fields
                .iter()
                .flat_map(|(field, messages)| {
                    messages.iter().map(move |m| {
                        if GENERAL_FIELD_KEYS.contains(&field.as_str()) {
                            m.clone()
                        } else {
                            format!("{field}: {m}")
                        }
                    })
                })
                .collect(),
        }
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("; "))
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Why a checkout could not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutBlocked {
    LoginRequired,
    EmptyCart,
    QuantityErrors,
}

impl fmt::Display for CheckoutBlocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            CheckoutBlocked::LoginRequired => "Please log in to proceed to checkout",
            CheckoutBlocked::EmptyCart => "Your cart is empty",
            CheckoutBlocked::QuantityErrors => "Please fix quantity errors before proceeding",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Authentication failed: {0}")]
    Auth(ErrorPayload),

    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not Found")]
    NotFound,

    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    #[error("Checkout blocked: {0}")]
    CheckoutBlocked(CheckoutBlocked),

    #[error("Request failed with status {status}: {payload}")]
    Http {
        status: StatusCode,
        payload: ErrorPayload,
    },

    #[error("Token storage error")]
    Storage(#[from] std::io::Error),

    #[error("Malformed response body")]
    Decode(#[from] serde_json::Error),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Maps an unsuccessful response from the API onto the error taxonomy.
    pub fn from_response(response: &HttpResponse) -> Self {
        let payload = response.error_payload();
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Auth(payload),
            StatusCode::NOT_FOUND => AppError::NotFound,
            status => AppError::Http { status, payload },
        }
    }

    /// Reduces any error to flat strings suitable for display.
    pub fn user_messages(&self) -> Vec<String> {
        match self {
            AppError::Validation(fields) => fields.iter().map(|(_, m)| m.to_string()).collect(),
            AppError::Auth(payload) | AppError::Http { payload, .. } => payload.messages(),
            AppError::CheckoutBlocked(reason) => vec![reason.to_string()],
            AppError::InvalidProduct(reason) => vec![reason.clone()],
            AppError::Network(_) => {
                vec!["Unable to reach the server. Please check your connection.".to_string()]
            }
            other => vec![other.to_string()],
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

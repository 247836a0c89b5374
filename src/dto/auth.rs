use serde::{Deserialize, Serialize};

use crate::{error::FieldErrors, models::UserProfile};

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Serialize, Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "password2")]
    pub password_confirmation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.username.trim().is_empty() {
            errors.add("username", "Username is required");
        }
        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        } else if !is_plausible_email(&self.email) {
            errors.add("email", "Email is invalid");
        }
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
            );
        }
        if self.password != self.password_confirmation {
            errors.add("password2", "Passwords do not match");
        }
        errors
    }
}

/// `local@domain.tld` with no whitespace and a dot inside the domain.
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AuthResponse {
    pub user: UserProfile,
    #[serde(alias = "token")]
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

pub mod guard;
pub mod state;

use serde::Serialize;
use thiserror::Error;

pub use guard::{resolve, Navigation, Route};
pub use state::{AuthSnapshot, AuthStatus, AuthStore};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Rejected locally; no request was made.
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    LoginFailed(String),

    #[error("{0}")]
    RefreshFailed(String),
}

/// Body of `POST /auth/login`. Build with [`LoginCredentials::new`] so the
/// values are trimmed and validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginCredentials {
    email: String,
    password: String,
}

impl LoginCredentials {
    pub fn new(email: &str, password: &str) -> Result<Self, AuthError> {
        let email = email.trim();
        let password = password.trim();

        validate_email(email)?;
        validate_password(password)?;

        Ok(Self {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Validates an email address.
///
/// Requires a single `@` with a non-empty local part and a dotted domain,
/// and no whitespace.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let invalid = || AuthError::InvalidCredentials("Enter a valid email".to_string());

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a password.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::InvalidCredentials(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

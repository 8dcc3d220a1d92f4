use std::collections::BTreeMap;
use thiserror::Error;

/// Per-field messages, keyed by the form field name the client rendered the
/// input under (`email`, `username`, `content`, ...). The reserved keys
/// `server` and `authorization` carry non-field errors.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub fn single_field(field: &str, message: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), vec![message.to_string()]);
    errors
}

/// Expected failure modes of the action layer. Every variant maps to one
/// terminal result object; nothing here escapes a handler as an unhandled
/// fault.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Schema rejection. Detected before any data-store access.
    #[error("Invalid input. Please check the fields.")]
    Validation(FieldErrors),
    /// Unique-constraint violation on email/username/phone.
    #[error("Some fields are already in use.")]
    Conflict(FieldErrors),
    /// Missing or unreadable session.
    #[error("Authentication required.")]
    Unauthenticated,
    /// Credentials checked and refused (login, SMS login, current password).
    #[error("{message}")]
    CredentialsRejected {
        message: String,
        errors: FieldErrors,
    },
    /// Session is valid but the action is not permitted. Deliberately does
    /// not distinguish a missing tweet from someone else's tweet.
    #[error("Unauthorized or tweet not found")]
    Forbidden(FieldErrors),
    #[error("{0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn credentials_rejected(message: &str, field: &str, detail: &str) -> Self {
        DomainError::CredentialsRejected {
            message: message.to_string(),
            errors: single_field(field, detail),
        }
    }
}

//! Error types for the Warden system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WardenError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Unknown identifier or wrong password. The two are deliberately
    /// indistinguishable.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account is locked due to too many failed attempts")]
    AccountLocked,

    #[error("account is not active")]
    AccountInactive,

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    /// Any structural, signature, expiry, type or subject failure of a
    /// bearer token.
    #[error("invalid token")]
    InvalidToken,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self::AuthorizationDenied {
            reason: reason.into(),
        }
    }

    /// Whether this is a missing-entity error for the given entity kind.
    pub fn is_not_found(&self, kind: &str) -> bool {
        matches!(self, Self::NotFound { entity, .. } if entity == kind)
    }
}

pub type WardenResult<T> = Result<T, WardenError>;

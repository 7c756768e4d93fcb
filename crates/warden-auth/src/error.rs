//! Authentication error types.

use thiserror::Error;
use warden_core::error::WardenError;

use crate::claims::TokenType;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is locked")]
    AccountLocked,

    #[error("account is inactive")]
    AccountInactive,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("expected a {expected} token")]
    WrongTokenType { expected: TokenType },

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for WardenError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => WardenError::InvalidCredentials,
            AuthError::AccountLocked => WardenError::AccountLocked,
            AuthError::AccountInactive => WardenError::AccountInactive,
            AuthError::TokenExpired
            | AuthError::TokenInvalid(_)
            | AuthError::WrongTokenType { .. } => WardenError::InvalidToken,
            AuthError::Crypto(msg) => WardenError::Crypto(msg),
        }
    }
}

//! HTTP error responses.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use warden_core::error::WardenError;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// An error on its way to the client.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", message)
    }
}

impl From<WardenError> for ApiError {
    fn from(err: WardenError) -> Self {
        match err {
            WardenError::InvalidCredentials => Self::unauthorized(err.to_string()),
            WardenError::InvalidToken => {
                Self::new(StatusCode::UNAUTHORIZED, "invalid_token", err.to_string())
            }
            WardenError::AccountLocked => {
                Self::new(StatusCode::FORBIDDEN, "account_locked", err.to_string())
            }
            WardenError::AccountInactive => {
                Self::new(StatusCode::FORBIDDEN, "account_inactive", err.to_string())
            }
            WardenError::AuthorizationDenied { reason } => Self::forbidden(reason),
            WardenError::Validation { message } => Self::validation(message),
            WardenError::NotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            WardenError::AlreadyExists { .. } => {
                Self::new(StatusCode::CONFLICT, "conflict", err.to_string())
            }
            WardenError::Database(_) | WardenError::Crypto(_) | WardenError::Internal(_) => {
                tracing::error!(error = %err, "request failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An unexpected error occurred",
                )
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "invalid_request", rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), "invalid_request", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), "invalid_request", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_are_unauthorized() {
        let err = ApiError::from(WardenError::InvalidCredentials);
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "invalid username or password");

        assert_eq!(ApiError::from(WardenError::InvalidToken).status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn refusals_are_forbidden() {
        assert_eq!(ApiError::from(WardenError::AccountLocked).status, StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(WardenError::AccountInactive).status, StatusCode::FORBIDDEN);

        let err = ApiError::from(WardenError::denied(
            "user does not have the required role in the organization",
        ));
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.message, "user does not have the required role in the organization");
    }

    #[test]
    fn internal_details_are_hidden() {
        let err = ApiError::from(WardenError::Database("connection reset".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("connection reset"));
    }

    #[test]
    fn store_outcomes_map_to_client_errors() {
        assert_eq!(
            ApiError::from(WardenError::validation("bad")).status,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(WardenError::not_found("user", "x")).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(WardenError::AlreadyExists { entity: "email".into() }).status,
            StatusCode::CONFLICT
        );
    }
}

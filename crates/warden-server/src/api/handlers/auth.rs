//! Login, refresh, `/me` and introspection.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use surrealdb::Connection;
use uuid::Uuid;
use warden_auth::{AuthOutcome, Introspection, LoginInput};
use warden_core::models::user::UserInfo;

use crate::api::{AppState, Authenticated, extract};
use crate::error::{ApiError, ApiResult};

/// Login body. Every field is optional on the wire so that a missing
/// one is reported as a validation failure rather than a decode error.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub role_id: Option<String>,
}

impl TryFrom<LoginRequest> for LoginInput {
    type Error = ApiError;

    fn try_from(request: LoginRequest) -> Result<Self, Self::Error> {
        let username = request
            .username
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ApiError::validation("username is required"))?;
        let password = request
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::validation("password is required"))?;
        let organization_id = request
            .organization_id
            .ok_or_else(|| ApiError::validation("organization_id is required"))?;

        Ok(Self {
            username,
            password,
            organization_id,
            department_id: request.department_id,
            role_id: request.role_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct IntrospectRequest {
    pub token: String,
}

pub async fn login<C: Connection>(
    State(state): State<AppState<C>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthOutcome>> {
    let Json(request) = payload?;
    let input = LoginInput::try_from(request)?;
    Ok(Json(state.auth.login(input).await?))
}

pub async fn refresh<C: Connection>(
    State(state): State<AppState<C>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<AuthOutcome>> {
    let Json(request) = payload?;
    if request.refresh_token.trim().is_empty() {
        return Err(ApiError::validation("refresh_token is required"));
    }
    Ok(Json(state.auth.refresh(&request.refresh_token).await?))
}

pub async fn me<C: Connection>(
    State(state): State<AppState<C>>,
    Authenticated(user_id): Authenticated,
) -> ApiResult<Json<UserInfo>> {
    Ok(Json(extract::account(&state, user_id).await?))
}

pub async fn introspect<C: Connection>(
    State(state): State<AppState<C>>,
    payload: Result<Json<IntrospectRequest>, JsonRejection>,
) -> ApiResult<Json<Introspection>> {
    let Json(request) = payload?;
    Ok(Json(state.auth.introspect(&request.token)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn request(
        username: Option<&str>,
        password: Option<&str>,
        organization_id: Option<Uuid>,
    ) -> LoginRequest {
        LoginRequest {
            username: username.map(str::to_string),
            password: password.map(str::to_string),
            organization_id,
            department_id: None,
            role_id: Some("ignored".to_string()),
        }
    }

    #[test]
    fn complete_request_converts() {
        let org = Uuid::new_v4();
        let input = LoginInput::try_from(request(Some("alice"), Some("pw"), Some(org))).unwrap();
        assert_eq!(input.username, "alice");
        assert_eq!(input.organization_id, org);
        assert_eq!(input.role_id.as_deref(), Some("ignored"));
    }

    #[test]
    fn missing_fields_are_validation_errors() {
        let org = Some(Uuid::new_v4());
        for bad in [
            request(None, Some("pw"), org),
            request(Some("  "), Some("pw"), org),
            request(Some("alice"), Some(""), org),
            request(Some("alice"), Some("pw"), None),
        ] {
            let err = LoginInput::try_from(bad).unwrap_err();
            assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        }
    }
}

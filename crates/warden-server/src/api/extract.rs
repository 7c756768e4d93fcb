use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use surrealdb::Connection;
use tracing::debug;
use uuid::Uuid;
use warden_core::error::WardenError;
use warden_core::models::user::UserInfo;

use crate::api::AppState;
use crate::error::ApiError;

/// The account behind a valid `Authorization: Bearer` access token.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Uuid);

impl<C: Connection> FromRequestParts<AppState<C>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<C>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer(parts)?;
        let user_id = state.auth.validate_token(token)?;
        Ok(Self(user_id))
    }
}

/// An authenticated account with `is_super_admin` set.
#[derive(Debug, Clone)]
pub struct SuperAdmin(pub UserInfo);

impl<C: Connection> FromRequestParts<AppState<C>> for SuperAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<C>,
    ) -> Result<Self, Self::Rejection> {
        let Authenticated(user_id) = Authenticated::from_request_parts(parts, state).await?;
        let user = account(state, user_id).await?;
        if !user.is_super_admin {
            debug!(%user_id, "administrator route refused");
            return Err(ApiError::forbidden("administrator privileges required"));
        }
        Ok(Self(user))
    }
}

/// Load the token's account. A subject that no longer exists is reported
/// as an invalid token, not a missing resource.
pub(crate) async fn account<C: Connection>(
    state: &AppState<C>,
    user_id: Uuid,
) -> Result<UserInfo, ApiError> {
    match state.auth.user_info(user_id).await {
        Ok(user) => Ok(user),
        Err(e) if e.is_not_found("user") => Err(WardenError::InvalidToken.into()),
        Err(e) => Err(e.into()),
    }
}

fn bearer(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;

    match header.split_once(' ') {
        Some((scheme, token))
            if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() =>
        {
            Ok(token.trim())
        }
        _ => Err(ApiError::unauthorized("missing bearer token")),
    }
}

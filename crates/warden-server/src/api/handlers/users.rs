//! Account administration under `/v1/auth/admin`.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use surrealdb::Connection;
use tracing::info;
use uuid::Uuid;
use warden_auth::RegisterInput;
use warden_core::models::user::UserInfo;
use warden_core::repository::{PaginatedResult, Pagination};

use crate::api::{AppState, SuperAdmin};
use crate::error::ApiResult;

const MAX_PAGE_SIZE: u64 = 100;

/// Clamp a client-supplied page to something the store should serve.
pub(crate) fn page(query: Result<Query<Pagination>, QueryRejection>) -> ApiResult<Pagination> {
    let Query(mut pagination) = query?;
    pagination.limit = pagination.limit.clamp(1, MAX_PAGE_SIZE);
    Ok(pagination)
}

pub async fn list<C: Connection>(
    State(state): State<AppState<C>>,
    _admin: SuperAdmin,
    query: Result<Query<Pagination>, QueryRejection>,
) -> ApiResult<Json<PaginatedResult<UserInfo>>> {
    Ok(Json(state.auth.list_users(page(query)?).await?))
}

pub async fn create<C: Connection>(
    State(state): State<AppState<C>>,
    SuperAdmin(admin): SuperAdmin,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserInfo>)> {
    let Json(input) = payload?;
    let user = state.auth.register(input).await?;
    info!(admin_id = %admin.id, user_id = %user.id, "account created by administrator");
    Ok((StatusCode::CREATED, Json(state.auth.user_info(user.id).await?)))
}

pub async fn unlock<C: Connection>(
    State(state): State<AppState<C>>,
    SuperAdmin(admin): SuperAdmin,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(user_id) = path?;
    state.auth.unlock_account(user_id).await?;
    info!(admin_id = %admin.id, %user_id, "account unlocked by administrator");
    Ok(StatusCode::NO_CONTENT)
}

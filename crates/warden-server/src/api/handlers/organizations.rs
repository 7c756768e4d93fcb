//! Tenant provisioning under `/v1/organizations/admin`.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use surrealdb::Connection;
use uuid::Uuid;
use warden_auth::{
    AssignDepartmentInput, AssignOrganizationInput, CreateDepartmentInput, CreateOrganizationInput,
};
use warden_core::models::{
    department::{Department, DepartmentKind},
    membership::{DepartmentMembership, OrganizationMembership},
    organization::Organization,
    role::Role,
};
use warden_core::repository::{PaginatedResult, Pagination};

use crate::api::{AppState, SuperAdmin, handlers::users::page};
use crate::error::ApiResult;

type Created<T> = ApiResult<(StatusCode, Json<T>)>;

/// Department body; the organization comes from the path.
#[derive(Debug, Deserialize)]
pub struct DepartmentRequest {
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub kind: Option<DepartmentKind>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub function: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Membership body; the unit comes from the path.
#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_primary: bool,
}

pub async fn create<C: Connection>(
    State(state): State<AppState<C>>,
    _admin: SuperAdmin,
    payload: Result<Json<CreateOrganizationInput>, JsonRejection>,
) -> Created<Organization> {
    let Json(input) = payload?;
    let organization = state.provisioning.create_organization(input).await?;
    Ok((StatusCode::CREATED, Json(organization)))
}

pub async fn list<C: Connection>(
    State(state): State<AppState<C>>,
    _admin: SuperAdmin,
    query: Result<Query<Pagination>, QueryRejection>,
) -> ApiResult<Json<PaginatedResult<Organization>>> {
    Ok(Json(state.provisioning.list_organizations(page(query)?).await?))
}

pub async fn children<C: Connection>(
    State(state): State<AppState<C>>,
    _admin: SuperAdmin,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<Organization>>> {
    let Path(organization_id) = path?;
    Ok(Json(
        state.provisioning.list_child_organizations(organization_id).await?,
    ))
}

pub async fn create_department<C: Connection>(
    State(state): State<AppState<C>>,
    _admin: SuperAdmin,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<DepartmentRequest>, JsonRejection>,
) -> Created<Department> {
    let Path(organization_id) = path?;
    let Json(request) = payload?;
    let department = state
        .provisioning
        .create_department(CreateDepartmentInput {
            organization_id,
            parent_id: request.parent_id,
            code: request.code,
            name: request.name,
            kind: request.kind,
            description: request.description,
            function: request.function,
            is_active: request.is_active,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(department)))
}

pub async fn departments<C: Connection>(
    State(state): State<AppState<C>>,
    _admin: SuperAdmin,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<Department>>> {
    let Path(organization_id) = path?;
    Ok(Json(state.provisioning.list_departments(organization_id).await?))
}

pub async fn department_children<C: Connection>(
    State(state): State<AppState<C>>,
    _admin: SuperAdmin,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<Department>>> {
    let Path(department_id) = path?;
    Ok(Json(
        state.provisioning.list_child_departments(department_id).await?,
    ))
}

pub async fn assign_member<C: Connection>(
    State(state): State<AppState<C>>,
    _admin: SuperAdmin,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<MemberRequest>, JsonRejection>,
) -> Created<OrganizationMembership> {
    let Path(organization_id) = path?;
    let Json(request) = payload?;
    let membership = state
        .provisioning
        .assign_user_to_organization(AssignOrganizationInput {
            user_id: request.user_id,
            organization_id,
            role: request.role,
            is_primary: request.is_primary,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

pub async fn assign_department_member<C: Connection>(
    State(state): State<AppState<C>>,
    _admin: SuperAdmin,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<MemberRequest>, JsonRejection>,
) -> Created<DepartmentMembership> {
    let Path(department_id) = path?;
    let Json(request) = payload?;
    let membership = state
        .provisioning
        .assign_user_to_department(AssignDepartmentInput {
            user_id: request.user_id,
            department_id,
            role: request.role,
            is_primary: request.is_primary,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

pub async fn user_organizations<C: Connection>(
    State(state): State<AppState<C>>,
    _admin: SuperAdmin,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<OrganizationMembership>>> {
    let Path(user_id) = path?;
    Ok(Json(state.provisioning.list_user_organizations(user_id).await?))
}

pub async fn user_departments<C: Connection>(
    State(state): State<AppState<C>>,
    _admin: SuperAdmin,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<DepartmentMembership>>> {
    let Path(user_id) = path?;
    Ok(Json(state.provisioning.list_user_departments(user_id).await?))
}

pub async fn remove_member<C: Connection>(
    State(state): State<AppState<C>>,
    _admin: SuperAdmin,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path((user_id, organization_id)) = path?;
    state
        .provisioning
        .remove_user_from_organization(user_id, organization_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_department_member<C: Connection>(
    State(state): State<AppState<C>>,
    _admin: SuperAdmin,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path((user_id, department_id)) = path?;
    state
        .provisioning
        .remove_user_from_department(user_id, department_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

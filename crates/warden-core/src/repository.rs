//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The traits are the only view
//! the auth and provisioning services have of storage; implementations
//! live in `warden-db`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WardenResult;
use crate::models::{
    department::{CreateDepartment, Department},
    membership::{DepartmentMembership, OrganizationMembership},
    organization::{CreateOrganization, Organization, UpdateOrganization},
    role::Role,
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Credential store
// ---------------------------------------------------------------------------

/// Accounts and their lockout counters. Soft-deleted accounts are
/// invisible to every lookup.
pub trait UserRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the email or username is taken.
    fn create(&self, input: CreateUser) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_username(&self, username: &str) -> impl Future<Output = WardenResult<User>> + Send;
    /// Exact match against either the email or the username column.
    fn get_by_email_or_username(
        &self,
        identifier: &str,
    ) -> impl Future<Output = WardenResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = WardenResult<User>> + Send;
    /// Atomically adds one failed attempt and returns the new count.
    fn increment_login_attempts(
        &self,
        id: Uuid,
    ) -> impl Future<Output = WardenResult<u32>> + Send;
    fn set_locked_until(
        &self,
        id: Uuid,
        until: DateTime<Utc>,
    ) -> impl Future<Output = WardenResult<()>> + Send;
    /// Resets `login_attempts` to zero and clears `locked_until`.
    fn clear_lockout(&self, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
    /// Clears lockout state and stamps `last_login_at`.
    fn record_successful_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = WardenResult<()>> + Send;
    /// Soft-delete. Membership rows of the account are removed.
    fn delete(&self, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
    /// Bring back the soft-deleted account holding `email`, active and
    /// unlocked. `NotFound` when no deleted account has that email.
    fn restore_by_email(&self, email: &str) -> impl Future<Output = WardenResult<User>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<User>>> + Send;
}

// ---------------------------------------------------------------------------
// Membership store: organizational units
// ---------------------------------------------------------------------------

pub trait OrganizationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrganization,
    ) -> impl Future<Output = WardenResult<Organization>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Organization>> + Send;
    fn get_by_domain(
        &self,
        domain: &str,
    ) -> impl Future<Output = WardenResult<Organization>> + Send;
    /// First non-deleted organization with this exact name.
    fn get_by_name(&self, name: &str) -> impl Future<Output = WardenResult<Organization>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateOrganization,
    ) -> impl Future<Output = WardenResult<Organization>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = WardenResult<PaginatedResult<Organization>>> + Send;
    fn list_children(
        &self,
        parent_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<Organization>>> + Send;
}

pub trait DepartmentRepository: Send + Sync {
    fn create(
        &self,
        input: CreateDepartment,
    ) -> impl Future<Output = WardenResult<Department>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Department>> + Send;
    fn list_by_organization(
        &self,
        organization_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<Department>>> + Send;
    fn list_children(
        &self,
        parent_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<Department>>> + Send;
}

// ---------------------------------------------------------------------------
// Membership store: user ↔ unit rows
// ---------------------------------------------------------------------------

/// Membership rows keyed by `(user, unit)`.
///
/// The assign commands own the "at most one primary" rule: with
/// `is_primary` set they clear the user's other primaries, upsert the
/// row and republish the account's denormalized primary reference as
/// one unit of work. Implementations must not let callers observe the
/// intermediate states.
pub trait MembershipRepository: Send + Sync {
    fn assign_organization(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        role: Role,
        is_primary: bool,
    ) -> impl Future<Output = WardenResult<OrganizationMembership>> + Send;
    fn assign_department(
        &self,
        user_id: Uuid,
        department_id: Uuid,
        role: Role,
        is_primary: bool,
    ) -> impl Future<Output = WardenResult<DepartmentMembership>> + Send;
    fn get_organization_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> impl Future<Output = WardenResult<OrganizationMembership>> + Send;
    fn get_department_membership(
        &self,
        user_id: Uuid,
        department_id: Uuid,
    ) -> impl Future<Output = WardenResult<DepartmentMembership>> + Send;
    /// Ordered primary first, then most recently updated.
    fn list_user_organizations(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<OrganizationMembership>>> + Send;
    /// Ordered primary first, then most recently updated.
    fn list_user_departments(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = WardenResult<Vec<DepartmentMembership>>> + Send;
    fn remove_organization(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> impl Future<Output = WardenResult<()>> + Send;
    fn remove_department(
        &self,
        user_id: Uuid,
        department_id: Uuid,
    ) -> impl Future<Output = WardenResult<()>> + Send;
    /// Drops the primary flag from every organization membership of the
    /// user and clears the account's primary organization.
    fn clear_primary_organizations(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = WardenResult<()>> + Send;
    fn clear_primary_departments(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = WardenResult<()>> + Send;
}

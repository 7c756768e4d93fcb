//! User ↔ organization and user ↔ department membership rows.
//!
//! Rows are keyed by `(user, unit)`. At most one row per user and per
//! membership type carries `is_primary = true`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::department::Department;
use super::organization::Organization;
use super::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationMembership {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: Role,
    pub is_primary: bool,
    /// The referenced organization, when it could be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentMembership {
    pub user_id: Uuid,
    pub department_id: Uuid,
    pub role: Role,
    pub is_primary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

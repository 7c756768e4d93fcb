//! Account domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::membership::{DepartmentMembership, OrganizationMembership};

/// A user account with credentials and security state.
///
/// `primary_organization_id` and `primary_department_id` cache the
/// primary membership rows. They are only written by the membership
/// repository's assign/remove commands, never through [`UpdateUser`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_super_admin: bool,
    pub mfa_enabled: bool,
    pub primary_organization_id: Option<Uuid>,
    pub primary_department_id: Option<Uuid>,
    /// Consecutive failed password checks since the last success.
    pub login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub username: String,
    /// Argon2id PHC string; hashing happens in the auth layer.
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_super_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub is_super_admin: Option<bool>,
}

/// Organization membership summary inside a [`UserInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMembershipInfo {
    pub organization_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub is_primary: bool,
}

/// Department membership summary inside a [`UserInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentMembershipInfo {
    pub department_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub is_primary: bool,
}

/// Public projection of an account, enriched with its memberships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_organization_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_department_id: Option<Uuid>,
    pub is_super_admin: bool,
    pub mfa_enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organizations: Vec<OrganizationMembershipInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub departments: Vec<DepartmentMembershipInfo>,
}

impl UserInfo {
    pub fn compose(
        user: &User,
        organizations: &[OrganizationMembership],
        departments: &[DepartmentMembership],
    ) -> Self {
        let role_of = |role: &super::role::Role| {
            (!role.is_empty()).then(|| role.as_str().to_string())
        };

        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            primary_organization_id: user.primary_organization_id,
            primary_department_id: user.primary_department_id,
            is_super_admin: user.is_super_admin,
            mfa_enabled: user.mfa_enabled,
            organizations: organizations
                .iter()
                .map(|m| OrganizationMembershipInfo {
                    organization_id: m.organization_id,
                    organization_name: m.organization.as_ref().map(|o| o.name.clone()),
                    role: role_of(&m.role),
                    is_primary: m.is_primary,
                })
                .collect(),
            departments: departments
                .iter()
                .map(|m| DepartmentMembershipInfo {
                    department_id: m.department_id,
                    department_name: m.department.as_ref().map(|d| d.name.clone()),
                    role: role_of(&m.role),
                    is_primary: m.is_primary,
                })
                .collect(),
        }
    }
}

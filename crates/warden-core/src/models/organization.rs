//! Organization domain model.
//!
//! Organizations are the tenants of the platform. They form a forest
//! through the optional `parent_id` reference and own zero or more
//! departments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Globally unique when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub description: String,
    pub domain: Option<String>,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
}

/// Fields that can be updated on an existing organization.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub is_active: Option<bool>,
}

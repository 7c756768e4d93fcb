//! Department domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classifies departments versus their child units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepartmentKind {
    /// A top-level department.
    #[default]
    Department,
    /// A functional sub-division inside a department.
    Division,
    /// An execution-focused group such as a field team.
    Team,
}

impl DepartmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Department => "DEPARTMENT",
            Self::Division => "DIVISION",
            Self::Team => "TEAM",
        }
    }
}

impl fmt::Display for DepartmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepartmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPARTMENT" => Ok(Self::Department),
            "DIVISION" => Ok(Self::Division),
            "TEAM" => Ok(Self::Team),
            other => Err(format!("unknown department kind: {other}")),
        }
    }
}

/// A sub-division within an organization. The parent department, when
/// set, always belongs to the same organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: Uuid,
    pub organization_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub name: String,
    pub kind: DepartmentKind,
    pub description: String,
    pub function: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDepartment {
    pub organization_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub code: Option<String>,
    pub name: String,
    pub kind: DepartmentKind,
    pub description: String,
    pub function: String,
    pub is_active: bool,
}

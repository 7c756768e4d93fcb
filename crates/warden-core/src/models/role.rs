//! Membership role value type.
//!
//! Roles are free-form strings attached to a membership row. Exactly
//! one value is reserved: [`Role::SYSTEM_ADMIN`], the platform
//! administrator role granted by bootstrap.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Reserved role value for the platform administrator.
    pub const SYSTEM_ADMIN: &'static str = "SYSTEM_ADMIN";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The reserved platform administrator role.
    pub fn system_admin() -> Self {
        Self(Self::SYSTEM_ADMIN.into())
    }

    /// The empty role: a membership with no role restriction.
    pub fn unrestricted() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn is_system_admin(&self) -> bool {
        self.0 == Self::SYSTEM_ADMIN
    }

    /// Organization-scoped login only admits unrestricted and
    /// administrator memberships.
    pub fn permits_organization_login(&self) -> bool {
        self.is_empty() || self.is_system_admin()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organization_login_admits_empty_and_admin_only() {
        assert!(Role::unrestricted().permits_organization_login());
        assert!(Role::new("   ").permits_organization_login());
        assert!(Role::system_admin().permits_organization_login());
        assert!(!Role::new("CEO").permits_organization_login());
        assert!(!Role::new("system_admin").permits_organization_login());
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Role::system_admin()).unwrap();
        assert_eq!(json, "\"SYSTEM_ADMIN\"");
    }
}

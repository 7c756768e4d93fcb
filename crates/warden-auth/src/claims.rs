//! Token claim set and its composition from an account plus its
//! memberships.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::models::membership::{DepartmentMembership, OrganizationMembership};
use warden_core::models::user::User;

use crate::config::AuthConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        })
    }
}

/// One organization or department entry in an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitClaim {
    pub id: String,
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Claims carried by both access and refresh tokens. Membership
/// arrays are only present on access tokens, and only when non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    pub jti: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub user_id: String,
    pub email: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_super_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizations: Option<Vec<UnitClaim>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departments: Option<Vec<UnitClaim>>,
}

impl Claims {
    /// The account id in `sub`.
    pub fn subject(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// Builds claim sets with fresh timestamps and `jti`.
#[derive(Debug, Clone)]
pub struct ClaimsComposer {
    issuer: String,
    audience: String,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl ClaimsComposer {
    pub fn from_config(config: &AuthConfig) -> Self {
        let secs = |value: u64| {
            i64::try_from(value)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX)
        };
        Self {
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            access_lifetime: secs(config.access_token_lifetime_secs),
            refresh_lifetime: secs(config.refresh_token_lifetime_secs),
        }
    }

    pub fn compose(
        &self,
        token_type: TokenType,
        user: &User,
        organizations: &[OrganizationMembership],
        departments: &[DepartmentMembership],
        now: DateTime<Utc>,
    ) -> Claims {
        let lifetime = match token_type {
            TokenType::Access => self.access_lifetime,
            TokenType::Refresh => self.refresh_lifetime,
        };
        let iat = now.timestamp();

        let mut claims = Claims {
            iss: self.issuer.clone(),
            sub: user.id.to_string(),
            aud: vec![self.audience.clone()],
            exp: iat.saturating_add(lifetime.num_seconds()),
            iat,
            nbf: iat,
            jti: Uuid::new_v4().to_string(),
            token_type,
            user_id: user.id.to_string(),
            email: user.email.clone(),
            username: user.username.clone(),
            org_id: user.primary_organization_id.map(|id| id.to_string()),
            is_super_admin: user.is_super_admin,
            organizations: None,
            roles: None,
            departments: None,
        };

        if token_type == TokenType::Access {
            claims.organizations = organization_claims(organizations);
            claims.roles = aggregate_roles(organizations);
            claims.departments = department_claims(departments);
        }

        claims
    }
}

fn non_empty(role: &str) -> Option<String> {
    let trimmed = role.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Primary first, then most recently updated.
fn by_precedence<T>(items: &[T], key: impl Fn(&T) -> (bool, DateTime<Utc>)) -> Vec<&T> {
    let mut sorted: Vec<&T> = items.iter().collect();
    sorted.sort_by(|a, b| {
        let (a_primary, a_updated) = key(a);
        let (b_primary, b_updated) = key(b);
        b_primary.cmp(&a_primary).then(b_updated.cmp(&a_updated))
    });
    sorted
}

fn organization_claims(memberships: &[OrganizationMembership]) -> Option<Vec<UnitClaim>> {
    if memberships.is_empty() {
        return None;
    }
    let claims = by_precedence(memberships, |m| (m.is_primary, m.updated_at))
        .into_iter()
        .map(|m| UnitClaim {
            id: m.organization_id.to_string(),
            is_primary: m.is_primary,
            name: m.organization.as_ref().map(|o| o.name.clone()),
            role: non_empty(m.role.as_str()),
        })
        .collect();
    Some(claims)
}

fn department_claims(memberships: &[DepartmentMembership]) -> Option<Vec<UnitClaim>> {
    if memberships.is_empty() {
        return None;
    }
    let claims = by_precedence(memberships, |m| (m.is_primary, m.updated_at))
        .into_iter()
        .map(|m| UnitClaim {
            id: m.department_id.to_string(),
            is_primary: m.is_primary,
            name: m.department.as_ref().map(|d| d.name.clone()),
            role: non_empty(m.role.as_str()),
        })
        .collect();
    Some(claims)
}

/// Distinct non-empty organization roles in precedence order.
fn aggregate_roles(memberships: &[OrganizationMembership]) -> Option<Vec<String>> {
    let mut roles: Vec<String> = Vec::new();
    for membership in by_precedence(memberships, |m| (m.is_primary, m.updated_at)) {
        let Some(role) = non_empty(membership.role.as_str()) else {
            continue;
        };
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    (!roles.is_empty()).then_some(roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::models::organization::Organization;
    use warden_core::models::role::Role;

    fn user(primary_org: Option<Uuid>, admin: bool) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            username: "ada".into(),
            password_hash: String::new(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            is_active: true,
            is_verified: true,
            is_super_admin: admin,
            mfa_enabled: false,
            primary_organization_id: primary_org,
            primary_department_id: None,
            login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn membership(
        user_id: Uuid,
        role: &str,
        is_primary: bool,
        age_secs: i64,
        name: Option<&str>,
    ) -> OrganizationMembership {
        let now = Utc::now();
        let organization_id = Uuid::new_v4();
        OrganizationMembership {
            user_id,
            organization_id,
            role: Role::new(role),
            is_primary,
            organization: name.map(|n| Organization {
                id: organization_id,
                name: n.into(),
                description: String::new(),
                domain: None,
                is_active: true,
                parent_id: None,
                deleted_at: None,
                created_at: now,
                updated_at: now,
            }),
            created_at: now,
            updated_at: now - Duration::seconds(age_secs),
        }
    }

    fn composer() -> ClaimsComposer {
        ClaimsComposer::from_config(&AuthConfig::default())
    }

    #[test]
    fn access_claims_order_primary_then_recent() {
        let u = user(None, false);
        let old = membership(u.id, "", false, 300, Some("Old"));
        let recent = membership(u.id, "CEO", false, 10, Some("Recent"));
        let primary = membership(u.id, Role::SYSTEM_ADMIN, true, 900, None);

        let claims = composer().compose(
            TokenType::Access,
            &u,
            &[old.clone(), recent.clone(), primary.clone()],
            &[],
            Utc::now(),
        );

        let orgs = claims.organizations.unwrap();
        let ids: Vec<_> = orgs.iter().map(|c| c.id.clone()).collect();
        assert_eq!(
            ids,
            vec![
                primary.organization_id.to_string(),
                recent.organization_id.to_string(),
                old.organization_id.to_string(),
            ]
        );
        assert_eq!(orgs[0].name, None);
        assert_eq!(orgs[2].role, None);
        assert_eq!(
            claims.roles.unwrap(),
            vec!["SYSTEM_ADMIN".to_string(), "CEO".to_string()]
        );
        assert!(claims.departments.is_none());
    }

    #[test]
    fn roles_are_deduplicated_and_blank_roles_dropped() {
        let u = user(None, false);
        let memberships = [
            membership(u.id, "CEO", true, 0, None),
            membership(u.id, " CEO ", false, 5, None),
            membership(u.id, "   ", false, 10, None),
        ];
        let claims = composer().compose(TokenType::Access, &u, &memberships, &[], Utc::now());
        assert_eq!(claims.roles.unwrap(), vec!["CEO".to_string()]);
    }

    #[test]
    fn empty_memberships_omit_claims_entirely() {
        let u = user(None, false);
        let claims = composer().compose(TokenType::Access, &u, &[], &[], Utc::now());
        let json = serde_json::to_value(&claims).unwrap();
        let object = json.as_object().unwrap();

        for absent in ["organizations", "roles", "departments", "org_id", "is_super_admin"] {
            assert!(!object.contains_key(absent), "{absent} should be omitted");
        }
        assert_eq!(object["type"], "access");
        assert_eq!(object["aud"], serde_json::json!(["warden"]));
    }

    #[test]
    fn refresh_claims_carry_identity_but_no_memberships() {
        let org = Uuid::new_v4();
        let u = user(Some(org), true);
        let memberships = [membership(u.id, "CEO", true, 0, Some("ACME"))];
        let now = Utc::now();

        let claims = composer().compose(TokenType::Refresh, &u, &memberships, &[], now);

        assert_eq!(claims.token_type, TokenType::Refresh);
        assert_eq!(claims.org_id, Some(org.to_string()));
        assert!(claims.is_super_admin);
        assert!(claims.organizations.is_none());
        assert!(claims.roles.is_none());
        assert_eq!(claims.exp - claims.iat, 604_800);
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.subject(), Some(u.id));
    }

    #[test]
    fn every_composition_gets_a_fresh_jti() {
        let u = user(None, false);
        let a = composer().compose(TokenType::Access, &u, &[], &[], Utc::now());
        let b = composer().compose(TokenType::Access, &u, &[], &[], Utc::now());
        assert_ne!(a.jti, b.jti);
    }
}

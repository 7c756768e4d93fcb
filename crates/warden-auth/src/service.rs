//! Authentication service: login, refresh, validation and the account
//! self-service operations that sit next to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::department::Department;
use warden_core::models::membership::{DepartmentMembership, OrganizationMembership};
use warden_core::models::organization::Organization;
use warden_core::models::role::Role;
use warden_core::models::user::{CreateUser, User, UserInfo};
use warden_core::repository::{MembershipRepository, PaginatedResult, Pagination, UserRepository};

use crate::claims::{ClaimsComposer, TokenType};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::lockout::{LockState, LockoutPolicy};
use crate::password::PasswordService;
use crate::token::TokenCodec;

/// Credentials and the organizational scope to log into.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    /// Email or username.
    pub username: String,
    pub password: String,
    pub organization_id: Uuid,
    #[serde(default)]
    pub department_id: Option<Uuid>,
    /// Accepted for wire compatibility. Not consulted by the login policy.
    #[serde(default)]
    pub role_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub primary_organization_id: Option<Uuid>,
}

/// Token pair plus the account projection, returned by login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub token_type: &'static str,
    pub user: UserInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logged_organization: Option<Organization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logged_department: Option<Department>,
}

/// Token introspection response. Everything but `active` is omitted
/// for an inactive token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Introspection {
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<TokenType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
#[derive(Clone)]
pub struct AuthService<U: UserRepository, M: MembershipRepository> {
    users: U,
    memberships: M,
    passwords: PasswordService,
    tokens: TokenCodec,
    claims: ClaimsComposer,
    lockout: LockoutPolicy,
    access_lifetime_secs: u64,
    min_password_length: usize,
}

impl<U: UserRepository, M: MembershipRepository> AuthService<U, M> {
    /// Fails when the signing secret is empty or the Argon2 cost
    /// parameters are invalid.
    pub fn new(users: U, memberships: M, config: &AuthConfig) -> WardenResult<Self> {
        Ok(Self {
            users,
            memberships,
            passwords: PasswordService::from_config(config)?,
            tokens: TokenCodec::from_config(config)?,
            claims: ClaimsComposer::from_config(config),
            lockout: LockoutPolicy::from_config(config),
            access_lifetime_secs: config.access_token_lifetime_secs,
            min_password_length: config.min_password_length,
        })
    }

    pub async fn login(&self, input: LoginInput) -> WardenResult<AuthOutcome> {
        let user = match self.users.get_by_email_or_username(&input.username).await {
            Ok(user) => user,
            Err(e) if e.is_not_found("user") => {
                self.passwords.verify_dummy(input.password).await?;
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        let now = Utc::now();
        if let LockState::Locked { until } = self.lockout.state(user.locked_until, now) {
            debug!(user_id = %user.id, %until, "login rejected: account locked");
            return Err(AuthError::AccountLocked.into());
        }
        if !user.is_active {
            debug!(user_id = %user.id, "login rejected: account inactive");
            return Err(AuthError::AccountInactive.into());
        }

        let valid = self
            .passwords
            .verify_blocking(input.password, user.password_hash.clone())
            .await?;
        if !valid {
            self.record_failure(&user, now).await?;
            return Err(AuthError::InvalidCredentials.into());
        }

        let (organizations, departments) = self.load_memberships(user.id).await?;

        let membership = organizations
            .iter()
            .find(|m| m.organization_id == input.organization_id)
            .ok_or_else(|| WardenError::denied("organization not found or user not a member"))?;
        if !membership.role.permits_organization_login() {
            warn!(
                user_id = %user.id,
                organization_id = %input.organization_id,
                role = %membership.role,
                "login rejected: role not permitted for organization login"
            );
            return Err(WardenError::denied(
                "user does not have the required role in the organization",
            ));
        }
        let logged_organization = membership
            .organization
            .clone()
            .ok_or_else(|| WardenError::not_found("organization", input.organization_id))?;

        // A department the account does not belong to is ignored.
        let logged_department = match input.department_id {
            Some(department_id) => departments
                .iter()
                .find(|m| m.department_id == department_id)
                .map(|m| {
                    m.department
                        .clone()
                        .ok_or_else(|| WardenError::not_found("department", department_id))
                })
                .transpose()?,
            None => None,
        };

        let mut outcome = self.issue(&user, &organizations, &departments, now)?;

        if let Err(e) = self.users.record_successful_login(user.id, now).await {
            warn!(user_id = %user.id, error = %e, "failed to record successful login");
        }

        info!(
            user_id = %user.id,
            organization_id = %logged_organization.id,
            "login succeeded"
        );
        outcome.logged_organization = Some(logged_organization);
        outcome.logged_department = logged_department;
        Ok(outcome)
    }

    /// Exchange a refresh token for a new pair. Every failure is
    /// reported as [`WardenError::InvalidToken`].
    pub async fn refresh(&self, refresh_token: &str) -> WardenResult<AuthOutcome> {
        let claims = self
            .tokens
            .decode(refresh_token, TokenType::Refresh)
            .map_err(|e| {
                debug!(error = %e, "refresh token rejected");
                WardenError::InvalidToken
            })?;
        let user_id = claims.subject().ok_or(WardenError::InvalidToken)?;

        let user = match self.users.get_by_id(user_id).await {
            Ok(user) => user,
            Err(e) if e.is_not_found("user") => {
                debug!(%user_id, "refresh token subject no longer exists");
                return Err(WardenError::InvalidToken);
            }
            Err(e) => return Err(e),
        };
        if !user.is_active {
            debug!(%user_id, "refresh token subject is inactive");
            return Err(WardenError::InvalidToken);
        }

        let (organizations, departments) = self.load_memberships(user.id).await?;
        let outcome = self.issue(&user, &organizations, &departments, Utc::now())?;
        info!(user_id = %user.id, "token refreshed");
        Ok(outcome)
    }

    /// Verify an access token and return its subject. Account state is
    /// not re-checked.
    pub fn validate_token(&self, access_token: &str) -> WardenResult<Uuid> {
        let claims = self
            .tokens
            .decode(access_token, TokenType::Access)
            .map_err(|e| {
                debug!(error = %e, "access token rejected");
                WardenError::InvalidToken
            })?;
        claims.subject().ok_or(WardenError::InvalidToken)
    }

    /// Describe a token of either type. Never fails.
    pub fn introspect(&self, token: &str) -> Introspection {
        match self.tokens.decode_any(token) {
            Ok(claims) => Introspection {
                active: true,
                sub: Some(claims.sub),
                username: Some(claims.username),
                email: Some(claims.email),
                organization_id: claims.org_id,
                token_type: Some(claims.token_type),
                iat: Some(claims.iat),
                exp: Some(claims.exp),
                nbf: Some(claims.nbf),
            },
            Err(e) => {
                debug!(error = %e, "introspected token is inactive");
                Introspection::default()
            }
        }
    }

    pub async fn register(&self, input: RegisterInput) -> WardenResult<User> {
        let email = input.email.trim().to_string();
        let username = input.username.trim().to_string();
        if email.is_empty() || username.is_empty() {
            return Err(WardenError::validation("email and username are required"));
        }
        if input.password.chars().count() < self.min_password_length {
            return Err(WardenError::validation(format!(
                "password must be at least {} characters long",
                self.min_password_length
            )));
        }

        if exists(self.users.get_by_email(&email).await)? {
            return Err(WardenError::AlreadyExists {
                entity: "email".into(),
            });
        }
        if exists(self.users.get_by_username(&username).await)? {
            return Err(WardenError::AlreadyExists {
                entity: "username".into(),
            });
        }

        let password_hash = self.passwords.hash_blocking(input.password).await?;
        let user = self
            .users
            .create(CreateUser {
                email,
                username,
                password_hash,
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                is_active: true,
                is_verified: false,
                is_super_admin: false,
            })
            .await?;
        info!(user_id = %user.id, "account registered");

        let Some(organization_id) = input.primary_organization_id else {
            return Ok(user);
        };
        self.memberships
            .assign_organization(user.id, organization_id, Role::unrestricted(), true)
            .await?;
        self.users.get_by_id(user.id).await
    }

    /// The `/me` projection.
    pub async fn user_info(&self, user_id: Uuid) -> WardenResult<UserInfo> {
        let user = self.users.get_by_id(user_id).await?;
        let (organizations, departments) = self.load_memberships(user.id).await?;
        Ok(UserInfo::compose(&user, &organizations, &departments))
    }

    pub async fn list_users(
        &self,
        pagination: Pagination,
    ) -> WardenResult<PaginatedResult<UserInfo>> {
        let page = self.users.list(pagination).await?;
        let mut items = Vec::with_capacity(page.items.len());
        for user in &page.items {
            let (organizations, departments) = self.load_memberships(user.id).await?;
            items.push(UserInfo::compose(user, &organizations, &departments));
        }
        Ok(PaginatedResult {
            items,
            total: page.total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    /// Administrative unlock: clears the attempt counter and the lock.
    pub async fn unlock_account(&self, user_id: Uuid) -> WardenResult<()> {
        self.users.clear_lockout(user_id).await?;
        info!(%user_id, "account unlocked");
        Ok(())
    }

    async fn record_failure(&self, user: &User, now: DateTime<Utc>) -> WardenResult<()> {
        let attempts = self.users.increment_login_attempts(user.id).await?;
        warn!(user_id = %user.id, attempts, "failed login attempt");

        if let Some(until) = self.lockout.on_failure(attempts, now) {
            self.users.set_locked_until(user.id, until).await?;
            warn!(user_id = %user.id, attempts, %until, "account locked");
        }
        Ok(())
    }

    async fn load_memberships(
        &self,
        user_id: Uuid,
    ) -> WardenResult<(Vec<OrganizationMembership>, Vec<DepartmentMembership>)> {
        let organizations = self.memberships.list_user_organizations(user_id).await?;
        let departments = self.memberships.list_user_departments(user_id).await?;
        Ok((organizations, departments))
    }

    fn issue(
        &self,
        user: &User,
        organizations: &[OrganizationMembership],
        departments: &[DepartmentMembership],
        now: DateTime<Utc>,
    ) -> WardenResult<AuthOutcome> {
        let access = self
            .claims
            .compose(TokenType::Access, user, organizations, departments, now);
        let refresh = self
            .claims
            .compose(TokenType::Refresh, user, organizations, departments, now);

        Ok(AuthOutcome {
            access_token: self.tokens.encode(&access)?,
            refresh_token: self.tokens.encode(&refresh)?,
            expires_in: self.access_lifetime_secs,
            token_type: "Bearer",
            user: UserInfo::compose(user, organizations, departments),
            logged_organization: None,
            logged_department: None,
        })
    }
}

fn exists(lookup: WardenResult<User>) -> WardenResult<bool> {
    match lookup {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found("user") => Ok(false),
        Err(e) => Err(e),
    }
}

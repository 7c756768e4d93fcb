//! SurrealDB implementation of [`UserRepository`].
//!
//! Accounts are soft-deleted: every lookup filters on
//! `deleted_at IS NONE`. A deleted account keeps its email and username,
//! so both stay reserved until the account is restored. Uniqueness is
//! checked before each write and backed by unique indexes.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::user::{CreateUser, UpdateUser, User};
use warden_core::repository::{PaginatedResult, Pagination, UserRepository};

use super::common::{CountRow, IdRow, parse_optional_uuid, parse_uuid, single, write_error};
use crate::error::DbError;

/// Unique indexes on the account identifiers.
const IDENTITY_INDEXES: &[(&str, &str)] =
    &[("idx_user_email", "email"), ("idx_user_username", "username")];

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    email: String,
    username: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    is_active: bool,
    is_verified: bool,
    is_super_admin: bool,
    mfa_enabled: bool,
    primary_organization_id: Option<String>,
    primary_department_id: Option<String>,
    login_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    email: String,
    username: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    is_active: bool,
    is_verified: bool,
    is_super_admin: bool,
    mfa_enabled: bool,
    primary_organization_id: Option<String>,
    primary_department_id: Option<String>,
    login_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AttemptsRow {
    login_attempts: u32,
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        Ok(User {
            id,
            email: self.email,
            username: self.username,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            is_active: self.is_active,
            is_verified: self.is_verified,
            is_super_admin: self.is_super_admin,
            mfa_enabled: self.mfa_enabled,
            primary_organization_id: parse_optional_uuid(self.primary_organization_id)?,
            primary_department_id: parse_optional_uuid(self.primary_department_id)?,
            login_attempts: self.login_attempts,
            locked_until: self.locked_until,
            last_login_at: self.last_login_at,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = parse_uuid(&self.record_id)?;
        UserRow {
            email: self.email,
            username: self.username,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            is_active: self.is_active,
            is_verified: self.is_verified,
            is_super_admin: self.is_super_admin,
            mfa_enabled: self.mfa_enabled,
            primary_organization_id: self.primary_organization_id,
            primary_department_id: self.primary_department_id,
            login_attempts: self.login_attempts,
            locked_until: self.locked_until,
            last_login_at: self.last_login_at,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_user(id)
    }
}

/// SurrealDB implementation of the credential store.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_one(&self, filter: &str, value: &str) -> Result<Option<User>, DbError> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM user \
             WHERE ({filter}) AND deleted_at IS NONE \
             ORDER BY created_at ASC LIMIT 1"
        );
        let mut result = self
            .db
            .query(&query)
            .bind(("value", value.to_string()))
            .await?;

        let rows: Vec<UserRowWithId> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(UserRowWithId::try_into_user)
            .transpose()
    }

    /// Reject identifiers held by any other account, deleted or not.
    async fn ensure_unique(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        except: Option<Uuid>,
    ) -> Result<(), DbError> {
        let checks = [("email", email), ("username", username)];
        for (field, value) in checks {
            let Some(value) = value else { continue };
            let query = format!(
                "SELECT meta::id(id) AS record_id FROM user WHERE {field} = $value"
            );
            let mut result = self
                .db
                .query(&query)
                .bind(("value", value.to_string()))
                .await?;
            let rows: Vec<IdRow> = result.take(0)?;

            let except = except.map(|id| id.to_string());
            if rows.iter().any(|row| Some(&row.record_id) != except.as_ref()) {
                return Err(DbError::AlreadyExists {
                    entity: field.into(),
                });
            }
        }
        Ok(())
    }

    /// Run a lockout-state update and confirm the account exists.
    async fn update_security_state(
        &self,
        id: Uuid,
        query: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<u32, DbError> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("at", at))
            .await?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AttemptsRow> = result.take(0)?;
        Ok(single(rows, "user", id_str)?.login_attempts)
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> WardenResult<User> {
        self.ensure_unique(Some(&input.email), Some(&input.username), None)
            .await?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 email = $email, username = $username, \
                 password_hash = $password_hash, \
                 first_name = $first_name, last_name = $last_name, \
                 is_active = $is_active, is_verified = $is_verified, \
                 is_super_admin = $is_super_admin, \
                 mfa_enabled = false, login_attempts = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", input.email))
            .bind(("username", input.username))
            .bind(("password_hash", input.password_hash))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("is_active", input.is_active))
            .bind(("is_verified", input.is_verified))
            .bind(("is_super_admin", input.is_super_admin))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| write_error(e.to_string(), IDENTITY_INDEXES))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, "user", id_str)?.into_user(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('user', $id) \
                 WHERE deleted_at IS NONE",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, "user", id_str)?.into_user(id)?)
    }

    async fn get_by_email(&self, email: &str) -> WardenResult<User> {
        self.find_one("email = $value", email)
            .await?
            .ok_or_else(|| DbError::not_found("user", format!("email={email}")).into())
    }

    async fn get_by_username(&self, username: &str) -> WardenResult<User> {
        self.find_one("username = $value", username)
            .await?
            .ok_or_else(|| DbError::not_found("user", format!("username={username}")).into())
    }

    async fn get_by_email_or_username(&self, identifier: &str) -> WardenResult<User> {
        self.find_one("email = $value OR username = $value", identifier)
            .await?
            .ok_or_else(|| DbError::not_found("user", format!("identifier={identifier}")).into())
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> WardenResult<User> {
        self.ensure_unique(input.email.as_deref(), input.username.as_deref(), Some(id))
            .await?;

        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.username.is_some() {
            sets.push("username = $username");
        }
        if input.password_hash.is_some() {
            sets.push("password_hash = $password_hash");
        }
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if input.is_verified.is_some() {
            sets.push("is_verified = $is_verified");
        }
        if input.is_super_admin.is_some() {
            sets.push("is_super_admin = $is_super_admin");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {} \
             WHERE deleted_at IS NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(username) = input.username {
            builder = builder.bind(("username", username));
        }
        if let Some(password_hash) = input.password_hash {
            builder = builder.bind(("password_hash", password_hash));
        }
        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(is_verified) = input.is_verified {
            builder = builder.bind(("is_verified", is_verified));
        }
        if let Some(is_super_admin) = input.is_super_admin {
            builder = builder.bind(("is_super_admin", is_super_admin));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| write_error(e.to_string(), IDENTITY_INDEXES))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, "user", id_str)?.into_user(id)?)
    }

    async fn increment_login_attempts(&self, id: Uuid) -> WardenResult<u32> {
        // Single statement: concurrent failures each observe their own count.
        Ok(self
            .update_security_state(
                id,
                "UPDATE type::record('user', $id) SET \
                 login_attempts += 1, updated_at = time::now() \
                 WHERE deleted_at IS NONE",
                None,
            )
            .await?)
    }

    async fn set_locked_until(&self, id: Uuid, until: DateTime<Utc>) -> WardenResult<()> {
        self.update_security_state(
            id,
            "UPDATE type::record('user', $id) SET \
             locked_until = $at, updated_at = time::now() \
             WHERE deleted_at IS NONE",
            Some(until),
        )
        .await?;
        Ok(())
    }

    async fn clear_lockout(&self, id: Uuid) -> WardenResult<()> {
        self.update_security_state(
            id,
            "UPDATE type::record('user', $id) SET \
             login_attempts = 0, locked_until = NONE, updated_at = time::now() \
             WHERE deleted_at IS NONE",
            None,
        )
        .await?;
        Ok(())
    }

    async fn record_successful_login(&self, id: Uuid, at: DateTime<Utc>) -> WardenResult<()> {
        self.update_security_state(
            id,
            "UPDATE type::record('user', $id) SET \
             login_attempts = 0, locked_until = NONE, \
             last_login_at = $at, updated_at = time::now() \
             WHERE deleted_at IS NONE",
            Some(at),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> WardenResult<()> {
        // Existence check first so deleting twice reports NotFound.
        self.get_by_id(id).await?;

        self.db
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE type::record('user', $id) SET \
                 deleted_at = time::now(), is_active = false, \
                 primary_organization_id = NONE, primary_department_id = NONE, \
                 updated_at = time::now(); \
                 DELETE user_organization WHERE user_id = $id; \
                 DELETE user_department WHERE user_id = $id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn restore_by_email(&self, email: &str) -> WardenResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM user \
                 WHERE email = $email AND deleted_at IS NOT NONE LIMIT 1",
            )
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
        let row = single(rows, "user", format!("deleted email={email}"))?;

        self.db
            .query(
                "UPDATE type::record('user', $id) SET \
                 deleted_at = NONE, is_active = true, \
                 login_attempts = 0, locked_until = NONE, \
                 updated_at = time::now()",
            )
            .bind(("id", row.record_id.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        self.get_by_id(parse_uuid(&row.record_id)?).await
    }

    async fn list(&self, pagination: Pagination) -> WardenResult<PaginatedResult<User>> {
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM user \
                 WHERE deleted_at IS NONE GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE deleted_at IS NONE \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(UserRowWithId::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

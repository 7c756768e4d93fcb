//! SurrealDB implementation of [`MembershipRepository`].
//!
//! Organization and department memberships share one storage shape:
//! a row keyed `<user>_<unit>` in `user_organization` or
//! `user_department`, plus the matching denormalized primary column on
//! the `user` record. Every write that can touch a primary flag runs
//! inside one SurrealDB transaction together with the user update.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::department::Department;
use warden_core::models::membership::{DepartmentMembership, OrganizationMembership};
use warden_core::models::organization::Organization;
use warden_core::models::role::Role;
use warden_core::repository::MembershipRepository;

use super::common::{membership_key, parse_uuid, single};
use super::department::{DepartmentRowWithId, SELECT_DEPARTMENT};
use super::organization::{OrganizationRowWithId, SELECT_ORGANIZATION};
use crate::error::DbError;

/// Storage coordinates of one membership type.
struct MembershipKind {
    table: &'static str,
    unit_column: &'static str,
    primary_column: &'static str,
    entity: &'static str,
}

const ORGANIZATION: MembershipKind = MembershipKind {
    table: "user_organization",
    unit_column: "organization_id",
    primary_column: "primary_organization_id",
    entity: "organization_membership",
};

const DEPARTMENT: MembershipKind = MembershipKind {
    table: "user_department",
    unit_column: "department_id",
    primary_column: "primary_department_id",
    entity: "department_membership",
};

impl MembershipKind {
    fn select(&self) -> String {
        format!(
            "SELECT user_id, {unit} AS unit_id, role, is_primary, created_at, updated_at \
             FROM {table}",
            unit = self.unit_column,
            table = self.table,
        )
    }

    fn assign(&self, is_primary: bool) -> String {
        let (clear_others, publish) = if is_primary {
            (
                format!(
                    "UPDATE {table} SET is_primary = false, updated_at = time::now() \
                     WHERE user_id = $user_id AND is_primary = true \
                     AND {unit} != $unit_id;",
                    table = self.table,
                    unit = self.unit_column,
                ),
                format!(
                    "UPDATE type::record('user', $user_id) SET \
                     {primary} = $unit_id, updated_at = time::now();",
                    primary = self.primary_column,
                ),
            )
        } else {
            (String::new(), self.unpublish())
        };

        format!(
            "BEGIN TRANSACTION; \
             {clear_others} \
             UPSERT type::record('{table}', $key) SET \
             user_id = $user_id, {unit} = $unit_id, role = $role, \
             is_primary = $is_primary, updated_at = time::now(); \
             {publish} \
             COMMIT TRANSACTION;",
            table = self.table,
            unit = self.unit_column,
        )
    }

    fn remove(&self) -> String {
        format!(
            "BEGIN TRANSACTION; \
             DELETE type::record('{table}', $key); \
             {unpublish} \
             COMMIT TRANSACTION;",
            table = self.table,
            unpublish = self.unpublish(),
        )
    }

    fn clear_primary(&self) -> String {
        format!(
            "BEGIN TRANSACTION; \
             UPDATE {table} SET is_primary = false, updated_at = time::now() \
             WHERE user_id = $user_id AND is_primary = true; \
             UPDATE type::record('user', $user_id) SET \
             {primary} = NONE, updated_at = time::now(); \
             COMMIT TRANSACTION;",
            table = self.table,
            primary = self.primary_column,
        )
    }

    /// Clears the account's primary reference if it points at `$unit_id`.
    fn unpublish(&self) -> String {
        format!(
            "UPDATE type::record('user', $user_id) SET \
             {primary} = NONE, updated_at = time::now() \
             WHERE {primary} = $unit_id;",
            primary = self.primary_column,
        )
    }
}

#[derive(Debug, SurrealValue)]
struct MembershipRow {
    user_id: String,
    unit_id: String,
    role: String,
    is_primary: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A decoded row before its unit is resolved.
struct Membership {
    user_id: Uuid,
    unit_id: Uuid,
    role: Role,
    is_primary: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MembershipRow {
    fn decode(self) -> Result<Membership, DbError> {
        Ok(Membership {
            user_id: parse_uuid(&self.user_id)?,
            unit_id: parse_uuid(&self.unit_id)?,
            role: Role::from(self.role),
            is_primary: self.is_primary,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl Membership {
    fn into_organization(self, organization: Option<Organization>) -> OrganizationMembership {
        OrganizationMembership {
            user_id: self.user_id,
            organization_id: self.unit_id,
            role: self.role,
            is_primary: self.is_primary,
            organization,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn into_department(self, department: Option<Department>) -> DepartmentMembership {
        DepartmentMembership {
            user_id: self.user_id,
            department_id: self.unit_id,
            role: self.role,
            is_primary: self.is_primary,
            department,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// SurrealDB implementation of the membership half of the store.
#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn write(
        &self,
        query: &str,
        user_id: Uuid,
        unit_id: Uuid,
        extra: Option<(Role, bool)>,
    ) -> Result<(), DbError> {
        let mut builder = self
            .db
            .query(query)
            .bind(("key", membership_key(user_id, unit_id)))
            .bind(("user_id", user_id.to_string()))
            .bind(("unit_id", unit_id.to_string()));
        if let Some((role, is_primary)) = extra {
            builder = builder
                .bind(("role", role.as_str().to_string()))
                .bind(("is_primary", is_primary));
        }

        builder
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    async fn find(
        &self,
        kind: &MembershipKind,
        user_id: Uuid,
        unit_id: Uuid,
    ) -> Result<Membership, DbError> {
        let query = format!(
            "{} WHERE user_id = $user_id AND {} = $unit_id",
            kind.select(),
            kind.unit_column,
        );
        let mut result = self
            .db
            .query(&query)
            .bind(("user_id", user_id.to_string()))
            .bind(("unit_id", unit_id.to_string()))
            .await?;

        let rows: Vec<MembershipRow> = result.take(0)?;
        single(rows, kind.entity, membership_key(user_id, unit_id))?.decode()
    }

    async fn list(&self, kind: &MembershipKind, user_id: Uuid) -> Result<Vec<Membership>, DbError> {
        let query = format!(
            "{} WHERE user_id = $user_id ORDER BY is_primary DESC, updated_at DESC",
            kind.select(),
        );
        let mut result = self
            .db
            .query(&query)
            .bind(("user_id", user_id.to_string()))
            .await?;

        let rows: Vec<MembershipRow> = result.take(0)?;
        rows.into_iter().map(MembershipRow::decode).collect()
    }

    async fn organizations_by_id(
        &self,
        ids: Vec<String>,
    ) -> Result<HashMap<Uuid, Organization>, DbError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let query =
            format!("{SELECT_ORGANIZATION} WHERE meta::id(id) IN $ids AND deleted_at IS NONE");
        let mut result = self.db.query(&query).bind(("ids", ids)).await?;
        let rows: Vec<OrganizationRowWithId> = result.take(0)?;
        rows.into_iter()
            .map(|row| row.try_into_organization().map(|org| (org.id, org)))
            .collect()
    }

    async fn departments_by_id(
        &self,
        ids: Vec<String>,
    ) -> Result<HashMap<Uuid, Department>, DbError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let query = format!("{SELECT_DEPARTMENT} WHERE meta::id(id) IN $ids");
        let mut result = self.db.query(&query).bind(("ids", ids)).await?;
        let rows: Vec<DepartmentRowWithId> = result.take(0)?;
        rows.into_iter()
            .map(|row| row.try_into_department().map(|dept| (dept.id, dept)))
            .collect()
    }

    async fn resolve_organizations(
        &self,
        memberships: Vec<Membership>,
    ) -> Result<Vec<OrganizationMembership>, DbError> {
        let ids = memberships.iter().map(|m| m.unit_id.to_string()).collect();
        let mut units = self.organizations_by_id(ids).await?;
        Ok(memberships
            .into_iter()
            .map(|m| {
                let unit = units.remove(&m.unit_id);
                m.into_organization(unit)
            })
            .collect())
    }

    async fn resolve_departments(
        &self,
        memberships: Vec<Membership>,
    ) -> Result<Vec<DepartmentMembership>, DbError> {
        let ids = memberships.iter().map(|m| m.unit_id.to_string()).collect();
        let mut units = self.departments_by_id(ids).await?;
        Ok(memberships
            .into_iter()
            .map(|m| {
                let unit = units.remove(&m.unit_id);
                m.into_department(unit)
            })
            .collect())
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn assign_organization(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        role: Role,
        is_primary: bool,
    ) -> WardenResult<OrganizationMembership> {
        self.write(
            &ORGANIZATION.assign(is_primary),
            user_id,
            organization_id,
            Some((role, is_primary)),
        )
        .await?;
        debug!(%user_id, %organization_id, is_primary, "Organization membership written");

        self.get_organization_membership(user_id, organization_id)
            .await
    }

    async fn assign_department(
        &self,
        user_id: Uuid,
        department_id: Uuid,
        role: Role,
        is_primary: bool,
    ) -> WardenResult<DepartmentMembership> {
        self.write(
            &DEPARTMENT.assign(is_primary),
            user_id,
            department_id,
            Some((role, is_primary)),
        )
        .await?;
        debug!(%user_id, %department_id, is_primary, "Department membership written");

        self.get_department_membership(user_id, department_id).await
    }

    async fn get_organization_membership(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> WardenResult<OrganizationMembership> {
        let membership = self.find(&ORGANIZATION, user_id, organization_id).await?;
        let mut resolved = self.resolve_organizations(vec![membership]).await?;
        Ok(resolved.remove(0))
    }

    async fn get_department_membership(
        &self,
        user_id: Uuid,
        department_id: Uuid,
    ) -> WardenResult<DepartmentMembership> {
        let membership = self.find(&DEPARTMENT, user_id, department_id).await?;
        let mut resolved = self.resolve_departments(vec![membership]).await?;
        Ok(resolved.remove(0))
    }

    async fn list_user_organizations(
        &self,
        user_id: Uuid,
    ) -> WardenResult<Vec<OrganizationMembership>> {
        let memberships = self.list(&ORGANIZATION, user_id).await?;
        Ok(self.resolve_organizations(memberships).await?)
    }

    async fn list_user_departments(
        &self,
        user_id: Uuid,
    ) -> WardenResult<Vec<DepartmentMembership>> {
        let memberships = self.list(&DEPARTMENT, user_id).await?;
        Ok(self.resolve_departments(memberships).await?)
    }

    async fn remove_organization(&self, user_id: Uuid, organization_id: Uuid) -> WardenResult<()> {
        self.find(&ORGANIZATION, user_id, organization_id).await?;
        self.write(&ORGANIZATION.remove(), user_id, organization_id, None)
            .await?;
        Ok(())
    }

    async fn remove_department(&self, user_id: Uuid, department_id: Uuid) -> WardenResult<()> {
        self.find(&DEPARTMENT, user_id, department_id).await?;
        self.write(&DEPARTMENT.remove(), user_id, department_id, None)
            .await?;
        Ok(())
    }

    async fn clear_primary_organizations(&self, user_id: Uuid) -> WardenResult<()> {
        self.db
            .query(ORGANIZATION.clear_primary())
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    async fn clear_primary_departments(&self, user_id: Uuid) -> WardenResult<()> {
        self.db
            .query(DEPARTMENT.clear_primary())
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_assign_clears_others_inside_the_transaction() {
        let sql = ORGANIZATION.assign(true);
        let begin = sql.find("BEGIN TRANSACTION").unwrap();
        let clear = sql.find("SET is_primary = false").unwrap();
        let upsert = sql.find("UPSERT").unwrap();
        let publish = sql.find("primary_organization_id = $unit_id").unwrap();
        let commit = sql.find("COMMIT TRANSACTION").unwrap();
        assert!(begin < clear && clear < upsert && upsert < publish && publish < commit);
    }

    #[test]
    fn non_primary_assign_only_unpublishes_matching_unit() {
        let sql = DEPARTMENT.assign(false);
        assert!(!sql.contains("is_primary = true"));
        assert!(sql.contains("WHERE primary_department_id = $unit_id"));
    }
}

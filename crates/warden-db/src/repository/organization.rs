//! SurrealDB implementation of [`OrganizationRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::organization::{CreateOrganization, Organization, UpdateOrganization};
use warden_core::repository::{OrganizationRepository, PaginatedResult, Pagination};

use super::common::{CountRow, parse_optional_uuid, parse_uuid, single, write_error};
use crate::error::DbError;

pub(crate) const SELECT_ORGANIZATION: &str =
    "SELECT meta::id(id) AS record_id, * FROM organization";

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct OrganizationRow {
    name: String,
    description: String,
    domain: Option<String>,
    is_active: bool,
    parent_id: Option<String>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(crate) struct OrganizationRowWithId {
    record_id: String,
    name: String,
    description: String,
    domain: Option<String>,
    is_active: bool,
    parent_id: Option<String>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRow {
    fn into_organization(self, id: Uuid) -> Result<Organization, DbError> {
        Ok(Organization {
            id,
            name: self.name,
            description: self.description,
            domain: self.domain,
            is_active: self.is_active,
            parent_id: parse_optional_uuid(self.parent_id)?,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl OrganizationRowWithId {
    pub(crate) fn try_into_organization(self) -> Result<Organization, DbError> {
        Ok(Organization {
            id: parse_uuid(&self.record_id)?,
            name: self.name,
            description: self.description,
            domain: self.domain,
            is_active: self.is_active,
            parent_id: parse_optional_uuid(self.parent_id)?,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Unique index guarding organization domains, including soft-deleted ones.
const DOMAIN_INDEX: &[(&str, &str)] = &[("idx_organization_domain", "organization domain")];

/// Empty domains are stored as NONE so they never collide.
fn normalize_domain(domain: Option<String>) -> Option<String> {
    domain.filter(|d| !d.trim().is_empty())
}

/// SurrealDB implementation of the Organization repository.
#[derive(Clone)]
pub struct SurrealOrganizationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrganizationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn select_many(
        &self,
        filter: &str,
        value: String,
    ) -> Result<Vec<Organization>, DbError> {
        let query = format!(
            "{SELECT_ORGANIZATION} WHERE ({filter}) AND deleted_at IS NONE \
             ORDER BY created_at ASC"
        );
        let mut result = self.db.query(&query).bind(("value", value)).await?;
        let rows: Vec<OrganizationRowWithId> = result.take(0)?;
        rows.into_iter()
            .map(OrganizationRowWithId::try_into_organization)
            .collect()
    }
}

impl<C: Connection> OrganizationRepository for SurrealOrganizationRepository<C> {
    async fn create(&self, input: CreateOrganization) -> WardenResult<Organization> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('organization', $id) SET \
                 name = $name, description = $description, \
                 domain = $domain, is_active = $is_active, \
                 parent_id = $parent_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("domain", normalize_domain(input.domain)))
            .bind(("is_active", input.is_active))
            .bind(("parent_id", input.parent_id.map(|p| p.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| write_error(e.to_string(), DOMAIN_INDEX))?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, "organization", id_str)?.into_organization(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Organization> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('organization', $id) \
                 WHERE deleted_at IS NONE",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, "organization", id_str)?.into_organization(id)?)
    }

    async fn get_by_domain(&self, domain: &str) -> WardenResult<Organization> {
        let rows = self.select_many("domain = $value", domain.to_string()).await?;
        Ok(single(rows, "organization", format!("domain={domain}"))?)
    }

    async fn get_by_name(&self, name: &str) -> WardenResult<Organization> {
        let rows = self.select_many("name = $value", name.to_string()).await?;
        Ok(single(rows, "organization", format!("name={name}"))?)
    }

    async fn update(&self, id: Uuid, input: UpdateOrganization) -> WardenResult<Organization> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.domain.is_some() {
            sets.push("domain = $domain");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('organization', $id) SET {} \
             WHERE deleted_at IS NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(domain) = input.domain {
            builder = builder.bind(("domain", normalize_domain(Some(domain))));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| write_error(e.to_string(), DOMAIN_INDEX))?;

        let rows: Vec<OrganizationRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, "organization", id_str)?.into_organization(id)?)
    }

    async fn list(&self, pagination: Pagination) -> WardenResult<PaginatedResult<Organization>> {
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM organization \
                 WHERE deleted_at IS NONE GROUP ALL",
            )
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let query = format!(
            "{SELECT_ORGANIZATION} WHERE deleted_at IS NONE \
             ORDER BY created_at ASC LIMIT $limit START $offset"
        );
        let mut result = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(OrganizationRowWithId::try_into_organization)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_children(&self, parent_id: Uuid) -> WardenResult<Vec<Organization>> {
        Ok(self
            .select_many("parent_id = $value", parent_id.to_string())
            .await?)
    }
}

//! SurrealDB implementation of [`DepartmentRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::department::{CreateDepartment, Department, DepartmentKind};
use warden_core::repository::DepartmentRepository;

use super::common::{parse_optional_uuid, parse_uuid, single};
use crate::error::DbError;

pub(crate) const SELECT_DEPARTMENT: &str = "SELECT meta::id(id) AS record_id, * FROM department";

#[derive(Debug, SurrealValue)]
pub(crate) struct DepartmentRowWithId {
    record_id: String,
    organization_id: String,
    parent_id: Option<String>,
    code: Option<String>,
    name: String,
    kind: String,
    description: String,
    function: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DepartmentRowWithId {
    pub(crate) fn try_into_department(self) -> Result<Department, DbError> {
        let kind = self
            .kind
            .parse::<DepartmentKind>()
            .map_err(DbError::Decode)?;
        Ok(Department {
            id: parse_uuid(&self.record_id)?,
            organization_id: parse_uuid(&self.organization_id)?,
            parent_id: parse_optional_uuid(self.parent_id)?,
            code: self.code,
            name: self.name,
            kind,
            description: self.description,
            function: self.function,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealDepartmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDepartmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn select(&self, filter: &str, value: String) -> Result<Vec<Department>, DbError> {
        let query = format!("{SELECT_DEPARTMENT} WHERE {filter} ORDER BY created_at ASC");
        let mut result = self.db.query(&query).bind(("value", value)).await?;
        let rows: Vec<DepartmentRowWithId> = result.take(0)?;
        rows.into_iter()
            .map(DepartmentRowWithId::try_into_department)
            .collect()
    }
}

impl<C: Connection> DepartmentRepository for SurrealDepartmentRepository<C> {
    async fn create(&self, input: CreateDepartment) -> WardenResult<Department> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        self.db
            .query(
                "CREATE type::record('department', $id) SET \
                 organization_id = $organization_id, parent_id = $parent_id, \
                 code = $code, name = $name, kind = $kind, \
                 description = $description, function = $function, \
                 is_active = $is_active",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", input.organization_id.to_string()))
            .bind(("parent_id", input.parent_id.map(|p| p.to_string())))
            .bind(("code", input.code))
            .bind(("name", input.name))
            .bind(("kind", input.kind.as_str().to_string()))
            .bind(("description", input.description))
            .bind(("function", input.function))
            .bind(("is_active", input.is_active))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Department> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('department', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DepartmentRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, "department", id)?.try_into_department()?)
    }

    async fn list_by_organization(&self, organization_id: Uuid) -> WardenResult<Vec<Department>> {
        Ok(self
            .select("organization_id = $value", organization_id.to_string())
            .await?)
    }

    async fn list_children(&self, parent_id: Uuid) -> WardenResult<Vec<Department>> {
        Ok(self
            .select("parent_id = $value", parent_id.to_string())
            .await?)
    }
}

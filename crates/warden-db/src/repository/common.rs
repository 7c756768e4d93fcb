//! Row decoding helpers shared by the repositories.

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for queries that only need the record key.
#[derive(Debug, SurrealValue)]
pub(crate) struct IdRow {
    pub record_id: String,
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub total: u64,
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid UUID {value:?}: {e}")))
}

pub(crate) fn parse_optional_uuid(value: Option<String>) -> Result<Option<Uuid>, DbError> {
    value.as_deref().map(parse_uuid).transpose()
}

/// First row of a result set, or `NotFound`.
pub(crate) fn single<T>(rows: Vec<T>, entity: &str, id: impl ToString) -> Result<T, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::not_found(entity, id))
}

/// Classify a rejected write. A violation of one of the `unique`
/// `(index, entity)` pairs becomes `AlreadyExists { entity }`.
pub(crate) fn write_error(message: String, unique: &[(&str, &str)]) -> DbError {
    match unique.iter().find(|(index, _)| message.contains(index)) {
        Some((_, entity)) => DbError::AlreadyExists {
            entity: (*entity).into(),
        },
        None => DbError::Query(message),
    }
}

/// Record key of a membership row.
pub(crate) fn membership_key(user_id: Uuid, unit_id: Uuid) -> String {
    format!("{user_id}_{unit_id}")
}

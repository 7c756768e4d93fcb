//! Database-specific error types and conversions.

use warden_core::error::WardenError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    /// The connection could not be established; `stage` names the step.
    #[error("SurrealDB connection failed while {stage}: {source}")]
    Connect {
        stage: String,
        #[source]
        source: surrealdb::Error,
    },

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A statement was rejected by the engine (constraint, assertion or
    /// transaction failure).
    #[error("Query failed: {0}")]
    Query(String),

    /// A stored value could not be mapped back to a domain type.
    #[error("Corrupt record: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity}")]
    AlreadyExists { entity: String },
}

impl DbError {
    pub(crate) fn connect(stage: String, source: surrealdb::Error) -> Self {
        Self::Connect { stage, source }
    }

    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

impl From<DbError> for WardenError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => WardenError::NotFound { entity, id },
            DbError::AlreadyExists { entity } => WardenError::AlreadyExists { entity },
            other => WardenError::Database(other.to_string()),
        }
    }
}

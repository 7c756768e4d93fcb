//! Schema definitions and migration runner for SurrealDB.
//!
//! Tables are SCHEMAFULL. UUIDs are stored as strings, both as record
//! keys and as reference fields. Membership rows use the composite key
//! `<user>_<unit>` so an upsert can never produce a duplicate pair.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "accounts_and_units",
        sql: ACCOUNTS_AND_UNITS,
    },
    Migration {
        version: 2,
        name: "memberships",
        sql: MEMBERSHIPS,
    },
];

// -----------------------------------------------------------------------
// v1: accounts, organizations, departments
// -----------------------------------------------------------------------

const ACCOUNTS_AND_UNITS: &str = "\
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD first_name ON TABLE user TYPE string DEFAULT '';
DEFINE FIELD last_name ON TABLE user TYPE string DEFAULT '';
DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD is_verified ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD is_super_admin ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD mfa_enabled ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD primary_organization_id ON TABLE user TYPE option<string>;
DEFINE FIELD primary_department_id ON TABLE user TYPE option<string>;
DEFINE FIELD login_attempts ON TABLE user TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD locked_until ON TABLE user TYPE option<datetime>;
DEFINE FIELD last_login_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD deleted_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_username ON TABLE user COLUMNS username UNIQUE;

DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD description ON TABLE organization TYPE string DEFAULT '';
DEFINE FIELD domain ON TABLE organization TYPE option<string>;
DEFINE FIELD is_active ON TABLE organization TYPE bool DEFAULT true;
DEFINE FIELD parent_id ON TABLE organization TYPE option<string>;
DEFINE FIELD deleted_at ON TABLE organization TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_organization_domain ON TABLE organization COLUMNS domain UNIQUE;
DEFINE INDEX idx_organization_name ON TABLE organization COLUMNS name;
DEFINE INDEX idx_organization_parent ON TABLE organization COLUMNS parent_id;

DEFINE TABLE department SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE department TYPE string;
DEFINE FIELD parent_id ON TABLE department TYPE option<string>;
DEFINE FIELD code ON TABLE department TYPE option<string>;
DEFINE FIELD name ON TABLE department TYPE string;
DEFINE FIELD kind ON TABLE department TYPE string \
    ASSERT $value IN ['DEPARTMENT', 'DIVISION', 'TEAM'];
DEFINE FIELD description ON TABLE department TYPE string DEFAULT '';
DEFINE FIELD function ON TABLE department TYPE string DEFAULT '';
DEFINE FIELD is_active ON TABLE department TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE department TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE department TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_department_organization ON TABLE department \
    COLUMNS organization_id;
DEFINE INDEX idx_department_parent ON TABLE department COLUMNS parent_id;
";

// -----------------------------------------------------------------------
// v2: user <-> unit membership rows
// -----------------------------------------------------------------------

const MEMBERSHIPS: &str = "\
DEFINE TABLE user_organization SCHEMAFULL;
DEFINE FIELD user_id ON TABLE user_organization TYPE string;
DEFINE FIELD organization_id ON TABLE user_organization TYPE string;
DEFINE FIELD role ON TABLE user_organization TYPE string DEFAULT '';
DEFINE FIELD is_primary ON TABLE user_organization TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE user_organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user_organization TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_organization_pair ON TABLE user_organization \
    COLUMNS user_id, organization_id UNIQUE;
DEFINE INDEX idx_user_organization_user ON TABLE user_organization \
    COLUMNS user_id;

DEFINE TABLE user_department SCHEMAFULL;
DEFINE FIELD user_id ON TABLE user_department TYPE string;
DEFINE FIELD department_id ON TABLE user_department TYPE string;
DEFINE FIELD role ON TABLE user_department TYPE string DEFAULT '';
DEFINE FIELD is_primary ON TABLE user_department TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE user_department TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user_department TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_department_pair ON TABLE user_department \
    COLUMNS user_id, department_id UNIQUE;
DEFINE INDEX idx_user_department_user ON TABLE user_department \
    COLUMNS user_id;
";

/// Apply every migration newer than the recorded schema version.
///
/// Safe to call on every start; applied versions are tracked in the
/// `_migration` table.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "could not record v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    if let Some(latest) = MIGRATIONS.last() {
        info!(version = latest.version, "Schema up to date");
    }

    Ok(())
}

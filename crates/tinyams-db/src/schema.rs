//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. UUIDs are stored as strings. The
//! `person_index` table is derived data: only the person repository
//! writes to it, always inside the transaction that changes `person`.

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
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "roster_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Associations (global scope, one per tenant)
-- =======================================================================
DEFINE TABLE association SCHEMAFULL;
DEFINE FIELD name ON TABLE association TYPE string;
DEFINE FIELD email ON TABLE association TYPE string;
DEFINE FIELD username ON TABLE association TYPE string;
DEFINE FIELD password_hash ON TABLE association TYPE string;
DEFINE FIELD created_at ON TABLE association TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_association_username ON TABLE association \
    COLUMNS username UNIQUE;

-- =======================================================================
-- Persons (association scope)
-- =======================================================================
DEFINE TABLE person SCHEMAFULL;
DEFINE FIELD association_id ON TABLE person TYPE string;
DEFINE FIELD is_member ON TABLE person TYPE bool DEFAULT false;
DEFINE FIELD username ON TABLE person TYPE string;
DEFINE FIELD password_hash ON TABLE person TYPE string;
DEFINE FIELD first_name ON TABLE person TYPE string DEFAULT '';
DEFINE FIELD middle_name ON TABLE person TYPE string DEFAULT '';
DEFINE FIELD last_name ON TABLE person TYPE string DEFAULT '';
DEFINE FIELD email ON TABLE person TYPE string DEFAULT '';
DEFINE FIELD phone ON TABLE person TYPE string DEFAULT '';
DEFINE FIELD employer ON TABLE person TYPE string DEFAULT '';
DEFINE FIELD job_title ON TABLE person TYPE string DEFAULT '';
DEFINE FIELD created_at ON TABLE person TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_person_association ON TABLE person \
    COLUMNS association_id;

-- =======================================================================
-- Person search index (derived from person, written in the same
-- transaction as every person mutation)
-- =======================================================================
DEFINE TABLE person_index SCHEMAFULL;
DEFINE FIELD association_id ON TABLE person_index TYPE string;
DEFINE FIELD is_member ON TABLE person_index TYPE bool;
DEFINE FIELD username ON TABLE person_index TYPE string;
DEFINE FIELD first_name ON TABLE person_index TYPE string;
DEFINE FIELD middle_name ON TABLE person_index TYPE string;
DEFINE FIELD last_name ON TABLE person_index TYPE string;
DEFINE FIELD email ON TABLE person_index TYPE string;
DEFINE FIELD phone ON TABLE person_index TYPE string;
DEFINE FIELD employer ON TABLE person_index TYPE string;
DEFINE FIELD job_title ON TABLE person_index TYPE string;
DEFINE FIELD created_at ON TABLE person_index TYPE datetime;
DEFINE FIELD search_text ON TABLE person_index TYPE string;
DEFINE FIELD token_count ON TABLE person_index TYPE int;
DEFINE INDEX idx_person_index_association ON TABLE person_index \
    COLUMNS association_id;

-- =======================================================================
-- Login sessions (association scope)
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD association_id ON TABLE session TYPE string;
DEFINE FIELD token_hash ON TABLE session TYPE string;
DEFINE FIELD expires_at ON TABLE session TYPE datetime;
DEFINE FIELD created_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_session_token ON TABLE session \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_session_association ON TABLE session \
    COLUMNS association_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies each
/// migration whose version exceeds the current maximum. A migration and
/// its tracking row are committed together, so a failed migration leaves
/// no partial schema behind.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        let script = format!(
            "BEGIN TRANSACTION;\n{}\n\
             CREATE _migration SET version = $version, name = $name;\n\
             COMMIT TRANSACTION;",
            migration.sql
        );
        db.query(script)
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

//! Database-specific error types and conversions.

use tinyams_core::error::AmsError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Malformed row: {0}")]
    InvalidRow(String),

    #[error("Password hashing failed: {0}")]
    Credential(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for AmsError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => AmsError::NotFound { entity, id },
            DbError::Credential(msg) => AmsError::Crypto(msg),
            other => AmsError::Database(other.to_string()),
        }
    }
}

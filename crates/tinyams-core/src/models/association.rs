//! Association domain model.
//!
//! An association is the tenant: it owns a roster of persons and is the
//! account that logs in. Every person-facing operation is scoped to one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    pub id: Uuid,
    /// Display name shown on every page once logged in.
    pub name: String,
    pub email: String,
    /// Login name.
    pub username: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to register a new association.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAssociation {
    pub name: String,
    pub email: String,
    pub username: String,
    /// Raw password (will be hashed with Argon2id before storage).
    pub password: String,
}

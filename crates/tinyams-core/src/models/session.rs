//! Login session domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A server-side session binding an opaque token to an association.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub association_id: Uuid,
    /// SHA-256 of the raw token, hex-encoded. The raw token only ever
    /// lives on the client.
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSession {
    pub association_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

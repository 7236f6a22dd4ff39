//! SurrealDB implementation of [`AssociationRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tinyams_core::error::AmsResult;
use tinyams_core::models::association::{Association, CreateAssociation};
use tinyams_core::repository::AssociationRepository;
use tracing::info;
use uuid::Uuid;

use crate::credential::hash_password;
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct AssociationRow {
    name: String,
    email: String,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl AssociationRow {
    fn into_association(self, id: Uuid) -> Association {
        Association {
            id,
            name: self.name,
            email: self.email,
            username: self.username,
            password_hash: self.password_hash,
            created_at: self.created_at,
        }
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct AssociationRowWithId {
    record_id: String,
    name: String,
    email: String,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl AssociationRowWithId {
    fn try_into_association(self) -> Result<Association, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::InvalidRow(format!("invalid UUID: {e}")))?;
        Ok(Association {
            id,
            name: self.name,
            email: self.email,
            username: self.username,
            password_hash: self.password_hash,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Association repository.
#[derive(Clone)]
pub struct SurrealAssociationRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
}

impl<C: Connection> SurrealAssociationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }
}

impl<C: Connection> AssociationRepository for SurrealAssociationRepository<C> {
    async fn create(&self, input: CreateAssociation) -> AmsResult<Association> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;

        let result = self
            .db
            .query(
                "CREATE type::record('association', $id) SET \
                 name = $name, email = $email, \
                 username = $username, \
                 password_hash = $password_hash",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("email", input.email))
            .bind(("username", input.username))
            .bind(("password_hash", password_hash))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AssociationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "association".into(),
            id: id_str,
        })?;

        info!(association_id = %id, username = %row.username, "Association registered");
        Ok(row.into_association(id))
    }

    async fn get_by_id(&self, id: Uuid) -> AmsResult<Association> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('association', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssociationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "association".into(),
            id: id_str,
        })?;

        Ok(row.into_association(id))
    }

    async fn get_by_username(&self, username: &str) -> AmsResult<Association> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM association \
                 WHERE username = $username LIMIT 1",
            )
            .bind(("username", username.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssociationRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "association".into(),
            id: format!("username={username}"),
        })?;

        Ok(row.try_into_association()?)
    }
}

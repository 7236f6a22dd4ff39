//! Person (roster entry) domain model and its search projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A roster entry owned by exactly one association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub association_id: Uuid,
    pub is_member: bool,
    pub username: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub employer: String,
    pub job_title: String,
    pub created_at: DateTime<Utc>,
}

/// The mutable part of a person. Updates replace all of it at once.
///
/// Text fields the form left out are stored as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonFields {
    pub is_member: bool,
    pub username: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub employer: String,
    pub job_title: String,
}

/// Fields required to add a person to an association's roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePerson {
    pub association_id: Uuid,
    /// Raw password (will be hashed with Argon2id before storage).
    pub password: String,
    pub fields: PersonFields,
}

impl Person {
    /// The current values of the mutable fields.
    pub fn fields(&self) -> PersonFields {
        PersonFields {
            is_member: self.is_member,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            middle_name: self.middle_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            employer: self.employer.clone(),
            job_title: self.job_title.clone(),
        }
    }

    /// Copy of this person with `fields` applied.
    pub fn with_fields(&self, fields: PersonFields) -> Person {
        Person {
            is_member: fields.is_member,
            username: fields.username,
            first_name: fields.first_name,
            middle_name: fields.middle_name,
            last_name: fields.last_name,
            email: fields.email,
            phone: fields.phone,
            employer: fields.employer,
            job_title: fields.job_title,
            ..self.clone()
        }
    }
}

/// Search index projection of a [`Person`]: every field except the
/// password hash, keyed by the person id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonEntry {
    pub id: Uuid,
    pub association_id: Uuid,
    pub is_member: bool,
    pub username: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub employer: String,
    pub job_title: String,
    pub created_at: DateTime<Utc>,
}

impl PersonEntry {
    /// Values of the full-text indexed columns, in index order.
    pub fn indexed_text(&self) -> [&str; 8] {
        [
            &self.username,
            &self.first_name,
            &self.middle_name,
            &self.last_name,
            &self.email,
            &self.phone,
            &self.employer,
            &self.job_title,
        ]
    }
}

impl From<&Person> for PersonEntry {
    fn from(p: &Person) -> Self {
        Self {
            id: p.id,
            association_id: p.association_id,
            is_member: p.is_member,
            username: p.username.clone(),
            first_name: p.first_name.clone(),
            middle_name: p.middle_name.clone(),
            last_name: p.last_name.clone(),
            email: p.email.clone(),
            phone: p.phone.clone(),
            employer: p.employer.clone(),
            job_title: p.job_title.clone(),
            created_at: p.created_at,
        }
    }
}

/// One search result. `score` is `None` for unranked full listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub entry: PersonEntry,
    pub score: Option<f64>,
}

/// Roster totals shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonCounts {
    pub total: u64,
    pub members: u64,
    pub non_members: u64,
}

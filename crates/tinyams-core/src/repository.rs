//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Person operations take an
//! `association_id` and must never read or touch another association's
//! rows: a person owned by someone else is reported as `NotFound`,
//! exactly like a person that does not exist.

use uuid::Uuid;

use crate::error::AmsResult;
use crate::models::{
    association::{Association, CreateAssociation},
    person::{CreatePerson, Person, PersonCounts, PersonFields, SearchHit},
    session::{CreateSession, Session},
};

// ---------------------------------------------------------------------------
// Associations (global scope)
// ---------------------------------------------------------------------------

pub trait AssociationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateAssociation,
    ) -> impl Future<Output = AmsResult<Association>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = AmsResult<Association>> + Send;
    /// Zero matching rows is `NotFound`, never a fault.
    fn get_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = AmsResult<Association>> + Send;
}

// ---------------------------------------------------------------------------
// Persons (association-scoped)
// ---------------------------------------------------------------------------

/// Roster storage. Every mutation keeps the search index in step inside
/// the same transaction.
pub trait PersonRepository: Send + Sync {
    fn create(&self, input: CreatePerson) -> impl Future<Output = AmsResult<Person>> + Send;
    fn get_by_id(
        &self,
        association_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = AmsResult<Person>> + Send;
    /// Replace every mutable field of a person.
    fn update(
        &self,
        association_id: Uuid,
        id: Uuid,
        fields: PersonFields,
    ) -> impl Future<Output = AmsResult<Person>> + Send;
    /// Hard delete.
    fn delete(&self, association_id: Uuid, id: Uuid)
    -> impl Future<Output = AmsResult<()>> + Send;
    fn count(&self, association_id: Uuid) -> impl Future<Output = AmsResult<PersonCounts>> + Send;
    /// All persons of an association in storage (creation) order.
    fn list(&self, association_id: Uuid) -> impl Future<Output = AmsResult<Vec<Person>>> + Send;
}

/// Read side of the person search index.
pub trait PersonSearch: Send + Sync {
    /// Blank queries list everything unranked; anything else is one
    /// prefix unit ranked by relevance.
    fn search(
        &self,
        association_id: Uuid,
        raw_query: &str,
    ) -> impl Future<Output = AmsResult<Vec<SearchHit>>> + Send;
    /// Re-derive every index entry of an association from the roster.
    /// Returns the number of entries written.
    fn rebuild(&self, association_id: Uuid) -> impl Future<Output = AmsResult<usize>> + Send;
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = AmsResult<Session>> + Send;
    /// Look up by token hash. The token alone identifies the association.
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = AmsResult<Session>> + Send;
    /// Invalidate a single session. Missing sessions are not an error.
    fn invalidate(&self, id: Uuid) -> impl Future<Output = AmsResult<()>> + Send;
    /// Remove all expired sessions, returning how many were removed.
    fn cleanup_expired(&self) -> impl Future<Output = AmsResult<u64>> + Send;
}

//! Person search index.
//!
//! `person_index` mirrors the `person` table minus password hashes, plus
//! a normalised token stream used for prefix matching. It is never
//! written on its own: the person repository wraps each roster mutation
//! and the matching [`IndexAction`] in one transaction (see [`synced`]),
//! so the index holds exactly one entry per live person.
//!
//! Queries are answered by [`SurrealPersonSearch`]: SurrealDB narrows
//! the candidates to one association and to entries containing the
//! prefix unit, and [`rank`] orders them by BM25.
//!
//! SurrealDB's own full-text indexes split input into independently
//! matched terms; a query here is a single phrase-prefix unit, so
//! matching and scoring stay in this module.

pub mod rank;
pub mod text;

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tinyams_core::error::AmsResult;
use tinyams_core::models::person::{Person, PersonEntry, SearchHit};
use tinyams_core::repository::PersonSearch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::person::list_persons;
use rank::{Corpus, bm25};
pub use text::{IndexedText, PrefixQuery, tokenize};

/// How a person mutation affects its index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexAction {
    Insert,
    /// Retract the old entry completely, then insert the new one.
    Update,
    Delete,
}

const RETRACT: &str = "DELETE type::record('person_index', $id);";

const INSERT: &str = "\
CREATE type::record('person_index', $id) SET \
    association_id = $association_id, \
    is_member = $is_member, \
    username = $username, \
    first_name = $first_name, \
    middle_name = $middle_name, \
    last_name = $last_name, \
    email = $email, \
    phone = $phone, \
    employer = $employer, \
    job_title = $job_title, \
    created_at = $created_at, \
    search_text = $search_text, \
    token_count = $token_count;";

impl IndexAction {
    /// Index statements for the entry keyed by `$id`.
    ///
    /// Insert and update read the person's columns from the same bound
    /// parameters as the person statement, plus `$search_text` and
    /// `$token_count` from [`IndexedText`].
    pub fn statements(self) -> String {
        match self {
            Self::Insert => INSERT.to_string(),
            Self::Update => format!("{RETRACT}\n{INSERT}"),
            Self::Delete => RETRACT.to_string(),
        }
    }
}

/// Wrap a person statement and its index sync in a single transaction.
pub fn synced(person_statement: &str, action: IndexAction) -> String {
    format!(
        "BEGIN TRANSACTION;\n{person_statement}\n{}\nCOMMIT TRANSACTION;",
        action.statements()
    )
}

/// Re-derive an association's entries from a roster snapshot.
///
/// The snapshot is read outside the transaction, so the script checks it
/// against the live roster first: every snapshot person must still exist
/// with the same fields, and nobody may have been added. Otherwise the
/// transaction aborts and nothing changes.
const REBUILD: &str = "\
BEGIN TRANSACTION;
DELETE person_index WHERE association_id = $association_id;
FOR $e IN $entries {
    LET $current = (
        SELECT is_member, username, first_name, middle_name, last_name,
            email, phone, employer, job_title
        FROM type::record('person', $e.id)
        WHERE association_id = $association_id
    )[0];
    IF $current != $e.fields { THROW 'roster changed during rebuild' };
    CREATE type::record('person_index', $e.id) SET
        association_id = $association_id,
        is_member = $e.fields.is_member,
        username = $e.fields.username,
        first_name = $e.fields.first_name,
        middle_name = $e.fields.middle_name,
        last_name = $e.fields.last_name,
        email = $e.fields.email,
        phone = $e.fields.phone,
        employer = $e.fields.employer,
        job_title = $e.fields.job_title,
        created_at = <datetime> $e.created_at,
        search_text = $e.search_text,
        token_count = $e.token_count;
};
LET $live = (
    SELECT count() AS total FROM person
    WHERE association_id = $association_id GROUP ALL
)[0].total ?? 0;
IF $live != array::len($entries) { THROW 'roster changed during rebuild' };
COMMIT TRANSACTION;";

/// Snapshots that went stale are re-read this many times in total.
const REBUILD_ATTEMPTS: u32 = 3;

fn rebuild_entry(person: &Person) -> serde_json::Value {
    let entry = PersonEntry::from(person);
    let indexed = IndexedText::of(&entry);
    serde_json::json!({
        "id": entry.id.to_string(),
        "fields": {
            "is_member": entry.is_member,
            "username": entry.username,
            "first_name": entry.first_name,
            "middle_name": entry.middle_name,
            "last_name": entry.last_name,
            "email": entry.email,
            "phone": entry.phone,
            "employer": entry.employer,
            "job_title": entry.job_title,
        },
        "created_at": entry.created_at.to_rfc3339(),
        "search_text": indexed.search_text,
        "token_count": indexed.token_count,
    })
}

/// Replace an association's index entries with ones derived from
/// `persons`, failing if the roster no longer matches the snapshot.
pub(crate) async fn rebuild_from<C: Connection>(
    db: &Surreal<C>,
    association_id: Uuid,
    persons: &[Person],
) -> Result<(), DbError> {
    let entries: Vec<serde_json::Value> = persons.iter().map(rebuild_entry).collect();

    db.query(REBUILD)
        .bind(("association_id", association_id.to_string()))
        .bind(("entries", serde_json::Value::Array(entries)))
        .await?
        .check()
        .map_err(|e| DbError::Query(e.to_string()))?;

    Ok(())
}

#[derive(Debug, SurrealValue)]
struct IndexRow {
    record_id: String,
    association_id: String,
    is_member: bool,
    username: String,
    first_name: String,
    middle_name: String,
    last_name: String,
    email: String,
    phone: String,
    employer: String,
    job_title: String,
    created_at: DateTime<Utc>,
    search_text: String,
    token_count: u64,
}

impl IndexRow {
    fn try_into_entry(self) -> Result<PersonEntry, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::InvalidRow(format!("invalid UUID: {e}")))?;
        let association_id = Uuid::parse_str(&self.association_id)
            .map_err(|e| DbError::InvalidRow(format!("invalid association UUID: {e}")))?;
        Ok(PersonEntry {
            id,
            association_id,
            is_member: self.is_member,
            username: self.username,
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            employer: self.employer,
            job_title: self.job_title,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct StatsRow {
    total: u64,
    tokens: u64,
}

/// SurrealDB implementation of [`PersonSearch`].
#[derive(Clone)]
pub struct SurrealPersonSearch<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPersonSearch<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn list_entries(&self, association_id: Uuid) -> Result<Vec<SearchHit>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM person_index \
                 WHERE association_id = $association_id \
                 ORDER BY created_at ASC",
            )
            .bind(("association_id", association_id.to_string()))
            .await?;

        let rows: Vec<IndexRow> = result.take(0)?;
        rows.into_iter()
            .map(|row| {
                Ok(SearchHit {
                    entry: row.try_into_entry()?,
                    score: None,
                })
            })
            .collect()
    }

    async fn ranked(
        &self,
        association_id: Uuid,
        query: &PrefixQuery,
    ) -> Result<Vec<SearchHit>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total, math::sum(token_count) AS tokens \
                 FROM person_index \
                 WHERE association_id = $association_id GROUP ALL; \
                 SELECT meta::id(id) AS record_id, * FROM person_index \
                 WHERE association_id = $association_id \
                 AND string::contains(search_text, $needle) \
                 ORDER BY created_at ASC;",
            )
            .bind(("association_id", association_id.to_string()))
            .bind(("needle", query.needle()))
            .await?;

        let stats: Vec<StatsRow> = result.take(0)?;
        let candidates: Vec<IndexRow> = result.take(1)?;

        let corpus = stats
            .first()
            .map(|s| Corpus::from_totals(s.total, s.tokens))
            .unwrap_or(Corpus::from_totals(0, 0));
        let matching = candidates.len();

        let mut hits = candidates
            .into_iter()
            .filter_map(|row| {
                let tf = query.match_count(&row.search_text);
                (tf > 0).then(|| {
                    let score = bm25(tf, row.token_count, matching, corpus);
                    row.try_into_entry().map(|entry| SearchHit {
                        entry,
                        score: Some(score),
                    })
                })
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        // Stable: equal scores keep storage order.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        Ok(hits)
    }
}

impl<C: Connection> PersonSearch for SurrealPersonSearch<C> {
    async fn search(&self, association_id: Uuid, raw_query: &str) -> AmsResult<Vec<SearchHit>> {
        if raw_query.trim().is_empty() {
            return Ok(self.list_entries(association_id).await?);
        }

        let Some(query) = PrefixQuery::parse(raw_query) else {
            debug!(%association_id, "Search query has no searchable characters");
            return Ok(Vec::new());
        };

        let hits = self.ranked(association_id, &query).await?;
        debug!(%association_id, hits = hits.len(), "Ranked person search");
        Ok(hits)
    }

    async fn rebuild(&self, association_id: Uuid) -> AmsResult<usize> {
        let mut attempt = 1;
        loop {
            let persons = list_persons(&self.db, association_id).await?;
            match rebuild_from(&self.db, association_id, &persons).await {
                Ok(()) => {
                    info!(%association_id, entries = persons.len(), "Rebuilt person search index");
                    return Ok(persons.len());
                }
                Err(e) if attempt < REBUILD_ATTEMPTS => {
                    warn!(%association_id, attempt, error = %e, "Index rebuild aborted, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

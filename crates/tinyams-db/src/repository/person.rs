//! SurrealDB implementation of [`PersonRepository`].
//!
//! Every mutation runs as one transaction that changes `person` and
//! re-syncs `person_index` (see [`crate::search::synced`]). Update and
//! delete first confirm the person belongs to the calling association,
//! so a foreign id behaves exactly like a missing one. The write itself
//! checks again: if the person is gone by then, the script throws before
//! the index is touched.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tinyams_core::error::AmsResult;
use tinyams_core::models::person::{CreatePerson, Person, PersonCounts, PersonEntry, PersonFields};
use tinyams_core::repository::PersonRepository;
use tracing::info;
use uuid::Uuid;

use crate::credential::hash_password;
use crate::error::DbError;
use crate::search::{IndexAction, IndexedText, synced};

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct PersonRow {
    association_id: String,
    is_member: bool,
    username: String,
    password_hash: String,
    first_name: String,
    middle_name: String,
    last_name: String,
    email: String,
    phone: String,
    employer: String,
    job_title: String,
    created_at: DateTime<Utc>,
}

impl PersonRow {
    fn into_person(self, id: Uuid) -> Result<Person, DbError> {
        let association_id = Uuid::parse_str(&self.association_id)
            .map_err(|e| DbError::InvalidRow(format!("invalid association UUID: {e}")))?;
        Ok(Person {
            id,
            association_id,
            is_member: self.is_member,
            username: self.username,
            password_hash: self.password_hash,
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

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct PersonRowWithId {
    record_id: String,
    association_id: String,
    is_member: bool,
    username: String,
    password_hash: String,
    first_name: String,
    middle_name: String,
    last_name: String,
    email: String,
    phone: String,
    employer: String,
    job_title: String,
    created_at: DateTime<Utc>,
}

impl PersonRowWithId {
    fn try_into_person(self) -> Result<Person, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::InvalidRow(format!("invalid UUID: {e}")))?;
        PersonRow {
            association_id: self.association_id,
            is_member: self.is_member,
            username: self.username,
            password_hash: self.password_hash,
            first_name: self.first_name,
            middle_name: self.middle_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            employer: self.employer,
            job_title: self.job_title,
            created_at: self.created_at,
        }
        .into_person(id)
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

const INSERT_PERSON: &str = "\
CREATE type::record('person', $id) SET \
    association_id = $association_id, \
    is_member = $is_member, \
    username = $username, \
    password_hash = $password_hash, \
    first_name = $first_name, \
    middle_name = $middle_name, \
    last_name = $last_name, \
    email = $email, \
    phone = $phone, \
    employer = $employer, \
    job_title = $job_title, \
    created_at = $created_at;";

const UPDATE_PERSON: &str = "\
LET $person = (UPDATE type::record('person', $id) SET \
    is_member = $is_member, \
    username = $username, \
    first_name = $first_name, \
    middle_name = $middle_name, \
    last_name = $last_name, \
    email = $email, \
    phone = $phone, \
    employer = $employer, \
    job_title = $job_title \
    WHERE association_id = $association_id RETURN AFTER);
IF array::len($person) = 0 { THROW 'person no longer exists' };";

const DELETE_PERSON: &str = "\
LET $person = (DELETE type::record('person', $id) \
    WHERE association_id = $association_id RETURN BEFORE);
IF array::len($person) = 0 { THROW 'person no longer exists' };";

/// Run `script` with every column of `person` and its derived index
/// text bound as parameters.
async fn write_person<C: Connection>(
    db: &Surreal<C>,
    script: String,
    person: &Person,
) -> Result<(), DbError> {
    let indexed = IndexedText::of(&PersonEntry::from(person));

    db.query(script)
        .bind(("id", person.id.to_string()))
        .bind(("association_id", person.association_id.to_string()))
        .bind(("is_member", person.is_member))
        .bind(("username", person.username.clone()))
        .bind(("password_hash", person.password_hash.clone()))
        .bind(("first_name", person.first_name.clone()))
        .bind(("middle_name", person.middle_name.clone()))
        .bind(("last_name", person.last_name.clone()))
        .bind(("email", person.email.clone()))
        .bind(("phone", person.phone.clone()))
        .bind(("employer", person.employer.clone()))
        .bind(("job_title", person.job_title.clone()))
        .bind(("created_at", person.created_at))
        .bind(("search_text", indexed.search_text))
        .bind(("token_count", indexed.token_count))
        .await?
        .check()
        .map_err(|e| DbError::Query(e.to_string()))?;

    Ok(())
}

/// All persons of an association, oldest first.
pub(crate) async fn list_persons<C: Connection>(
    db: &Surreal<C>,
    association_id: Uuid,
) -> Result<Vec<Person>, DbError> {
    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * FROM person \
             WHERE association_id = $association_id \
             ORDER BY created_at ASC",
        )
        .bind(("association_id", association_id.to_string()))
        .await?;

    let rows: Vec<PersonRowWithId> = result.take(0)?;
    rows.into_iter().map(PersonRowWithId::try_into_person).collect()
}

/// SurrealDB implementation of the Person repository.
#[derive(Clone)]
pub struct SurrealPersonRepository<C: Connection> {
    db: Surreal<C>,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
}

impl<C: Connection> SurrealPersonRepository<C> {
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

impl<C: Connection> PersonRepository for SurrealPersonRepository<C> {
    async fn create(&self, input: CreatePerson) -> AmsResult<Person> {
        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;
        let fields = input.fields;

        let person = Person {
            id: Uuid::new_v4(),
            association_id: input.association_id,
            is_member: fields.is_member,
            username: fields.username,
            password_hash,
            first_name: fields.first_name,
            middle_name: fields.middle_name,
            last_name: fields.last_name,
            email: fields.email,
            phone: fields.phone,
            employer: fields.employer,
            job_title: fields.job_title,
            created_at: Utc::now(),
        };

        write_person(&self.db, synced(INSERT_PERSON, IndexAction::Insert), &person).await?;

        info!(
            association_id = %person.association_id,
            person_id = %person.id,
            "Person created"
        );
        Ok(person)
    }

    async fn get_by_id(&self, association_id: Uuid, id: Uuid) -> AmsResult<Person> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('person', $id) \
                 WHERE association_id = $association_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("association_id", association_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PersonRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "person".into(),
            id: id_str,
        })?;

        Ok(row.into_person(id)?)
    }

    async fn update(
        &self,
        association_id: Uuid,
        id: Uuid,
        fields: PersonFields,
    ) -> AmsResult<Person> {
        let current = self.get_by_id(association_id, id).await?;
        let person = current.with_fields(fields);

        let written =
            write_person(&self.db, synced(UPDATE_PERSON, IndexAction::Update), &person).await;
        if let Err(e) = written {
            // Vanished since the pre-read.
            self.get_by_id(association_id, id).await?;
            return Err(e.into());
        }

        info!(%association_id, person_id = %id, "Person updated");
        Ok(person)
    }

    async fn delete(&self, association_id: Uuid, id: Uuid) -> AmsResult<()> {
        let person = self.get_by_id(association_id, id).await?;

        let written =
            write_person(&self.db, synced(DELETE_PERSON, IndexAction::Delete), &person).await;
        if let Err(e) = written {
            // Vanished since the pre-read.
            self.get_by_id(association_id, id).await?;
            return Err(e.into());
        }

        info!(%association_id, person_id = %id, "Person deleted");
        Ok(())
    }

    async fn count(&self, association_id: Uuid) -> AmsResult<PersonCounts> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM person \
                 WHERE association_id = $association_id GROUP ALL; \
                 SELECT count() AS total FROM person \
                 WHERE association_id = $association_id AND is_member = true GROUP ALL;",
            )
            .bind(("association_id", association_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let total_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let member_rows: Vec<CountRow> = result.take(1).map_err(DbError::from)?;
        let total = total_rows.first().map(|r| r.total).unwrap_or(0);
        let members = member_rows.first().map(|r| r.total).unwrap_or(0);

        Ok(PersonCounts {
            total,
            members,
            non_members: total.saturating_sub(members),
        })
    }

    async fn list(&self, association_id: Uuid) -> AmsResult<Vec<Person>> {
        Ok(list_persons(&self.db, association_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use surrealdb::engine::local::{Db, Mem};
    use tinyams_core::error::AmsError;
    use tinyams_core::repository::PersonSearch;

    use super::*;
    use crate::search::SurrealPersonSearch;

    async fn setup() -> (Surreal<Db>, SurrealPersonRepository<Db>, Uuid) {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        crate::run_migrations(&db).await.unwrap();
        let repo = SurrealPersonRepository::new(db.clone());
        (db, repo, Uuid::new_v4())
    }

    async fn add(repo: &SurrealPersonRepository<Db>, aid: Uuid) -> Person {
        repo.create(CreatePerson {
            association_id: aid,
            password: "pw".into(),
            fields: PersonFields {
                username: "jdoe".into(),
                last_name: "Doe".into(),
                ..PersonFields::default()
            },
        })
        .await
        .unwrap()
    }

    async fn index_is_empty(db: &Surreal<Db>, aid: Uuid) {
        let search = SurrealPersonSearch::new(db.clone());
        assert!(search.search(aid, "").await.unwrap().is_empty());
        assert!(search.search(aid, "doe").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_after_concurrent_delete_leaves_no_index_entry() {
        let (db, repo, aid) = setup().await;
        let person = add(&repo, aid).await;

        // Pre-read as `update` does, then lose the race to a delete.
        let current = repo.get_by_id(aid, person.id).await.unwrap();
        repo.delete(aid, person.id).await.unwrap();

        let stale = current.with_fields(PersonFields {
            username: "jdoe".into(),
            last_name: "Dough".into(),
            ..PersonFields::default()
        });
        let write = write_person(&db, synced(UPDATE_PERSON, IndexAction::Update), &stale).await;
        assert!(write.is_err());

        index_is_empty(&db, aid).await;
        assert_eq!(repo.count(aid).await.unwrap().total, 0);

        let err = repo
            .update(aid, person.id, PersonFields::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AmsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_after_concurrent_delete_is_not_found() {
        let (db, repo, aid) = setup().await;
        let person = add(&repo, aid).await;

        let current = repo.get_by_id(aid, person.id).await.unwrap();
        repo.delete(aid, person.id).await.unwrap();

        let write = write_person(&db, synced(DELETE_PERSON, IndexAction::Delete), &current).await;
        assert!(write.is_err());
        index_is_empty(&db, aid).await;

        let err = repo.delete(aid, person.id).await.unwrap_err();
        assert!(matches!(err, AmsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_of_foreign_person_touches_nothing() {
        let (db, repo, aid) = setup().await;
        let person = add(&repo, aid).await;

        let foreign = Person {
            association_id: Uuid::new_v4(),
            ..person.clone()
        };
        let write = write_person(&db, synced(UPDATE_PERSON, IndexAction::Update), &foreign).await;
        assert!(write.is_err());

        let hits = SurrealPersonSearch::new(db.clone()).search(aid, "doe").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.association_id, aid);
    }
}

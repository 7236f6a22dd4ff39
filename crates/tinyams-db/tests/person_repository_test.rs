//! Integration tests for the Person repository using in-memory
//! SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use tinyams_core::error::AmsError;
use tinyams_core::models::association::CreateAssociation;
use tinyams_core::models::person::{CreatePerson, PersonCounts, PersonFields};
use tinyams_core::repository::{AssociationRepository, PersonRepository};
use tinyams_db::repository::{SurrealAssociationRepository, SurrealPersonRepository};
use uuid::Uuid;

/// Helper: spin up in-memory DB, run migrations, register two
/// associations.
async fn setup() -> (
    Surreal<surrealdb::engine::local::Db>,
    Uuid, // association A
    Uuid, // association B
) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tinyams_db::run_migrations(&db).await.unwrap();

    let repo = SurrealAssociationRepository::new(db.clone());
    let a = repo
        .create(CreateAssociation {
            name: "acme".into(),
            email: "a@x.com".into(),
            username: "acme1".into(),
            password: "pw1".into(),
        })
        .await
        .unwrap();
    let b = repo
        .create(CreateAssociation {
            name: "globex".into(),
            email: "g@x.com".into(),
            username: "globex1".into(),
            password: "pw2".into(),
        })
        .await
        .unwrap();

    (db, a.id, b.id)
}

fn jane() -> PersonFields {
    PersonFields {
        is_member: true,
        username: "jdoe".into(),
        first_name: "Jane".into(),
        middle_name: "Q".into(),
        last_name: "Doe".into(),
        email: "jane@example.com".into(),
        phone: "555-0100".into(),
        employer: "Acme".into(),
        job_title: "Engineer".into(),
    }
}

fn new_person(association_id: Uuid, fields: PersonFields) -> CreatePerson {
    CreatePerson {
        association_id,
        password: "secret".into(),
        fields,
    }
}

#[tokio::test]
async fn create_and_get_person() {
    let (db, a, _) = setup().await;
    let repo = SurrealPersonRepository::new(db);

    let person = repo.create(new_person(a, jane())).await.unwrap();
    assert_eq!(person.association_id, a);
    assert_eq!(person.fields(), jane());
    assert!(person.password_hash.starts_with("$argon2id$"));

    let fetched = repo.get_by_id(a, person.id).await.unwrap();
    assert_eq!(fetched.id, person.id);
    assert_eq!(fetched.fields(), jane());
    assert_eq!(fetched.password_hash, person.password_hash);
    assert_eq!(fetched.created_at, person.created_at);
}

#[tokio::test]
async fn other_association_cannot_read() {
    let (db, a, b) = setup().await;
    let repo = SurrealPersonRepository::new(db);

    let person = repo.create(new_person(a, jane())).await.unwrap();

    let foreign = repo.get_by_id(b, person.id).await.unwrap_err();
    let missing = repo.get_by_id(b, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(foreign, AmsError::NotFound { .. }));
    assert!(matches!(missing, AmsError::NotFound { .. }));
}

#[tokio::test]
async fn update_replaces_all_mutable_fields() {
    let (db, a, _) = setup().await;
    let repo = SurrealPersonRepository::new(db);

    let person = repo.create(new_person(a, jane())).await.unwrap();

    let changed = PersonFields {
        is_member: false,
        username: "jsmith".into(),
        last_name: "Smith".into(),
        ..PersonFields::default()
    };
    let updated = repo.update(a, person.id, changed.clone()).await.unwrap();
    assert_eq!(updated.fields(), changed);

    let fetched = repo.get_by_id(a, person.id).await.unwrap();
    assert_eq!(fetched.fields(), changed);
    // Immutable columns survive.
    assert_eq!(fetched.id, person.id);
    assert_eq!(fetched.association_id, a);
    assert_eq!(fetched.password_hash, person.password_hash);
    assert_eq!(fetched.created_at, person.created_at);
}

#[tokio::test]
async fn update_is_idempotent() {
    let (db, a, _) = setup().await;
    let repo = SurrealPersonRepository::new(db);

    let person = repo.create(new_person(a, jane())).await.unwrap();
    let payload = PersonFields {
        employer: "Initech".into(),
        ..jane()
    };

    repo.update(a, person.id, payload.clone()).await.unwrap();
    let first = repo.get_by_id(a, person.id).await.unwrap();
    repo.update(a, person.id, payload).await.unwrap();
    let second = repo.get_by_id(a, person.id).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn other_association_cannot_update_or_delete() {
    let (db, a, b) = setup().await;
    let repo = SurrealPersonRepository::new(db);

    let person = repo.create(new_person(a, jane())).await.unwrap();

    let err = repo
        .update(b, person.id, PersonFields::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AmsError::NotFound { .. }));

    let err = repo.delete(b, person.id).await.unwrap_err();
    assert!(matches!(err, AmsError::NotFound { .. }));

    // Untouched.
    let fetched = repo.get_by_id(a, person.id).await.unwrap();
    assert_eq!(fetched.fields(), jane());
}

#[tokio::test]
async fn delete_is_hard() {
    let (db, a, _) = setup().await;
    let repo = SurrealPersonRepository::new(db);

    let person = repo.create(new_person(a, jane())).await.unwrap();
    repo.delete(a, person.id).await.unwrap();

    let err = repo.get_by_id(a, person.id).await.unwrap_err();
    assert!(matches!(err, AmsError::NotFound { .. }));
    assert!(repo.list(a).await.unwrap().is_empty());

    // A second delete finds nothing.
    let err = repo.delete(a, person.id).await.unwrap_err();
    assert!(matches!(err, AmsError::NotFound { .. }));
}

#[tokio::test]
async fn counts_are_scoped() {
    let (db, a, b) = setup().await;
    let repo = SurrealPersonRepository::new(db);

    assert_eq!(repo.count(a).await.unwrap(), PersonCounts::default());

    repo.create(new_person(a, jane())).await.unwrap();
    repo.create(new_person(
        a,
        PersonFields {
            is_member: false,
            username: "guest".into(),
            ..PersonFields::default()
        },
    ))
    .await
    .unwrap();
    repo.create(new_person(b, jane())).await.unwrap();

    assert_eq!(
        repo.count(a).await.unwrap(),
        PersonCounts {
            total: 2,
            members: 1,
            non_members: 1,
        }
    );
    assert_eq!(repo.count(b).await.unwrap().total, 1);
}

#[tokio::test]
async fn list_is_in_creation_order() {
    let (db, a, _) = setup().await;
    let repo = SurrealPersonRepository::new(db);

    let mut ids = Vec::new();
    for name in ["first", "second", "third"] {
        let p = repo
            .create(new_person(
                a,
                PersonFields {
                    username: name.into(),
                    ..PersonFields::default()
                },
            ))
            .await
            .unwrap();
        ids.push(p.id);
    }

    let listed: Vec<Uuid> = repo.list(a).await.unwrap().iter().map(|p| p.id).collect();
    assert_eq!(listed, ids);
}

//! Integration tests for the Session repository using in-memory
//! SurrealDB.

use chrono::{Duration, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use tinyams_core::error::AmsError;
use tinyams_core::models::association::CreateAssociation;
use tinyams_core::models::session::CreateSession;
use tinyams_core::repository::{AssociationRepository, SessionRepository};
use tinyams_db::repository::{SurrealAssociationRepository, SurrealSessionRepository};
use uuid::Uuid;

async fn setup() -> (Surreal<surrealdb::engine::local::Db>, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tinyams_db::run_migrations(&db).await.unwrap();

    let assoc = SurrealAssociationRepository::new(db.clone())
        .create(CreateAssociation {
            name: "acme".into(),
            email: String::new(),
            username: "acme1".into(),
            password: "pw1".into(),
        })
        .await
        .unwrap();

    (db, assoc.id)
}

fn session_for(association_id: Uuid, token_hash: &str, ttl: Duration) -> CreateSession {
    CreateSession {
        association_id,
        token_hash: token_hash.into(),
        expires_at: Utc::now() + ttl,
    }
}

#[tokio::test]
async fn create_and_get_by_token_hash() {
    let (db, aid) = setup().await;
    let repo = SurrealSessionRepository::new(db);

    let session = repo
        .create(session_for(aid, "hash-a", Duration::hours(1)))
        .await
        .unwrap();
    assert_eq!(session.association_id, aid);
    assert_eq!(session.token_hash, "hash-a");

    let fetched = repo.get_by_token_hash("hash-a").await.unwrap();
    assert_eq!(fetched.id, session.id);
    assert_eq!(fetched.association_id, aid);
}

#[tokio::test]
async fn unknown_token_hash_is_not_found() {
    let (db, _) = setup().await;
    let repo = SurrealSessionRepository::new(db);

    let err = repo.get_by_token_hash("nope").await.unwrap_err();
    match err {
        AmsError::NotFound { entity, id } => {
            assert_eq!(entity, "session");
            assert_ne!(id, "nope");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn invalidate_removes_session() {
    let (db, aid) = setup().await;
    let repo = SurrealSessionRepository::new(db);

    let session = repo
        .create(session_for(aid, "hash-b", Duration::hours(1)))
        .await
        .unwrap();
    repo.invalidate(session.id).await.unwrap();

    assert!(repo.get_by_token_hash("hash-b").await.is_err());
    // Invalidating twice is harmless.
    repo.invalidate(session.id).await.unwrap();
}

#[tokio::test]
async fn cleanup_expired_only_removes_expired() {
    let (db, aid) = setup().await;
    let repo = SurrealSessionRepository::new(db);

    repo.create(session_for(aid, "old-1", Duration::hours(-2)))
        .await
        .unwrap();
    repo.create(session_for(aid, "old-2", Duration::minutes(-1)))
        .await
        .unwrap();
    repo.create(session_for(aid, "live", Duration::hours(1)))
        .await
        .unwrap();

    assert_eq!(repo.cleanup_expired().await.unwrap(), 2);
    assert!(repo.get_by_token_hash("old-1").await.is_err());
    assert!(repo.get_by_token_hash("live").await.is_ok());
    assert_eq!(repo.cleanup_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_deletes_are_reported() {
    let (db, aid) = setup().await;
    db.query(
        "DEFINE EVENT keep_sessions ON session WHEN $event = 'DELETE' \
         THEN { THROW 'sessions are locked' };",
    )
    .await
    .unwrap()
    .check()
    .unwrap();
    let repo = SurrealSessionRepository::new(db);

    let live = repo
        .create(session_for(aid, "locked-live", Duration::hours(1)))
        .await
        .unwrap();
    repo.create(session_for(aid, "locked-old", Duration::hours(-1)))
        .await
        .unwrap();

    assert!(repo.invalidate(live.id).await.is_err());
    assert!(repo.cleanup_expired().await.is_err());
    assert!(repo.get_by_token_hash("locked-live").await.is_ok());
}

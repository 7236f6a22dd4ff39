//! Opening the roster store.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;

/// Where the roster store lives and how to sign in to it.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket address, `host:port`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "tinyams".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Connect to the configured store and bring its schema up to date.
///
/// The returned handle is what every repository clones.
pub async fn open(config: &DbConfig) -> Result<Surreal<Client>, DbError> {
    let db = Surreal::new::<Ws>(&config.url).await?;
    db.signin(Root {
        username: config.username.clone(),
        password: config.password.clone(),
    })
    .await?;
    db.use_ns(&config.namespace).use_db(&config.database).await?;

    run_migrations(&db).await?;
    info!(
        url = %config.url,
        namespace = %config.namespace,
        database = %config.database,
        "Roster store ready"
    );
    Ok(db)
}

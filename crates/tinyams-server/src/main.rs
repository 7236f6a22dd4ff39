//! TinyAMS Server: Application entry point.

use std::process::ExitCode;

use thiserror::Error;
use tinyams_core::error::AmsError;
use tinyams_db::DbError;
use tinyams_server::{App, ConfigError, ServerConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database unavailable: {0}")]
    Db(#[from] DbError),

    #[error(transparent)]
    App(#[from] AmsError),

    #[error("signal handler failed: {0}")]
    Signal(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_env("TINYAMS_LOG").unwrap_or_else(|_| EnvFilter::new("tinyams=info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    info!("Starting TinyAMS server...");

    match run().await {
        Ok(()) => {
            info!("TinyAMS server stopped.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "TinyAMS server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = ServerConfig::from_env()?;

    let db = tinyams_db::open(&config.db).await?;

    let app = App::new(db, config.auth);
    let purged = app.auth().purge_expired_sessions().await?;
    info!(purged, "Ready");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    Ok(())
}

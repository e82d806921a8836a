//! CLI command implementations.

pub mod blocklist;
pub mod migrate;

use secrecy::SecretString;
use sqlx::SqlitePool;
use thiserror::Error;

use storekeep_api::db::{self, RepositoryError};

/// Default database when `DATABASE_URL` is unset.
const DEFAULT_DATABASE_URL: &str = "sqlite://data.db";

/// Errors returned by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Read `DATABASE_URL` (from the environment or `.env`).
fn database_url() -> SecretString {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    let url = std::env::var("DATABASE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
    SecretString::from(url)
}

/// Connect to the configured database.
async fn connect() -> Result<SqlitePool, CommandError> {
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url()).await?;
    Ok(pool)
}

//! Database operations for the Storekeep `SQLite` database.
//!
//! ## Tables
//!
//! - `users` - Accounts (username, password hash, optional email)
//! - `blocked_tokens` - Revoked access token ids, kept until natural expiry
//! - `stores` - Stores, unique by name
//! - `items` - Items, each owned by one store
//! - `tags` - Tags, unique by name within their store
//! - `item_tags` - Item/tag association, composite primary key
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/`, embedded at compile
//! time, and run via:
//! ```bash
//! cargo run -p storekeep-cli -- migrate
//! ```
//!
//! # Transactions
//!
//! Repositories borrow a `&mut SqliteConnection`, so the same repository code
//! runs against a pooled connection or inside a `Transaction`. A transaction
//! that is dropped without `commit()` rolls back.
//!
//! Transactions that write start with [`begin_write`] (`BEGIN IMMEDIATE`), so
//! the write lock is taken up front and concurrent writers queue on the busy
//! timeout instead of failing with `SQLITE_BUSY` on lock upgrade.

pub mod blocklist;
pub mod items;
pub mod stores;
pub mod tags;
pub mod users;

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;

pub use blocklist::BlocklistRepository;
pub use items::ItemRepository;
pub use stores::StoreRepository;
pub use tags::TagRepository;
pub use users::UserRepository;

/// How long a connection waits for a lock held by another connection.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation (e.g., duplicate username).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Foreign key violation (row still referenced, or parent missing).
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    /// The operation did not finish within its time budget.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Migrations could not be applied.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Create a `SQLite` connection pool.
///
/// In-memory databases (`sqlite::memory:`) live only as long as their
/// connection, so they get exactly one connection that is never recycled.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<SqlitePool, sqlx::Error> {
    let url = database_url.expose_secret();
    let in_memory = url.contains(":memory:");
    let mut options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
            .max_connections(10)
            .min_connections(1)
    };

    pool_options
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Begin a transaction that holds the database write lock from its first
/// statement.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if no connection is available or the
/// lock is not granted within the busy timeout.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, RepositoryError> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `RepositoryError::Migration` if a migration fails.
pub async fn migrate(pool: &SqlitePool) -> Result<(), RepositoryError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Run `operation` with an upper bound on its duration.
///
/// The future is dropped on timeout, which rolls back any transaction it held.
///
/// # Errors
///
/// Returns the operation's own error, or `RepositoryError::Timeout` converted
/// into the caller's error type.
pub async fn bounded<T, E, F>(limit: Duration, operation: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<RepositoryError>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(limit_ms = limit.as_millis(), "Operation timed out");
            Err(RepositoryError::Timeout(limit).into())
        }
    }
}

/// Classify a failed write, turning constraint violations into domain errors.
pub(crate) fn classify_write_error(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(format!("{what} already exists"));
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::ForeignKey(format!("{what} is referenced or missing a parent"));
        }
    }
    RepositoryError::Database(e)
}

//! Revoked access tokens.
//!
//! A row is written on logout and kept until the token it revokes would have
//! expired on its own; after that the signature check alone rejects the token
//! and the row can be purged.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::{RepositoryError, classify_write_error};

/// Repository for the `blocked_tokens` table.
pub struct BlocklistRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> BlocklistRepository<'c> {
    /// Create a new blocklist repository on a connection or transaction.
    #[must_use]
    pub const fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Check whether a token id has been revoked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn contains(&mut self, jti: &str) -> Result<bool, RepositoryError> {
        let (exists,): (i64,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM blocked_tokens WHERE jti = ?)")
                .bind(jti)
                .fetch_one(&mut *self.conn)
                .await?;
        Ok(exists != 0)
    }

    /// Record a revoked token id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id is already revoked.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(
        &mut self,
        jti: &str,
        expires_at: DateTime<Utc>,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO blocked_tokens (jti, expires_at, revoked_at) VALUES (?, ?, ?)")
            .bind(jti)
            .bind(expires_at.timestamp())
            .bind(revoked_at.timestamp())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| classify_write_error(e, "token revocation"))?;

        tracing::debug!(jti, "Token revoked");
        Ok(())
    }

    /// Delete revocations for tokens that expired before `now`.
    ///
    /// # Returns
    ///
    /// The number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purge_expired(&mut self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM blocked_tokens WHERE expires_at < ?")
            .bind(now.timestamp())
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected())
    }
}

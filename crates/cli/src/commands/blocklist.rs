//! Token blocklist maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Remove revocations of tokens that have expired anyway
//! sk-cli blocklist purge
//! ```

use chrono::Utc;

use storekeep_api::db::{BlocklistRepository, RepositoryError};

use super::{CommandError, connect};

/// Delete blocklist rows whose token has passed its natural expiry.
///
/// # Errors
///
/// Returns `CommandError` if the database operation fails.
pub async fn purge() -> Result<u64, CommandError> {
    let pool = connect().await?;
    let mut conn = pool.acquire().await.map_err(RepositoryError::from)?;

    let purged = BlocklistRepository::new(&mut conn)
        .purge_expired(Utc::now())
        .await?;

    tracing::info!(purged, "Purged expired token revocations");
    drop(conn);
    pool.close().await;
    Ok(purged)
}

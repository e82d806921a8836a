//! Store repository.

use sqlx::SqliteConnection;

use storekeep_core::{Name, StoreId};

use super::{RepositoryError, classify_write_error};
use crate::models::Store;

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    name: String,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        let name = Name::parse(&row.name).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid store name in database: {e}"))
        })?;
        Ok(Self { id: row.id, name })
    }
}

/// Repository for the `stores` table.
pub struct StoreRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> StoreRepository<'c> {
    /// Create a new store repository on a connection or transaction.
    #[must_use]
    pub const fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// List all stores ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&mut self) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as("SELECT id, name FROM stores ORDER BY id")
            .fetch_all(&mut *self.conn)
            .await?;

        rows.into_iter().map(Store::try_from).collect()
    }

    /// Get a store by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&mut self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row: Option<StoreRow> = sqlx::query_as("SELECT id, name FROM stores WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        row.map(Store::try_from).transpose()
    }

    /// Create a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a store with this name exists.
    pub async fn create(&mut self, name: &Name) -> Result<Store, RepositoryError> {
        let row: StoreRow = sqlx::query_as("INSERT INTO stores (name) VALUES (?) RETURNING id, name")
            .bind(name.as_str())
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| classify_write_error(e, "store"))?;

        Store::try_from(row)
    }

    /// Delete a store together with its items, tags and their links.
    ///
    /// # Returns
    ///
    /// Returns `true` if the store was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&mut self, id: StoreId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM stores WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| classify_write_error(e, "store"))?;

        Ok(result.rows_affected() > 0)
    }
}

//! Tag repository and the item/tag association.
//!
//! `tags` carries `UNIQUE (store_id, name)`, and `item_tags` has the composite
//! primary key `(item_id, tag_id)`, so linking the same pair twice is a no-op.

use sqlx::SqliteConnection;

use storekeep_core::{ItemId, Name, StoreId, TagId};

use super::{RepositoryError, classify_write_error};
use crate::models::Tag;

#[derive(Debug, sqlx::FromRow)]
struct TagRow {
    id: TagId,
    name: String,
    store_id: StoreId,
}

impl TryFrom<TagRow> for Tag {
    type Error = RepositoryError;

    fn try_from(row: TagRow) -> Result<Self, Self::Error> {
        let name = Name::parse(&row.name).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid tag name in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            name,
            store_id: row.store_id,
        })
    }
}

fn into_tags(rows: Vec<TagRow>) -> Result<Vec<Tag>, RepositoryError> {
    rows.into_iter().map(Tag::try_from).collect()
}

/// Repository for the `tags` and `item_tags` tables.
pub struct TagRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> TagRepository<'c> {
    /// Create a new tag repository on a connection or transaction.
    #[must_use]
    pub const fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// List every tag ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&mut self) -> Result<Vec<Tag>, RepositoryError> {
        let rows: Vec<TagRow> = sqlx::query_as("SELECT id, name, store_id FROM tags ORDER BY id")
            .fetch_all(&mut *self.conn)
            .await?;
        into_tags(rows)
    }

    /// List the tags of one store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_store(&mut self, store_id: StoreId) -> Result<Vec<Tag>, RepositoryError> {
        let rows: Vec<TagRow> =
            sqlx::query_as("SELECT id, name, store_id FROM tags WHERE store_id = ? ORDER BY id")
                .bind(store_id)
                .fetch_all(&mut *self.conn)
                .await?;
        into_tags(rows)
    }

    /// List the tags linked to an item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_item(&mut self, item_id: ItemId) -> Result<Vec<Tag>, RepositoryError> {
        let rows: Vec<TagRow> = sqlx::query_as(
            r"
            SELECT t.id, t.name, t.store_id
            FROM tags t
            JOIN item_tags it ON it.tag_id = t.id
            WHERE it.item_id = ?
            ORDER BY t.id
            ",
        )
        .bind(item_id)
        .fetch_all(&mut *self.conn)
        .await?;
        into_tags(rows)
    }

    /// Get a tag by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&mut self, id: TagId) -> Result<Option<Tag>, RepositoryError> {
        let row: Option<TagRow> = sqlx::query_as("SELECT id, name, store_id FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        row.map(Tag::try_from).transpose()
    }

    /// Check whether a store already has a tag with this name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn name_exists(
        &mut self,
        store_id: StoreId,
        name: &Name,
    ) -> Result<bool, RepositoryError> {
        let (exists,): (i64,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM tags WHERE store_id = ? AND name = ?)",
        )
        .bind(store_id)
        .bind(name.as_str())
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(exists != 0)
    }

    /// Create a tag in a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the store already has a tag with this name.
    /// Returns `RepositoryError::ForeignKey` if the store does not exist.
    pub async fn create(&mut self, store_id: StoreId, name: &Name) -> Result<Tag, RepositoryError> {
        let row: TagRow = sqlx::query_as(
            "INSERT INTO tags (name, store_id) VALUES (?, ?) RETURNING id, name, store_id",
        )
        .bind(name.as_str())
        .bind(store_id)
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| classify_write_error(e, "tag"))?;

        Tag::try_from(row)
    }

    /// Delete a tag.
    ///
    /// # Returns
    ///
    /// Returns `true` if the tag was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the tag is still linked to an item.
    pub async fn delete(&mut self, id: TagId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await
            .map_err(|e| classify_write_error(e, "tag"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Count the items linked to a tag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn link_count(&mut self, id: TagId) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM item_tags WHERE tag_id = ?")
            .bind(id)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    /// Link a tag to an item.
    ///
    /// # Returns
    ///
    /// Returns `true` if a new link was created, `false` if it already existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if either side does not exist.
    pub async fn link(&mut self, item_id: ItemId, tag_id: TagId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO item_tags (item_id, tag_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(item_id)
        .bind(tag_id)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| classify_write_error(e, "item tag link"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove the link between a tag and an item.
    ///
    /// # Returns
    ///
    /// Returns `true` if a link was removed, `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unlink(&mut self, item_id: ItemId, tag_id: TagId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM item_tags WHERE item_id = ? AND tag_id = ?")
            .bind(item_id)
            .bind(tag_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove an item's links to tags that belong to a different store.
    ///
    /// # Returns
    ///
    /// The number of links removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unlink_foreign(
        &mut self,
        item_id: ItemId,
        store_id: StoreId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM item_tags
            WHERE item_id = ?
              AND tag_id IN (SELECT id FROM tags WHERE store_id != ?)
            ",
        )
        .bind(item_id)
        .bind(store_id)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected())
    }
}

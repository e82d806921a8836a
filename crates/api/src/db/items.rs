//! Item repository.
//!
//! Prices are stored as decimal TEXT and parsed back into [`Price`].

use sqlx::SqliteConnection;

use storekeep_core::{ItemId, Name, Price, StoreId, TagId};

use super::{RepositoryError, classify_write_error};
use crate::models::Item;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: ItemId,
    name: String,
    price: String,
    store_id: StoreId,
}

impl TryFrom<ItemRow> for Item {
    type Error = RepositoryError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let name = Name::parse(&row.name).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid item name in database: {e}"))
        })?;
        let price = row.price.parse::<Price>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid item price in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            name,
            price,
            store_id: row.store_id,
        })
    }
}

fn into_items(rows: Vec<ItemRow>) -> Result<Vec<Item>, RepositoryError> {
    rows.into_iter().map(Item::try_from).collect()
}

/// Fields to change on an existing item; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub name: Option<Name>,
    pub price: Option<Price>,
    pub store_id: Option<StoreId>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the `items` table.
pub struct ItemRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ItemRepository<'c> {
    /// Create a new item repository on a connection or transaction.
    #[must_use]
    pub const fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// List all items ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&mut self) -> Result<Vec<Item>, RepositoryError> {
        let rows: Vec<ItemRow> =
            sqlx::query_as("SELECT id, name, price, store_id FROM items ORDER BY id")
                .fetch_all(&mut *self.conn)
                .await?;
        into_items(rows)
    }

    /// List the items of one store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_store(&mut self, store_id: StoreId) -> Result<Vec<Item>, RepositoryError> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            "SELECT id, name, price, store_id FROM items WHERE store_id = ? ORDER BY id",
        )
        .bind(store_id)
        .fetch_all(&mut *self.conn)
        .await?;
        into_items(rows)
    }

    /// List the items linked to a tag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_tag(&mut self, tag_id: TagId) -> Result<Vec<Item>, RepositoryError> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            r"
            SELECT i.id, i.name, i.price, i.store_id
            FROM items i
            JOIN item_tags it ON it.item_id = i.id
            WHERE it.tag_id = ?
            ORDER BY i.id
            ",
        )
        .bind(tag_id)
        .fetch_all(&mut *self.conn)
        .await?;
        into_items(rows)
    }

    /// Get an item by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&mut self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let row: Option<ItemRow> =
            sqlx::query_as("SELECT id, name, price, store_id FROM items WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *self.conn)
                .await?;

        row.map(Item::try_from).transpose()
    }

    /// Create an item, letting the database assign the ID unless one is given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the store does not exist.
    /// Returns `RepositoryError::Conflict` if an explicit ID is already taken.
    pub async fn create(
        &mut self,
        id: Option<ItemId>,
        name: &Name,
        price: Price,
        store_id: StoreId,
    ) -> Result<Item, RepositoryError> {
        let row: ItemRow = sqlx::query_as(
            r"
            INSERT INTO items (id, name, price, store_id)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, price, store_id
            ",
        )
        .bind(id)
        .bind(name.as_str())
        .bind(price.to_string())
        .bind(store_id)
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| classify_write_error(e, "item"))?;

        Item::try_from(row)
    }

    /// Apply changes to an existing item.
    ///
    /// # Returns
    ///
    /// The updated item, or `None` if no item has this ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ForeignKey` if the new store does not exist.
    pub async fn update(
        &mut self,
        id: ItemId,
        changes: &ItemChanges,
    ) -> Result<Option<Item>, RepositoryError> {
        let row: Option<ItemRow> = sqlx::query_as(
            r"
            UPDATE items
            SET name = COALESCE(?, name),
                price = COALESCE(?, price),
                store_id = COALESCE(?, store_id)
            WHERE id = ?
            RETURNING id, name, price, store_id
            ",
        )
        .bind(changes.name.as_ref().map(Name::as_str))
        .bind(changes.price.map(|p| p.to_string()))
        .bind(changes.store_id)
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(|e| classify_write_error(e, "item"))?;

        row.map(Item::try_from).transpose()
    }

    /// Delete an item and its tag links.
    ///
    /// # Returns
    ///
    /// Returns `true` if the item was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&mut self, id: ItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

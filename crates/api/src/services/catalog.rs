//! Stores and items.
//!
//! Reads are public. Writes take a [`Principal`].

use std::time::Duration;

use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;

use storekeep_core::{ItemId, Name, NameError, Price, StoreId};

use super::auth::Principal;
use crate::db::items::ItemChanges;
use crate::db::{self, ItemRepository, RepositoryError, StoreRepository, TagRepository};
use crate::models::{Item, ItemDetail, Store, StoreDetail};

/// Errors that can occur during store and item operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Invalid store or item name.
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),

    /// A field needed to create an item is missing.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Store not found.
    #[error("Store not found.")]
    StoreNotFound,

    /// Item not found.
    #[error("Item not found.")]
    ItemNotFound,

    /// A store with this name already exists.
    #[error("A store with that name already exists.")]
    DuplicateStore,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Fields for a new item.
#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub price: Price,
    pub store_id: StoreId,
}

/// Fields for `PUT /item/{id}`. Every field is optional when the item
/// exists; all are required when it doesn't.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub price: Option<Price>,
    pub store_id: Option<StoreId>,
}

/// Store and item service.
pub struct CatalogService<'a> {
    pool: &'a SqlitePool,
    timeout: Duration,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    // =========================================================================
    // Stores
    // =========================================================================

    /// List all stores.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the database operation fails.
    pub async fn list_stores(&self) -> Result<Vec<Store>, CatalogError> {
        db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
            let stores = StoreRepository::new(&mut conn).list().await?;
            Ok(stores)
        })
        .await
    }

    /// Create a store.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateStore` if the name is taken.
    pub async fn create_store(
        &self,
        principal: &Principal,
        name: &str,
    ) -> Result<Store, CatalogError> {
        let name = Name::parse(name)?;

        let store = db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
            StoreRepository::new(&mut conn)
                .create(&name)
                .await
                .map_err(|e| match e {
                    RepositoryError::Conflict(_) => CatalogError::DuplicateStore,
                    other => CatalogError::Repository(other),
                })
        })
        .await?;

        tracing::info!(caller = %principal.user_id(), store_id = %store.id, "Store created");
        Ok(store)
    }

    /// Get a store with its items and tags.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::StoreNotFound` if the store doesn't exist.
    pub async fn get_store(&self, id: StoreId) -> Result<StoreDetail, CatalogError> {
        db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;

            let store = StoreRepository::new(&mut conn)
                .get(id)
                .await?
                .ok_or(CatalogError::StoreNotFound)?;
            let items = ItemRepository::new(&mut conn).list_by_store(id).await?;
            let tags = TagRepository::new(&mut conn).list_by_store(id).await?;

            Ok(StoreDetail { store, items, tags })
        })
        .await
    }

    /// Delete a store with its items, tags and their links.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::StoreNotFound` if the store doesn't exist.
    pub async fn delete_store(&self, principal: &Principal, id: StoreId) -> Result<(), CatalogError> {
        db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
            if StoreRepository::new(&mut conn).delete(id).await? {
                Ok(())
            } else {
                Err(CatalogError::StoreNotFound)
            }
        })
        .await?;

        tracing::info!(caller = %principal.user_id(), store_id = %id, "Store deleted");
        Ok(())
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// List all items.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the database operation fails.
    pub async fn list_items(&self) -> Result<Vec<Item>, CatalogError> {
        db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
            let items = ItemRepository::new(&mut conn).list().await?;
            Ok(items)
        })
        .await
    }

    /// Create an item in an existing store.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::StoreNotFound` if the store doesn't exist.
    pub async fn create_item(
        &self,
        principal: &Principal,
        new_item: NewItem,
    ) -> Result<Item, CatalogError> {
        let name = Name::parse(&new_item.name)?;

        let item = db::bounded(self.timeout, async {
            let mut tx = db::begin_write(self.pool).await?;

            if StoreRepository::new(&mut tx)
                .get(new_item.store_id)
                .await?
                .is_none()
            {
                return Err(CatalogError::StoreNotFound);
            }
            let item = ItemRepository::new(&mut tx)
                .create(None, &name, new_item.price, new_item.store_id)
                .await
                .map_err(store_missing)?;

            tx.commit().await.map_err(RepositoryError::from)?;
            Ok(item)
        })
        .await?;

        tracing::info!(caller = %principal.user_id(), item_id = %item.id, "Item created");
        Ok(item)
    }

    /// Get an item with its tags.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ItemNotFound` if the item doesn't exist.
    pub async fn get_item(&self, id: ItemId) -> Result<ItemDetail, CatalogError> {
        db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;

            let item = ItemRepository::new(&mut conn)
                .get(id)
                .await?
                .ok_or(CatalogError::ItemNotFound)?;
            let tags = TagRepository::new(&mut conn).list_by_item(id).await?;

            Ok(ItemDetail { item, tags })
        })
        .await
    }

    /// Update an item, or create it under `id` if it doesn't exist.
    ///
    /// Moving an item to another store drops its links to tags of the old
    /// store.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::StoreNotFound` if the target store doesn't exist,
    /// and `CatalogError::MissingField` when creating without every field.
    pub async fn put_item(
        &self,
        principal: &Principal,
        id: ItemId,
        update: ItemUpdate,
    ) -> Result<Item, CatalogError> {
        let changes = ItemChanges {
            name: update.name.as_deref().map(Name::parse).transpose()?,
            price: update.price,
            store_id: update.store_id,
        };

        let item = db::bounded(self.timeout, async {
            let mut tx = db::begin_write(self.pool).await?;

            if let Some(store_id) = changes.store_id
                && StoreRepository::new(&mut tx).get(store_id).await?.is_none()
            {
                return Err(CatalogError::StoreNotFound);
            }

            let mut items = ItemRepository::new(&mut tx);
            let item = if items.get(id).await?.is_some() {
                let item = items
                    .update(id, &changes)
                    .await
                    .map_err(store_missing)?
                    .ok_or(CatalogError::ItemNotFound)?;
                let dropped = TagRepository::new(&mut tx)
                    .unlink_foreign(id, item.store_id)
                    .await?;
                if dropped > 0 {
                    tracing::debug!(item_id = %id, dropped, "Dropped links to tags of previous store");
                }
                item
            } else {
                let name = changes.name.as_ref().ok_or(CatalogError::MissingField("name"))?;
                let price = changes.price.ok_or(CatalogError::MissingField("price"))?;
                let store_id = changes
                    .store_id
                    .ok_or(CatalogError::MissingField("store_id"))?;
                items
                    .create(Some(id), name, price, store_id)
                    .await
                    .map_err(store_missing)?
            };

            tx.commit().await.map_err(RepositoryError::from)?;
            Ok(item)
        })
        .await?;

        tracing::info!(caller = %principal.user_id(), item_id = %item.id, "Item saved");
        Ok(item)
    }

    /// Delete an item and its tag links.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ItemNotFound` if the item doesn't exist.
    pub async fn delete_item(&self, principal: &Principal, id: ItemId) -> Result<(), CatalogError> {
        db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
            if ItemRepository::new(&mut conn).delete(id).await? {
                Ok(())
            } else {
                Err(CatalogError::ItemNotFound)
            }
        })
        .await?;

        tracing::info!(caller = %principal.user_id(), item_id = %id, "Item deleted");
        Ok(())
    }
}

/// A foreign key failure on an item write means its store vanished.
fn store_missing(e: RepositoryError) -> CatalogError {
    match e {
        RepositoryError::ForeignKey(_) => CatalogError::StoreNotFound,
        other => CatalogError::Repository(other),
    }
}

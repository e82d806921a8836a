//! Tags scoped to a store, and their links to items.
//!
//! A tag's name is unique within its store. A tag can only be linked to
//! items of the same store, and it can only be deleted once no item links to
//! it. The pre-checks give friendly errors; the `UNIQUE (store_id, name)` and
//! `item_tags` foreign key constraints decide races.

use std::time::Duration;

use sqlx::SqlitePool;
use thiserror::Error;

use storekeep_core::{ItemId, Name, NameError, StoreId, TagId};

use super::auth::Principal;
use crate::db::{self, ItemRepository, RepositoryError, StoreRepository, TagRepository};
use crate::models::{Item, Tag, TagDetail};

/// Errors that can occur during tag operations.
#[derive(Debug, Error)]
pub enum TagError {
    /// Invalid tag name.
    #[error("invalid tag name: {0}")]
    InvalidName(#[from] NameError),

    /// Store not found.
    #[error("Store not found.")]
    StoreNotFound,

    /// Item not found.
    #[error("Item not found.")]
    ItemNotFound,

    /// Tag not found.
    #[error("Tag not found.")]
    TagNotFound,

    /// The store already has a tag with this name.
    #[error("Tag with given name already exists in the store.")]
    DuplicateName,

    /// The tag is still linked to at least one item.
    #[error(
        "Could not delete tag. Make sure tag is not associated with any items, then try again."
    )]
    InUse,

    /// Tag and item belong to different stores.
    #[error("Tag and item belong to different stores.")]
    StoreMismatch,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Tag and item/tag link service.
pub struct TagService<'a> {
    pool: &'a SqlitePool,
    timeout: Duration,
}

impl<'a> TagService<'a> {
    /// Create a new tag service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// List the tags of a store.
    ///
    /// # Errors
    ///
    /// Returns `TagError::StoreNotFound` if the store doesn't exist.
    pub async fn list_tags(
        &self,
        principal: &Principal,
        store_id: StoreId,
    ) -> Result<Vec<Tag>, TagError> {
        tracing::debug!(caller = %principal.user_id(), store_id = %store_id, "List store tags");

        db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;

            if StoreRepository::new(&mut conn).get(store_id).await?.is_none() {
                return Err(TagError::StoreNotFound);
            }
            let tags = TagRepository::new(&mut conn).list_by_store(store_id).await?;
            Ok(tags)
        })
        .await
    }

    /// List every tag.
    ///
    /// # Errors
    ///
    /// Returns `TagError::Repository` if the database operation fails.
    pub async fn list_all_tags(&self, principal: &Principal) -> Result<Vec<Tag>, TagError> {
        tracing::debug!(caller = %principal.user_id(), "List all tags");

        db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
            let tags = TagRepository::new(&mut conn).list().await?;
            Ok(tags)
        })
        .await
    }

    /// Create a tag in a store.
    ///
    /// # Errors
    ///
    /// Returns `TagError::StoreNotFound` if the store doesn't exist.
    /// Returns `TagError::DuplicateName` if the store already has this tag.
    pub async fn create_tag(
        &self,
        principal: &Principal,
        store_id: StoreId,
        name: &str,
    ) -> Result<Tag, TagError> {
        let name = Name::parse(name)?;

        let tag = db::bounded(self.timeout, async {
            let mut tx = db::begin_write(self.pool).await?;

            if StoreRepository::new(&mut tx).get(store_id).await?.is_none() {
                return Err(TagError::StoreNotFound);
            }

            let mut tags = TagRepository::new(&mut tx);
            if tags.name_exists(store_id, &name).await? {
                return Err(TagError::DuplicateName);
            }
            let tag = tags.create(store_id, &name).await.map_err(|e| match e {
                RepositoryError::Conflict(_) => TagError::DuplicateName,
                RepositoryError::ForeignKey(_) => TagError::StoreNotFound,
                other => TagError::Repository(other),
            })?;

            tx.commit().await.map_err(RepositoryError::from)?;
            Ok(tag)
        })
        .await?;

        tracing::info!(
            caller = %principal.user_id(),
            tag_id = %tag.id,
            store_id = %store_id,
            "Tag created"
        );
        Ok(tag)
    }

    /// Get a tag together with the items linked to it.
    ///
    /// # Errors
    ///
    /// Returns `TagError::TagNotFound` if the tag doesn't exist.
    pub async fn get_tag(&self, principal: &Principal, tag_id: TagId) -> Result<TagDetail, TagError> {
        tracing::debug!(caller = %principal.user_id(), tag_id = %tag_id, "Get tag");

        db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;

            let tag = TagRepository::new(&mut conn)
                .get(tag_id)
                .await?
                .ok_or(TagError::TagNotFound)?;
            let items = ItemRepository::new(&mut conn).list_by_tag(tag_id).await?;
            Ok(TagDetail { tag, items })
        })
        .await
    }

    /// Link a tag to an item. Linking an already linked pair is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `TagError::ItemNotFound` or `TagError::TagNotFound` if either
    /// side doesn't exist, and `TagError::StoreMismatch` if they belong to
    /// different stores.
    pub async fn link_tag_to_item(
        &self,
        principal: &Principal,
        item_id: ItemId,
        tag_id: TagId,
    ) -> Result<Tag, TagError> {
        let tag = db::bounded(self.timeout, async {
            let mut tx = db::begin_write(self.pool).await?;

            let item = ItemRepository::new(&mut tx)
                .get(item_id)
                .await?
                .ok_or(TagError::ItemNotFound)?;
            let mut tags = TagRepository::new(&mut tx);
            let tag = tags.get(tag_id).await?.ok_or(TagError::TagNotFound)?;
            if item.store_id != tag.store_id {
                return Err(TagError::StoreMismatch);
            }

            let created = tags.link(item_id, tag_id).await?;
            tx.commit().await.map_err(RepositoryError::from)?;

            if created {
                tracing::info!(
                    caller = %principal.user_id(),
                    item_id = %item_id,
                    tag_id = %tag_id,
                    "Tag linked to item"
                );
            }
            Ok(tag)
        })
        .await?;

        Ok(tag)
    }

    /// Remove the link between a tag and an item. Removing an absent link is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// Returns `TagError::ItemNotFound` or `TagError::TagNotFound` if either
    /// side doesn't exist.
    pub async fn unlink_tag_from_item(
        &self,
        principal: &Principal,
        item_id: ItemId,
        tag_id: TagId,
    ) -> Result<(Item, Tag), TagError> {
        db::bounded(self.timeout, async {
            let mut tx = db::begin_write(self.pool).await?;

            let item = ItemRepository::new(&mut tx)
                .get(item_id)
                .await?
                .ok_or(TagError::ItemNotFound)?;
            let mut tags = TagRepository::new(&mut tx);
            let tag = tags.get(tag_id).await?.ok_or(TagError::TagNotFound)?;

            let removed = tags.unlink(item_id, tag_id).await?;
            tx.commit().await.map_err(RepositoryError::from)?;

            if removed {
                tracing::info!(
                    caller = %principal.user_id(),
                    item_id = %item_id,
                    tag_id = %tag_id,
                    "Tag unlinked from item"
                );
            }
            Ok((item, tag))
        })
        .await
    }

    /// Delete a tag that no item links to.
    ///
    /// # Errors
    ///
    /// Returns `TagError::TagNotFound` if the tag doesn't exist, and
    /// `TagError::InUse` if any item still links to it.
    pub async fn delete_tag(&self, principal: &Principal, tag_id: TagId) -> Result<(), TagError> {
        db::bounded(self.timeout, async {
            let mut tx = db::begin_write(self.pool).await?;
            let mut tags = TagRepository::new(&mut tx);

            if tags.get(tag_id).await?.is_none() {
                return Err(TagError::TagNotFound);
            }
            if tags.link_count(tag_id).await? > 0 {
                return Err(TagError::InUse);
            }
            let deleted = tags.delete(tag_id).await.map_err(|e| match e {
                RepositoryError::ForeignKey(_) => TagError::InUse,
                other => TagError::Repository(other),
            })?;
            if !deleted {
                return Err(TagError::TagNotFound);
            }

            tx.commit().await.map_err(RepositoryError::from)?;
            Ok(())
        })
        .await?;

        tracing::info!(caller = %principal.user_id(), tag_id = %tag_id, "Tag deleted");
        Ok(())
    }
}

//! Store, item and tag domain types.

use serde::Serialize;

use storekeep_core::{ItemId, Name, Price, StoreId, TagId};

/// A store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Store {
    pub id: StoreId,
    pub name: Name,
}

/// An item, owned by exactly one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: ItemId,
    pub name: Name,
    pub price: Price,
    pub store_id: StoreId,
}

/// A tag. Its name is unique within its store only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: TagId,
    pub name: Name,
    pub store_id: StoreId,
}

/// A store together with everything it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreDetail {
    #[serde(flatten)]
    pub store: Store,
    pub items: Vec<Item>,
    pub tags: Vec<Tag>,
}

/// An item together with the tags linked to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: Item,
    pub tags: Vec<Tag>,
}

/// A tag together with the items linked to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagDetail {
    #[serde(flatten)]
    pub tag: Tag,
    pub items: Vec<Item>,
}

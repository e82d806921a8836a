//! Domain models for Storekeep.
//!
//! These are validated domain types, separate from the database row types in
//! [`crate::db`]. They serialize to the JSON bodies returned by the API.

pub mod catalog;
pub mod user;

pub use catalog::{Item, ItemDetail, Store, StoreDetail, Tag, TagDetail};
pub use user::User;

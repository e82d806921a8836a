//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password hashing, access tokens, token revocation
//! - `users` - Registration, login, logout, user lookup and deletion
//! - `tags` - Store-scoped tags and their links to items
//! - `catalog` - Stores and items
//! - `notifier` - Outbound email (Mailgun)
//!
//! Services borrow the pool and whatever else they need from
//! [`crate::state::AppState`] for the duration of one request. Each operation
//! is bounded by the configured operation timeout.

pub mod auth;
pub mod catalog;
pub mod notifier;
pub mod tags;
pub mod users;

pub use auth::{AuthError, Principal, TokenKeys, TokenService};
pub use catalog::{CatalogError, CatalogService, ItemUpdate, NewItem};
pub use notifier::{DisabledNotifier, MailgunNotifier, Notifier, NotifyError};
pub use tags::{TagError, TagService};
pub use users::UserService;

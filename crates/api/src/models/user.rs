//! User domain types.

use serde::Serialize;

use storekeep_core::{Email, UserId, Username};

/// A registered user (domain type).
///
/// The password hash never leaves the repository layer, so this type can be
/// returned to clients as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique login name.
    pub username: Username,
    /// Optional contact address, unique when present.
    pub email: Option<Email>,
}

//! Authentication service.
//!
//! Provides password hashing, access tokens and the revocation blocklist.

mod error;
pub mod password;
pub mod tokens;

pub use error::AuthError;
pub use password::{hash_password, verify_dummy, verify_password};
pub use tokens::{Claims, IssuedToken, Principal, TokenKeys, TokenService};

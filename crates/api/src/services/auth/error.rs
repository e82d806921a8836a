//! Authentication error types.

use thiserror::Error;

use storekeep_core::{EmailError, NameError};

use crate::db::RepositoryError;

/// Errors that can occur during authentication and session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid username.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] NameError),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password missing or blank.
    #[error("password cannot be empty")]
    EmptyPassword,

    /// Username is already registered.
    #[error("A user with that username already exists.")]
    UsernameTaken,

    /// Email is already registered.
    #[error("A user with that email already exists.")]
    EmailTaken,

    /// Invalid credentials (wrong password or user not found).
    #[error("Invalid credentials.")]
    InvalidCredentials,

    /// User not found.
    #[error("User not found.")]
    UserNotFound,

    /// Token signature or structure is invalid.
    #[error("Signature verification failed.")]
    InvalidToken,

    /// Token is past its expiry.
    #[error("The token has expired.")]
    ExpiredToken,

    /// Token was revoked, or its subject no longer exists.
    #[error("The token has been revoked.")]
    RevokedToken,

    /// Token id is already on the blocklist.
    #[error("The token has already been revoked.")]
    AlreadyRevoked,

    /// Token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// Configured token lifetime does not fit a timestamp.
    #[error("token lifetime out of range")]
    TokenLifetime,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

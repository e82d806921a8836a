//! User lifecycle: registration, login, logout, lookup and deletion.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;

use storekeep_core::{Email, UserId, Username};

use super::auth::{
    AuthError, IssuedToken, Principal, TokenKeys, TokenService, hash_password, verify_dummy,
    verify_password,
};
use super::notifier::{self, Notifier};
use crate::db::{self, BlocklistRepository, RepositoryError, UserRepository};
use crate::models::User;

/// User lifecycle service.
pub struct UserService<'a> {
    pool: &'a SqlitePool,
    keys: &'a TokenKeys,
    notifier: &'a Arc<dyn Notifier>,
    timeout: Duration,
}

impl<'a> UserService<'a> {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        pool: &'a SqlitePool,
        keys: &'a TokenKeys,
        notifier: &'a Arc<dyn Notifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            pool,
            keys,
            notifier,
            timeout,
        }
    }

    /// Register a new user.
    ///
    /// A welcome message is sent in the background when an email is given.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername`, `AuthError::EmptyPassword` or
    /// `AuthError::InvalidEmail` for bad input.
    /// Returns `AuthError::UsernameTaken` or `AuthError::EmailTaken` on conflict.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<User, AuthError> {
        let username = Username::parse(username)?;
        if password.trim().is_empty() {
            return Err(AuthError::EmptyPassword);
        }
        let email = email
            .filter(|e| !e.trim().is_empty())
            .map(Email::parse)
            .transpose()?;

        let password_hash = hash_password(password)?;

        let user = db::bounded(self.timeout, async {
            let mut tx = db::begin_write(self.pool).await?;
            let mut users = UserRepository::new(&mut tx);

            if users.username_exists(&username).await? {
                return Err(AuthError::UsernameTaken);
            }
            if let Some(email) = &email
                && users.email_exists(email).await?
            {
                return Err(AuthError::EmailTaken);
            }

            let user = users
                .create(&username, &password_hash, email.as_ref())
                .await
                .map_err(|e| match e {
                    RepositoryError::Conflict(msg) if msg.starts_with("email") => {
                        AuthError::EmailTaken
                    }
                    RepositoryError::Conflict(_) => AuthError::UsernameTaken,
                    other => AuthError::Repository(other),
                })?;

            tx.commit().await.map_err(RepositoryError::from)?;
            Ok(user)
        })
        .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        if let Some(email) = &user.email {
            notifier::send_in_background(
                Arc::clone(self.notifier),
                email.clone(),
                "Successfully signed up".to_string(),
                format!(
                    "Hi {}! You have successfully signed up to the Stores REST API.",
                    user.username
                ),
            );
        }

        Ok(user)
    }

    /// Check a username and password and issue an access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown user or a wrong
    /// password alike.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let Ok(username) = Username::parse(username) else {
            verify_dummy(password);
            return Err(AuthError::InvalidCredentials);
        };

        let credentials = db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
            let credentials = UserRepository::new(&mut conn)
                .get_credentials(&username)
                .await?;
            Ok::<_, AuthError>(credentials)
        })
        .await?;

        let Some((user, password_hash)) = credentials else {
            tracing::debug!(username = %username, "Login for unknown user");
            verify_dummy(password);
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &password_hash) {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.keys.issue(user.id)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(token)
    }

    /// Revoke the token the principal was validated from.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AlreadyRevoked` if a concurrent logout got there first.
    pub async fn logout(&self, principal: &Principal) -> Result<(), AuthError> {
        TokenService::new(self.pool, self.keys, self.timeout)
            .revoke(principal.jti(), principal.expires_at())
            .await?;

        tracing::info!(user_id = %principal.user_id(), "User logged out");
        Ok(())
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, principal: &Principal, id: UserId) -> Result<User, AuthError> {
        tracing::debug!(caller = %principal.user_id(), user_id = %id, "Get user");

        db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
            UserRepository::new(&mut conn)
                .get_by_id(id)
                .await?
                .ok_or(AuthError::UserNotFound)
        })
        .await
    }

    /// Delete a user.
    ///
    /// Outstanding tokens of the deleted user stop validating. When callers
    /// delete themselves, their current token is also blocklisted.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn delete_user(&self, principal: &Principal, id: UserId) -> Result<(), AuthError> {
        db::bounded(self.timeout, async {
            let mut tx = db::begin_write(self.pool).await?;

            if !UserRepository::new(&mut tx).delete(id).await? {
                return Err(AuthError::UserNotFound);
            }

            if principal.user_id() == id {
                match BlocklistRepository::new(&mut tx)
                    .insert(principal.jti(), principal.expires_at(), Utc::now())
                    .await
                {
                    Ok(()) | Err(RepositoryError::Conflict(_)) => {}
                    Err(e) => return Err(e.into()),
                }
            }

            tx.commit().await.map_err(RepositoryError::from)?;
            Ok(())
        })
        .await?;

        tracing::info!(caller = %principal.user_id(), user_id = %id, "User deleted");
        Ok(())
    }
}

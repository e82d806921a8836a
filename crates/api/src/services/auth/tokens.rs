//! Access tokens and the revocation blocklist.
//!
//! Tokens are HS256 JWTs carrying `sub` (user id), `jti`, `iat` and `exp`.
//! A token is accepted only when its signature verifies, it has not expired,
//! its `jti` is not on the blocklist, and its subject still exists.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use storekeep_core::UserId;

use super::AuthError;
use crate::config::JwtConfig;
use crate::db::{self, BlocklistRepository, RepositoryError, UserRepository};

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id, as a string.
    pub sub: String,
    /// Unique token id; the revocation key.
    pub jti: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Encoded JWT.
    pub token: String,
    /// Unique token id.
    pub jti: String,
    /// Moment the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// Proof that a bearer token was validated.
///
/// Only [`TokenService::validate`] constructs this, and every protected
/// service operation takes a `&Principal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    user_id: UserId,
    jti: String,
    expires_at: DateTime<Utc>,
}

impl Principal {
    /// The authenticated user.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The id of the token this principal was validated from.
    #[must_use]
    pub fn jti(&self) -> &str {
        &self.jti
    }

    /// Natural expiry of the token.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn from_claims(claims: Claims) -> Result<Self, AuthError> {
        let user_id = claims
            .sub
            .parse::<i32>()
            .map(UserId::new)
            .map_err(|_| AuthError::InvalidToken)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::InvalidToken)?;

        Ok(Self {
            user_id,
            jti: claims.jti,
            expires_at,
        })
    }
}

// =============================================================================
// Signing keys
// =============================================================================

/// Signing and verification keys, built once at startup.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKeys")
            .field("keys", &"[REDACTED]")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl TokenKeys {
    /// Build keys from the JWT configuration.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime: config.expires_in,
        }
    }

    /// Lifetime of issued tokens.
    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token for `user_id`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if the token cannot be encoded.
    pub fn issue(&self, user_id: UserId) -> Result<IssuedToken, AuthError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if it had been issued at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenLifetime` if the expiry overflows, or
    /// `AuthError::Signing` if the token cannot be encoded.
    pub fn issue_at(
        &self,
        user_id: UserId,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let lifetime = TimeDelta::from_std(self.lifetime).map_err(|_| AuthError::TokenLifetime)?;
        let expires_at = issued_at
            .checked_add_signed(lifetime)
            .ok_or(AuthError::TokenLifetime)?;

        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::Signing)?;

        tracing::debug!(user_id = %user_id, jti = %claims.jti, "Issued access token");

        Ok(IssuedToken {
            token,
            jti: claims.jti,
            expires_at,
        })
    }

    /// Verify signature and expiry, returning the claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ExpiredToken` past `exp`, and
    /// `AuthError::InvalidToken` for any other decoding failure.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })
    }
}

// =============================================================================
// Token service
// =============================================================================

/// Token validation and revocation against the blocklist.
pub struct TokenService<'a> {
    pool: &'a SqlitePool,
    keys: &'a TokenKeys,
    timeout: Duration,
}

impl<'a> TokenService<'a> {
    /// Create a new token service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, keys: &'a TokenKeys, timeout: Duration) -> Self {
        Self {
            pool,
            keys,
            timeout,
        }
    }

    /// Validate a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken`, `AuthError::ExpiredToken` or
    /// `AuthError::RevokedToken`; the last also covers tokens whose user has
    /// been deleted.
    pub async fn validate(&self, token: &str) -> Result<Principal, AuthError> {
        let principal = Principal::from_claims(self.keys.decode(token)?)?;

        db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;

            if BlocklistRepository::new(&mut conn)
                .contains(&principal.jti)
                .await?
            {
                return Err(AuthError::RevokedToken);
            }
            if UserRepository::new(&mut conn)
                .get_by_id(principal.user_id)
                .await?
                .is_none()
            {
                tracing::debug!(user_id = %principal.user_id, "Token subject no longer exists");
                return Err(AuthError::RevokedToken);
            }
            Ok(())
        })
        .await?;

        Ok(principal)
    }

    /// Check whether a token id is on the blocklist.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn is_revoked(&self, jti: &str) -> Result<bool, AuthError> {
        db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
            let revoked = BlocklistRepository::new(&mut conn).contains(jti).await?;
            Ok(revoked)
        })
        .await
    }

    /// Put a token id on the blocklist until `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AlreadyRevoked` if the id is already blocklisted.
    pub async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
            BlocklistRepository::new(&mut conn)
                .insert(jti, expires_at, Utc::now())
                .await
                .map_err(|e| match e {
                    RepositoryError::Conflict(_) => AuthError::AlreadyRevoked,
                    other => AuthError::Repository(other),
                })
        })
        .await
    }

    /// Remove blocklist entries for tokens that expired before `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        db::bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
            let purged = BlocklistRepository::new(&mut conn)
                .purge_expired(now)
                .await?;
            Ok(purged)
        })
        .await
    }
}

//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::ApiConfig;
use crate::services::notifier::{self, Notifier, NotifyError};
use crate::services::{CatalogService, TagService, TokenKeys, TokenService, UserService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: SqlitePool,
    keys: TokenKeys,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Create a new application state, with the notifier chosen from the
    /// Mailgun configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the Mailgun HTTP client cannot be built.
    pub fn new(config: ApiConfig, pool: SqlitePool) -> Result<Self, NotifyError> {
        let notifier = notifier::from_config(config.mailgun.as_ref())?;
        Ok(Self::with_notifier(config, pool, notifier))
    }

    /// Create a new application state with an explicit notifier.
    #[must_use]
    pub fn with_notifier(config: ApiConfig, pool: SqlitePool, notifier: Arc<dyn Notifier>) -> Self {
        let keys = TokenKeys::new(&config.jwt);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                keys,
                notifier,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the token signing keys.
    #[must_use]
    pub fn keys(&self) -> &TokenKeys {
        &self.inner.keys
    }

    /// Token validation and revocation.
    #[must_use]
    pub fn tokens(&self) -> TokenService<'_> {
        TokenService::new(self.pool(), self.keys(), self.inner.config.operation_timeout)
    }

    /// User lifecycle operations.
    #[must_use]
    pub fn users(&self) -> UserService<'_> {
        UserService::new(
            self.pool(),
            self.keys(),
            &self.inner.notifier,
            self.inner.config.operation_timeout,
        )
    }

    /// Tag and item/tag link operations.
    #[must_use]
    pub fn tags(&self) -> TagService<'_> {
        TagService::new(self.pool(), self.inner.config.operation_timeout)
    }

    /// Store and item operations.
    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(self.pool(), self.inner.config.operation_timeout)
    }
}

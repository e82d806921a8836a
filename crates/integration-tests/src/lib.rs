//! Integration tests for Storekeep.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storekeep-integration-tests
//! ```
//!
//! Every [`TestContext`] owns a private `SQLite` database with all migrations
//! applied, so tests run in parallel without sharing state. [`TestContext::new`]
//! uses an in-memory database on one connection; [`TestContext::on_disk`]
//! uses a file in a temporary directory with a full connection pool, for tests
//! where writers must actually race.
//!
//! # Test Categories
//!
//! - `users` - Registration, login, logout, lookup and deletion
//! - `tokens` - Token validation and the revocation blocklist
//! - `tags` - Store-scoped tags and item links
//! - `catalog` - Stores and items
//! - `http` - The router end to end, driven in-process

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tempfile::TempDir;

use storekeep_api::config::ApiConfig;
use storekeep_api::models::{Item, Store, User};
use storekeep_api::services::{NewItem, Notifier, NotifyError, Principal};
use storekeep_api::state::AppState;
use storekeep_api::{app, db};
use storekeep_core::{Email, Price, StoreId};

/// High-entropy signing secret accepted by config validation.
pub const TEST_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

/// A message captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Notifier that keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingNotifier {
    /// Messages sent so far.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait until at least `count` messages were sent, or give up after a second.
    pub async fn wait_for(&self, count: usize) -> Vec<SentMessage> {
        for _ in 0..100 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &Email, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Notifier whose every send fails, as an unreachable mail provider would.
#[derive(Debug, Default)]
pub struct FailingNotifier {
    attempts: AtomicUsize,
}

impl FailingNotifier {
    /// Number of sends attempted so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` sends were attempted, or give up after a second.
    pub async fn wait_for(&self, count: usize) -> usize {
        for _ in 0..100 {
            if self.attempts() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.attempts()
    }
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _recipient: &Email, _subject: &str, _body: &str) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError::Api {
            status: 503,
            message: "mail provider unavailable".to_string(),
        })
    }
}

/// Shared fixture: application state over a fresh database.
pub struct TestContext {
    pub state: AppState,
    pub notifier: Arc<RecordingNotifier>,
    // Keeps the database file alive for on-disk contexts.
    _db_dir: Option<TempDir>,
}

impl TestContext {
    /// Create a context with default test configuration.
    pub async fn new() -> Self {
        Self::with_vars(&[]).await
    }

    /// Create a context, overriding configuration variables.
    pub async fn with_vars(overrides: &[(&str, &str)]) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let state = build_state(test_config(overrides), notifier.clone()).await;

        Self {
            state,
            notifier,
            _db_dir: None,
        }
    }

    /// Create a context backed by a database file with a multi-connection pool.
    pub async fn on_disk() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("storekeep.db").display());

        let notifier = Arc::new(RecordingNotifier::default());
        let state = build_state(test_config(&[("DATABASE_URL", url.as_str())]), notifier.clone()).await;

        Self {
            state,
            notifier,
            _db_dir: Some(dir),
        }
    }

    /// Create a context whose notifier fails every send.
    pub async fn with_failing_notifier() -> (Self, Arc<FailingNotifier>) {
        let failing = Arc::new(FailingNotifier::default());
        let state = build_state(test_config(&[]), failing.clone()).await;

        let ctx = Self {
            state,
            notifier: Arc::new(RecordingNotifier::default()),
            _db_dir: None,
        };
        (ctx, failing)
    }

    /// The full router, including middleware.
    pub fn router(&self) -> Router {
        app(self.state.clone())
    }

    /// Register `username` with password "correct" and log in.
    ///
    /// Returns the user, the validated principal and the raw bearer token.
    pub async fn signed_in(&self, username: &str) -> (User, Principal, String) {
        let user = self
            .state
            .users()
            .register(username, "correct", None)
            .await
            .unwrap();
        let issued = self.state.users().login(username, "correct").await.unwrap();
        let principal = self.state.tokens().validate(&issued.token).await.unwrap();
        (user, principal, issued.token)
    }

    /// Create a store.
    pub async fn store(&self, principal: &Principal, name: &str) -> Store {
        self.state
            .catalog()
            .create_store(principal, name)
            .await
            .unwrap()
    }

    /// Create an item priced 9.99 in `store_id`.
    pub async fn item(&self, principal: &Principal, store_id: StoreId, name: &str) -> Item {
        self.state
            .catalog()
            .create_item(
                principal,
                NewItem {
                    name: name.to_string(),
                    price: "9.99".parse::<Price>().unwrap(),
                    store_id,
                },
            )
            .await
            .unwrap()
    }
}

/// Connect, migrate and build application state around `notifier`.
async fn build_state(config: ApiConfig, notifier: Arc<dyn Notifier>) -> AppState {
    let pool = db::create_pool(&config.database_url).await.unwrap();
    db::migrate(&pool).await.unwrap();
    AppState::with_notifier(config, pool, notifier)
}

/// Configuration for tests: in-memory database and a valid signing secret.
pub fn test_config(overrides: &[(&str, &str)]) -> ApiConfig {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("DATABASE_URL".to_string(), "sqlite::memory:".to_string()),
        ("JWT_SECRET_KEY".to_string(), TEST_SECRET.to_string()),
    ]);
    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }

    ApiConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (database round-trip)
//!
//! # Users
//! POST   /register                  - Create an account
//! POST   /login                     - Exchange credentials for an access token
//! POST   /logout                    - Revoke the current token (auth)
//! GET    /user/{id}                 - Get a user (auth)
//! DELETE /user/{id}                 - Delete a user (auth)
//!
//! # Stores
//! GET    /store                     - List stores
//! POST   /store                     - Create a store (auth)
//! GET    /store/{id}                - Store with its items and tags
//! DELETE /store/{id}                - Delete a store and everything it owns (auth)
//!
//! # Items
//! GET    /item                      - List items
//! POST   /item                      - Create an item (auth)
//! GET    /item/{id}                 - Item with its tags
//! PUT    /item/{id}                 - Update or create an item (auth)
//! DELETE /item/{id}                 - Delete an item (auth)
//!
//! # Tags (all auth)
//! GET    /store/{id}/tag            - Tags of a store
//! POST   /store/{id}/tag            - Create a tag in a store
//! POST   /item/{id}/tag/{tag_id}    - Link a tag to an item
//! DELETE /item/{id}/tag/{tag_id}    - Unlink a tag from an item
//! GET    /tag                       - List all tags
//! GET    /tag/{id}                  - Tag with its items
//! DELETE /tag/{id}                  - Delete an unlinked tag
//! ```

pub mod items;
pub mod stores;
pub mod tags;
pub mod users;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

// =============================================================================
// Extractors and shared responses
// =============================================================================

/// JSON body extractor whose rejection is a JSON [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path extractor whose rejection is a JSON [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// `{"message": ...}` response body.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

impl Message {
    #[must_use]
    pub const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route("/user/{id}", get(users::show).delete(users::delete))
}

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/store", get(stores::index).post(stores::create))
        .route("/store/{id}", get(stores::show).delete(stores::delete))
}

/// Create the item routes router.
pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/item", get(items::index).post(items::create))
        .route(
            "/item/{id}",
            get(items::show).put(items::put).delete(items::delete),
        )
}

/// Create the tag routes router.
pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/store/{id}/tag",
            get(tags::index_in_store).post(tags::create_in_store),
        )
        .route(
            "/item/{id}/tag/{tag_id}",
            post(tags::link).delete(tags::unlink),
        )
        .route("/tag", get(tags::index))
        .route("/tag/{id}", get(tags::show).delete(tags::delete))
}

/// Create the health check router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .merge(user_routes())
        .merge(store_routes())
        .merge(item_routes())
        .merge(tag_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

//! Store route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use storekeep_core::StoreId;

use super::{AppJson, AppPath, Message};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Store, StoreDetail};
use crate::state::AppState;

/// Store creation payload.
#[derive(Debug, Deserialize)]
pub struct StoreRequest {
    pub name: String,
}

/// `GET /store`
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Store>>> {
    Ok(Json(state.catalog().list_stores().await?))
}

/// `POST /store`
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppJson(payload): AppJson<StoreRequest>,
) -> Result<(StatusCode, Json<Store>)> {
    let store = state
        .catalog()
        .create_store(&principal, &payload.name)
        .await?;
    Ok((StatusCode::CREATED, Json(store)))
}

/// `GET /store/{id}`
pub async fn show(
    State(state): State<AppState>,
    AppPath(id): AppPath<StoreId>,
) -> Result<Json<StoreDetail>> {
    Ok(Json(state.catalog().get_store(id).await?))
}

/// `DELETE /store/{id}`
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(id): AppPath<StoreId>,
) -> Result<Json<Message>> {
    state.catalog().delete_store(&principal, id).await?;
    Ok(Json(Message::new("Store deleted.")))
}

//! Item route handlers.

use axum::{Json, extract::State, http::StatusCode};

use storekeep_core::ItemId;

use super::{AppJson, AppPath, Message};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Item, ItemDetail};
use crate::services::{ItemUpdate, NewItem};
use crate::state::AppState;

/// `GET /item`
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Item>>> {
    Ok(Json(state.catalog().list_items().await?))
}

/// `POST /item`
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppJson(payload): AppJson<NewItem>,
) -> Result<(StatusCode, Json<Item>)> {
    let item = state.catalog().create_item(&principal, payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /item/{id}`
pub async fn show(
    State(state): State<AppState>,
    AppPath(id): AppPath<ItemId>,
) -> Result<Json<ItemDetail>> {
    Ok(Json(state.catalog().get_item(id).await?))
}

/// `PUT /item/{id}`
pub async fn put(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(id): AppPath<ItemId>,
    AppJson(payload): AppJson<ItemUpdate>,
) -> Result<Json<Item>> {
    let item = state.catalog().put_item(&principal, id, payload).await?;
    Ok(Json(item))
}

/// `DELETE /item/{id}`
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(id): AppPath<ItemId>,
) -> Result<Json<Message>> {
    state.catalog().delete_item(&principal, id).await?;
    Ok(Json(Message::new("Item deleted.")))
}

//! Tag route handlers. Every route requires a bearer token.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use storekeep_core::{ItemId, StoreId, TagId};

use super::{AppJson, AppPath, Message};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Item, Tag, TagDetail};
use crate::state::AppState;

/// Tag creation payload.
#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub name: String,
}

/// Response for `DELETE /item/{id}/tag/{tag_id}`.
#[derive(Debug, Serialize)]
pub struct UnlinkResponse {
    pub message: &'static str,
    pub item: Item,
    pub tag: Tag,
}

/// `GET /store/{id}/tag`
pub async fn index_in_store(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(store_id): AppPath<StoreId>,
) -> Result<Json<Vec<Tag>>> {
    Ok(Json(state.tags().list_tags(&principal, store_id).await?))
}

/// `POST /store/{id}/tag`
pub async fn create_in_store(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(store_id): AppPath<StoreId>,
    AppJson(payload): AppJson<TagRequest>,
) -> Result<(StatusCode, Json<Tag>)> {
    let tag = state
        .tags()
        .create_tag(&principal, store_id, &payload.name)
        .await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// `POST /item/{id}/tag/{tag_id}`
pub async fn link(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath((item_id, tag_id)): AppPath<(ItemId, TagId)>,
) -> Result<(StatusCode, Json<Tag>)> {
    let tag = state
        .tags()
        .link_tag_to_item(&principal, item_id, tag_id)
        .await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// `DELETE /item/{id}/tag/{tag_id}`
pub async fn unlink(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath((item_id, tag_id)): AppPath<(ItemId, TagId)>,
) -> Result<Json<UnlinkResponse>> {
    let (item, tag) = state
        .tags()
        .unlink_tag_from_item(&principal, item_id, tag_id)
        .await?;

    Ok(Json(UnlinkResponse {
        message: "Item removed from tag",
        item,
        tag,
    }))
}

/// `GET /tag`
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<Vec<Tag>>> {
    Ok(Json(state.tags().list_all_tags(&principal).await?))
}

/// `GET /tag/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(tag_id): AppPath<TagId>,
) -> Result<Json<TagDetail>> {
    Ok(Json(state.tags().get_tag(&principal, tag_id).await?))
}

/// `DELETE /tag/{id}`
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(tag_id): AppPath<TagId>,
) -> Result<(StatusCode, Json<Message>)> {
    state.tags().delete_tag(&principal, tag_id).await?;
    Ok((StatusCode::ACCEPTED, Json(Message::new("Tag deleted"))))
}

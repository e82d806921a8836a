//! User route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use storekeep_core::UserId;

use super::{AppJson, AppPath, Message};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::state::AppState;

/// Registration payload.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Login payload.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Message>)> {
    state
        .users()
        .register(&payload.username, &payload.password, payload.email.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Message::new("User created successfully.")),
    ))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let issued = state
        .users()
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(TokenResponse {
        access_token: issued.token,
    }))
}

/// `POST /logout`
pub async fn logout(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
) -> Result<Json<Message>> {
    state.users().logout(&principal).await?;
    Ok(Json(Message::new("Successfully logged out.")))
}

/// `GET /user/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(id): AppPath<UserId>,
) -> Result<Json<User>> {
    let user = state.users().get_user(&principal, id).await?;
    Ok(Json(user))
}

/// `DELETE /user/{id}`
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(principal): RequireAuth,
    AppPath(id): AppPath<UserId>,
) -> Result<Json<Message>> {
    state.users().delete_user(&principal, id).await?;
    Ok(Json(Message::new("User deleted successfully.")))
}

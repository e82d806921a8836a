//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//!
//! Every error response has a JSON body `{"message": ..., "error": <code>}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, CatalogError, TagError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication or user operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Tag operation failed.
    #[error("Tag error: {0}")]
    Tag(#[from] TagError),

    /// Store or item operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// No bearer token on a protected route.
    #[error("Request does not contain an access token.")]
    AuthRequired,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    error: &'static str,
}

impl AppError {
    /// Whether this error is the server's fault.
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Auth(
                    AuthError::Repository(_)
                        | AuthError::Signing(_)
                        | AuthError::TokenLifetime
                        | AuthError::PasswordHash
                )
                | Self::Tag(TagError::Repository(_))
                | Self::Catalog(CatalogError::Repository(_))
        )
    }

    /// HTTP status and stable error code.
    const fn status_and_code(&self) -> (StatusCode, &'static str) {
        const NOT_FOUND: (StatusCode, &str) = (StatusCode::NOT_FOUND, "not_found");
        const CONFLICT: (StatusCode, &str) = (StatusCode::CONFLICT, "conflict");
        const BAD_REQUEST: (StatusCode, &str) = (StatusCode::BAD_REQUEST, "bad_request");
        const INTERNAL: (StatusCode, &str) = (StatusCode::INTERNAL_SERVER_ERROR, "internal_error");

        if self.is_server_error() {
            return INTERNAL;
        }

        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidUsername(_)
                | AuthError::InvalidEmail(_)
                | AuthError::EmptyPassword => BAD_REQUEST,
                AuthError::UsernameTaken | AuthError::EmailTaken | AuthError::AlreadyRevoked => {
                    CONFLICT
                }
                AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
                AuthError::UserNotFound => NOT_FOUND,
                AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
                AuthError::ExpiredToken => (StatusCode::UNAUTHORIZED, "token_expired"),
                AuthError::RevokedToken => (StatusCode::UNAUTHORIZED, "token_revoked"),
                _ => INTERNAL,
            },
            Self::Tag(err) => match err {
                TagError::InvalidName(_) | TagError::StoreMismatch => BAD_REQUEST,
                TagError::StoreNotFound | TagError::ItemNotFound | TagError::TagNotFound => {
                    NOT_FOUND
                }
                TagError::DuplicateName => CONFLICT,
                TagError::InUse => (StatusCode::BAD_REQUEST, "blocked"),
                TagError::Repository(_) => INTERNAL,
            },
            Self::Catalog(err) => match err {
                CatalogError::InvalidName(_) | CatalogError::MissingField(_) => BAD_REQUEST,
                CatalogError::StoreNotFound | CatalogError::ItemNotFound => NOT_FOUND,
                CatalogError::DuplicateStore => CONFLICT,
                CatalogError::Repository(_) => INTERNAL,
            },
            Self::AuthRequired => (StatusCode::UNAUTHORIZED, "authorization_required"),
            Self::NotFound(_) => NOT_FOUND,
            Self::BadRequest(_) => BAD_REQUEST,
            Self::Database(_) | Self::Internal(_) => INTERNAL,
        }
    }

    /// Client-facing message. Internal details never leave the server.
    fn message(&self) -> String {
        if self.is_server_error() {
            return "Internal server error".to_string();
        }

        match self {
            Self::Auth(err) => err.to_string(),
            Self::Tag(err) => err.to_string(),
            Self::Catalog(err) => err.to_string(),
            Self::NotFound(msg) | Self::BadRequest(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (status, code) = self.status_and_code();
        let body = ErrorBody {
            message: self.message(),
            error: code,
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn get_body(err: AppError) -> serde_json::Value {
        let bytes = err
            .into_response()
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("store 3".to_string());
        assert_eq!(err.to_string(), "Not found: store 3");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(AppError::AuthRequired), StatusCode::UNAUTHORIZED);
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_domain_error_status_codes() {
        assert_eq!(
            get_status(AuthError::UsernameTaken.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthError::UserNotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(get_status(TagError::InUse.into()), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(TagError::DuplicateName.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(TagError::StoreMismatch.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CatalogError::MissingField("price").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RepositoryError::Timeout(std::time::Duration::from_secs(5)).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_token_error_codes() {
        assert_eq!(
            get_body(AuthError::ExpiredToken.into()).await["error"],
            "token_expired"
        );
        assert_eq!(
            get_body(AuthError::RevokedToken.into()).await["error"],
            "token_revoked"
        );
        assert_eq!(
            get_body(AuthError::InvalidToken.into()).await["error"],
            "invalid_token"
        );
        assert_eq!(
            get_body(AppError::AuthRequired).await["error"],
            "authorization_required"
        );
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let err: AppError = TagError::Repository(RepositoryError::DataCorruption(
            "bad row in tags".to_string(),
        ))
        .into();
        let body = get_body(err).await;

        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["error"], "internal_error");
    }

    #[tokio::test]
    async fn test_blocked_body() {
        let body = get_body(TagError::InUse.into()).await;

        assert_eq!(body["error"], "blocked");
        assert!(body["message"].as_str().unwrap().starts_with("Could not delete tag"));
    }
}

//! Request ID middleware for request tracing and correlation.
//!
//! Every request carries an id, taken from an upstream `x-request-id` header
//! when present and generated otherwise. The id is recorded on the tracing
//! span, tagged on the Sentry scope, and echoed on the response.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header carrying the request id.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest upstream id accepted before a fresh one is generated.
const MAX_UPSTREAM_ID_LEN: usize = 128;

/// Request id, also available to handlers as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Middleware that ensures every request has a request id.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = upstream_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), value);
    }

    response
}

fn upstream_id(request: &Request) -> Option<String> {
    let value = request.headers().get(&REQUEST_ID_HEADER)?.to_str().ok()?;
    let value = value.trim();
    (!value.is_empty() && value.len() <= MAX_UPSTREAM_ID_LEN).then(|| value.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;

    use super::*;

    #[test]
    fn test_upstream_id_used() {
        let request = Request::builder()
            .header("x-request-id", "edge-42")
            .body(Body::empty())
            .unwrap();
        assert_eq!(upstream_id(&request).as_deref(), Some("edge-42"));
    }

    #[test]
    fn test_oversized_upstream_id_ignored() {
        let request = Request::builder()
            .header("x-request-id", "a".repeat(MAX_UPSTREAM_ID_LEN + 1))
            .body(Body::empty())
            .unwrap();
        assert_eq!(upstream_id(&request), None);
    }
}

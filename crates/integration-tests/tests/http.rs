//! End-to-end tests through the router, driven in-process with `oneshot`.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use storekeep_integration_tests::TestContext;

/// Send a request and return the status with the decoded JSON body.
///
/// Non-JSON bodies come back as a JSON string.
async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

/// Register and log in over HTTP, returning the access token.
async fn login(router: &Router, username: &str) -> String {
    let credentials = json!({ "username": username, "password": "hunter2" });
    let (status, _) = send(router, "POST", "/register", None, Some(credentials.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(router, "POST", "/login", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new().await;
    let router = ctx.router();

    let (status, body) = send(&router, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));

    let (status, _) = send(&router, "GET", "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let ctx = TestContext::new().await;

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = ctx.router().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "abc-123"
    );
}

#[tokio::test]
async fn test_register_and_login_flow() {
    let ctx = TestContext::new().await;
    let router = ctx.router();

    let (status, body) = send(
        &router,
        "POST",
        "/register",
        None,
        Some(json!({ "username": "alice", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User created successfully.");

    let (status, body) = send(
        &router,
        "POST",
        "/register",
        None,
        Some(json!({ "username": "alice", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
    assert_eq!(body["message"], "A user with that username already exists.");

    let (status, body) = send(
        &router,
        "POST",
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");

    let (status, body) = send(
        &router,
        "POST",
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
}

#[tokio::test]
async fn test_register_returns_created_when_notifier_fails() {
    let (ctx, notifier) = TestContext::with_failing_notifier().await;
    let router = ctx.router();

    let (status, body) = send(
        &router,
        "POST",
        "/register",
        None,
        Some(json!({ "username": "ivan", "password": "pw", "email": "ivan@shop.test" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User created successfully.");
    assert_eq!(notifier.wait_for(1).await, 1);

    let (status, body) = send(
        &router,
        "POST",
        "/login",
        None,
        Some(json!({ "username": "ivan", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let ctx = TestContext::new().await;
    let router = ctx.router();

    let (status, body) = send(
        &router,
        "POST",
        "/store",
        None,
        Some(json!({ "name": "Corner" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "authorization_required");
    assert!(body["message"].is_string());

    let (status, body) = send(&router, "GET", "/tag", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_logout_then_token_is_revoked() {
    let ctx = TestContext::new().await;
    let router = ctx.router();
    let token = login(&router, "alice").await;

    let (status, body) = send(&router, "POST", "/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully logged out.");

    let (status, body) = send(&router, "POST", "/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token_revoked");
}

#[tokio::test]
async fn test_bad_json_body() {
    let ctx = TestContext::new().await;
    let router = ctx.router();

    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "bad_request");

    let (status, body) = send(
        &router,
        "POST",
        "/register",
        None,
        Some(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_bad_path_parameter() {
    let ctx = TestContext::new().await;

    let (status, body) = send(&ctx.router(), "GET", "/store/abc", None, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_store_item_tag_lifecycle() {
    let ctx = TestContext::new().await;
    let router = ctx.router();
    let token = login(&router, "alice").await;
    let auth = Some(token.as_str());

    let (status, store) = send(&router, "POST", "/store", auth, Some(json!({ "name": "Corner" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let store_id = store["id"].as_i64().unwrap();

    let (status, item) = send(
        &router,
        "POST",
        "/item",
        auth,
        Some(json!({ "name": "Chair", "price": "19.99", "store_id": store_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let item_id = item["id"].as_i64().unwrap();

    let (status, tag) = send(
        &router,
        "POST",
        &format!("/store/{store_id}/tag"),
        auth,
        Some(json!({ "name": "sale" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let tag_id = tag["id"].as_i64().unwrap();

    let (status, _) = send(
        &router,
        "POST",
        &format!("/store/{store_id}/tag"),
        auth,
        Some(json!({ "name": "sale" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let link_uri = format!("/item/{item_id}/tag/{tag_id}");
    let (status, _) = send(&router, "POST", &link_uri, auth, None).await;
    assert_eq!(status, StatusCode::CREATED);

    // Public read shows the link
    let (status, detail) = send(&router, "GET", &format!("/item/{item_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["tags"][0]["name"], "sale");

    let tag_uri = format!("/tag/{tag_id}");
    let (status, body) = send(&router, "DELETE", &tag_uri, auth, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "blocked");

    let (status, body) = send(&router, "DELETE", &link_uri, auth, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Item removed from tag");
    assert_eq!(body["item"]["id"], item_id);

    let (status, body) = send(&router, "DELETE", &tag_uri, auth, None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "Tag deleted");

    let (status, body) = send(&router, "GET", &tag_uri, auth, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = send(&router, "DELETE", &format!("/store/{store_id}"), auth, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Store deleted.");

    let (status, items) = send(&router, "GET", "/item", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(items, json!([]));
}

#[tokio::test]
async fn test_put_item_over_http() {
    let ctx = TestContext::new().await;
    let router = ctx.router();
    let token = login(&router, "alice").await;
    let auth = Some(token.as_str());

    let (_, store) = send(&router, "POST", "/store", auth, Some(json!({ "name": "Corner" }))).await;
    let store_id = store["id"].as_i64().unwrap();

    let (status, body) = send(
        &router,
        "PUT",
        "/item/7",
        auth,
        Some(json!({ "name": "Lamp" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, item) = send(
        &router,
        "PUT",
        "/item/7",
        auth,
        Some(json!({ "name": "Lamp", "price": "4.50", "store_id": store_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["id"], 7);
    assert_eq!(item["name"], "Lamp");
}

#[tokio::test]
async fn test_user_routes() {
    let ctx = TestContext::new().await;
    let router = ctx.router();
    let token = login(&router, "alice").await;
    let principal = ctx.state.tokens().validate(&token).await.unwrap();
    let id = principal.user_id();

    let (status, body) = send(&router, "GET", &format!("/user/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert!(body.get("password_hash").is_none());

    let (status, body) = send(&router, "DELETE", &format!("/user/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully.");

    let (status, body) = send(&router, "GET", &format!("/user/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token_revoked");
}

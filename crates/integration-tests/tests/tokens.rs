//! Integration tests for token validation and the revocation blocklist.

#![allow(clippy::unwrap_used)]

use chrono::{TimeDelta, Utc};

use storekeep_api::db::BlocklistRepository;
use storekeep_api::services::AuthError;
use storekeep_core::UserId;
use storekeep_integration_tests::{TEST_SECRET, TestContext};

#[tokio::test]
async fn test_valid_token_yields_principal() {
    let ctx = TestContext::new().await;
    let (alice, _, token) = ctx.signed_in("alice").await;

    let principal = ctx.state.tokens().validate(&token).await.unwrap();

    assert_eq!(principal.user_id(), alice.id);
    assert!(principal.expires_at() > Utc::now());
    assert!(!ctx.state.tokens().is_revoked(principal.jti()).await.unwrap());
}

#[tokio::test]
async fn test_expired_token() {
    let ctx = TestContext::new().await;
    let (alice, _, _) = ctx.signed_in("alice").await;

    let stale = ctx
        .state
        .keys()
        .issue_at(alice.id, Utc::now() - TimeDelta::hours(2))
        .unwrap();

    assert!(matches!(
        ctx.state.tokens().validate(&stale.token).await,
        Err(AuthError::ExpiredToken)
    ));
}

#[tokio::test]
async fn test_token_from_other_secret_is_invalid() {
    let ctx = TestContext::new().await;
    let (alice, _, _) = ctx.signed_in("alice").await;

    assert_ne!(TEST_SECRET, "Zq8%wE1@rT5^yU3&iO7*pA2!sD6#fG4$");
    let other = TestContext::with_vars(&[("JWT_SECRET_KEY", "Zq8%wE1@rT5^yU3&iO7*pA2!sD6#fG4$")])
        .await;
    let foreign = other.state.keys().issue(alice.id).unwrap();

    assert!(matches!(
        ctx.state.tokens().validate(&foreign.token).await,
        Err(AuthError::InvalidToken)
    ));
    assert!(matches!(
        ctx.state.tokens().validate("not.a.token").await,
        Err(AuthError::InvalidToken)
    ));
}

#[tokio::test]
async fn test_token_for_missing_user_is_revoked() {
    let ctx = TestContext::new().await;

    let orphan = ctx.state.keys().issue(UserId::new(4242)).unwrap();

    assert!(matches!(
        ctx.state.tokens().validate(&orphan.token).await,
        Err(AuthError::RevokedToken)
    ));
}

#[tokio::test]
async fn test_revoke_twice_conflicts() {
    let ctx = TestContext::new().await;
    let tokens = ctx.state.tokens();
    let expires_at = Utc::now() + TimeDelta::minutes(15);

    tokens.revoke("jti-1", expires_at).await.unwrap();
    assert!(tokens.is_revoked("jti-1").await.unwrap());
    assert!(matches!(
        tokens.revoke("jti-1", expires_at).await,
        Err(AuthError::AlreadyRevoked)
    ));
}

#[tokio::test]
async fn test_purge_removes_only_expired_rows() {
    let ctx = TestContext::new().await;
    let now = Utc::now();

    {
        let mut conn = ctx.state.pool().acquire().await.unwrap();
        let mut blocklist = BlocklistRepository::new(&mut conn);
        blocklist
            .insert("expired", now - TimeDelta::minutes(5), now - TimeDelta::minutes(20))
            .await
            .unwrap();
        blocklist
            .insert("live", now + TimeDelta::minutes(5), now)
            .await
            .unwrap();
    }

    let purged = ctx.state.tokens().purge_expired(now).await.unwrap();

    assert_eq!(purged, 1);
    assert!(!ctx.state.tokens().is_revoked("expired").await.unwrap());
    assert!(ctx.state.tokens().is_revoked("live").await.unwrap());
}

#[tokio::test]
async fn test_purge_keeps_logged_out_token_rejected_until_expiry() {
    let ctx = TestContext::new().await;
    let (_, principal, token) = ctx.signed_in("alice").await;

    ctx.state.users().logout(&principal).await.unwrap();
    let purged = ctx.state.tokens().purge_expired(Utc::now()).await.unwrap();

    assert_eq!(purged, 0);
    assert!(matches!(
        ctx.state.tokens().validate(&token).await,
        Err(AuthError::RevokedToken)
    ));
}

//! Tests for the refresh-cookie flow.

mod common;

use axum::http::StatusCode;
use common::{cookie_request, empty_request, test_app};
use jsonwebtoken::{EncodingKey, Header};
use notekeep::db::Role;
use notekeep::jwt::{RefreshClaims, TokenType};
use std::time::{SystemTime, UNIX_EPOCH};

#[tokio::test]
async fn test_refresh_without_cookie() {
    let app = test_app().await;

    let response = app.send(empty_request("GET", "/auth/refresh", None)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_with_invalid_token() {
    let app = test_app().await;
    app.seed_account("alice", "pw", &[Role::Employee]).await;
    let access = app.token_for("alice", &[Role::Employee]);

    for token in ["garbage", access.as_str()] {
        let response = app.send(cookie_request("GET", "/auth/refresh", token)).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.message(), "Invalid or expired token");
    }
}

#[tokio::test]
async fn test_refresh_with_expired_token() {
    let app = test_app().await;
    app.seed_account("alice", "pw", &[Role::Employee]).await;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = RefreshClaims {
        username: "alice".to_string(),
        token_type: TokenType::Refresh,
        iat: now - 1000,
        exp: now - 100,
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(common::REFRESH_SECRET),
    )
    .unwrap();

    // The cookie may outlive the token; the token's own expiry wins.
    let response = app.send(cookie_request("GET", "/auth/refresh", &token)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_refresh_carries_current_roles() {
    let app = test_app().await;
    let uuid = app.seed_account("alice", "pw", &[Role::Employee]).await;
    let (_, refresh) = app.login("alice", "pw").await;

    let account = app.db.accounts().get_by_uuid(&uuid).await.unwrap().unwrap();
    app.db
        .accounts()
        .set_roles(account.id, &[Role::Employee, Role::Admin])
        .await
        .unwrap();

    let response = app.send(cookie_request("GET", "/auth/refresh", &refresh)).await;
    assert_eq!(response.status, StatusCode::OK);

    let token = response.json["accessToken"].as_str().unwrap();
    let claims = app.jwt.validate_access_token(token).unwrap();
    assert_eq!(claims.user_info.username, "alice");
    assert_eq!(claims.user_info.roles, vec![Role::Employee, Role::Admin]);

    // The new token opens routes the old roles could not.
    let response = app.send(empty_request("GET", "/accounts", Some(token))).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_for_deleted_account() {
    let app = test_app().await;
    let uuid = app.seed_account("alice", "pw", &[Role::Employee]).await;
    let (_, refresh) = app.login("alice", "pw").await;

    let account = app.db.accounts().get_by_uuid(&uuid).await.unwrap().unwrap();
    app.db.accounts().delete(account.id).await.unwrap();

    let response = app.send(cookie_request("GET", "/auth/refresh", &refresh)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.json.get("accessToken").is_none());
}

#[tokio::test]
async fn test_refresh_for_deactivated_account() {
    let app = test_app().await;
    let uuid = app.seed_account("alice", "pw", &[Role::Employee]).await;
    let (_, refresh) = app.login("alice", "pw").await;

    let account = app.db.accounts().get_by_uuid(&uuid).await.unwrap().unwrap();
    app.db.accounts().set_active(account.id, false).await.unwrap();

    let response = app.send(cookie_request("GET", "/auth/refresh", &refresh)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = test_app().await;
    app.seed_account("alice", "pw", &[Role::Admin]).await;
    let (access, refresh) = app.login("alice", "pw").await;

    let response = app.send(empty_request("GET", "/accounts", Some(&refresh))).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app.send(empty_request("GET", "/accounts", Some(&access))).await;
    assert_eq!(response.status, StatusCode::OK);
}

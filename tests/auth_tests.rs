//! Tests for login, logout and the bearer token gate.

mod common;

use axum::http::StatusCode;
use common::{cookie_request, empty_request, json_request, test_app};
use jsonwebtoken::{EncodingKey, Header};
use notekeep::db::Role;
use notekeep::jwt::{AccessClaims, IdentityClaims, TokenType};
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

fn login_body(username: &str, password: &str) -> serde_json::Value {
    json!({"username": username, "password": password})
}

#[tokio::test]
async fn test_login_success_returns_token_and_cookie() {
    let app = test_app().await;
    app.seed_account("alice", "correct horse", &[Role::Employee, Role::Manager])
        .await;

    let response = app
        .send(json_request(
            "POST",
            "/auth",
            None,
            login_body("alice", "correct horse"),
        ))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let token = response.json["accessToken"].as_str().unwrap();
    assert!(!token.is_empty());

    let claims = app.jwt.validate_access_token(token).unwrap();
    assert_eq!(claims.user_info.username, "alice");
    assert_eq!(claims.user_info.roles, vec![Role::Employee, Role::Manager]);

    let cookie = response.set_cookie().unwrap();
    assert!(cookie.starts_with("jwt="));
    for attribute in ["HttpOnly", "Secure", "SameSite=None", "Path=/", "Max-Age=86400"] {
        assert!(cookie.contains(attribute), "missing {} in {}", attribute, cookie);
    }

    let refresh = cookie
        .strip_prefix("jwt=")
        .and_then(|c| c.split(';').next())
        .unwrap();
    assert_eq!(
        app.jwt.validate_refresh_token(refresh).unwrap().username,
        "alice"
    );
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = test_app().await;
    app.seed_account("alice", "correct horse", &[Role::Employee])
        .await;
    let inactive = app
        .seed_account("bob", "battery staple", &[Role::Employee])
        .await;
    let bob = app.db.accounts().get_by_uuid(&inactive).await.unwrap().unwrap();
    app.db.accounts().set_active(bob.id, false).await.unwrap();

    let attempts = [
        login_body("alice", "wrong"),
        login_body("nobody", "correct horse"),
        login_body("bob", "battery staple"),
        // Lookup is exact, not folded.
        login_body("ALICE", "correct horse"),
    ];

    for body in attempts {
        let response = app.send(json_request("POST", "/auth", None, body.clone())).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "body: {}", body);
        assert_eq!(response.json, json!({"message": "Unauthorized", "kind": "unauthorized"}));
        assert!(response.set_cookie().is_none());
    }
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let app = test_app().await;

    for body in [
        json!({"username": "alice"}),
        json!({"password": "pw"}),
        json!({"username": "", "password": "pw"}),
        json!({}),
    ] {
        let response = app.send(json_request("POST", "/auth", None, body)).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.message(), "All fields are required");
    }
}

#[tokio::test]
async fn test_login_malformed_json() {
    let app = test_app().await;

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/auth")
        .header("x-forwarded-for", common::CLIENT_IP)
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["kind"], "validation");
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let app = test_app().await;
    app.seed_account("alice", "pw", &[Role::Employee]).await;
    let (_, refresh) = app.login("alice", "pw").await;

    let first = app.send(cookie_request("POST", "/auth/logout", &refresh)).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.message(), "Cookie cleared");
    assert_eq!(
        first.set_cookie(),
        Some("jwt=; HttpOnly; Secure; SameSite=None; Path=/; Max-Age=0")
    );

    // The client dropped the cookie; a second logout has nothing to clear.
    let second = app.send(empty_request("POST", "/auth/logout", None)).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.message(), "No refresh token to delete");
    assert!(second.set_cookie().is_none());
}

#[tokio::test]
async fn test_delete_auth_also_logs_out() {
    let app = test_app().await;

    let response = app.send(cookie_request("DELETE", "/auth", "anything")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.message(), "Cookie cleared");

    let response = app.send(empty_request("DELETE", "/auth", None)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.message(), "No refresh token to delete");
}

#[tokio::test]
async fn test_gate_rejects_missing_or_malformed_header() {
    let app = test_app().await;

    let response = app.send(empty_request("GET", "/records", None)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let request = axum::http::Request::builder()
        .uri("/records")
        .header("authorization", "Token abc")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json["kind"], "unauthorized");
}

#[tokio::test]
async fn test_gate_rejects_invalid_tokens() {
    let app = test_app().await;
    let refresh = app.refresh_token_for("alice");

    for token in ["garbage", refresh.as_str()] {
        let response = app.send(empty_request("GET", "/records", Some(token))).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.message(), "Invalid or expired token");
    }
}

#[tokio::test]
async fn test_gate_rejects_expired_token() {
    let app = test_app().await;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = AccessClaims {
        user_info: IdentityClaims {
            username: "alice".to_string(),
            roles: vec![Role::Admin],
        },
        token_type: TokenType::Access,
        iat: now - 120,
        exp: now - 60,
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(common::ACCESS_SECRET),
    )
    .unwrap();

    let response = app.send(empty_request("GET", "/accounts", Some(&token))).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.message(), "Invalid or expired token");
}

#[tokio::test]
async fn test_rejected_request_has_no_side_effects() {
    let app = test_app().await;
    let owner = app.seed_account("alice", "pw", &[Role::Employee]).await;

    let body = json!({"owner": owner, "title": "Sneaky", "text": "should not exist"});
    for token in [None, Some("garbage")] {
        let response = app.send(json_request("POST", "/records", token, body.clone())).await;
        assert!(matches!(
            response.status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ));
    }

    assert!(app.db.records().list().await.unwrap().is_empty());
}

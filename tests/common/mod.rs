#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use notekeep::{
    ServerConfig,
    cli::IpSource,
    create_app,
    db::{Database, Role},
    jwt::{JwtConfig, TokenLifetimes},
    password::hash_password,
    rate_limit::LoginLimit,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const ACCESS_SECRET: &[u8] = b"integration-access-secret-0123456789";
pub const REFRESH_SECRET: &[u8] = b"integration-refresh-secret-0123456789";

/// Minimum bcrypt cost keeps the tests fast.
pub const TEST_COST: u32 = 4;

/// Client address sent with every request unless a test overrides it.
pub const CLIENT_IP: &str = "198.51.100.10";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: serde_json::Value,
}

impl TestResponse {
    pub fn message(&self) -> &str {
        self.json["message"].as_str().unwrap_or_default()
    }

    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }
}

pub async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

/// Build the app around an in-memory database, letting the test adjust the config first.
pub async fn test_app_with(configure: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");

    let mut config = ServerConfig {
        db: db.clone(),
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        token_lifetimes: TokenLifetimes::default(),
        login_limit: LoginLimit::default(),
        ip_source: IpSource::XForwardedFor,
        password_cost: TEST_COST,
    };
    configure(&mut config);

    let jwt = JwtConfig::new(&config.access_secret, &config.refresh_secret)
        .with_lifetimes(config.token_lifetimes);
    let app = create_app(&config, config.rate_limit());

    TestApp { app, db, jwt }
}

impl TestApp {
    /// Insert an account directly. Returns its public ID.
    pub async fn seed_account(&self, username: &str, password: &str, roles: &[Role]) -> String {
        let uuid = Uuid::new_v4().to_string();
        let hash = hash_password(password, TEST_COST).await.unwrap();
        self.db
            .accounts()
            .create(&uuid, username, &hash, roles)
            .await
            .unwrap();
        uuid
    }

    /// Insert a record directly. Returns its public ID.
    pub async fn seed_record(&self, owner_uuid: &str, title: &str, text: &str) -> String {
        let owner = self
            .db
            .accounts()
            .get_by_uuid(owner_uuid)
            .await
            .unwrap()
            .unwrap();
        let uuid = Uuid::new_v4().to_string();
        self.db
            .records()
            .create(&uuid, owner.id, title, text)
            .await
            .unwrap();
        uuid
    }

    /// Access token signed the same way the server signs them.
    pub fn token_for(&self, username: &str, roles: &[Role]) -> String {
        self.jwt.generate_access_token(username, roles).unwrap().token
    }

    pub fn refresh_token_for(&self, username: &str) -> String {
        self.jwt.generate_refresh_token(username).unwrap().token
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        TestResponse {
            status,
            headers,
            json,
        }
    }

    /// Log in through the API and return the access token and the raw refresh token.
    pub async fn login(&self, username: &str, password: &str) -> (String, String) {
        let response = self
            .send(json_request(
                "POST",
                "/auth",
                None,
                serde_json::json!({"username": username, "password": password}),
            ))
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.json);

        let access = response.json["accessToken"].as_str().unwrap().to_string();
        let refresh = response
            .set_cookie()
            .and_then(|c| c.strip_prefix("jwt="))
            .and_then(|c| c.split(';').next())
            .unwrap()
            .to_string();
        (access, refresh)
    }
}

/// JSON request, optionally with a bearer token.
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", CLIENT_IP)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Body-less request, optionally with a bearer token.
pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", CLIENT_IP);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Body-less request carrying a refresh cookie.
pub fn cookie_request(method: &str, uri: &str, refresh_token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("jwt={}", refresh_token))
        .body(Body::empty())
        .unwrap()
}

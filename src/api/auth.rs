//! Login, token refresh and logout.
//!
//! Login is rate limited per client address. The refresh token only ever
//! travels in the `jwt` cookie; the access token only in response bodies.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, info};

use super::MessageResponse;
use super::error::{ApiError, ApiJson, ResultExt};
use crate::auth::{REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie};
use crate::db::Database;
use crate::jwt::{JwtConfig, JwtError};
use crate::password::verify_password;
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

/// State for auth endpoints.
#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

pub fn router(state: AuthState, rate_limit: Arc<RateLimitConfig>) -> Router {
    let login_route = post(login)
        .layer::<_, Infallible>(middleware::from_fn_with_state(rate_limit, rate_limit_login))
        .delete(logout);

    Router::new()
        .route("/", login_route)
        .route("/refresh", get(refresh))
        .route("/logout", post(logout))
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
}

fn token_error(e: JwtError) -> ApiError {
    tracing::error!(error = %e, "Failed to issue token");
    ApiError::internal("Failed to issue token")
}

/// Every credential failure looks the same to the caller.
fn login_rejected() -> ApiError {
    ApiError::unauthorized("Unauthorized")
}

// --- Handlers ---

/// Exchange a username and password for an access token and a refresh cookie.
async fn login(
    State(state): State<AuthState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let username = body.username.as_deref().filter(|s| !s.is_empty());
    let password = body.password.as_deref().filter(|s| !s.is_empty());
    let (Some(username), Some(password)) = (username, password) else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    let account = state
        .db
        .accounts()
        .get_by_username(username)
        .await
        .db_err("Failed to look up account")?;

    let Some(account) = account.filter(|a| a.active) else {
        info!(username, "Login rejected: unknown or inactive account");
        return Err(login_rejected());
    };

    let matches = verify_password(password, &account.password_hash)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Password verification failed");
            ApiError::internal("Internal server error")
        })?;
    if !matches {
        info!(username, "Login rejected: wrong password");
        return Err(login_rejected());
    }

    let access = state
        .jwt
        .generate_access_token(&account.username, &account.roles)
        .map_err(token_error)?;
    let refresh = state
        .jwt
        .generate_refresh_token(&account.username)
        .map_err(token_error)?;

    info!(username = %account.username, "Login succeeded");

    Ok((
        [(header::SET_COOKIE, refresh_cookie(&refresh.token))],
        Json(TokenResponse {
            access_token: access.token,
        }),
    )
        .into_response())
}

/// Mint a new access token from the refresh cookie, using the account's current roles.
async fn refresh(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let claims = state.jwt.validate_refresh_token(token).map_err(|e| {
        debug!(error = %e, "Rejected refresh token");
        ApiError::forbidden("Invalid or expired token")
    })?;

    let account = state
        .db
        .accounts()
        .get_by_username(&claims.username)
        .await
        .db_err("Failed to look up account")?;

    let Some(account) = account.filter(|a| a.active) else {
        info!(username = %claims.username, "Refresh rejected: account gone or inactive");
        return Err(ApiError::unauthorized("Unauthorized"));
    };

    let access = state
        .jwt
        .generate_access_token(&account.username, &account.roles)
        .map_err(token_error)?;

    Ok(Json(TokenResponse {
        access_token: access.token,
    }))
}

/// Clear the refresh cookie. Succeeds whether or not one was sent.
async fn logout(headers: HeaderMap) -> Response {
    if get_cookie(&headers, REFRESH_COOKIE_NAME).is_none() {
        return Json(MessageResponse::new("No refresh token to delete")).into_response();
    }

    (
        [(header::SET_COOKIE, clear_refresh_cookie())],
        Json(MessageResponse::new("Cookie cleared")),
    )
        .into_response()
}

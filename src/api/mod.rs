mod accounts;
mod auth;
mod error;
mod records;

use axum::Router;
use serde::Serialize;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, ApiJson, ResultExt, validate_uuid};

/// `{"message": ...}` body shared by endpoints that only confirm an action.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    rate_limit: Arc<RateLimitConfig>,
    password_cost: u32,
) -> Router {
    let auth_state = auth::AuthState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let records_state = records::RecordsState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let accounts_state = accounts::AccountsState {
        db,
        jwt,
        password_cost,
    };

    Router::new()
        .nest("/auth", auth::router(auth_state, rate_limit))
        .nest("/records", records::router(records_state))
        .nest("/accounts", accounts::router(accounts_state))
}

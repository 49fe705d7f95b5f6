//! Account administration API.
//!
//! All endpoints require the `Manager` or `Admin` role.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::MessageResponse;
use super::error::{ApiError, ApiJson, ResultExt, required, validate_uuid};
use crate::auth::{Auth, ManagerOrAdmin};
use crate::db::{AccountSummary, Database, Role, is_foreign_key_violation, is_unique_violation};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::password::hash_password;

/// Maximum username length in characters.
const MAX_USERNAME_LENGTH: usize = 32;

/// State for account endpoints.
#[derive(Clone)]
pub struct AccountsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub password_cost: u32,
}

impl_has_auth_backend!(AccountsState);

pub fn router(state: AccountsState) -> Router {
    Router::new()
        .route(
            "/",
            get(list_accounts)
                .post(create_account)
                .patch(update_account)
                .delete(delete_account),
        )
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct CreateAccountRequest {
    username: Option<String>,
    password: Option<String>,
    roles: Option<Vec<Role>>,
}

#[derive(Serialize)]
struct CreateAccountResponse {
    message: String,
    id: String,
}

#[derive(Deserialize)]
struct UpdateAccountRequest {
    id: Option<String>,
    username: Option<String>,
    roles: Option<Vec<Role>>,
    active: Option<bool>,
    password: Option<String>,
}

#[derive(Deserialize)]
struct DeleteAccountRequest {
    id: Option<String>,
}

// --- Helpers ---

const DUPLICATE_USERNAME: &str = "Duplicate username";
const HAS_RECORDS: &str = "Account has assigned records";

/// Validate an already-trimmed username.
fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Username cannot exceed {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    if username.chars().any(char::is_control) {
        return Err(ApiError::bad_request("Username contains invalid characters"));
    }
    Ok(())
}

async fn hash(password: &str, cost: u32) -> Result<String, ApiError> {
    hash_password(password, cost).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to hash password");
        ApiError::internal("Internal server error")
    })
}

fn write_error(context: &str, e: sqlx::Error) -> ApiError {
    if is_unique_violation(&e) {
        ApiError::conflict(DUPLICATE_USERNAME)
    } else {
        ApiError::db_error(context, e)
    }
}

// --- Handlers ---

async fn list_accounts(
    State(state): State<AccountsState>,
    _auth: Auth<ManagerOrAdmin>,
) -> Result<Json<Vec<AccountSummary>>, ApiError> {
    let accounts = state
        .db
        .accounts()
        .list()
        .await
        .db_err("Failed to list accounts")?;

    if accounts.is_empty() {
        return Err(ApiError::not_found("No accounts found"));
    }

    Ok(Json(accounts))
}

async fn create_account(
    State(state): State<AccountsState>,
    auth: Auth<ManagerOrAdmin>,
    ApiJson(body): ApiJson<CreateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(username), Some(password)) = (
        required(&body.username),
        body.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };
    validate_username(username)?;

    // Fast path; the username_key UNIQUE constraint is what actually holds the line.
    let duplicate = state
        .db
        .accounts()
        .find_by_folded_name(username)
        .await
        .db_err("Failed to check for duplicate username")?;
    if duplicate.is_some() {
        return Err(ApiError::conflict(DUPLICATE_USERNAME));
    }

    let password_hash = hash(password, state.password_cost).await?;
    let roles = body.roles.unwrap_or_default();

    let uuid = Uuid::new_v4().to_string();
    state
        .db
        .accounts()
        .create(&uuid, username, &password_hash, &roles)
        .await
        .map_err(|e| write_error("Failed to create account", e))?;

    info!(account = %uuid, username, by = %auth.user.username, "Account created");

    Ok((
        StatusCode::CREATED,
        Json(CreateAccountResponse {
            message: format!("New account {} created", username),
            id: uuid,
        }),
    ))
}

async fn update_account(
    State(state): State<AccountsState>,
    auth: Auth<ManagerOrAdmin>,
    ApiJson(body): ApiJson<UpdateAccountRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (Some(id), Some(username), Some(roles), Some(active)) = (
        required(&body.id),
        required(&body.username),
        body.roles.as_deref().filter(|r| !r.is_empty()),
        body.active,
    ) else {
        return Err(ApiError::bad_request(
            "All fields except password are required",
        ));
    };
    validate_uuid(id)?;
    validate_username(username)?;

    let account = state
        .db
        .accounts()
        .get_by_uuid(id)
        .await
        .db_err("Failed to look up account")?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    // Renaming to a name that folds to the account's own is allowed.
    let duplicate = state
        .db
        .accounts()
        .find_by_folded_name(username)
        .await
        .db_err("Failed to check for duplicate username")?;
    if duplicate.is_some_and(|d| d.id != account.id) {
        return Err(ApiError::conflict(DUPLICATE_USERNAME));
    }

    let password_hash = match body.password.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(password) => Some(hash(password, state.password_cost).await?),
        None => None,
    };

    let updated = state
        .db
        .accounts()
        .update(account.id, username, roles, active, password_hash.as_deref())
        .await
        .map_err(|e| write_error("Failed to update account", e))?;
    if !updated {
        return Err(ApiError::not_found("Account not found"));
    }

    info!(account = %id, username, by = %auth.user.username, "Account updated");

    Ok(Json(MessageResponse::new(format!("{} updated", username))))
}

async fn delete_account(
    State(state): State<AccountsState>,
    auth: Auth<ManagerOrAdmin>,
    ApiJson(body): ApiJson<DeleteAccountRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Some(id) = required(&body.id) else {
        return Err(ApiError::bad_request("Account ID required"));
    };
    validate_uuid(id)?;

    let account = state
        .db
        .accounts()
        .get_by_uuid(id)
        .await
        .db_err("Failed to look up account")?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;

    // Fast path; the records foreign key rejects the delete regardless.
    let records = state
        .db
        .records()
        .count_by_account(account.id)
        .await
        .db_err("Failed to count account records")?;
    if records > 0 {
        return Err(ApiError::bad_request(HAS_RECORDS));
    }

    let deleted = state
        .db
        .accounts()
        .delete(account.id)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                ApiError::bad_request(HAS_RECORDS)
            } else {
                ApiError::db_error("Failed to delete account", e)
            }
        })?;
    if !deleted {
        return Err(ApiError::not_found("Account not found"));
    }

    info!(account = %id, by = %auth.user.username, "Account deleted");

    Ok(Json(MessageResponse::new(format!(
        "Username {} with ID {} deleted",
        account.username, id
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("José").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(MAX_USERNAME_LENGTH)).is_ok());
        assert!(validate_username(&"a".repeat(MAX_USERNAME_LENGTH + 1)).is_err());
        assert!(validate_username("bad\nname").is_err());
    }
}

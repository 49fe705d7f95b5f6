//! Records (notes) API.
//!
//! All endpoints require a bearer access token. Record IDs travel in the
//! request body, not the path.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::MessageResponse;
use super::error::{ApiError, ApiJson, ResultExt, required, validate_uuid};
use crate::auth::Auth;
use crate::db::{Account, Database, Record, is_foreign_key_violation, is_unique_violation};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

/// State for records endpoints.
#[derive(Clone)]
pub struct RecordsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(RecordsState);

pub fn router(state: RecordsState) -> Router {
    Router::new()
        .route(
            "/",
            get(list_records)
                .post(create_record)
                .patch(update_record)
                .delete(delete_record),
        )
        .with_state(state)
}

// --- Request types ---

#[derive(Deserialize)]
struct CreateRecordRequest {
    owner: Option<String>,
    title: Option<String>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct UpdateRecordRequest {
    id: Option<String>,
    owner: Option<String>,
    title: Option<String>,
    text: Option<String>,
    completed: Option<bool>,
}

#[derive(Deserialize)]
struct DeleteRecordRequest {
    id: Option<String>,
}

// --- Helpers ---

const DUPLICATE_TITLE: &str = "Duplicate record title";
const UNKNOWN_OWNER: &str = "Owner does not exist";

/// Resolve the owner account, which must exist at write time.
async fn resolve_owner(db: &Database, owner: &str) -> Result<Account, ApiError> {
    validate_uuid(owner)?;
    db.accounts()
        .get_by_uuid(owner)
        .await
        .db_err("Failed to look up owner")?
        .ok_or_else(|| ApiError::bad_request(UNKNOWN_OWNER))
}

/// Map a failed write onto the constraint it tripped.
fn write_error(context: &str, e: sqlx::Error) -> ApiError {
    if is_unique_violation(&e) {
        ApiError::conflict(DUPLICATE_TITLE)
    } else if is_foreign_key_violation(&e) {
        ApiError::bad_request(UNKNOWN_OWNER)
    } else {
        ApiError::db_error(context, e)
    }
}

// --- Handlers ---

async fn list_records(
    State(state): State<RecordsState>,
    _auth: Auth,
) -> Result<Json<Vec<Record>>, ApiError> {
    let records = state
        .db
        .records()
        .list()
        .await
        .db_err("Failed to list records")?;

    if records.is_empty() {
        return Err(ApiError::not_found("No records found"));
    }

    Ok(Json(records))
}

async fn create_record(
    State(state): State<RecordsState>,
    auth: Auth,
    ApiJson(body): ApiJson<CreateRecordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(owner), Some(title), Some(text)) = (
        required(&body.owner),
        required(&body.title),
        required(&body.text),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    let owner = resolve_owner(&state.db, owner).await?;

    // Fast path; the title_key UNIQUE constraint is what actually holds the line.
    let duplicate = state
        .db
        .records()
        .find_by_folded_title(title)
        .await
        .db_err("Failed to check for duplicate title")?;
    if duplicate.is_some() {
        return Err(ApiError::conflict(DUPLICATE_TITLE));
    }

    let uuid = Uuid::new_v4().to_string();
    state
        .db
        .records()
        .create(&uuid, owner.id, title, text)
        .await
        .map_err(|e| write_error("Failed to create record", e))?;

    let record = state
        .db
        .records()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to load created record")?
        .ok_or_else(|| ApiError::internal("Created record could not be loaded"))?;

    info!(record = %uuid, by = %auth.user.username, "Record created");

    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_record(
    State(state): State<RecordsState>,
    auth: Auth,
    ApiJson(body): ApiJson<UpdateRecordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (Some(id), Some(owner), Some(title), Some(text), Some(completed)) = (
        required(&body.id),
        required(&body.owner),
        required(&body.title),
        required(&body.text),
        body.completed,
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    validate_uuid(id)?;
    let record = state
        .db
        .records()
        .get_by_uuid(id)
        .await
        .db_err("Failed to look up record")?
        .ok_or_else(|| ApiError::not_found("Record not found"))?;

    let owner = resolve_owner(&state.db, owner).await?;

    // A record may keep its own title; only another record's title collides.
    let duplicate = state
        .db
        .records()
        .find_by_folded_title(title)
        .await
        .db_err("Failed to check for duplicate title")?;
    if duplicate.is_some_and(|d| d.id != record.id) {
        return Err(ApiError::conflict(DUPLICATE_TITLE));
    }

    let updated = state
        .db
        .records()
        .update(id, owner.id, title, text, completed)
        .await
        .map_err(|e| write_error("Failed to update record", e))?;
    if !updated {
        return Err(ApiError::not_found("Record not found"));
    }

    info!(record = %id, by = %auth.user.username, "Record updated");

    Ok(Json(MessageResponse::new(format!("Record '{}' updated", title))))
}

async fn delete_record(
    State(state): State<RecordsState>,
    auth: Auth,
    ApiJson(body): ApiJson<DeleteRecordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Some(id) = required(&body.id) else {
        return Err(ApiError::bad_request("Record ID required"));
    };
    validate_uuid(id)?;

    let record = state
        .db
        .records()
        .get_by_uuid(id)
        .await
        .db_err("Failed to look up record")?
        .ok_or_else(|| ApiError::not_found("Record not found"))?;

    let deleted = state
        .db
        .records()
        .delete(id)
        .await
        .db_err("Failed to delete record")?;
    if !deleted {
        return Err(ApiError::not_found("Record not found"));
    }

    info!(record = %id, by = %auth.user.username, "Record deleted");

    Ok(Json(MessageResponse::new(format!(
        "Record '{}' with ID {} deleted",
        record.title, id
    ))))
}

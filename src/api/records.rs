//! Bookings, menu items and packages.
//!
//! Thin CRUD over `RecordStore`; documents pass through untouched. Which of
//! these routes need an admin token is decided in `routes.rs`.

use crate::api::AppState;
use crate::store::{Collection, Record};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

// ===== Generic handlers =====

fn list(state: &AppState, collection: Collection) -> Result<Json<Vec<Record>>, ApiError> {
    Ok(Json(state.records.list(collection)?))
}

fn get_one(state: &AppState, collection: Collection, id: &str) -> Result<Json<Record>, ApiError> {
    state
        .records
        .get(collection, id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{} {} not found", collection.table(), id)))
}

fn create(
    state: &AppState,
    collection: Collection,
    data: serde_json::Value,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    require_object(&data)?;
    let record = state.records.create(collection, data)?;
    Ok((StatusCode::CREATED, Json(record)))
}

fn update(
    state: &AppState,
    collection: Collection,
    id: &str,
    data: serde_json::Value,
) -> Result<Json<Record>, ApiError> {
    require_object(&data)?;
    state
        .records
        .update(collection, id, data)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{} {} not found", collection.table(), id)))
}

fn delete(state: &AppState, collection: Collection, id: &str) -> Result<StatusCode, ApiError> {
    if state.records.delete(collection, id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "{} {} not found",
            collection.table(),
            id
        )))
    }
}

fn require_object(data: &serde_json::Value) -> Result<(), ApiError> {
    if data.is_object() {
        Ok(())
    } else {
        Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ))
    }
}

// ===== Bookings =====

pub async fn list_bookings(State(state): State<AppState>) -> Result<Json<Vec<Record>>, ApiError> {
    list(&state, Collection::Bookings)
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record>, ApiError> {
    get_one(&state, Collection::Bookings, &id)
}

/// Public storefront booking request
pub async fn create_booking(
    State(state): State<AppState>,
    Json(data): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    create(&state, Collection::Bookings, data)
}

pub async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<serde_json::Value>,
) -> Result<Json<Record>, ApiError> {
    update(&state, Collection::Bookings, &id, data)
}

pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete(&state, Collection::Bookings, &id)
}

// ===== Menu items =====

pub async fn list_menu_items(
    State(state): State<AppState>,
) -> Result<Json<Vec<Record>>, ApiError> {
    list(&state, Collection::MenuItems)
}

pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record>, ApiError> {
    get_one(&state, Collection::MenuItems, &id)
}

pub async fn create_menu_item(
    State(state): State<AppState>,
    Json(data): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    create(&state, Collection::MenuItems, data)
}

pub async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<serde_json::Value>,
) -> Result<Json<Record>, ApiError> {
    update(&state, Collection::MenuItems, &id, data)
}

pub async fn delete_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete(&state, Collection::MenuItems, &id)
}

// ===== Packages =====

pub async fn list_packages(State(state): State<AppState>) -> Result<Json<Vec<Record>>, ApiError> {
    list(&state, Collection::Packages)
}

pub async fn get_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record>, ApiError> {
    get_one(&state, Collection::Packages, &id)
}

pub async fn create_package(
    State(state): State<AppState>,
    Json(data): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    create(&state, Collection::Packages, data)
}

pub async fn update_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<serde_json::Value>,
) -> Result<Json<Record>, ApiError> {
    update(&state, Collection::Packages, &id, data)
}

pub async fn delete_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    delete(&state, Collection::Packages, &id)
}

// ===== Error Handling =====

#[derive(Debug)]
pub enum ApiError {
    Database(anyhow::Error),
    NotFound(String),
    BadRequest(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Database(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Database(err) => {
                tracing::error!("Database error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalError",
                    "Internal server error".to_string(),
                )
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BadRequest", msg.clone()),
        };

        let body = Json(json!({
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

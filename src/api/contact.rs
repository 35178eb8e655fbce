//! Contact form endpoint - POST /contact

use crate::api::{records::ApiError, AppState};
use crate::notify::{self, ContactMessage};
use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

pub async fn submit_contact(
    State(state): State<AppState>,
    Json(message): Json<ContactMessage>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if message.name.trim().is_empty()
        || message.message.trim().is_empty()
        || !message.email.contains('@')
    {
        return Err(ApiError::BadRequest(
            "name, email and message are required".to_string(),
        ));
    }

    notify::dispatch(state.notifier.clone(), message);

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "received" }))))
}

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use gasdesk_logistics::AgentStatus;

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatusRequest {
    pub status: AgentStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceLogoutRequest {
    pub reason: Option<String>,
}

/// Unwrap a JSON body, turning malformed or mistyped input into a 400.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

// -------------------------
// Response envelope
// -------------------------

/// `{success: true, message, data}` with status 200.
pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Result<Response, ApiError> {
    let data = serde_json::to_value(data)?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": message.into(),
            "data": data,
        })),
    )
        .into_response())
}

/// `{success: false, message, error}`.
pub fn failure(status: StatusCode, message: impl Into<String>, error: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "message": message.into(),
            "error": error.into(),
        })),
    )
        .into_response()
}

/// Attach the `statusChanged` flag agency events carry.
pub fn with_status_changed(mut data: JsonValue, status_changed: bool) -> JsonValue {
    if let Some(obj) = data.as_object_mut() {
        obj.insert("statusChanged".to_string(), JsonValue::Bool(status_changed));
    }
    data
}

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{sse::Event as SseEvent, IntoResponse, Response, Sse},
    Json,
};
use serde_json::json;
use tokio_stream::Stream;

use gasdesk_events::{Channel, SubscribeFrame};

use crate::app::dto::{body, ok};
use crate::app::errors::ApiError;
use crate::app::realtime::connection_stream;
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(session): Extension<SessionContext>) -> impl IntoResponse {
    Json(json!({
        "userId": session.user_id(),
        "role": session.role(),
        "agencyId": session.agency_id(),
    }))
}

/// Open a realtime connection.
pub async fn socket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    connection_stream(Arc::clone(&services.hub), session.claims().clone())
}

/// Client to server events on an open connection (the subscribe family).
pub async fn emit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(connection_id): Path<String>,
    payload: Result<Json<SubscribeFrame>, JsonRejection>,
) -> Result<Response, ApiError> {
    let frame = body(payload)?;
    let channel =
        Channel::try_from(frame).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    services
        .hub
        .subscribe(&connection_id, session.claims(), channel.clone())?;
    ok("Subscribed", json!({ "channel": channel.to_string() }))
}

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::Response,
    routing::post,
    Json, Router,
};
use serde_json::json;

use gasdesk_auth::{require_role, Role};
use gasdesk_core::{AgencyId, UserId};
use gasdesk_events::EventName;

use crate::app::dto::{ok, ForceLogoutRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::SessionContext;

const DEFAULT_USER_MESSAGE: &str = "Your session has been ended by an administrator.";
const DEFAULT_AGENCY_MESSAGE: &str = "Your agency's sessions have been ended by an administrator.";

pub fn router() -> Router {
    Router::new()
        .route("/force-logout/users/:user_id", post(force_logout_user))
        .route("/force-logout/agencies/:agency_id", post(force_logout_agency))
}

/// The body is optional; anything unreadable falls back to the default message.
fn reason(payload: Result<Json<ForceLogoutRequest>, JsonRejection>) -> Option<String> {
    match payload {
        Ok(Json(request)) => request.reason.filter(|r| !r.trim().is_empty()),
        Err(_) => None,
    }
}

pub async fn force_logout_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(user_id): Path<String>,
    payload: Result<Json<ForceLogoutRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;

    let user_id = UserId::from(user_id);
    let message = reason(payload).unwrap_or_else(|| DEFAULT_USER_MESSAGE.to_string());
    let connections = services.hub.connections_of(&user_id);

    tracing::info!(
        user_id = %user_id,
        by = %session.user_id(),
        connections,
        "forcing user logout"
    );
    services.publish_json(
        EventName::UserForceLogout,
        json!({ "userId": user_id, "message": message }),
    );
    ok(
        "Force logout sent",
        json!({ "userId": user_id, "connections": connections }),
    )
}

pub async fn force_logout_agency(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(agency_id): Path<String>,
    payload: Result<Json<ForceLogoutRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;

    let agency_id = AgencyId::from(agency_id);
    let message = reason(payload).unwrap_or_else(|| DEFAULT_AGENCY_MESSAGE.to_string());

    tracing::info!(agency_id = %agency_id, by = %session.user_id(), "forcing agency logout");
    services.publish_json(
        EventName::AgencyForceLogout,
        json!({ "agencyId": agency_id, "message": message }),
    );
    ok("Force logout sent", json!({ "agencyId": agency_id }))
}

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use gasdesk_auth::{require_role, Role};
use gasdesk_events::EventName;
use gasdesk_pricing::{PlatformCharge, PlatformChargeInput};

use crate::app::dto::{body, ok};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new().route(
        "/",
        get(get_platform_charge)
            .post(set_platform_charge)
            .delete(delete_platform_charge),
    )
}

pub async fn get_platform_charge(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let charge = services.platform_charge.get().await?;
    ok("Platform charge fetched successfully", charge)
}

pub async fn set_platform_charge(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    payload: Result<Json<PlatformChargeInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;
    let input = body(payload)?;

    let charge = PlatformCharge::from_input(input, Utc::now())?;
    services.platform_charge.set(charge.clone()).await?;

    services.publish(EventName::PlatformChargeUpdated, &charge);
    ok("Platform charge saved successfully", charge)
}

pub async fn delete_platform_charge(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;

    let removed = services
        .platform_charge
        .clear()
        .await?
        .ok_or_else(|| ApiError::not_found("Platform charge not found"))?;

    services.publish(EventName::PlatformChargeDeleted, &removed);
    ok("Platform charge deleted successfully", removed)
}

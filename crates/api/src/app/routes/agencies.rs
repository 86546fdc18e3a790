use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::Response,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;

use gasdesk_auth::{require_role, Role};
use gasdesk_core::AgencyId;
use gasdesk_events::EventName;
use gasdesk_logistics::{Agency, AgencyInput};

use crate::app::dto::{body, ok, with_status_changed};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_agencies).post(create_agency))
        .route("/:id", put(update_agency))
}

pub async fn list_agencies(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    let agencies: Vec<Agency> = services
        .agencies
        .list()
        .await?
        .into_iter()
        .filter(|agency| session.can_access_agency(&agency.id))
        .collect();
    ok("Agencies fetched successfully", agencies)
}

pub async fn create_agency(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    payload: Result<Json<AgencyInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;
    let input = body(payload)?;

    let agency = Agency::register(AgencyId::generate(), input, Utc::now())?;
    services.agencies.upsert(agency.clone()).await?;

    tracing::info!(agency_id = %agency.id, name = %agency.name, "agency created");
    services.publish(EventName::AgencyCreated, &agency);
    ok("Agency created successfully", agency)
}

pub async fn update_agency(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    payload: Result<Json<AgencyInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;
    let input = body(payload)?;

    let current = services
        .agencies
        .get(&AgencyId::from(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Agency not found"))?;

    let (updated, status_changed) = current.apply(input)?;
    services.agencies.upsert(updated.clone()).await?;

    if status_changed {
        tracing::info!(agency_id = %updated.id, status = ?updated.status, "agency status changed");
    }
    let data = with_status_changed(serde_json::to_value(&updated)?, status_changed);
    services.publish_json(EventName::AgencyUpdated, data.clone());
    ok("Agency updated successfully", data)
}

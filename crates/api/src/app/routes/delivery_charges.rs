use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::Response,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;

use gasdesk_auth::{require_role, Role};
use gasdesk_core::{AgencyId, DeliveryChargeId};
use gasdesk_pricing::{DeliveryCharge, DeliveryChargeInput, DUPLICATE_AGENCY_MESSAGE};

use crate::app::dto::{body, ok};
use crate::app::errors::{conflict_as, ApiError};
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_delivery_charges).post(create_delivery_charge))
        .route("/:id", put(update_delivery_charge).delete(delete_delivery_charge))
        .route("/agency/:agency_id", get(get_agency_delivery_charge))
}

pub async fn list_delivery_charges(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let charges = services.delivery_charges.list().await?;
    ok("Delivery charges fetched successfully", charges)
}

pub async fn get_agency_delivery_charge(
    Extension(services): Extension<Arc<AppServices>>,
    Path(agency_id): Path<String>,
) -> Result<Response, ApiError> {
    let agency_id = AgencyId::from(agency_id);
    let charge = services
        .delivery_charges
        .list()
        .await?
        .into_iter()
        .find(|c| c.agency_id == agency_id)
        .ok_or_else(|| ApiError::not_found("Delivery charge not found for this agency"))?;
    ok("Delivery charge fetched successfully", charge)
}

pub async fn create_delivery_charge(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    payload: Result<Json<DeliveryChargeInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;
    let input = body(payload)?;

    let charge = DeliveryCharge::create(DeliveryChargeId::generate(), input, Utc::now())?;
    store_unique(&services, charge.clone()).await?;

    tracing::info!(charge_id = %charge.id, agency_id = %charge.agency_id, "delivery charge created");
    ok("Delivery charge created successfully", charge)
}

pub async fn update_delivery_charge(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    payload: Result<Json<DeliveryChargeInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;
    let input = body(payload)?;

    let current = services
        .delivery_charges
        .get(&DeliveryChargeId::from(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Delivery charge not found"))?;

    let updated = current.apply(input, Utc::now())?;
    store_unique(&services, updated.clone()).await?;
    ok("Delivery charge updated successfully", updated)
}

pub async fn delete_delivery_charge(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;

    let removed = services
        .delivery_charges
        .remove(&DeliveryChargeId::from(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Delivery charge not found"))?;

    tracing::info!(charge_id = %removed.id, "delivery charge deleted");
    ok("Delivery charge deleted successfully", removed)
}

/// One delivery charge per agency.
async fn store_unique(services: &AppServices, charge: DeliveryCharge) -> Result<(), ApiError> {
    let agency_id = charge.agency_id.clone();
    services
        .delivery_charges
        .put_unique(charge, &|other: &DeliveryCharge| other.agency_id == agency_id)
        .await
        .map_err(|e| conflict_as(e, DUPLICATE_AGENCY_MESSAGE))
}

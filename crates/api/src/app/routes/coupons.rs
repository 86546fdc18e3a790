use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::Response,
    routing::{get, patch, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::Value as JsonValue;

use gasdesk_auth::{require_role, Role};
use gasdesk_core::{CouponId, DomainError};
use gasdesk_events::EventName;
use gasdesk_pricing::{Coupon, CouponInput, DUPLICATE_CODE_MESSAGE};

use crate::app::dto::{body, ok};
use crate::app::errors::{conflict_as, ApiError};
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_coupons).post(create_coupon))
        .route("/:id", put(update_coupon).delete(delete_coupon))
        .route("/:id/status", patch(set_coupon_status))
}

pub async fn list_coupons(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let coupons = services.coupons.list().await?;
    ok("Coupons fetched successfully", coupons)
}

pub async fn create_coupon(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    payload: Result<Json<CouponInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;
    let input = body(payload)?;

    let coupon = Coupon::create(CouponId::generate(), input, Utc::now())?;
    let code = coupon.code.clone();
    services
        .coupons
        .put_unique(coupon.clone(), &|other: &Coupon| other.has_code(&code))
        .await
        .map_err(|e| conflict_as(e, DUPLICATE_CODE_MESSAGE))?;

    tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "coupon created");
    services.publish(EventName::CouponCreated, &coupon);
    ok("Coupon created successfully", coupon)
}

pub async fn update_coupon(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    payload: Result<Json<CouponInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;
    let input = body(payload)?;

    let id = CouponId::from(id);
    let current = services
        .coupons
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Coupon not found"))?;

    let updated = current.apply(input, Utc::now())?;
    let code = updated.code.clone();
    services
        .coupons
        .put_unique(updated.clone(), &|other: &Coupon| other.has_code(&code))
        .await
        .map_err(|e| conflict_as(e, DUPLICATE_CODE_MESSAGE))?;

    services.publish(EventName::CouponUpdated, &updated);
    ok("Coupon updated successfully", updated)
}

pub async fn delete_coupon(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;

    let removed = services
        .coupons
        .remove(&CouponId::from(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Coupon not found"))?;

    tracing::info!(coupon_id = %removed.id, "coupon deleted");
    services.publish(EventName::CouponDeleted, &removed);
    ok("Coupon deleted successfully", removed)
}

/// `{"isActive": bool}`. Anything but a JSON boolean is rejected before the
/// coupon is touched.
pub async fn set_coupon_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;
    let payload = body(payload)?;

    let is_active = payload
        .get("isActive")
        .and_then(JsonValue::as_bool)
        .ok_or_else(|| DomainError::validation("isActive must be a boolean"))?;

    let id = CouponId::from(id);
    let current = services
        .coupons
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Coupon not found"))?;

    let updated = current.with_status(is_active, Utc::now());
    services.coupons.upsert(updated.clone()).await?;

    services.publish(EventName::CouponStatusChanged, &updated);
    let message = if is_active {
        "Coupon activated successfully"
    } else {
        "Coupon deactivated successfully"
    };
    ok(message, updated)
}

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
use gasdesk_pricing::{TaxConfig, TaxInput};

use crate::app::dto::{body, ok};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new().route("/", get(get_tax).post(set_tax).delete(delete_tax))
}

/// `data` is `null` while no tax is configured.
pub async fn get_tax(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let tax = services.tax.get().await?;
    ok("Tax configuration fetched successfully", tax)
}

pub async fn set_tax(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    payload: Result<Json<TaxInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;
    let input = body(payload)?;

    let tax = TaxConfig::from_input(input, Utc::now())?;
    services.tax.set(tax.clone()).await?;

    tracing::info!(percentage = %tax.percentage, fixed_amount = %tax.fixed_amount, "tax configured");
    services.publish(EventName::TaxUpdated, &tax);
    ok("Tax configuration saved successfully", tax)
}

pub async fn delete_tax(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;

    let removed = services
        .tax
        .clear()
        .await?
        .ok_or_else(|| ApiError::not_found("Tax configuration not found"))?;

    services.publish(EventName::TaxDeleted, &removed);
    ok("Tax configuration deleted successfully", removed)
}

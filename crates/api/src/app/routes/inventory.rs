use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::Response,
    routing::{delete, get, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::Value as JsonValue;

use gasdesk_core::{AgencyId, DomainError, ProductId};
use gasdesk_events::EventName;
use gasdesk_logistics::{InventoryAction, InventoryItem, InventoryKey, InventoryUpdate};

use crate::app::dto::{body, ok};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", put(upsert_stock))
        .route("/:agency_id", get(list_agency_inventory))
        .route("/:agency_id/:product_id", delete(remove_stock))
}

fn require_agency(session: &SessionContext, agency: &AgencyId) -> Result<(), ApiError> {
    if session.can_access_agency(agency) {
        Ok(())
    } else {
        Err(DomainError::forbidden("No access to this agency's inventory").into())
    }
}

/// `inventory:*` payload: the stock line plus what happened to it.
fn inventory_payload(item: &InventoryItem, action: InventoryAction) -> Result<JsonValue, ApiError> {
    let mut data = serde_json::to_value(item)?;
    if let Some(obj) = data.as_object_mut() {
        obj.insert("action".to_string(), JsonValue::from(action.as_str()));
    }
    Ok(data)
}

pub async fn list_agency_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(agency_id): Path<String>,
) -> Result<Response, ApiError> {
    let agency_id = AgencyId::from(agency_id);
    require_agency(&session, &agency_id)?;

    let items: Vec<InventoryItem> = services
        .inventory
        .list()
        .await?
        .into_iter()
        .filter(|item| item.key.agency_id == agency_id)
        .collect();
    ok("Inventory fetched successfully", items)
}

pub async fn upsert_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    payload: Result<Json<InventoryUpdate>, JsonRejection>,
) -> Result<Response, ApiError> {
    let update = body(payload)?;
    update.validate()?;
    require_agency(&session, &update.agency_id)?;

    let key = InventoryKey::new(update.agency_id.clone(), update.product_id.clone());
    let existing = services.inventory.get(&key).await?;
    let (item, action) = InventoryItem::upsert(existing.as_ref(), update, Utc::now())?;
    services.inventory.upsert(item.clone()).await?;

    let data = inventory_payload(&item, action)?;
    services.publish_json(EventName::InventoryUpdated, data.clone());

    if item.is_low_stock(services.low_stock_threshold) {
        tracing::warn!(
            agency_id = %item.key.agency_id,
            product_id = %item.key.product_id,
            stock = item.stock,
            threshold = services.low_stock_threshold,
            "low stock"
        );
        services.publish_json(EventName::InventoryLowStock, data.clone());
    }

    ok("Inventory updated successfully", data)
}

pub async fn remove_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path((agency_id, product_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let key = InventoryKey::new(AgencyId::from(agency_id), ProductId::from(product_id));
    require_agency(&session, &key.agency_id)?;

    let removed = services
        .inventory
        .remove(&key)
        .await?
        .ok_or_else(|| ApiError::not_found("Inventory item not found"))?;

    let data = inventory_payload(&removed, InventoryAction::Removed)?;
    services.publish_json(EventName::InventoryUpdated, data.clone());
    ok("Inventory item removed successfully", data)
}

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::Response,
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;

use gasdesk_auth::Role;
use gasdesk_core::{DomainError, OrderId};
use gasdesk_events::EventName;
use gasdesk_logistics::{AssignOrder, NewOrder, Order, OrderStatus, OrderStatusUpdate};

use crate::app::dto::{body, ok};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/status", patch(update_order_status))
        .route("/:id/assign", patch(assign_order))
}

/// Orders tied to an agency are visible to that agency and to admins.
fn visible_to(session: &SessionContext, order: &Order) -> bool {
    match &order.agency_id {
        Some(agency) => session.can_access_agency(agency),
        None => true,
    }
}

async fn load_order(
    services: &AppServices,
    session: &SessionContext,
    id: String,
) -> Result<Order, ApiError> {
    services
        .orders
        .get(&OrderId::from(id))
        .await?
        .filter(|order| visible_to(session, order))
        .ok_or_else(|| ApiError::not_found("Order not found"))
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> Result<Response, ApiError> {
    let orders: Vec<Order> = services
        .orders
        .list()
        .await?
        .into_iter()
        .filter(|order| visible_to(&session, order))
        .collect();
    ok("Orders fetched successfully", orders)
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let order = load_order(&services, &session, id).await?;
    ok("Order fetched successfully", order)
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    payload: Result<Json<NewOrder>, JsonRejection>,
) -> Result<Response, ApiError> {
    let mut input = body(payload)?;

    // Agency sessions place orders for their own agency.
    if session.role() != Role::Admin {
        if let Some(own) = session.agency_id() {
            input.agency_id = Some(own.clone());
        }
    }

    let order = Order::place(OrderId::generate(), input, Utc::now())?;
    services.orders.upsert(order.clone()).await?;

    tracing::info!(order_id = %order.id, order_number = %order.order_number, "order created");
    services.publish(EventName::OrderCreated, &order);
    ok("Order created successfully", order)
}

pub async fn update_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    payload: Result<Json<OrderStatusUpdate>, JsonRejection>,
) -> Result<Response, ApiError> {
    if session.role() == Role::Customer {
        return Err(DomainError::forbidden("Customers cannot change order status").into());
    }
    let update = body(payload)?;

    let current = load_order(&services, &session, id).await?;
    let updated = current.with_status(update, Utc::now());
    services.orders.upsert(updated.clone()).await?;

    tracing::info!(
        order_id = %updated.id,
        from = current.status.as_str(),
        to = updated.status.as_str(),
        "order status updated"
    );
    services.publish(EventName::OrderStatusUpdated, &updated);
    if updated.status == OrderStatus::Delivered && current.status != OrderStatus::Delivered {
        services.publish(EventName::OrderDelivered, &updated);
    }
    ok("Order status updated successfully", updated)
}

pub async fn assign_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    payload: Result<Json<AssignOrder>, JsonRejection>,
) -> Result<Response, ApiError> {
    if !matches!(session.role(), Role::Admin | Role::AgencyOwner) {
        return Err(DomainError::forbidden("Only admins and agency owners can assign orders").into());
    }
    let mut assignment = body(payload)?;

    let current = load_order(&services, &session, id).await?;
    let agent = services
        .agents
        .get(&assignment.agent_id)
        .await?
        .filter(|agent| session.can_access_agency(&agent.agency_id))
        .ok_or_else(|| ApiError::not_found("Agent not found"))?;
    if assignment.agent_name.is_none() {
        assignment.agent_name = Some(agent.name.clone());
    }

    let updated = current.assign(assignment);
    services.orders.upsert(updated.clone()).await?;

    tracing::info!(order_id = %updated.id, agent_id = %agent.id, "order assigned");
    services.publish(EventName::OrderAssigned, &updated);
    ok("Order assigned successfully", updated)
}

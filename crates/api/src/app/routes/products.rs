use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::Response,
    routing::{get, put},
    Json, Router,
};

use gasdesk_auth::{require_role, Role};
use gasdesk_core::ProductId;
use gasdesk_events::EventName;
use gasdesk_logistics::{Product, ProductInput};

use crate::app::dto::{body, ok};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", put(update_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let products = services.products.list().await?;
    ok("Products fetched successfully", products)
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;
    let input = body(payload)?;

    let product = Product::create(ProductId::generate(), input)?;
    services.products.upsert(product.clone()).await?;

    tracing::info!(product_id = %product.id, name = %product.name, "product created");
    services.publish(EventName::ProductCreated, &product);
    ok("Product created successfully", product)
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    payload: Result<Json<ProductInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    require_role(session.claims(), Role::Admin)?;
    let input = body(payload)?;

    let current = services
        .products
        .get(&ProductId::from(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    let updated = current.apply(input)?;
    services.products.upsert(updated.clone()).await?;

    services.publish(EventName::ProductUpdated, &updated);
    ok("Product updated successfully", updated)
}

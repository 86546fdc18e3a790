use axum::{
    routing::{get, post},
    Router,
};

pub mod admin;
pub mod agencies;
pub mod agents;
pub mod coupons;
pub mod delivery_charges;
pub mod inventory;
pub mod orders;
pub mod platform_charge;
pub mod products;
pub mod system;
pub mod tax;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    let api = Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/coupons", coupons::router())
        .nest("/delivery-charges", delivery_charges::router())
        .nest("/tax", tax::router())
        .nest("/platform-charge", platform_charge::router())
        .nest("/orders", orders::router())
        .nest("/products", products::router())
        .nest("/agencies", agencies::router())
        .nest("/agents", agents::router())
        .nest("/inventory", inventory::router())
        .nest("/admin", admin::router());

    Router::new()
        .nest("/api", api)
        .route("/socket", get(system::socket))
        .route("/socket/:connection_id/emit", post(system::emit))
}

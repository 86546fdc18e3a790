//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: stores, event bus and realtime hub
//! - `realtime.rs`: SSE connections and their subscriptions
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request DTOs and the response envelope
//! - `errors.rs`: error to status/envelope mapping

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use gasdesk_auth::Hs256JwtValidator;
use gasdesk_infra::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod realtime;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: AppConfig) -> anyhow::Result<Router> {
    anyhow::ensure!(!config.jwt_secret.trim().is_empty(), "JWT secret must not be empty");
    let jwt = Arc::new(Hs256JwtValidator::new(config.jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(services::build_services(&config).await?);

    // Protected routes: the session is checked before services are attached.
    let protected = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::auth_middleware,
            ))
            .layer(Extension(services)),
    );

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected))
}

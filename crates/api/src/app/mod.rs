//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: registry, in-memory platform, AI gateway and live instances
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use modhub_ai::AiGateway;
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router with the built-in modules registered.
pub fn build_app(ai: AiGateway) -> Router {
    router_for(Arc::new(services::AppServices::new(ai)))
}

/// Build the router around existing services (tests use this to keep a handle).
pub fn router_for(services: Arc<services::AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(Extension(services))
                .layer(axum::middleware::from_fn(middleware::request_logging)),
        )
}

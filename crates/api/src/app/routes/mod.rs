use axum::{routing::get, Router};

pub mod modules;
pub mod system;
pub mod tenants;

/// Router for every endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .route("/modules", get(modules::list_modules))
        .nest("/tenants/:tenant/modules/:module", tenants::router())
}

use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::dto;
use crate::app::services::AppServices;

pub async fn list_modules(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let items = services
        .registrations()
        .iter()
        .map(dto::module_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

//! Tenant-scoped module endpoints, nested under `/tenants/:tenant/modules/:module`.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use modhub_core::AlertId;
use modhub_events::Table;

use crate::app::dto;
use crate::app::errors;
use crate::app::services::{self, AppServices};
use crate::context::{acting_user, ModuleRoute};

pub fn router() -> Router {
    Router::new()
        .route("/run", post(run_module))
        .route("/state", get(module_state))
        .route("/config", put(update_config))
        .route("/enable", post(enable_module))
        .route("/disable", post(disable_module))
        .route("/reports", get(list_reports))
        .route("/alerts", get(list_alerts))
        .route("/alerts/:alert/read", post(mark_alert_read))
        .route("/changes", get(changes))
}

fn route(tenant: &str, module: &str) -> Result<ModuleRoute, axum::response::Response> {
    ModuleRoute::parse(tenant, module)
}

pub async fn run_module(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant, module)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<dto::RunModuleRequest>,
) -> axum::response::Response {
    let route = match route(&tenant, &module) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let user = match acting_user(&headers) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let outcome = match services.run(route.tenant_id(), user, route.module_id(), body.input).await {
        Ok(o) => o,
        Err(e) => return errors::module_error_to_response(e),
    };

    match outcome.output {
        Ok(output) => (StatusCode::OK, Json(dto::run_to_json(output, &outcome.state))).into_response(),
        Err(e) => errors::module_error_to_response(e),
    }
}

pub async fn module_state(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant, module)): Path<(String, String)>,
) -> axum::response::Response {
    let route = match route(&tenant, &module) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match services.state(route.tenant_id(), route.module_id()).await {
        Ok(state) => (StatusCode::OK, Json(state)).into_response(),
        Err(e) => errors::module_error_to_response(e),
    }
}

pub async fn enable_module(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant, module)): Path<(String, String)>,
    headers: HeaderMap,
) -> axum::response::Response {
    set_enabled(&services, &tenant, &module, &headers, true).await
}

pub async fn disable_module(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant, module)): Path<(String, String)>,
    headers: HeaderMap,
) -> axum::response::Response {
    set_enabled(&services, &tenant, &module, &headers, false).await
}

async fn set_enabled(
    services: &AppServices,
    tenant: &str,
    module: &str,
    headers: &HeaderMap,
    enabled: bool,
) -> axum::response::Response {
    let route = match route(tenant, module) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let user = match acting_user(headers) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let result = if enabled {
        services.enable(route.tenant_id(), user, route.module_id()).await
    } else {
        services.disable(route.tenant_id(), user, route.module_id()).await
    };
    match result {
        Ok(state) => (StatusCode::OK, Json(state)).into_response(),
        Err(e) => errors::module_error_to_response(e),
    }
}

pub async fn update_config(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant, module)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<dto::UpdateConfigRequest>,
) -> axum::response::Response {
    let route = match route(&tenant, &module) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let user = match acting_user(&headers) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    match services
        .update_config(route.tenant_id(), user, route.module_id(), body.settings)
        .await
    {
        Ok(config) => (StatusCode::OK, Json(config)).into_response(),
        Err(e) => errors::module_error_to_response(e),
    }
}

pub async fn list_reports(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant, module)): Path<(String, String)>,
    Query(query): Query<dto::ReportsQuery>,
) -> axum::response::Response {
    let route = match route(&tenant, &module) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let limit = query.limit.unwrap_or(dto::DEFAULT_REPORT_LIMIT);
    match services.reports(route.tenant_id(), route.module_id(), limit).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::module_error_to_response(e),
    }
}

pub async fn list_alerts(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant, module)): Path<(String, String)>,
    Query(query): Query<dto::AlertsQuery>,
) -> axum::response::Response {
    let route = match route(&tenant, &module) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match services
        .alerts(route.tenant_id(), route.module_id(), query.only_unread)
        .await
    {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::module_error_to_response(e),
    }
}

pub async fn mark_alert_read(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant, module, alert)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> axum::response::Response {
    let route = match route(&tenant, &module) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let user = match acting_user(&headers) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let alert_id: AlertId = match alert.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid alert id"),
    };
    match services
        .mark_alert_read(route.tenant_id(), user, route.module_id(), alert_id)
        .await
    {
        Ok(alert) => (StatusCode::OK, Json(alert)).into_response(),
        Err(e) => errors::module_error_to_response(e),
    }
}

/// Server-sent events for the tenant's writes to one table (default `alerts`).
pub async fn changes(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant, module)): Path<(String, String)>,
    Query(query): Query<dto::ChangesQuery>,
) -> axum::response::Response {
    let route = match route(&tenant, &module) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let table = query.table.unwrap_or(Table::Alerts);
    match services.changes(route.tenant_id(), route.module_id(), table) {
        Ok(stream) => services::change_sse_stream(stream).into_response(),
        Err(e) => errors::module_error_to_response(e),
    }
}

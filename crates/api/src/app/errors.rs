use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use modhub_platform::PlatformError;
use modhub_runtime::ModuleError;

pub fn module_error_to_response(err: ModuleError) -> axum::response::Response {
    match err {
        ModuleError::CapabilityDenied { .. } => {
            json_error(StatusCode::FORBIDDEN, "capability_denied", err.to_string())
        }
        ModuleError::Platform(e) => platform_error_to_response(e),
        ModuleError::InvalidInput(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_input", msg),
        ModuleError::Ai(e) => json_error(StatusCode::BAD_REQUEST, "invalid_input", e.to_string()),
        ModuleError::Failed(_) | ModuleError::Panicked { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "module_failed", err.to_string())
        }
        ModuleError::ModuleNotFound(_) => json_error(StatusCode::NOT_FOUND, "module_not_found", err.to_string()),
        ModuleError::RegistrationMismatch { .. } => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "registration_mismatch", err.to_string())
        }
        ModuleError::ModuleDisabled(_) => json_error(StatusCode::CONFLICT, "module_disabled", err.to_string()),
    }
}

pub fn platform_error_to_response(err: PlatformError) -> axum::response::Response {
    match err {
        PlatformError::TenantBoundaryViolation(msg) => json_error(StatusCode::FORBIDDEN, "tenant_boundary", msg),
        PlatformError::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        PlatformError::Storage(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

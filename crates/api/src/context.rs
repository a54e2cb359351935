use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use modhub_core::{ModuleId, TenantId, UserId};

use crate::app::errors::json_error;

/// Header carrying the acting user. Requests without it act as a fresh anonymous user.
pub const USER_HEADER: &str = "x-user-id";

/// Tenant + module addressed by a `/tenants/{tenant}/modules/{module}` route.
///
/// Parsing only checks the id formats; a nil tenant passes here and is refused
/// by the platform as a missing tenant scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRoute {
    tenant_id: TenantId,
    module_id: ModuleId,
}

impl ModuleRoute {
    pub fn parse(tenant: &str, module: &str) -> Result<Self, Response> {
        let tenant_id = tenant
            .parse()
            .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid tenant id"))?;
        let module_id = module
            .parse()
            .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid module id"))?;
        Ok(Self { tenant_id, module_id })
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }
}

pub fn acting_user(headers: &HeaderMap) -> Result<UserId, Response> {
    let Some(value) = headers.get(USER_HEADER) else {
        return Ok(UserId::new());
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid x-user-id header"))
}

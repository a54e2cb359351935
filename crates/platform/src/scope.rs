use modhub_core::{ModuleId, TenantId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, PlatformResult};

/// Who is calling: the tenant whose data is touched, the acting user and the module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformScope {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub module_id: ModuleId,
}

impl PlatformScope {
    pub fn new(tenant_id: TenantId, user_id: UserId, module_id: ModuleId) -> Self {
        Self {
            tenant_id,
            user_id,
            module_id,
        }
    }

    /// The nil tenant id stands for "no tenant"; such a scope may not touch any data.
    pub fn tenant(&self) -> PlatformResult<TenantId> {
        if self.tenant_id.is_nil() {
            return Err(PlatformError::boundary(format!(
                "module '{}' called without a tenant scope",
                self.module_id
            )));
        }
        Ok(self.tenant_id)
    }
}

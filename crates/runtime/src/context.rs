use modhub_core::{ModuleId, TenantId, UserId};
use modhub_platform::{ModuleConfig, PlatformScope};
use serde::{Deserialize, Serialize};

/// Per-invocation input built by the host: who is calling, for which module, with what config.
///
/// Never mutated in place; [`with_config`](Self::with_config) returns an updated copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleContext {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub config: ModuleConfig,
}

impl ModuleContext {
    pub fn new(tenant_id: TenantId, user_id: UserId, module_id: ModuleId) -> Self {
        Self {
            tenant_id,
            user_id,
            module_id,
            config: ModuleConfig::default(),
        }
    }

    pub fn with_config(&self, config: ModuleConfig) -> Self {
        Self {
            config,
            ..self.clone()
        }
    }

    pub fn scope(&self) -> PlatformScope {
        PlatformScope::new(self.tenant_id, self.user_id, self.module_id.clone())
    }
}

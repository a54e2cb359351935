use async_trait::async_trait;
use modhub_platform::ModuleConfig;
use serde_json::Value as JsonValue;

use crate::capability::ModuleCapabilities;
use crate::context::ModuleContext;
use crate::error::ModuleResult;
use crate::metadata::ModuleMetadata;
use crate::scope::ModuleScope;

/// A module type: metadata, capabilities and behaviour.
///
/// Implementations hold no lifecycle state; [`ModuleInstance`](crate::ModuleInstance) owns it.
/// Hooks default to doing nothing. Panics in any method are caught by the instance.
#[async_trait]
pub trait Module: Send + Sync {
    fn metadata(&self) -> &ModuleMetadata;

    fn capabilities(&self) -> ModuleCapabilities;

    /// The module's industry-specific entry point.
    async fn execute(&self, scope: &ModuleScope<'_>, input: JsonValue) -> ModuleResult<JsonValue>;

    async fn on_install(&self, _ctx: &ModuleContext) -> ModuleResult<()> {
        Ok(())
    }

    async fn on_uninstall(&self, _ctx: &ModuleContext) -> ModuleResult<()> {
        Ok(())
    }

    async fn on_enable(&self, _ctx: &ModuleContext) -> ModuleResult<()> {
        Ok(())
    }

    async fn on_disable(&self, _ctx: &ModuleContext) -> ModuleResult<()> {
        Ok(())
    }

    async fn on_config_update(&self, _ctx: &ModuleContext, _config: &ModuleConfig) -> ModuleResult<()> {
        Ok(())
    }

    async fn process_data(&self, data: JsonValue, _ctx: &ModuleContext) -> ModuleResult<JsonValue> {
        Ok(data)
    }

    async fn validate_data(&self, _data: &JsonValue) -> bool {
        true
    }

    async fn transform_data(&self, data: JsonValue) -> ModuleResult<JsonValue> {
        Ok(data)
    }
}

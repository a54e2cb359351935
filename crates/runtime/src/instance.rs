//! One live module: the module type plus its lifecycle state.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use modhub_ai::AiGateway;
use modhub_core::ModuleId;
use modhub_platform::PlatformGateway;
use serde_json::{Map, Value as JsonValue};

use crate::capability::{Capability, ModuleCapabilities, authorize};
use crate::context::ModuleContext;
use crate::error::{ModuleError, ModuleResult};
use crate::metadata::ModuleMetadata;
use crate::module::Module;
use crate::scope::ModuleScope;
use crate::state::ModuleState;

/// Shared collaborators handed to every instance.
#[derive(Clone)]
pub struct ModuleServices {
    pub platform: Arc<dyn PlatformGateway>,
    pub ai: Arc<AiGateway>,
}

impl ModuleServices {
    pub fn new(platform: Arc<dyn PlatformGateway>, ai: Arc<AiGateway>) -> Self {
        Self { platform, ai }
    }
}

impl core::fmt::Debug for ModuleServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleServices").field("ai", &self.ai).finish_non_exhaustive()
    }
}

/// Owns a module's [`ModuleState`]; the only path through which that state changes.
///
/// Every hook and `execute` runs behind a boundary that turns an `Err` or a panic into
/// the `error` state and returns the failure to the caller. Treat one instance as
/// single-writer: methods take `&mut self`.
pub struct ModuleInstance {
    module: Arc<dyn Module>,
    state: ModuleState,
    services: ModuleServices,
}

impl core::fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("module", &self.module.metadata().id)
            .field("state", &self.state)
            .finish()
    }
}

impl ModuleInstance {
    pub fn new(module: Arc<dyn Module>, services: ModuleServices) -> Self {
        Self {
            module,
            state: ModuleState::default(),
            services,
        }
    }

    pub fn id(&self) -> &ModuleId {
        &self.module.metadata().id
    }

    pub fn metadata(&self) -> &ModuleMetadata {
        self.module.metadata()
    }

    pub fn capabilities(&self) -> ModuleCapabilities {
        self.module.capabilities()
    }

    pub fn state(&self) -> &ModuleState {
        &self.state
    }

    pub async fn install(&mut self, ctx: &ModuleContext) -> ModuleResult<()> {
        self.check_context(ctx)?;
        let module = Arc::clone(&self.module);
        let outcome = guarded(self.id(), module.on_install(ctx)).await;
        self.settle("install", outcome)?;
        tracing::info!(module = %self.id(), tenant = %ctx.tenant_id, "module installed");
        Ok(())
    }

    pub async fn uninstall(&mut self, ctx: &ModuleContext) -> ModuleResult<()> {
        self.check_context(ctx)?;
        let module = Arc::clone(&self.module);
        let outcome = guarded(self.id(), module.on_uninstall(ctx)).await;
        self.settle("uninstall", outcome)?;
        tracing::info!(module = %self.id(), tenant = %ctx.tenant_id, "module uninstalled");
        Ok(())
    }

    /// Moves to `running` from any state once the hook succeeds.
    pub async fn enable(&mut self, ctx: &ModuleContext) -> ModuleResult<()> {
        self.check_context(ctx)?;
        let module = Arc::clone(&self.module);
        let outcome = guarded(self.id(), module.on_enable(ctx)).await;
        self.settle("enable", outcome)?;
        self.state.enable();
        tracing::info!(module = %self.id(), tenant = %ctx.tenant_id, "module enabled");
        Ok(())
    }

    pub async fn disable(&mut self, ctx: &ModuleContext) -> ModuleResult<()> {
        self.check_context(ctx)?;
        let module = Arc::clone(&self.module);
        let outcome = guarded(self.id(), module.on_disable(ctx)).await;
        self.settle("disable", outcome)?;
        self.state.disable();
        tracing::info!(module = %self.id(), tenant = %ctx.tenant_id, "module disabled");
        Ok(())
    }

    /// Persist merged settings, notify the module, and return the updated context.
    pub async fn update_config(
        &mut self,
        ctx: &ModuleContext,
        settings: Map<String, JsonValue>,
    ) -> ModuleResult<ModuleContext> {
        self.check_context(ctx)?;
        let config = self
            .services
            .platform
            .update_module_config(&ctx.scope(), settings)
            .await?;
        let next = ctx.with_config(config);

        let module = Arc::clone(&self.module);
        let outcome = guarded(self.id(), module.on_config_update(&next, &next.config)).await;
        self.settle("config_update", outcome)?;
        Ok(next)
    }

    /// Run the module's `execute` for one invocation.
    ///
    /// Metrics logged during the call are merged into the state and `last_run` is stamped,
    /// whether or not the call succeeded.
    pub async fn run(&mut self, ctx: &ModuleContext, input: JsonValue) -> ModuleResult<JsonValue> {
        self.check_context(ctx)?;
        let module = Arc::clone(&self.module);
        let services = self.services.clone();
        let scope = ModuleScope::new(ctx, module.capabilities(), services.platform.as_ref(), &services.ai);

        tracing::debug!(module = %self.id(), tenant = %ctx.tenant_id, "executing module");
        let outcome = guarded(self.id(), module.execute(&scope, input)).await;

        self.state.merge_metrics(scope.take_metrics());
        self.state.stamp_run(Utc::now());
        self.settle("execute", outcome)
    }

    /// Requires `canProcessData`; data that fails `validate_data` is rejected before processing.
    pub async fn process_data(&mut self, ctx: &ModuleContext, data: JsonValue) -> ModuleResult<JsonValue> {
        self.check_context(ctx)?;
        authorize(self.id(), &self.module.capabilities(), Capability::ProcessData)?;
        if !self.validate_data(&data).await? {
            return Err(ModuleError::invalid_input("data rejected by module validation"));
        }
        let module = Arc::clone(&self.module);
        let outcome = guarded(self.id(), module.process_data(data, ctx)).await;
        self.settle("process_data", outcome)
    }

    pub async fn validate_data(&mut self, data: &JsonValue) -> ModuleResult<bool> {
        let module = Arc::clone(&self.module);
        let outcome = guarded(self.id(), async { Ok(module.validate_data(data).await) }).await;
        self.settle("validate_data", outcome)
    }

    pub async fn transform_data(&mut self, data: JsonValue) -> ModuleResult<JsonValue> {
        let module = Arc::clone(&self.module);
        let outcome = guarded(self.id(), module.transform_data(data)).await;
        self.settle("transform_data", outcome)
    }

    fn check_context(&self, ctx: &ModuleContext) -> ModuleResult<()> {
        if ctx.module_id != *self.id() {
            return Err(ModuleError::invalid_input(format!(
                "context is for module '{}', not '{}'",
                ctx.module_id,
                self.id()
            )));
        }
        Ok(())
    }

    fn settle<T>(&mut self, operation: &'static str, outcome: ModuleResult<T>) -> ModuleResult<T> {
        if let Err(error) = &outcome {
            tracing::warn!(module = %self.id(), operation, %error, "module operation failed");
            self.state.fail(error.to_string());
        }
        outcome
    }
}

/// Await `fut`, turning a panic into [`ModuleError::Panicked`].
async fn guarded<T>(module: &ModuleId, fut: impl Future<Output = ModuleResult<T>>) -> ModuleResult<T> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => Err(ModuleError::Panicked {
            module: module.clone(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

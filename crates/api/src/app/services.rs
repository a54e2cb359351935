//! Runtime wiring for the host: registry, platform, AI gateway and live instances.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use modhub_ai::AiGateway;
use modhub_core::{AlertId, ModuleId, TenantId, UserId};
use modhub_events::{SubscriptionGuard, Table, TableChange};
use modhub_platform::{AlertRecord, InMemoryPlatform, ModuleConfig, PlatformGateway, PlatformScope, ReportRecord};
use modhub_runtime::{
    ModuleContext, ModuleError, ModuleInstance, ModuleRegistration, ModuleRegistry, ModuleResult, ModuleServices,
    ModuleState, register_builtin,
};
use serde_json::{Map, Value as JsonValue};
use tokio::sync::{OnceCell, mpsc, mpsc::error::TrySendError};
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};

type SharedInstance = Arc<tokio::sync::Mutex<ModuleInstance>>;
type InstanceSlot = Arc<OnceCell<SharedInstance>>;

/// Changes buffered per open change stream; a slower reader loses the overflow.
pub const CHANGE_BUFFER: usize = 256;

/// Result of one module run. The state is reported whether or not the run succeeded.
#[derive(Debug)]
pub struct RunOutcome {
    pub output: ModuleResult<JsonValue>,
    pub state: ModuleState,
}

/// Everything the handlers share.
///
/// One [`ModuleInstance`] per (tenant, module), created and installed on first use and enabled
/// unless the tenant disabled it.
/// First use is initialized once per key even under concurrent calls.
/// Calls on the same instance are serialized; different instances run concurrently.
pub struct AppServices {
    registry: Arc<ModuleRegistry>,
    platform: Arc<InMemoryPlatform>,
    services: ModuleServices,
    instances: Mutex<HashMap<(TenantId, ModuleId), InstanceSlot>>,
}

impl AppServices {
    /// In-memory platform plus every built-in module kind.
    pub fn new(ai: AiGateway) -> Self {
        let registry = Arc::new(ModuleRegistry::new());
        register_builtin(&registry);
        Self::with_registry(registry, ai)
    }

    pub fn with_registry(registry: Arc<ModuleRegistry>, ai: AiGateway) -> Self {
        let platform = Arc::new(InMemoryPlatform::new());
        let services = ModuleServices::new(platform.clone(), Arc::new(ai));
        Self {
            registry,
            platform,
            services,
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub fn registrations(&self) -> Vec<ModuleRegistration> {
        self.registry.all()
    }

    /// Refused with [`ModuleError::ModuleDisabled`] while the tenant has the module disabled.
    pub async fn run(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        module_id: &ModuleId,
        input: JsonValue,
    ) -> ModuleResult<RunOutcome> {
        let ctx = self.context(tenant_id, user_id, module_id).await?;
        let instance = self.instance(&ctx).await?;
        let mut instance = instance.lock().await;

        // Enable and disable store the flag while holding this lock.
        let ctx = self.context(tenant_id, user_id, module_id).await?;
        if !ctx.config.enabled {
            tracing::debug!(tenant = %tenant_id, module = %module_id, "run refused: module disabled");
            return Err(ModuleError::ModuleDisabled(module_id.clone()));
        }

        let output = instance.run(&ctx, input).await;
        Ok(RunOutcome {
            output,
            state: instance.state().clone(),
        })
    }

    pub async fn update_config(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        module_id: &ModuleId,
        settings: Map<String, JsonValue>,
    ) -> ModuleResult<ModuleConfig> {
        let ctx = self.context(tenant_id, user_id, module_id).await?;
        let instance = self.instance(&ctx).await?;
        let next = instance.lock().await.update_config(&ctx, settings).await?;
        Ok(next.config)
    }

    pub async fn enable(&self, tenant_id: TenantId, user_id: UserId, module_id: &ModuleId) -> ModuleResult<ModuleState> {
        self.set_enabled(tenant_id, user_id, module_id, true).await
    }

    pub async fn disable(&self, tenant_id: TenantId, user_id: UserId, module_id: &ModuleId) -> ModuleResult<ModuleState> {
        self.set_enabled(tenant_id, user_id, module_id, false).await
    }

    /// State of the tenant's instance; `idle` when the module never ran for this tenant.
    pub async fn state(&self, tenant_id: TenantId, module_id: &ModuleId) -> ModuleResult<ModuleState> {
        self.ensure_registered(module_id)?;
        let slot = self.instances().get(&(tenant_id, module_id.clone())).cloned();
        match slot.as_ref().and_then(|slot| slot.get()) {
            Some(instance) => Ok(instance.lock().await.state().clone()),
            None => Ok(ModuleState::default()),
        }
    }

    pub async fn reports(&self, tenant_id: TenantId, module_id: &ModuleId, limit: usize) -> ModuleResult<Vec<ReportRecord>> {
        let scope = self.read_scope(tenant_id, module_id)?;
        Ok(self.platform.list_reports(&scope, limit).await?)
    }

    pub async fn alerts(&self, tenant_id: TenantId, module_id: &ModuleId, only_unread: bool) -> ModuleResult<Vec<AlertRecord>> {
        let scope = self.read_scope(tenant_id, module_id)?;
        Ok(self.platform.list_alerts(&scope, only_unread).await?)
    }

    pub async fn mark_alert_read(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        module_id: &ModuleId,
        alert_id: AlertId,
    ) -> ModuleResult<AlertRecord> {
        self.ensure_registered(module_id)?;
        let scope = PlatformScope::new(tenant_id, user_id, module_id.clone());
        Ok(self.platform.mark_alert_read(&scope, alert_id).await?)
    }

    /// Stream of the tenant's changes to `table` for this module's channel.
    ///
    /// The subscription lives as long as the returned stream.
    pub fn changes(
        &self,
        tenant_id: TenantId,
        module_id: &ModuleId,
        table: Table,
    ) -> ModuleResult<impl Stream<Item = TableChange> + Send + use<>> {
        let scope = self.read_scope(tenant_id, module_id)?;
        let (tx, rx) = mpsc::channel(CHANGE_BUFFER);
        let guard: SubscriptionGuard = self.platform.subscribe(
            &scope,
            table,
            Arc::new(move |change: &TableChange| match tx.try_send(change.clone()) {
                Ok(()) | Err(TrySendError::Closed(_)) => {}
                Err(TrySendError::Full(dropped)) => {
                    tracing::warn!(
                        tenant = %dropped.tenant_id,
                        table = %dropped.table,
                        "change stream reader lagging; change dropped"
                    );
                }
            }),
        )?;

        Ok(ReceiverStream::new(rx).map(move |change| {
            let _subscription = &guard;
            change
        }))
    }

    /// Open change subscriptions across all tenants; each live change stream holds one.
    pub fn active_subscriptions(&self) -> usize {
        self.platform.feed().active_subscriptions()
    }

    /// Runs the lifecycle hook and stores the flag under the instance lock.
    async fn set_enabled(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        module_id: &ModuleId,
        enabled: bool,
    ) -> ModuleResult<ModuleState> {
        let ctx = self.context(tenant_id, user_id, module_id).await?;
        let instance = self.instance(&ctx).await?;
        let mut instance = instance.lock().await;
        if enabled {
            instance.enable(&ctx).await?;
        } else {
            instance.disable(&ctx).await?;
        }
        let scope = PlatformScope::new(tenant_id, user_id, module_id.clone());
        self.platform.set_module_enabled(&scope, enabled).await?;
        Ok(instance.state().clone())
    }

    async fn context(&self, tenant_id: TenantId, user_id: UserId, module_id: &ModuleId) -> ModuleResult<ModuleContext> {
        self.ensure_registered(module_id)?;
        let scope = PlatformScope::new(tenant_id, user_id, module_id.clone());
        let config = self.platform.module_config(&scope).await?;
        Ok(ModuleContext::new(tenant_id, user_id, module_id.clone()).with_config(config))
    }

    /// The tenant's instance, built on first use. Concurrent first calls wait for one initializer;
    /// a failed initialization leaves the slot empty for the next call.
    async fn instance(&self, ctx: &ModuleContext) -> ModuleResult<SharedInstance> {
        let slot = {
            let mut instances = self.instances();
            Arc::clone(instances.entry((ctx.tenant_id, ctx.module_id.clone())).or_default())
        };

        let shared = slot
            .get_or_try_init(|| async {
                let mut fresh = self.registry.instantiate(&ctx.module_id, self.services.clone())?;
                fresh.install(ctx).await?;
                if ctx.config.enabled {
                    fresh.enable(ctx).await?;
                }
                Ok::<_, ModuleError>(Arc::new(tokio::sync::Mutex::new(fresh)))
            })
            .await?;
        Ok(Arc::clone(shared))
    }

    fn read_scope(&self, tenant_id: TenantId, module_id: &ModuleId) -> ModuleResult<PlatformScope> {
        self.ensure_registered(module_id)?;
        // Reads are attributed to no particular user.
        Ok(PlatformScope::new(tenant_id, UserId::from_uuid(Default::default()), module_id.clone()))
    }

    fn ensure_registered(&self, module_id: &ModuleId) -> ModuleResult<()> {
        if self.registry.has(module_id) {
            Ok(())
        } else {
            Err(ModuleError::ModuleNotFound(module_id.clone()))
        }
    }

    fn instances(&self) -> std::sync::MutexGuard<'_, HashMap<(TenantId, ModuleId), InstanceSlot>> {
        self.instances.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// SSE framing for [`AppServices::changes`].
pub fn change_sse_stream(
    changes: impl Stream<Item = TableChange> + Send + 'static,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let events = changes.map(|change| {
        let data = serde_json::to_string(&change).unwrap_or_else(|_| "{}".to_string());
        Ok(SseEvent::default().event(change.table.as_str()).data(data))
    });
    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use modhub_runtime::{Module, ModuleCapabilities, ModuleMetadata, ModuleScope, ModuleStatus};
    use serde_json::json;

    use super::*;

    struct SlowInstall {
        metadata: ModuleMetadata,
        installs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Module for SlowInstall {
        fn metadata(&self) -> &ModuleMetadata {
            &self.metadata
        }

        fn capabilities(&self) -> ModuleCapabilities {
            ModuleCapabilities::all()
        }

        async fn execute(&self, _scope: &ModuleScope<'_>, input: JsonValue) -> ModuleResult<JsonValue> {
            Ok(input)
        }

        async fn on_install(&self, _ctx: &ModuleContext) -> ModuleResult<()> {
            self.installs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        }
    }

    fn slow_install_services() -> (Arc<AppServices>, Arc<AtomicUsize>, ModuleId) {
        let id = ModuleId::new("slow-install").unwrap();
        let installs = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(ModuleRegistry::new());
        let counter = Arc::clone(&installs);
        let metadata = ModuleMetadata::new(id.clone(), "Slow install", "testing");
        registry
            .register(metadata.clone(), move || {
                Arc::new(SlowInstall {
                    metadata: metadata.clone(),
                    installs: Arc::clone(&counter),
                }) as Arc<dyn Module>
            })
            .unwrap();
        let services = Arc::new(AppServices::with_registry(registry, AiGateway::fallback_only()));
        (services, installs, id)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_runs_install_one_instance() {
        let (services, installs, id) = slow_install_services();
        let tenant = TenantId::new();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let services = Arc::clone(&services);
                let id = id.clone();
                tokio::spawn(async move { services.run(tenant, UserId::new(), &id, json!({ "call": i })).await })
            })
            .collect();
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            assert!(outcome.output.is_ok());
        }

        assert_eq!(installs.load(Ordering::SeqCst), 1);
        assert_eq!(services.instances().len(), 1);
        let state = services.state(tenant, &id).await.unwrap();
        assert_eq!(state.status, ModuleStatus::Running);
    }

    #[tokio::test]
    async fn disabled_module_refuses_runs_until_enabled() {
        let (services, _, id) = slow_install_services();
        let tenant = TenantId::new();
        let user = UserId::new();

        let paused = services.disable(tenant, user, &id).await.unwrap();
        assert_eq!(paused.status, ModuleStatus::Paused);
        assert_eq!(
            services.run(tenant, user, &id, json!({})).await.unwrap_err(),
            ModuleError::ModuleDisabled(id.clone())
        );

        // Another tenant is unaffected.
        assert!(services.run(TenantId::new(), user, &id, json!({})).await.is_ok());

        services.enable(tenant, user, &id).await.unwrap();
        let outcome = services.run(tenant, user, &id, json!({"ok": true})).await.unwrap();
        assert_eq!(outcome.output.unwrap(), json!({"ok": true}));
    }

    #[tokio::test]
    async fn slow_change_reader_keeps_a_bounded_buffer() {
        let services = AppServices::new(AiGateway::fallback_only());
        let tenant = TenantId::new();
        let module = ModuleId::new("fraud-detection").unwrap();
        let stream = services.changes(tenant, &module, Table::Reports).unwrap();
        tokio::pin!(stream);

        let scope = PlatformScope::new(tenant, UserId::new(), module.clone());
        for i in 0..CHANGE_BUFFER + 10 {
            services
                .platform
                .create_report(&scope, &format!("report {i}"), json!({}), None)
                .await
                .unwrap();
        }

        let mut received = 0;
        while let Ok(Some(_)) = tokio::time::timeout(Duration::from_millis(50), stream.next()).await {
            received += 1;
        }
        assert_eq!(received, CHANGE_BUFFER);

        // The reader caught up, so later changes flow again.
        services.platform.create_report(&scope, "late", json!({}), None).await.unwrap();
        let late = tokio::time::timeout(Duration::from_secs(1), stream.next()).await.unwrap().unwrap();
        assert_eq!(late.record["title"], "late");
    }
}

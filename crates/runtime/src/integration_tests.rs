//! Runtime tests against the in-memory platform and a fallback-only AI gateway.
//!
//! Verifies:
//! - Capability gating fails fast and persists nothing
//! - Failures and panics in module code land in the `error` state
//! - Lifecycle transitions, config updates and metrics
//! - Built-in modules complete their flow with zero AI configuration

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use modhub_ai::AiGateway;
    use modhub_core::{ModuleId, TenantId, UserId};
    use modhub_platform::{
        AlertSeverity, InMemoryPlatform, ModuleConfig, PlatformError, PlatformGateway, PlatformScope,
    };
    use proptest::prelude::*;
    use serde_json::{Value as JsonValue, json};

    use crate::builtin::ModuleKind;
    use crate::{
        Capability, ModuleCapabilities, ModuleContext, ModuleError, ModuleInstance, ModuleMetadata,
        ModuleRegistry, ModuleResult, ModuleScope, ModuleServices, ModuleStatus, register_builtin,
    };
    use crate::module::Module;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Action {
        Nothing,
        Report,
        Alert,
        Fail,
        Panic,
    }

    struct TestModule {
        metadata: ModuleMetadata,
        capabilities: ModuleCapabilities,
        action: Action,
        fail_enable: bool,
        seen_config: Arc<Mutex<Option<ModuleConfig>>>,
    }

    impl TestModule {
        fn new(action: Action, capabilities: ModuleCapabilities) -> Self {
            Self {
                metadata: ModuleMetadata::new(ModuleId::new("test-module").unwrap(), "Test", "testing"),
                capabilities,
                action,
                fail_enable: false,
                seen_config: Arc::new(Mutex::new(None)),
            }
        }
    }

    #[async_trait]
    impl Module for TestModule {
        fn metadata(&self) -> &ModuleMetadata {
            &self.metadata
        }

        fn capabilities(&self) -> ModuleCapabilities {
            self.capabilities
        }

        async fn execute(&self, scope: &ModuleScope<'_>, _input: JsonValue) -> ModuleResult<JsonValue> {
            scope.log_metric("calls", 1);
            match self.action {
                Action::Nothing => {}
                Action::Report => {
                    scope.generate_report("Weekly", json!({"ok": true}), "weekly").await?;
                }
                Action::Alert => {
                    scope.send_alert(AlertSeverity::High, "Heads up", "something happened").await?;
                }
                Action::Fail => return Err(ModuleError::failed("upstream data missing")),
                Action::Panic => panic!("module exploded"),
            }
            Ok(json!({"done": true}))
        }

        async fn on_enable(&self, _ctx: &ModuleContext) -> ModuleResult<()> {
            if self.fail_enable {
                return Err(ModuleError::failed("cannot start"));
            }
            Ok(())
        }

        async fn on_config_update(&self, _ctx: &ModuleContext, config: &ModuleConfig) -> ModuleResult<()> {
            *self.seen_config.lock().unwrap() = Some(config.clone());
            Ok(())
        }

        async fn validate_data(&self, data: &JsonValue) -> bool {
            data.is_object()
        }
    }

    fn services() -> (Arc<InMemoryPlatform>, ModuleServices) {
        let platform = Arc::new(InMemoryPlatform::new());
        let services = ModuleServices::new(platform.clone(), Arc::new(AiGateway::fallback_only()));
        (platform, services)
    }

    fn context(module_id: ModuleId) -> ModuleContext {
        ModuleContext::new(TenantId::new(), UserId::new(), module_id)
    }

    fn instance(module: TestModule) -> (Arc<InMemoryPlatform>, ModuleInstance, ModuleContext) {
        let (platform, services) = services();
        let ctx = context(module.metadata.id.clone());
        (platform, ModuleInstance::new(Arc::new(module), services), ctx)
    }

    fn only(flag: Capability) -> ModuleCapabilities {
        ModuleCapabilities {
            can_generate_reports: flag == Capability::GenerateReports,
            can_send_alerts: flag == Capability::SendAlerts,
            can_process_data: flag == Capability::ProcessData,
            can_integrate_external: flag == Capability::IntegrateExternal,
            requires_data_connection: false,
        }
    }

    #[tokio::test]
    async fn send_alert_without_capability_is_denied_and_persists_nothing() {
        let (platform, mut instance, ctx) = instance(TestModule::new(Action::Alert, only(Capability::GenerateReports)));

        let err = instance.run(&ctx, json!({})).await.unwrap_err();

        assert_eq!(
            err,
            ModuleError::CapabilityDenied {
                module: ctx.module_id.clone(),
                capability: Capability::SendAlerts,
            }
        );
        assert!(platform.list_alerts(&ctx.scope(), false).await.unwrap().is_empty());
        assert_eq!(instance.state().status, ModuleStatus::Error);
        assert!(instance.state().error_message.as_deref().unwrap().contains("canSendAlerts"));
    }

    #[tokio::test]
    async fn module_failure_and_panic_move_to_error_state() {
        let (_, mut failing, ctx) = instance(TestModule::new(Action::Fail, ModuleCapabilities::all()));
        failing.enable(&ctx).await.unwrap();
        let err = failing.run(&ctx, json!({})).await.unwrap_err();
        assert_eq!(err, ModuleError::failed("upstream data missing"));
        assert_eq!(failing.state().status, ModuleStatus::Error);

        let (_, mut panicking, ctx) = instance(TestModule::new(Action::Panic, ModuleCapabilities::all()));
        panicking.enable(&ctx).await.unwrap();
        let err = panicking.run(&ctx, json!({})).await.unwrap_err();
        assert!(matches!(err, ModuleError::Panicked { ref message, .. } if message == "module exploded"));
        assert_eq!(panicking.state().status, ModuleStatus::Error);

        // Recovery goes through enable.
        panicking.enable(&ctx).await.unwrap();
        assert_eq!(panicking.state().status, ModuleStatus::Running);
        assert_eq!(panicking.state().error_message, None);
    }

    #[tokio::test]
    async fn lifecycle_transitions() {
        let (_, mut instance, ctx) = instance(TestModule::new(Action::Nothing, ModuleCapabilities::all()));
        instance.install(&ctx).await.unwrap();
        assert_eq!(instance.state().status, ModuleStatus::Idle);

        instance.enable(&ctx).await.unwrap();
        assert_eq!(instance.state().status, ModuleStatus::Running);
        instance.disable(&ctx).await.unwrap();
        assert_eq!(instance.state().status, ModuleStatus::Paused);
        instance.enable(&ctx).await.unwrap();
        assert_eq!(instance.state().status, ModuleStatus::Running);
        instance.uninstall(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn failing_enable_hook_leaves_error_state() {
        let mut module = TestModule::new(Action::Nothing, ModuleCapabilities::all());
        module.fail_enable = true;
        let (_, mut instance, ctx) = instance(module);

        assert!(instance.enable(&ctx).await.is_err());
        assert_eq!(instance.state().status, ModuleStatus::Error);
    }

    #[tokio::test]
    async fn run_records_metrics_and_last_run() {
        let (platform, mut instance, ctx) = instance(TestModule::new(Action::Report, ModuleCapabilities::all()));
        assert!(instance.state().last_run.is_none());

        let out = instance.run(&ctx, json!({})).await.unwrap();

        assert_eq!(out, json!({"done": true}));
        assert!(instance.state().last_run.is_some());
        assert_eq!(instance.state().metrics.get("calls"), Some(&json!(1)));
        let reports = platform.list_reports(&ctx.scope(), 10).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].report_type, "weekly");
    }

    #[tokio::test]
    async fn update_config_returns_a_new_context() {
        let module = TestModule::new(Action::Nothing, ModuleCapabilities::all());
        let seen = Arc::clone(&module.seen_config);
        let (_, mut instance, ctx) = instance(module);

        let settings = json!({"riskThreshold": 80}).as_object().cloned().unwrap();
        let next = instance.update_config(&ctx, settings).await.unwrap();

        assert_eq!(next.config.setting("riskThreshold"), Some(&json!(80)));
        assert_eq!(ctx.config.setting("riskThreshold"), None);
        assert_eq!(seen.lock().unwrap().as_ref(), Some(&next.config));
    }

    #[tokio::test]
    async fn process_data_requires_capability_and_valid_data() {
        let (_, mut denied, ctx) = instance(TestModule::new(Action::Nothing, only(Capability::SendAlerts)));
        assert!(denied.process_data(&ctx, json!({})).await.unwrap_err().is_capability_denied());

        let (_, mut allowed, ctx) = instance(TestModule::new(Action::Nothing, only(Capability::ProcessData)));
        assert!(matches!(
            allowed.process_data(&ctx, json!([1, 2])).await,
            Err(ModuleError::InvalidInput(_))
        ));
        assert_eq!(allowed.process_data(&ctx, json!({"a": 1})).await.unwrap(), json!({"a": 1}));
        assert_eq!(allowed.transform_data(json!("x")).await.unwrap(), json!("x"));
    }

    #[tokio::test]
    async fn missing_tenant_scope_is_a_typed_failure() {
        let (_, mut instance, _) = instance(TestModule::new(Action::Report, ModuleCapabilities::all()));
        let ctx = ModuleContext::new(
            TenantId::from_uuid(Default::default()),
            UserId::new(),
            ModuleId::new("test-module").unwrap(),
        );

        let err = instance.run(&ctx, json!({})).await.unwrap_err();
        assert!(err.is_tenant_boundary_violation());
        assert!(matches!(err, ModuleError::Platform(PlatformError::TenantBoundaryViolation(_))));
    }

    #[tokio::test]
    async fn context_for_another_module_is_rejected() {
        let (_, mut instance, _) = instance(TestModule::new(Action::Nothing, ModuleCapabilities::all()));
        let ctx = context(ModuleId::new("someone-else").unwrap());
        assert!(matches!(instance.run(&ctx, json!({})).await, Err(ModuleError::InvalidInput(_))));
        assert_eq!(instance.state().status, ModuleStatus::Idle);
    }

    #[test]
    fn registry_overwrites_and_reports_missing_modules() {
        let registry = ModuleRegistry::new();
        let id = ModuleId::new("test-module").unwrap();

        registry
            .register(ModuleMetadata::new(id.clone(), "First", "testing"), || {
                Arc::new(TestModule::new(Action::Nothing, ModuleCapabilities::default())) as Arc<dyn Module>
            })
            .unwrap();
        registry
            .register(ModuleMetadata::new(id.clone(), "Second", "testing"), || {
                Arc::new(TestModule::new(Action::Nothing, ModuleCapabilities::all())) as Arc<dyn Module>
            })
            .unwrap();

        assert!(registry.has(&id));
        assert_eq!(registry.len(), 1);
        let registration = registry.get(&id).unwrap();
        assert_eq!(registration.metadata().name, "Second");
        assert_eq!(registration.capabilities(), ModuleCapabilities::all());

        let (_, services) = services();
        let missing = ModuleId::new("missing").unwrap();
        assert_eq!(
            registry.instantiate(&missing, services).unwrap_err(),
            ModuleError::ModuleNotFound(missing)
        );
    }

    #[test]
    fn registration_under_a_foreign_id_is_rejected() {
        let registry = ModuleRegistry::new();
        let claimed = ModuleId::new("fraud-detection").unwrap();

        let err = registry
            .register(ModuleMetadata::new(claimed.clone(), "Impostor", "testing"), || {
                Arc::new(TestModule::new(Action::Nothing, ModuleCapabilities::all())) as Arc<dyn Module>
            })
            .unwrap_err();

        assert_eq!(
            err,
            ModuleError::RegistrationMismatch {
                registered: claimed.clone(),
                constructed: ModuleId::new("test-module").unwrap(),
            }
        );
        assert!(!registry.has(&claimed));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn builtin_modules_complete_with_fallback_only() {
        let registry = ModuleRegistry::new();
        register_builtin(&registry);
        let (platform, services) = services();
        let tenant = TenantId::new();

        let run = |kind: ModuleKind, config: ModuleConfig, input: JsonValue| {
            let registry = &registry;
            let services = services.clone();
            async move {
                let mut instance = registry.instantiate(&kind.id(), services).unwrap();
                let ctx = ModuleContext::new(tenant, UserId::new(), kind.id()).with_config(config);
                instance.enable(&ctx).await.unwrap();
                let out = instance.run(&ctx, input).await;
                (instance, ctx, out)
            }
        };

        let (_, ctx, out) = run(
            ModuleKind::CustomerService,
            ModuleConfig::default(),
            json!({"message": "refund policy question"}),
        )
        .await;
        let out = out.unwrap();
        assert_eq!(out["source"], "fallback");
        assert_eq!(out["escalated"], false);
        assert!(platform.list_alerts(&ctx.scope(), false).await.unwrap().is_empty());

        let transactions = json!({"transactions": [
            {"id": "t1", "amount": 120.0, "currency": "USD", "merchant": "Coffee"},
            {"id": "t2", "amount": 98000.0, "currency": "USD", "merchant": "Wire"},
        ]});
        let always = ModuleConfig::default().merged(json!({"riskThreshold": 0}).as_object().cloned().unwrap());
        let (instance, ctx, out) = run(ModuleKind::FraudDetection, always, transactions.clone()).await;
        assert_eq!(out.unwrap()["summary"]["highRisk"], 2);
        assert_eq!(platform.list_alerts(&ctx.scope(), false).await.unwrap().len(), 2);
        assert_eq!(instance.state().metrics.get("transactions_analyzed"), Some(&json!(2)));

        let never = ModuleConfig::default().merged(json!({"riskThreshold": 101}).as_object().cloned().unwrap());
        let (_, _, out) = run(ModuleKind::FraudDetection, never, transactions).await;
        assert_eq!(out.unwrap()["summary"]["highRisk"], 0);
        assert_eq!(platform.list_alerts(&ctx.scope(), false).await.unwrap().len(), 2);
        assert_eq!(platform.list_reports(&ctx.scope(), 10).await.unwrap().len(), 2);

        let (_, ctx, out) = run(
            ModuleKind::StudentPerformance,
            ModuleConfig::default(),
            json!({"students": [
                {"name": "Amy", "scores": {"math": 92, "science": 88}},
                {"name": "Ben", "scores": {"math": 35, "science": 30}},
            ]}),
        )
        .await;
        assert_eq!(out.unwrap()["summary"]["atRisk"], json!(["Ben"]));
        let alerts = platform.list_alerts(&ctx.scope(), true).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::High);

        let (instance, ctx, out) = run(
            ModuleKind::DocumentReview,
            ModuleConfig::default(),
            json!({"title": "Loan agreement", "content": "The borrower agrees to repay..."}),
        )
        .await;
        assert_eq!(out.unwrap()["review"]["riskLevel"], "medium");
        assert_eq!(instance.state().status, ModuleStatus::Running);
        assert_eq!(platform.list_reports(&ctx.scope(), 10).await.unwrap().len(), 1);

        let (instance, _, out) = run(ModuleKind::DocumentReview, ModuleConfig::default(), json!({"title": "x"})).await;
        assert!(matches!(out, Err(ModuleError::InvalidInput(_))));
        assert_eq!(instance.state().status, ModuleStatus::Error);
    }

    proptest! {
        #[test]
        fn gated_operations_match_declared_capabilities(
            reports in any::<bool>(),
            alerts in any::<bool>(),
            send_alert in any::<bool>(),
        ) {
            let capabilities = ModuleCapabilities {
                can_generate_reports: reports,
                can_send_alerts: alerts,
                ..ModuleCapabilities::default()
            };
            let action = if send_alert { Action::Alert } else { Action::Report };
            let allowed = if send_alert { alerts } else { reports };
            let (platform, mut instance, ctx) = instance(TestModule::new(action, capabilities));

            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let outcome = runtime.block_on(instance.run(&ctx, json!({})));
            let scope: PlatformScope = ctx.scope();
            let written = runtime.block_on(async {
                platform.list_reports(&scope, usize::MAX).await.unwrap().len()
                    + platform.list_alerts(&scope, false).await.unwrap().len()
            });

            prop_assert_eq!(outcome.is_ok(), allowed);
            prop_assert_eq!(written, usize::from(allowed));
            if !allowed {
                prop_assert!(outcome.unwrap_err().is_capability_denied());
            }
        }
    }
}

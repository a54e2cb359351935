use std::collections::BTreeMap;
use std::sync::Mutex;

use modhub_ai::AiGateway;
use modhub_events::{ChangeCallback, SubscriptionGuard, Table};
use modhub_platform::{AlertRecord, AlertSeverity, DataConnection, PlatformGateway, ReportRecord};
use serde_json::Value as JsonValue;

use crate::capability::{Capability, ModuleCapabilities, authorize};
use crate::context::ModuleContext;
use crate::error::ModuleResult;

/// Everything a module may touch during one `execute`.
///
/// Writes go through the capability check first; a denied call returns
/// [`ModuleError::CapabilityDenied`](crate::ModuleError::CapabilityDenied) and persists nothing.
pub struct ModuleScope<'a> {
    ctx: &'a ModuleContext,
    capabilities: ModuleCapabilities,
    platform: &'a dyn PlatformGateway,
    ai: &'a AiGateway,
    metrics: Mutex<BTreeMap<String, JsonValue>>,
}

impl<'a> ModuleScope<'a> {
    pub fn new(
        ctx: &'a ModuleContext,
        capabilities: ModuleCapabilities,
        platform: &'a dyn PlatformGateway,
        ai: &'a AiGateway,
    ) -> Self {
        Self {
            ctx,
            capabilities,
            platform,
            ai,
            metrics: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn context(&self) -> &ModuleContext {
        self.ctx
    }

    pub fn capabilities(&self) -> ModuleCapabilities {
        self.capabilities
    }

    pub fn ai(&self) -> &AiGateway {
        self.ai
    }

    /// Requires `canGenerateReports`.
    pub async fn generate_report(
        &self,
        title: &str,
        content: JsonValue,
        report_type: &str,
    ) -> ModuleResult<ReportRecord> {
        authorize(&self.ctx.module_id, &self.capabilities, Capability::GenerateReports)?;
        Ok(self
            .platform
            .create_report(&self.ctx.scope(), title, content, Some(report_type))
            .await?)
    }

    /// Requires `canSendAlerts`.
    pub async fn send_alert(&self, severity: AlertSeverity, title: &str, message: &str) -> ModuleResult<AlertRecord> {
        authorize(&self.ctx.module_id, &self.capabilities, Capability::SendAlerts)?;
        Ok(self
            .platform
            .create_alert(&self.ctx.scope(), severity, title, message)
            .await?)
    }

    pub async fn recent_reports(&self, limit: usize) -> ModuleResult<Vec<ReportRecord>> {
        Ok(self.platform.list_reports(&self.ctx.scope(), limit).await?)
    }

    pub async fn alerts(&self, only_unread: bool) -> ModuleResult<Vec<AlertRecord>> {
        Ok(self.platform.list_alerts(&self.ctx.scope(), only_unread).await?)
    }

    pub async fn data_connections(&self, connection_type: Option<&str>) -> ModuleResult<Vec<DataConnection>> {
        Ok(self
            .platform
            .list_data_connections(&self.ctx.scope(), connection_type)
            .await?)
    }

    /// The guard must be released (or dropped) when the module stops watching.
    pub fn subscribe(&self, table: Table, callback: ChangeCallback) -> ModuleResult<SubscriptionGuard> {
        Ok(self.platform.subscribe(&self.ctx.scope(), table, callback)?)
    }

    /// Recorded into the instance state after `execute` returns (also on failure).
    pub fn log_metric(&self, name: impl Into<String>, value: impl Into<JsonValue>) {
        let name = name.into();
        let value = value.into();
        tracing::debug!(module = %self.ctx.module_id, metric = %name, %value, "metric recorded");
        let mut metrics = match self.metrics.lock() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        };
        metrics.insert(name, value);
    }

    pub(crate) fn take_metrics(self) -> BTreeMap<String, JsonValue> {
        match self.metrics.into_inner() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

//! In-memory platform gateway for tests, dev and the single-process host.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use modhub_core::{AlertId, ConnectionId, ModuleId, ReportId, TenantId};
use modhub_events::{
    ChangeCallback, ChangeFeed, ChangeFilter, ChangeOp, InMemoryChangeFeed, SubscriptionGuard, Table, TableChange,
};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::{PlatformError, PlatformResult};
use crate::gateway::PlatformGateway;
use crate::records::{
    AlertRecord, AlertSeverity, ConnectionStatus, DataConnection, ModuleConfig, NewDataConnection, ReportRecord,
    DEFAULT_REPORT_TYPE,
};
use crate::scope::PlatformScope;
use crate::store::{InMemoryTenantStore, TenantStore};

/// Tenant-isolated tables plus a change feed.
///
/// Each successful write is published on the feed after the record is stored. Feed
/// subscribers are called synchronously and must not write back through this gateway.
#[derive(Debug)]
pub struct InMemoryPlatform<F = InMemoryChangeFeed> {
    reports: InMemoryTenantStore<ReportId, ReportRecord>,
    alerts: InMemoryTenantStore<AlertId, AlertRecord>,
    connections: InMemoryTenantStore<ConnectionId, DataConnection>,
    configs: InMemoryTenantStore<ModuleId, ModuleConfig>,
    feed: Arc<F>,
}

impl InMemoryPlatform<InMemoryChangeFeed> {
    pub fn new() -> Self {
        Self::with_feed(Arc::new(InMemoryChangeFeed::new()))
    }
}

impl Default for InMemoryPlatform<InMemoryChangeFeed> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ChangeFeed> InMemoryPlatform<F> {
    pub fn with_feed(feed: Arc<F>) -> Self {
        Self {
            reports: InMemoryTenantStore::new(),
            alerts: InMemoryTenantStore::new(),
            connections: InMemoryTenantStore::new(),
            configs: InMemoryTenantStore::new(),
            feed,
        }
    }

    pub fn feed(&self) -> &Arc<F> {
        &self.feed
    }

    fn announce<R: Serialize>(&self, tenant_id: TenantId, table: Table, op: ChangeOp, record: &R) {
        let record = match serde_json::to_value(record) {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(%tenant_id, %table, %error, "change not published: record did not serialize");
                return;
            }
        };
        match self.feed.publish(TableChange::new(tenant_id, table, op, record)) {
            Ok(delivered) => tracing::debug!(%tenant_id, %table, ?op, delivered, "change published"),
            Err(error) => tracing::warn!(%tenant_id, %table, ?error, "change feed publish failed"),
        }
    }

    fn store_config(&self, tenant_id: TenantId, scope: &PlatformScope, config: ModuleConfig) -> PlatformResult<()> {
        self.configs.upsert(tenant_id, scope.module_id.clone(), config.clone())?;
        self.announce(
            tenant_id,
            Table::ModuleConfigs,
            ChangeOp::Update,
            &serde_json::json!({ "moduleId": scope.module_id, "config": config }),
        );
        Ok(())
    }

    /// Resolve a record id to "ours", "someone else's" or "nobody's".
    fn owned<K, V>(
        store: &InMemoryTenantStore<K, V>,
        tenant_id: TenantId,
        key: &K,
        entity: &'static str,
    ) -> PlatformResult<()>
    where
        K: Clone + Eq + std::hash::Hash + Send + Sync + core::fmt::Display + 'static,
        V: Clone + Send + Sync + 'static,
    {
        match store.owner_of(key)? {
            Some(owner) if owner == tenant_id => Ok(()),
            Some(_) => {
                tracing::warn!(%tenant_id, %entity, id = %key, "cross-tenant access refused");
                Err(PlatformError::boundary(format!("{entity} {key} belongs to another tenant")))
            }
            None => Err(PlatformError::not_found(entity, key)),
        }
    }
}

#[async_trait]
impl<F: ChangeFeed> PlatformGateway for InMemoryPlatform<F> {
    async fn create_report(
        &self,
        scope: &PlatformScope,
        title: &str,
        content: JsonValue,
        report_type: Option<&str>,
    ) -> PlatformResult<ReportRecord> {
        let tenant_id = scope.tenant()?;
        let record = ReportRecord {
            id: ReportId::new(),
            tenant_id,
            module_id: scope.module_id.clone(),
            title: title.to_string(),
            content,
            report_type: report_type.unwrap_or(DEFAULT_REPORT_TYPE).to_string(),
            created_by: scope.user_id,
            created_at: Utc::now(),
        };
        self.reports.upsert(tenant_id, record.id, record.clone())?;
        tracing::info!(%tenant_id, module = %scope.module_id, report = %record.id, "report created");
        self.announce(tenant_id, Table::Reports, ChangeOp::Insert, &record);
        Ok(record)
    }

    async fn list_reports(&self, scope: &PlatformScope, limit: usize) -> PlatformResult<Vec<ReportRecord>> {
        let tenant_id = scope.tenant()?;
        let mut reports: Vec<_> = self
            .reports
            .list(tenant_id)?
            .into_iter()
            .filter(|r| r.module_id == scope.module_id)
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        reports.truncate(limit);
        Ok(reports)
    }

    async fn create_alert(
        &self,
        scope: &PlatformScope,
        severity: AlertSeverity,
        title: &str,
        message: &str,
    ) -> PlatformResult<AlertRecord> {
        let tenant_id = scope.tenant()?;
        let record = AlertRecord {
            id: AlertId::new(),
            tenant_id,
            module_id: scope.module_id.clone(),
            severity,
            title: title.to_string(),
            message: message.to_string(),
            is_read: false,
            created_at: Utc::now(),
        };
        self.alerts.upsert(tenant_id, record.id, record.clone())?;
        tracing::info!(%tenant_id, module = %scope.module_id, alert = %record.id, %severity, "alert raised");
        self.announce(tenant_id, Table::Alerts, ChangeOp::Insert, &record);
        Ok(record)
    }

    async fn list_alerts(&self, scope: &PlatformScope, only_unread: bool) -> PlatformResult<Vec<AlertRecord>> {
        let tenant_id = scope.tenant()?;
        let mut alerts: Vec<_> = self
            .alerts
            .list(tenant_id)?
            .into_iter()
            .filter(|a| a.module_id == scope.module_id && !(only_unread && a.is_read))
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(alerts)
    }

    async fn mark_alert_read(&self, scope: &PlatformScope, alert_id: AlertId) -> PlatformResult<AlertRecord> {
        let tenant_id = scope.tenant()?;
        Self::owned(&self.alerts, tenant_id, &alert_id, "alert")?;
        let record = self
            .alerts
            .update(tenant_id, &alert_id, &mut |alert| alert.is_read = true)?
            .ok_or_else(|| PlatformError::not_found("alert", alert_id))?;
        self.announce(tenant_id, Table::Alerts, ChangeOp::Update, &record);
        Ok(record)
    }

    async fn list_data_connections(
        &self,
        scope: &PlatformScope,
        connection_type: Option<&str>,
    ) -> PlatformResult<Vec<DataConnection>> {
        let tenant_id = scope.tenant()?;
        let mut connections: Vec<_> = self
            .connections
            .list(tenant_id)?
            .into_iter()
            .filter(|c| c.status == ConnectionStatus::Active)
            .filter(|c| connection_type.is_none_or(|t| c.connection_type == t))
            .collect();
        connections.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(connections)
    }

    async fn create_data_connection(
        &self,
        scope: &PlatformScope,
        connection: NewDataConnection,
    ) -> PlatformResult<DataConnection> {
        let tenant_id = scope.tenant()?;
        let record = DataConnection {
            id: ConnectionId::new(),
            tenant_id,
            connection_type: connection.connection_type,
            name: connection.name,
            config: connection.config,
            status: ConnectionStatus::Active,
            created_at: Utc::now(),
        };
        self.connections.upsert(tenant_id, record.id, record.clone())?;
        self.announce(tenant_id, Table::DataConnections, ChangeOp::Insert, &record);
        Ok(record)
    }

    async fn update_data_connection_status(
        &self,
        scope: &PlatformScope,
        connection_id: ConnectionId,
        status: ConnectionStatus,
    ) -> PlatformResult<DataConnection> {
        let tenant_id = scope.tenant()?;
        Self::owned(&self.connections, tenant_id, &connection_id, "data connection")?;
        let record = self
            .connections
            .update(tenant_id, &connection_id, &mut |c| c.status = status)?
            .ok_or_else(|| PlatformError::not_found("data connection", connection_id))?;
        self.announce(tenant_id, Table::DataConnections, ChangeOp::Update, &record);
        Ok(record)
    }

    async fn module_config(&self, scope: &PlatformScope) -> PlatformResult<ModuleConfig> {
        let tenant_id = scope.tenant()?;
        Ok(self.configs.get(tenant_id, &scope.module_id)?.unwrap_or_default())
    }

    async fn update_module_config(
        &self,
        scope: &PlatformScope,
        settings: Map<String, JsonValue>,
    ) -> PlatformResult<ModuleConfig> {
        let tenant_id = scope.tenant()?;
        let current = self.configs.get(tenant_id, &scope.module_id)?.unwrap_or_default();
        let next = current.merged(settings);
        self.store_config(tenant_id, scope, next.clone())?;
        tracing::info!(%tenant_id, module = %scope.module_id, "module config updated");
        Ok(next)
    }

    async fn set_module_enabled(&self, scope: &PlatformScope, enabled: bool) -> PlatformResult<ModuleConfig> {
        let tenant_id = scope.tenant()?;
        let mut next = self.configs.get(tenant_id, &scope.module_id)?.unwrap_or_default();
        next.enabled = enabled;
        self.store_config(tenant_id, scope, next.clone())?;
        tracing::info!(%tenant_id, module = %scope.module_id, enabled, "module enabled flag stored");
        Ok(next)
    }

    fn subscribe(
        &self,
        scope: &PlatformScope,
        table: Table,
        callback: ChangeCallback,
    ) -> PlatformResult<SubscriptionGuard> {
        let tenant_id = scope.tenant()?;
        let channel = format!("{table}_{}", scope.module_id);
        tracing::debug!(%tenant_id, %channel, "subscribing to table changes");
        Ok(self.feed.subscribe(ChangeFilter::new(tenant_id, table, channel), callback))
    }
}

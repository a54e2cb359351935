use async_trait::async_trait;
use modhub_core::{AlertId, ConnectionId};
use modhub_events::{ChangeCallback, SubscriptionGuard, Table};
use serde_json::{Map, Value as JsonValue};

use crate::error::PlatformResult;
use crate::records::{
    AlertRecord, AlertSeverity, ConnectionStatus, DataConnection, ModuleConfig, NewDataConnection, ReportRecord,
};
use crate::scope::PlatformScope;

/// Tenant-scoped persistence seen by a module.
///
/// Every operation takes the caller's [`PlatformScope`]. A scope without a tenant, or a
/// record id owned by another tenant, fails with
/// [`PlatformError::TenantBoundaryViolation`](crate::PlatformError::TenantBoundaryViolation)
/// before anything is read or written.
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    async fn create_report(
        &self,
        scope: &PlatformScope,
        title: &str,
        content: JsonValue,
        report_type: Option<&str>,
    ) -> PlatformResult<ReportRecord>;

    /// Newest first, this tenant and module only.
    async fn list_reports(&self, scope: &PlatformScope, limit: usize) -> PlatformResult<Vec<ReportRecord>>;

    async fn create_alert(
        &self,
        scope: &PlatformScope,
        severity: AlertSeverity,
        title: &str,
        message: &str,
    ) -> PlatformResult<AlertRecord>;

    /// Newest first, this tenant and module only.
    async fn list_alerts(&self, scope: &PlatformScope, only_unread: bool) -> PlatformResult<Vec<AlertRecord>>;

    async fn mark_alert_read(&self, scope: &PlatformScope, alert_id: AlertId) -> PlatformResult<AlertRecord>;

    /// Active connections of the tenant, optionally of one type.
    async fn list_data_connections(
        &self,
        scope: &PlatformScope,
        connection_type: Option<&str>,
    ) -> PlatformResult<Vec<DataConnection>>;

    async fn create_data_connection(
        &self,
        scope: &PlatformScope,
        connection: NewDataConnection,
    ) -> PlatformResult<DataConnection>;

    async fn update_data_connection_status(
        &self,
        scope: &PlatformScope,
        connection_id: ConnectionId,
        status: ConnectionStatus,
    ) -> PlatformResult<DataConnection>;

    /// Stored configuration, or the default (enabled, no settings) if none was saved.
    async fn module_config(&self, scope: &PlatformScope) -> PlatformResult<ModuleConfig>;

    /// Merge `settings` into the stored configuration and return the result.
    async fn update_module_config(
        &self,
        scope: &PlatformScope,
        settings: Map<String, JsonValue>,
    ) -> PlatformResult<ModuleConfig>;

    /// Persist the enabled flag, keeping settings untouched.
    async fn set_module_enabled(&self, scope: &PlatformScope, enabled: bool) -> PlatformResult<ModuleConfig>;

    /// Watch one table of the caller's tenant. Release the guard on teardown.
    fn subscribe(
        &self,
        scope: &PlatformScope,
        table: Table,
        callback: ChangeCallback,
    ) -> PlatformResult<SubscriptionGuard>;
}

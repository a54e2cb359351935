//! Persisted record shapes.

use chrono::{DateTime, Utc};
use modhub_core::{AlertId, ConnectionId, ModuleId, ReportId, TenantId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Report type used when the caller does not name one.
pub const DEFAULT_REPORT_TYPE: &str = "auto_generated";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub id: ReportId,
    pub tenant_id: TenantId,
    pub module_id: ModuleId,
    pub title: String,
    pub content: JsonValue,
    pub report_type: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        }
    }
}

impl core::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: AlertId,
    pub tenant_id: TenantId,
    pub module_id: ModuleId,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Active,
    Inactive,
    Error,
}

/// A tenant-level link to an external data source (CSV upload, API, database).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataConnection {
    pub id: ConnectionId,
    pub tenant_id: TenantId,
    pub connection_type: String,
    pub name: String,
    pub config: JsonValue,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
}

/// Input for [`PlatformGateway::create_data_connection`](crate::PlatformGateway::create_data_connection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDataConnection {
    pub connection_type: String,
    pub name: String,
    #[serde(default)]
    pub config: JsonValue,
}

/// Per-tenant configuration of one installed module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
    pub enabled: bool,
    #[serde(default)]
    pub settings: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_connections: Vec<ConnectionId>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settings: Map::new(),
            data_connections: Vec::new(),
        }
    }
}

impl ModuleConfig {
    pub fn setting(&self, key: &str) -> Option<&JsonValue> {
        self.settings.get(key)
    }

    /// Shallow merge: keys in `settings` replace existing keys, others are kept.
    pub fn merged(&self, settings: Map<String, JsonValue>) -> Self {
        let mut next = self.clone();
        next.settings.extend(settings);
        next
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn merge_keeps_unrelated_settings() {
        let mut base = ModuleConfig::default();
        base.settings.insert("threshold".into(), json!(70));
        base.settings.insert("mode".into(), json!("strict"));

        let update = json!({"threshold": 85}).as_object().cloned().unwrap();
        let next = base.merged(update);

        assert_eq!(next.setting("threshold"), Some(&json!(85)));
        assert_eq!(next.setting("mode"), Some(&json!("strict")));
        assert_eq!(base.setting("threshold"), Some(&json!(70)));
    }

    #[test]
    fn severity_is_ordered_and_lowercase_on_the_wire() {
        assert!(AlertSeverity::Low < AlertSeverity::Critical);
        assert_eq!(serde_json::to_value(AlertSeverity::High).unwrap(), json!("high"));
    }
}

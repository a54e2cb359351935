use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use modhub_core::TenantId;

/// Tables whose writes are announced on the change feed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Reports,
    Alerts,
    DataConnections,
    ModuleConfigs,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Reports => "reports",
            Table::Alerts => "alerts",
            Table::DataConnections => "data_connections",
            Table::ModuleConfigs => "module_configs",
        }
    }
}

impl core::fmt::Display for Table {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// A single row change, always carrying the tenant that owns the row.
///
/// `record` is the JSON form of the row after the change (before it, for deletes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableChange {
    pub tenant_id: TenantId,
    pub table: Table,
    pub op: ChangeOp,
    pub record: JsonValue,
    pub occurred_at: DateTime<Utc>,
}

impl TableChange {
    pub fn new(tenant_id: TenantId, table: Table, op: ChangeOp, record: JsonValue) -> Self {
        Self {
            tenant_id,
            table,
            op,
            record,
            occurred_at: Utc::now(),
        }
    }
}

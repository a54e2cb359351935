//! Instance lifecycle state.
//!
//! ```text
//! idle ──enable──▶ running ──disable──▶ paused
//!                     │                   │
//!                  failure             enable
//!                     ▼                   │
//!                   error ──enable──▶ running
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    #[default]
    Idle,
    Running,
    Error,
    Paused,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Idle => "idle",
            ModuleStatus::Running => "running",
            ModuleStatus::Error => "error",
            ModuleStatus::Paused => "paused",
        }
    }
}

impl core::fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable per-instance state. Only [`ModuleInstance`](crate::ModuleInstance) changes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleState {
    pub status: ModuleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, JsonValue>,
}

impl ModuleState {
    /// From any state. Clears a previous error.
    pub(crate) fn enable(&mut self) {
        self.status = ModuleStatus::Running;
        self.error_message = None;
    }

    pub(crate) fn disable(&mut self) {
        self.status = ModuleStatus::Paused;
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.status = ModuleStatus::Error;
        self.error_message = Some(message.into());
    }

    pub(crate) fn stamp_run(&mut self, at: DateTime<Utc>) {
        self.last_run = Some(at);
    }

    pub(crate) fn merge_metrics(&mut self, metrics: BTreeMap<String, JsonValue>) {
        self.metrics.extend(metrics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_follow_the_lifecycle() {
        let mut state = ModuleState::default();
        assert_eq!(state.status, ModuleStatus::Idle);

        state.enable();
        assert_eq!(state.status, ModuleStatus::Running);
        state.disable();
        assert_eq!(state.status, ModuleStatus::Paused);
        state.enable();
        state.fail("boom");
        assert_eq!(state.status, ModuleStatus::Error);
        assert_eq!(state.error_message.as_deref(), Some("boom"));

        state.enable();
        assert_eq!(state.status, ModuleStatus::Running);
        assert_eq!(state.error_message, None);
    }
}

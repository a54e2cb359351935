use serde::Deserialize;
use serde_json::{Map, Value as JsonValue, json};

use modhub_events::Table;
use modhub_runtime::{ModuleRegistration, ModuleState};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct RunModuleRequest {
    #[serde(default)]
    pub input: JsonValue,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConfigRequest {
    pub settings: Map<String, JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertsQuery {
    #[serde(default)]
    pub only_unread: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChangesQuery {
    pub table: Option<Table>,
}

pub const DEFAULT_REPORT_LIMIT: usize = 20;

// -------------------------
// Response mapping
// -------------------------

pub fn module_to_json(registration: &ModuleRegistration) -> JsonValue {
    json!({
        "metadata": registration.metadata(),
        "capabilities": registration.capabilities(),
    })
}

pub fn run_to_json(output: JsonValue, state: &ModuleState) -> JsonValue {
    json!({
        "output": output,
        "state": state,
    })
}

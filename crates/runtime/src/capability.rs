use serde::{Deserialize, Serialize};

use crate::error::ModuleError;
use modhub_core::ModuleId;

/// Declared permission flags of a module type. Read-only at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCapabilities {
    pub can_generate_reports: bool,
    pub can_send_alerts: bool,
    pub can_process_data: bool,
    pub can_integrate_external: bool,
    pub requires_data_connection: bool,
}

impl ModuleCapabilities {
    /// Every permission granted; no data connection required.
    pub fn all() -> Self {
        Self {
            can_generate_reports: true,
            can_send_alerts: true,
            can_process_data: true,
            can_integrate_external: true,
            requires_data_connection: false,
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::GenerateReports => self.can_generate_reports,
            Capability::SendAlerts => self.can_send_alerts,
            Capability::ProcessData => self.can_process_data,
            Capability::IntegrateExternal => self.can_integrate_external,
        }
    }
}

/// A gated operation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "canGenerateReports")]
    GenerateReports,
    #[serde(rename = "canSendAlerts")]
    SendAlerts,
    #[serde(rename = "canProcessData")]
    ProcessData,
    #[serde(rename = "canIntegrateExternal")]
    IntegrateExternal,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::GenerateReports => "canGenerateReports",
            Capability::SendAlerts => "canSendAlerts",
            Capability::ProcessData => "canProcessData",
            Capability::IntegrateExternal => "canIntegrateExternal",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check `required` against a module's declared capabilities.
///
/// - No IO
/// - No panics
/// - Denials are logged and returned, never downgraded to a no-op
pub fn authorize(module: &ModuleId, capabilities: &ModuleCapabilities, required: Capability) -> Result<(), ModuleError> {
    if capabilities.allows(required) {
        return Ok(());
    }
    tracing::warn!(%module, capability = %required, "capability denied");
    Err(ModuleError::CapabilityDenied {
        module: module.clone(),
        capability: required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_names_the_missing_capability() {
        let module = ModuleId::new("quiet").unwrap();
        let caps = ModuleCapabilities {
            can_generate_reports: true,
            ..ModuleCapabilities::default()
        };

        assert!(authorize(&module, &caps, Capability::GenerateReports).is_ok());
        let err = authorize(&module, &caps, Capability::SendAlerts).unwrap_err();
        assert_eq!(err.to_string(), "module 'quiet' lacks capability 'canSendAlerts'");
    }
}

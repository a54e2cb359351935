use modhub_ai::AiError;
use modhub_core::ModuleId;
use modhub_platform::PlatformError;
use thiserror::Error;

use crate::capability::Capability;

pub type ModuleResult<T> = Result<T, ModuleError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModuleError {
    /// The module tried a side effect its declared capabilities forbid. Nothing was written.
    #[error("module '{module}' lacks capability '{capability}'")]
    CapabilityDenied { module: ModuleId, capability: Capability },

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The module's own logic reported a failure.
    #[error("module failed: {0}")]
    Failed(String),

    #[error("module '{module}' panicked: {message}")]
    Panicked { module: ModuleId, message: String },

    #[error("module not registered: {0}")]
    ModuleNotFound(ModuleId),

    #[error("module registered as '{registered}' but its constructor builds '{constructed}'")]
    RegistrationMismatch { registered: ModuleId, constructed: ModuleId },

    /// The tenant paused this module; runs are refused until it is enabled again.
    #[error("module '{0}' is disabled for this tenant")]
    ModuleDisabled(ModuleId),

    #[error(transparent)]
    Ai(#[from] AiError),
}

impl ModuleError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    pub fn is_capability_denied(&self) -> bool {
        matches!(self, Self::CapabilityDenied { .. })
    }

    pub fn is_tenant_boundary_violation(&self) -> bool {
        matches!(self, Self::Platform(PlatformError::TenantBoundaryViolation(_)))
    }
}

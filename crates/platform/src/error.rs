use thiserror::Error;

pub type PlatformResult<T> = Result<T, PlatformError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The call lacked a tenant scope, or named a record owned by another tenant.
    /// The operation was not executed.
    #[error("tenant boundary violation: {0}")]
    TenantBoundaryViolation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl PlatformError {
    pub fn boundary(msg: impl Into<String>) -> Self {
        Self::TenantBoundaryViolation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

//! Strongly-typed identifiers used across the platform.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a tenant (the company that installed modules).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

/// Identifier of a user (acting identity of a module call).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

/// Identifier of a persisted report.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(Uuid);

/// Identifier of a persisted alert.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(Uuid);

/// Identifier of a data-connection record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// `true` for the all-zero identifier, which never names a real record.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(TenantId, "TenantId");
impl_uuid_newtype!(UserId, "UserId");
impl_uuid_newtype!(ReportId, "ReportId");
impl_uuid_newtype!(AlertId, "AlertId");
impl_uuid_newtype!(ConnectionId, "ConnectionId");

/// Unique string key of a module type (e.g. `"fraud-detection"`).
///
/// Keys are lowercase ASCII letters, digits, `-`, `_` and `.`; this keeps them usable
/// as URL path segments and change-feed channel names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::invalid_id("ModuleId: empty"));
        }
        if let Some(bad) = id
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.')))
        {
            return Err(DomainError::invalid_id(format!(
                "ModuleId: unexpected character '{bad}' in '{id}'"
            )));
        }
        Ok(Self(id))
    }

    /// For keys fixed at compile time. An invalid key panics in debug builds.
    pub fn from_static(id: &'static str) -> Self {
        debug_assert!(Self::new(id).is_ok(), "invalid module id '{id}'");
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModuleId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ModuleId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ModuleId> for String {
    fn from(value: ModuleId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_id_accepts_kebab_keys() {
        let id = ModuleId::new("fraud-detection").unwrap();
        assert_eq!(id.as_str(), "fraud-detection");
        assert_eq!(id.to_string(), "fraud-detection");
    }

    #[test]
    fn module_id_rejects_empty_and_uppercase() {
        assert!(matches!(ModuleId::new(""), Err(DomainError::InvalidId(_))));
        assert!(matches!(ModuleId::new("Fraud"), Err(DomainError::InvalidId(_))));
        assert!(matches!(ModuleId::new("a b"), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn module_id_deserialization_validates() {
        let ok: ModuleId = serde_json::from_str("\"student-performance\"").unwrap();
        assert_eq!(ok.as_str(), "student-performance");
        assert!(serde_json::from_str::<ModuleId>("\"Not Valid\"").is_err());
    }

    #[test]
    fn tenant_id_parses_and_reports_nil() {
        let nil: TenantId = "00000000-0000-0000-0000-000000000000".parse().unwrap();
        assert!(nil.is_nil());
        assert!(!TenantId::new().is_nil());
        assert!("not-a-uuid".parse::<TenantId>().is_err());
    }
}

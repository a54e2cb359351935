//! `modhub-core`: shared building blocks.
//!
//! Identifiers and the domain error type used by every other crate. No IO lives here.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{AlertId, ConnectionId, ModuleId, ReportId, TenantId, UserId};

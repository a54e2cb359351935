//! `modhub-events`: tenant-scoped change notifications.
//!
//! Writes made through the platform gateway are announced as [`TableChange`]s on a
//! [`ChangeFeed`]. Modules subscribe with a tenant + table filter and receive a
//! [`SubscriptionGuard`] that must be released on teardown.

pub mod bus;
pub mod envelope;
pub mod in_memory_bus;
pub mod tenant;

pub use bus::{ChangeCallback, ChangeFeed, ChangeFilter, SubscriptionGuard, SubscriptionId};
pub use envelope::{ChangeOp, Table, TableChange};
pub use in_memory_bus::{InMemoryChangeFeed, InMemoryFeedError};
pub use tenant::TenantScoped;

//! `modhub-platform`: tenant-scoped persistence for modules.
//!
//! **Responsibility:** reports, alerts, data connections and module configuration, each
//! filtered by the caller's tenant. Every write is announced on the change feed so modules
//! can react to table changes through a scoped subscription.
//!
//! Nothing here decides *whether* a module may write; capability checks live in the runtime.

pub mod error;
pub mod gateway;
pub mod in_memory;
pub mod records;
pub mod scope;
pub mod store;

pub use error::{PlatformError, PlatformResult};
pub use gateway::PlatformGateway;
pub use in_memory::InMemoryPlatform;
pub use records::{
    AlertRecord, AlertSeverity, ConnectionStatus, DataConnection, ModuleConfig, NewDataConnection, ReportRecord,
    DEFAULT_REPORT_TYPE,
};
pub use scope::PlatformScope;
pub use store::{InMemoryTenantStore, TenantStore};

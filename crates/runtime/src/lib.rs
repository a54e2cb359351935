//! `modhub-runtime`: the plugin runtime.
//!
//! **Responsibility:** register module types, own each instance's lifecycle state, and
//! gate the side effects a module may perform by its declared capabilities.
//!
//! - [`ModuleRegistry`] maps a module id to its constructor (last registration wins).
//! - [`ModuleInstance`] drives lifecycle hooks and `execute`, converting failures and
//!   panics into the `error` state plus a typed [`ModuleError`].
//! - [`ModuleScope`] is what a module sees while it runs: its context, the AI gateway,
//!   capability-checked report/alert creation, and metrics.

pub mod builtin;
pub mod capability;
pub mod context;
pub mod error;
pub mod instance;
pub mod metadata;
pub mod module;
pub mod registry;
pub mod scope;
pub mod state;

pub use builtin::{ModuleKind, register_builtin};
pub use capability::{Capability, ModuleCapabilities, authorize};
pub use context::ModuleContext;
pub use error::{ModuleError, ModuleResult};
pub use instance::{ModuleInstance, ModuleServices};
pub use metadata::{ModuleMetadata, PricingTier};
pub use module::Module;
pub use registry::{ModuleConstructor, ModuleRegistration, ModuleRegistry};
pub use scope::ModuleScope;
pub use state::{ModuleState, ModuleStatus};

mod integration_tests;

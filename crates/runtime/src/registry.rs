//! Process-wide map from module id to module constructor.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use modhub_core::ModuleId;

use crate::capability::ModuleCapabilities;
use crate::error::{ModuleError, ModuleResult};
use crate::instance::{ModuleInstance, ModuleServices};
use crate::metadata::ModuleMetadata;
use crate::module::Module;

pub type ModuleConstructor = Arc<dyn Fn() -> Arc<dyn Module> + Send + Sync>;

/// A registered module type.
#[derive(Clone)]
pub struct ModuleRegistration {
    metadata: ModuleMetadata,
    constructor: ModuleConstructor,
}

impl ModuleRegistration {
    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    pub fn construct(&self) -> Arc<dyn Module> {
        (self.constructor)()
    }

    /// Capabilities as declared by a freshly constructed module.
    pub fn capabilities(&self) -> ModuleCapabilities {
        self.construct().capabilities()
    }
}

impl core::fmt::Debug for ModuleRegistration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleRegistration")
            .field("id", &self.metadata.id)
            .field("version", &self.metadata.version)
            .finish_non_exhaustive()
    }
}

/// Append/overwrite-only registry.
///
/// `register` with an id that is already present replaces the previous entry (hot reload).
/// Reads hand out clones, never references into the map.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RwLock<HashMap<ModuleId, ModuleRegistration>>,
}

impl core::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModuleRegistry").field("modules", &self.len()).finish()
    }
}

static GLOBAL: OnceLock<ModuleRegistry> = OnceLock::new();

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static ModuleRegistry {
        GLOBAL.get_or_init(ModuleRegistry::new)
    }

    /// Rejects the registration when the constructor builds a module under another id.
    pub fn register<F>(&self, metadata: ModuleMetadata, constructor: F) -> ModuleResult<()>
    where
        F: Fn() -> Arc<dyn Module> + Send + Sync + 'static,
    {
        let id = metadata.id.clone();
        let built = constructor().metadata().id.clone();
        if built != id {
            tracing::error!(module = %id, constructed = %built, "module registration rejected: id mismatch");
            return Err(ModuleError::RegistrationMismatch {
                registered: id,
                constructed: built,
            });
        }
        let registration = ModuleRegistration {
            metadata,
            constructor: Arc::new(constructor),
        };
        // Entries are whole values; a poisoned lock cannot hold a half-written one.
        let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
        if modules.insert(id.clone(), registration).is_some() {
            tracing::debug!(module = %id, "module registration replaced");
        } else {
            tracing::debug!(module = %id, "module registered");
        }
        Ok(())
    }

    pub fn get(&self, id: &ModuleId) -> Option<ModuleRegistration> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn has(&self, id: &ModuleId) -> bool {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Snapshot of every registration, sorted by id.
    pub fn all(&self) -> Vec<ModuleRegistration> {
        let mut all: Vec<_> = self
            .modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.metadata.id.cmp(&b.metadata.id));
        all
    }

    pub fn len(&self) -> usize {
        self.modules.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn instantiate(&self, id: &ModuleId, services: ModuleServices) -> ModuleResult<ModuleInstance> {
        let registration = self
            .get(id)
            .ok_or_else(|| ModuleError::ModuleNotFound(id.clone()))?;
        Ok(ModuleInstance::new(registration.construct(), services))
    }
}

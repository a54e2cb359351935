use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use modhub_core::TenantId;

use crate::error::{PlatformError, PlatformResult};

/// Tenant-isolated key/value table.
///
/// Every read and write is keyed by tenant; there is no way to list or fetch across
/// tenants except [`owner_of`](Self::owner_of), which only reveals who owns a key.
pub trait TenantStore<K, V>: Send + Sync {
    fn get(&self, tenant_id: TenantId, key: &K) -> PlatformResult<Option<V>>;

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> PlatformResult<()>;

    /// Apply `f` to the stored value in place and return the updated copy.
    fn update(&self, tenant_id: TenantId, key: &K, f: &mut dyn FnMut(&mut V)) -> PlatformResult<Option<V>>;

    fn list(&self, tenant_id: TenantId) -> PlatformResult<Vec<V>>;

    fn owner_of(&self, key: &K) -> PlatformResult<Option<TenantId>>;
}

/// In-memory tenant-isolated table for tests, dev and the single-process host.
#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    inner: RwLock<HashMap<(TenantId, K), V>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> PlatformError {
    PlatformError::storage("tenant store lock poisoned")
}

impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> PlatformResult<Option<V>> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.get(&(tenant_id, key.clone())).cloned())
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> PlatformResult<()> {
        let mut map = self.inner.write().map_err(poisoned)?;
        map.insert((tenant_id, key), value);
        Ok(())
    }

    fn update(&self, tenant_id: TenantId, key: &K, f: &mut dyn FnMut(&mut V)) -> PlatformResult<Option<V>> {
        let mut map = self.inner.write().map_err(poisoned)?;
        Ok(map.get_mut(&(tenant_id, key.clone())).map(|value| {
            f(value);
            value.clone()
        }))
    }

    fn list(&self, tenant_id: TenantId) -> PlatformResult<Vec<V>> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map
            .iter()
            .filter_map(|((t, _k), v)| if *t == tenant_id { Some(v.clone()) } else { None })
            .collect())
    }

    fn owner_of(&self, key: &K) -> PlatformResult<Option<TenantId>> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.keys().find(|(_, k)| k == key).map(|(t, _)| *t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_never_cross_tenants() {
        let store: InMemoryTenantStore<u32, &str> = InMemoryTenantStore::new();
        let (a, b) = (TenantId::new(), TenantId::new());
        store.upsert(a, 1, "a-one").unwrap();
        store.upsert(b, 2, "b-two").unwrap();

        assert_eq!(store.get(a, &1).unwrap(), Some("a-one"));
        assert_eq!(store.get(b, &1).unwrap(), None);
        assert_eq!(store.list(a).unwrap(), vec!["a-one"]);
        assert_eq!(store.owner_of(&2).unwrap(), Some(b));
    }

    #[test]
    fn update_only_touches_the_owning_tenant() {
        let store: InMemoryTenantStore<u32, String> = InMemoryTenantStore::new();
        let (a, b) = (TenantId::new(), TenantId::new());
        store.upsert(a, 1, "draft".to_string()).unwrap();

        assert_eq!(store.update(b, &1, &mut |v| v.push_str("!")).unwrap(), None);
        assert_eq!(store.update(a, &1, &mut |v| v.push_str("!")).unwrap().as_deref(), Some("draft!"));
    }
}

//! In-memory change feed for tests/dev (and the single-process host).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use thiserror::Error;

use crate::bus::{ChangeCallback, ChangeFeed, ChangeFilter, SubscriptionGuard, SubscriptionId};
use crate::TableChange;

#[derive(Debug, Error)]
pub enum InMemoryFeedError {
    /// Publish failed due to internal lock poisoning.
    #[error("change feed lock poisoned")]
    Poisoned,
}

struct Subscriber {
    filter: ChangeFilter,
    callback: ChangeCallback,
}

#[derive(Default)]
struct Inner {
    subscribers: RwLock<BTreeMap<SubscriptionId, Subscriber>>,
    next_id: AtomicU64,
}

/// In-memory pub/sub feed.
///
/// - No IO
/// - Synchronous fan-out in subscription order
/// - Release waits for in-flight deliveries, so no callback runs after `unsubscribe` returns
#[derive(Clone, Default)]
pub struct InMemoryChangeFeed {
    inner: Arc<Inner>,
}

impl InMemoryChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscriptions that have not been released yet.
    pub fn active_subscriptions(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .map(|subs| subs.len())
            .unwrap_or(0)
    }
}

impl core::fmt::Debug for InMemoryChangeFeed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryChangeFeed")
            .field("active_subscriptions", &self.active_subscriptions())
            .finish()
    }
}

fn release(inner: &Weak<Inner>, id: SubscriptionId) {
    // Feed already gone: nothing left to deliver to.
    let Some(inner) = inner.upgrade() else {
        return;
    };
    match inner.subscribers.write() {
        Ok(mut subs) => {
            subs.remove(&id);
        }
        Err(poisoned) => {
            poisoned.into_inner().remove(&id);
        }
    }
}

impl ChangeFeed for InMemoryChangeFeed {
    type Error = InMemoryFeedError;

    fn publish(&self, change: TableChange) -> Result<usize, Self::Error> {
        let subs = self
            .inner
            .subscribers
            .read()
            .map_err(|_| InMemoryFeedError::Poisoned)?;

        let mut delivered = 0;
        for sub in subs.values().filter(|s| s.filter.matches(&change)) {
            (sub.callback)(&change);
            delivered += 1;
        }
        Ok(delivered)
    }

    fn subscribe(&self, filter: ChangeFilter, callback: ChangeCallback) -> SubscriptionGuard {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let channel = filter.channel.clone();

        match self.inner.subscribers.write() {
            Ok(mut subs) => {
                subs.insert(id, Subscriber { filter, callback });
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(id, Subscriber { filter, callback });
            }
        }
        tracing::debug!(subscription = %id, channel = %channel, "subscription opened");

        let weak = Arc::downgrade(&self.inner);
        SubscriptionGuard::new(id, channel, move || release(&weak, id))
    }
}

//! Change-feed publishing/subscription abstraction (mechanics only).
//!
//! The feed is the pub/sub side of the platform gateway: every write to a tenant-owned
//! table is published once, and every subscriber whose filter matches receives it.
//!
//! ## Delivery
//!
//! - **Tenant-filtered**: a subscriber never receives a change owned by another tenant.
//! - **Best-effort**: changes are not persisted by the feed; the store is the source of truth.
//! - **Scoped**: `subscribe` hands back a [`SubscriptionGuard`]. Releasing the guard (explicitly
//!   via [`SubscriptionGuard::unsubscribe`], or by dropping it) removes the callback; after
//!   release returns, the callback is never invoked again.
//!
//! Callbacks run on the publishing thread. They must not subscribe or unsubscribe on the
//! same feed from inside the callback.

use std::sync::Arc;

use modhub_core::TenantId;

use crate::{Table, TableChange, TenantScoped};

/// Callback invoked for each matching change.
pub type ChangeCallback = Arc<dyn Fn(&TableChange) + Send + Sync>;

/// Identifier of a live subscription (unique per feed).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl core::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// What a subscriber wants to see: one table of one tenant.
///
/// `channel` is a human-readable name used in logs (e.g. `alerts_fraud-detection`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub tenant_id: TenantId,
    pub table: Table,
    pub channel: String,
}

impl ChangeFilter {
    pub fn new(tenant_id: TenantId, table: Table, channel: impl Into<String>) -> Self {
        Self {
            tenant_id,
            table,
            channel: channel.into(),
        }
    }

    pub fn matches(&self, change: &TableChange) -> bool {
        change.tenant_id() == self.tenant_id && change.table == self.table
    }
}

/// Owned handle for a live subscription.
///
/// Acquired from [`ChangeFeed::subscribe`]; released exactly once, either through
/// [`unsubscribe`](Self::unsubscribe) or on drop.
#[must_use = "dropping the guard immediately cancels the subscription"]
pub struct SubscriptionGuard {
    id: SubscriptionId,
    channel: String,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl SubscriptionGuard {
    pub fn new(
        id: SubscriptionId,
        channel: impl Into<String>,
        release: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            channel: channel.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Cancel the subscription. No callback invocation starts after this returns.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            tracing::debug!(subscription = %self.id, channel = %self.channel, "subscription released");
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl core::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// Tenant-filtered change feed.
///
/// ## Thread Safety
///
/// The trait requires `Send + Sync`; writers on any thread may publish concurrently.
pub trait ChangeFeed: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Deliver `change` to every matching subscriber. Returns the number of deliveries.
    fn publish(&self, change: TableChange) -> Result<usize, Self::Error>;

    fn subscribe(&self, filter: ChangeFilter, callback: ChangeCallback) -> SubscriptionGuard;
}

impl<F> ChangeFeed for Arc<F>
where
    F: ChangeFeed + ?Sized,
{
    type Error = F::Error;

    fn publish(&self, change: TableChange) -> Result<usize, Self::Error> {
        (**self).publish(change)
    }

    fn subscribe(&self, filter: ChangeFilter, callback: ChangeCallback) -> SubscriptionGuard {
        (**self).subscribe(filter, callback)
    }
}

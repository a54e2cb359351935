use modhub_core::TenantId;

use crate::TableChange;

/// Helper trait for tenant-scoped messages.
///
/// Feed implementations use it to filter deliveries so a subscriber only ever sees
/// changes that belong to its own tenant.
pub trait TenantScoped {
    fn tenant_id(&self) -> TenantId;
}

impl TenantScoped for TableChange {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

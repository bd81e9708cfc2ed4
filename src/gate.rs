//! Credential -> tenant resolution.

use std::sync::Arc;

use crate::error::{AuthError, Result};
use crate::models::Tenant;
use crate::store::Store;

/// Resolves an opaque API key to exactly one active tenant.
pub struct AccessGate {
    store: Arc<dyn Store>,
}

impl AccessGate {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// `None` and `""` are both a missing credential. Matching is exact
    /// and case-sensitive; deactivated tenants never match.
    pub async fn resolve(&self, credential: Option<&str>) -> Result<Tenant> {
        let credential = match credential {
            Some(c) if !c.is_empty() => c,
            _ => return Err(AuthError::Missing.into()),
        };

        match self.store.find_active_tenant_by_key(credential).await? {
            Some(tenant) => {
                tracing::debug!(tenant_id = tenant.id, "credential resolved");
                Ok(tenant)
            }
            None => Err(AuthError::Invalid.into()),
        }
    }
}

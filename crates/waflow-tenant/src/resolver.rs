// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant activation gate, credential lookup, and configuration merging.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};
use waflow_core::{CredentialBundle, TenantId, TenantStatus, WaflowError};
use waflow_storage::models::Tenant;
use waflow_storage::queries::{bot_config, tenants};
use waflow_storage::Database;

/// Two-level precedence: the tenant override wins, the platform default
/// backs it, absence of both yields `None`.
pub fn merge(override_value: Option<Value>, default_value: Option<Value>) -> Option<Value> {
    override_value.or(default_value)
}

/// Resolves tenant identity, credentials, and configuration against storage.
#[derive(Clone)]
pub struct TenantResolver {
    db: Database,
}

impl TenantResolver {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Load a tenant and require it to be active. Suspended and disabled
    /// tenants are rejected before any message processing happens.
    pub async fn require_active(&self, tenant_id: &TenantId) -> Result<Tenant, WaflowError> {
        let tenant = tenants::get_tenant(&self.db, &tenant_id.0)
            .await?
            .ok_or_else(|| WaflowError::TenantNotFound {
                tenant_id: tenant_id.0.clone(),
            })?;
        if tenant.status != TenantStatus::Active {
            return Err(WaflowError::TenantInactive {
                tenant_id: tenant_id.0.clone(),
                status: tenant.status.to_string(),
            });
        }
        Ok(tenant)
    }

    /// Load the tenant's credential bundle. Fail-closed: a missing bundle
    /// or one with any empty field refuses processing rather than falling
    /// back to shared credentials.
    pub async fn resolve_credentials(
        &self,
        tenant_id: &TenantId,
    ) -> Result<CredentialBundle, WaflowError> {
        let bundle = tenants::get_credentials(&self.db, &tenant_id.0)
            .await?
            .ok_or_else(|| WaflowError::CredentialsNotConfigured {
                tenant_id: tenant_id.0.clone(),
            })?;
        if bundle.access_token.is_empty()
            || bundle.verify_token.is_empty()
            || bundle.app_secret.is_empty()
            || bundle.phone_number_id.is_empty()
        {
            warn!(tenant_id = %tenant_id, "credential bundle has empty fields, refusing");
            return Err(WaflowError::CredentialsNotConfigured {
                tenant_id: tenant_id.0.clone(),
            });
        }
        Ok(bundle)
    }

    /// Resolve one configuration key with override-over-default precedence.
    pub async fn resolve_config(
        &self,
        tenant_id: &TenantId,
        key: &str,
    ) -> Result<Option<Value>, WaflowError> {
        let resolved = self
            .resolve_config_batch(tenant_id, &[key.to_string()])
            .await?;
        Ok(resolved.into_iter().next().map(|(_, v)| v))
    }

    /// Resolve a set of keys in a single storage round trip, returning
    /// the merged value per key. Keys with neither an override nor a
    /// default are absent from the result.
    pub async fn resolve_config_batch(
        &self,
        tenant_id: &TenantId,
        keys: &[String],
    ) -> Result<HashMap<String, Value>, WaflowError> {
        let rows = bot_config::fetch_rows(&self.db, &tenant_id.0, keys).await?;
        let mut overrides: HashMap<String, Value> = HashMap::new();
        let mut defaults: HashMap<String, Value> = HashMap::new();
        for row in rows {
            if row.is_default {
                defaults.insert(row.key, row.value);
            } else {
                overrides.insert(row.key, row.value);
            }
        }

        let mut merged = HashMap::new();
        for key in keys {
            if let Some(value) = merge(overrides.remove(key), defaults.remove(key)) {
                merged.insert(key.clone(), value);
            }
        }
        debug!(tenant_id = %tenant_id, requested = keys.len(), resolved = merged.len(), "resolved config batch");
        Ok(merged)
    }

    /// Write a tenant override. Platform defaults are never touched by
    /// tenant-scoped writes.
    pub async fn set_config(
        &self,
        tenant_id: &TenantId,
        key: &str,
        value: &Value,
    ) -> Result<(), WaflowError> {
        bot_config::set_override(&self.db, &tenant_id.0, key, value).await
    }

    /// Remove a tenant override, restoring the platform default. Removing
    /// an override that does not exist is a no-op.
    pub async fn reset_config(&self, tenant_id: &TenantId, key: &str) -> Result<bool, WaflowError> {
        bot_config::reset_override(&self.db, &tenant_id.0, key).await
    }
}

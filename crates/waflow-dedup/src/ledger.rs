// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dedup coordinator composing the fast cache and the durable store.
//!
//! Duplicate checks consult the cache first and fall through to the
//! durable store, backfilling the cache on a durable hit. Backend
//! failures fail open: a message is treated as new rather than dropped,
//! accepting a possible duplicate reply over a lost one. The narrow
//! window between check and mark is likewise left open; the provider
//! redelivers rarely enough that a second reply is the cheaper failure.

use std::sync::Arc;

use tracing::{debug, error, warn};
use waflow_core::{DedupBackend, DedupMeta, MessageId, TenantId, WaflowError};

/// Two-tier deduplication ledger.
pub struct DedupLedger {
    cache: Arc<dyn DedupBackend>,
    durable: Arc<dyn DedupBackend>,
}

impl DedupLedger {
    pub fn new(cache: Arc<dyn DedupBackend>, durable: Arc<dyn DedupBackend>) -> Self {
        Self { cache, durable }
    }

    /// Returns whether `(tenant_id, message_id)` was already processed.
    ///
    /// Never fails: backend errors are logged and the message treated as
    /// new.
    pub async fn check_duplicate(&self, tenant_id: &TenantId, message_id: &MessageId) -> bool {
        match self.cache.seen(tenant_id, message_id).await {
            Ok(true) => {
                debug!(tenant_id = %tenant_id, message_id = %message_id, backend = self.cache.name(), "duplicate hit");
                return true;
            }
            Ok(false) => {}
            Err(e) => {
                error!(tenant_id = %tenant_id, backend = self.cache.name(), error = %e, "dedup check failed, failing open");
            }
        }

        match self.durable.seen(tenant_id, message_id).await {
            Ok(true) => {
                debug!(tenant_id = %tenant_id, message_id = %message_id, backend = self.durable.name(), "duplicate hit");
                // Warm the cache so the next redelivery short-circuits.
                if let Err(e) = self
                    .cache
                    .record(tenant_id, message_id, &DedupMeta::default())
                    .await
                {
                    warn!(backend = self.cache.name(), error = %e, "cache backfill failed");
                }
                true
            }
            Ok(false) => false,
            Err(e) => {
                error!(tenant_id = %tenant_id, backend = self.durable.name(), error = %e, "dedup check failed, failing open");
                false
            }
        }
    }

    /// Record a processed message in both tiers. The durable store is
    /// authoritative; a cache write failure only costs a fast-path hit.
    pub async fn mark_processed(
        &self,
        tenant_id: &TenantId,
        message_id: &MessageId,
        meta: &DedupMeta,
    ) -> Result<(), WaflowError> {
        if let Err(e) = self.cache.record(tenant_id, message_id, meta).await {
            warn!(backend = self.cache.name(), error = %e, "cache record failed");
        }
        self.durable.record(tenant_id, message_id, meta).await
    }
}

// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dedup backend trait implemented by the fast cache and the durable store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WaflowError;
use crate::types::{MessageId, TenantId};

/// Optional metadata captured alongside a dedup record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DedupMeta {
    /// Sender address of the message, when known.
    pub sender: Option<String>,
    /// ISO 8601 capture timestamp.
    pub captured_at: Option<String>,
}

/// One backend of the deduplication ledger.
///
/// Two implementations exist: a fast in-process cache and a durable SQLite
/// store. The coordinator in `waflow-dedup` composes them and owns the
/// degradation policy; backends just report their own errors.
#[async_trait]
pub trait DedupBackend: Send + Sync {
    /// Short backend name for log fields.
    fn name(&self) -> &str;

    /// Returns whether a record for `(tenant_id, message_id)` exists.
    async fn seen(&self, tenant_id: &TenantId, message_id: &MessageId)
        -> Result<bool, WaflowError>;

    /// Records `(tenant_id, message_id)` as processed.
    ///
    /// Recording an already-present pair is not an error.
    async fn record(
        &self,
        tenant_id: &TenantId,
        message_id: &MessageId,
        meta: &DedupMeta,
    ) -> Result<(), WaflowError>;
}

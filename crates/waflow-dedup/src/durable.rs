// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable dedup backend over the SQLite processed-messages table.

use async_trait::async_trait;
use waflow_core::{DedupBackend, DedupMeta, MessageId, TenantId, WaflowError};
use waflow_storage::queries::dedup;
use waflow_storage::Database;

/// Authoritative dedup records, surviving restarts.
pub struct DurableStore {
    db: Database,
}

impl DurableStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DedupBackend for DurableStore {
    fn name(&self) -> &str {
        "durable"
    }

    async fn seen(
        &self,
        tenant_id: &TenantId,
        message_id: &MessageId,
    ) -> Result<bool, WaflowError> {
        dedup::exists(&self.db, &tenant_id.0, &message_id.0).await
    }

    async fn record(
        &self,
        tenant_id: &TenantId,
        message_id: &MessageId,
        meta: &DedupMeta,
    ) -> Result<(), WaflowError> {
        dedup::insert_if_absent(
            &self.db,
            &tenant_id.0,
            &message_id.0,
            meta.sender.as_deref(),
            meta.captured_at.as_deref(),
        )
        .await?;
        Ok(())
    }
}

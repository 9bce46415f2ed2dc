// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process dedup cache with TTL expiry.
//!
//! First line of defence against provider redeliveries, which mostly
//! arrive within seconds of the original. Lost on restart; the durable
//! store is the authority.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use waflow_core::{DedupBackend, DedupMeta, MessageId, TenantId, WaflowError};

/// Opportunistic pruning runs once every this many records.
const PRUNE_INTERVAL: u64 = 1024;

/// TTL-bounded in-memory dedup records.
pub struct MemoryCache {
    entries: DashMap<(String, String), Instant>,
    ttl: Duration,
    records: AtomicU64,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            records: AtomicU64::new(0),
        }
    }

    /// Drop all expired entries.
    pub fn prune_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, inserted| inserted.elapsed() < ttl);
    }

    /// Live (non-expired) entry count. Test and diagnostics helper.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.value().elapsed() < self.ttl)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(tenant_id: &TenantId, message_id: &MessageId) -> (String, String) {
        (tenant_id.0.clone(), message_id.0.clone())
    }
}

#[async_trait]
impl DedupBackend for MemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    async fn seen(
        &self,
        tenant_id: &TenantId,
        message_id: &MessageId,
    ) -> Result<bool, WaflowError> {
        let key = Self::key(tenant_id, message_id);
        match self.entries.get(&key) {
            Some(inserted) if inserted.elapsed() < self.ttl => Ok(true),
            Some(_) => {
                drop(self.entries.remove(&key));
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn record(
        &self,
        tenant_id: &TenantId,
        message_id: &MessageId,
        _meta: &DedupMeta,
    ) -> Result<(), WaflowError> {
        self.entries
            .insert(Self::key(tenant_id, message_id), Instant::now());
        if self.records.fetch_add(1, Ordering::Relaxed) % PRUNE_INTERVAL == PRUNE_INTERVAL - 1 {
            self.prune_expired();
        }
        Ok(())
    }
}

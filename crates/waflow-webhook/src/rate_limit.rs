// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-window per-source-IP rate limiting.
//!
//! Guards the handshake endpoint against verification-token brute force
//! and bounds delivery bursts. Windows live in a shared map and are
//! pruned opportunistically.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

const WINDOW: Duration = Duration::from_secs(60);
const PRUNE_INTERVAL: u64 = 256;

struct Window {
    started: Instant,
    count: u32,
}

/// Per-IP fixed-window limiter.
pub struct RateLimiter {
    windows: DashMap<IpAddr, Window>,
    limit: u32,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new(limit_per_minute: u32) -> Self {
        Self {
            windows: DashMap::new(),
            limit: limit_per_minute,
            checks: AtomicU64::new(0),
        }
    }

    /// Returns whether a request from `ip` is within the ceiling.
    pub fn allow(&self, ip: IpAddr) -> bool {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_INTERVAL == PRUNE_INTERVAL - 1 {
            self.prune_expired();
        }
        let mut entry = self.windows.entry(ip).or_insert_with(|| Window {
            started: Instant::now(),
            count: 0,
        });
        if entry.started.elapsed() >= WINDOW {
            entry.started = Instant::now();
            entry.count = 0;
        }
        if entry.count >= self.limit {
            return false;
        }
        entry.count += 1;
        true
    }

    /// Drop windows older than one period.
    pub fn prune_expired(&self) {
        self.windows.retain(|_, w| w.started.elapsed() < WINDOW);
    }
}

// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-tier message deduplication.
//!
//! The fast tier is an in-process TTL cache; the durable tier is the
//! SQLite processed-messages table. The ledger composes both and owns
//! the fail-open degradation policy.

pub mod cache;
pub mod durable;
pub mod ledger;

pub use cache::MemoryCache;
pub use durable::DurableStore;
pub use ledger::DedupLedger;

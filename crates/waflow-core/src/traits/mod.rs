// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the ingestion pipeline and its collaborators.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod dedup;
pub mod sender;

pub use dedup::{DedupBackend, DedupMeta};
pub use sender::OutboundSender;

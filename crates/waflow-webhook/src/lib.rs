// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP surface and inbound message pipeline.
//!
//! Request flow: rate limit, tenant gate, signature verification over
//! the raw body, then acknowledgment. The pipeline behind it handles
//! dedup, per-tenant flow execution, and reply delivery.

pub mod handlers;
pub mod payload;
pub mod pipeline;
pub mod rate_limit;
pub mod sender;
pub mod server;
pub mod verify;

pub use pipeline::{MessagePipeline, ProcessOutcome};
pub use rate_limit::RateLimiter;
pub use sender::CloudApiSender;
pub use server::{build_router, start_server, ServerConfig, WebhookState};

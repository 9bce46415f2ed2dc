// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant resolution: activation gate, credentials, and configuration.
//!
//! Configuration follows a two-level precedence model: a tenant override
//! row wins over the platform default row, and absence of both yields
//! nothing. Credentials are fail-closed; a tenant without a complete
//! bundle cannot process messages.

pub mod resolver;
pub mod toggles;

pub use resolver::{merge, TenantResolver};

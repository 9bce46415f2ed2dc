// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Waflow ingestion core.

use thiserror::Error;

/// The primary error type used across all Waflow crates.
#[derive(Debug, Error)]
pub enum WaflowError {
    /// Configuration errors (invalid TOML, missing required fields, illegal toggles).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Webhook authentication failures (bad signature, bad verify token).
    ///
    /// The message is for internal logs only; external callers receive a
    /// generic 403 with no detail.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Tenant exists but is not in a state that permits processing.
    #[error("tenant {tenant_id} is not active: {status}")]
    TenantInactive { tenant_id: String, status: String },

    /// Requested tenant was not found.
    #[error("tenant not found: {tenant_id}")]
    TenantNotFound { tenant_id: String },

    /// Tenant exists but has no usable credential bundle.
    #[error("credentials not configured for tenant {tenant_id}")]
    CredentialsNotConfigured { tenant_id: String },

    /// Flow graph definition or per-tenant plan resolution errors.
    #[error("flow graph error: {0}")]
    Graph(String),

    /// Outbound channel errors (send failure, message format).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Conversion event emitter errors (attribution API failure).
    #[error("emitter error: {message}")]
    Emitter {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

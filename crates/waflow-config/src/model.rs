// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Waflow platform.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.
//!
//! Process-level settings only. Per-tenant settings (credentials, node
//! toggles) live in the database and are resolved per request by
//! `waflow-tenant`.

use serde::{Deserialize, Serialize};

/// Top-level Waflow configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WaflowConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Webhook HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Deduplication ledger settings.
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Messaging provider (send API) settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Advertising attribution API settings.
    #[serde(default)]
    pub attribution: AttributionConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "waflow".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Webhook HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-source-address request ceiling for the webhook endpoints,
    /// evaluated over a fixed one-minute window.
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8085
}

fn default_rate_limit_per_minute() -> u32 {
    120
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("waflow").join("waflow.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("waflow.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Deduplication ledger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DedupConfig {
    /// Time-to-live for fast-cache entries, in seconds.
    ///
    /// The durable store retains records indefinitely; the cache only needs
    /// to cover the provider's redelivery horizon.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    86_400
}

/// Messaging provider send API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL of the provider's graph API.
    #[serde(default = "default_provider_base_url")]
    pub api_base_url: String,

    /// Timeout for outbound send calls, in seconds.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_provider_base_url(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

fn default_provider_base_url() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

fn default_send_timeout_secs() -> u64 {
    10
}

/// Advertising attribution API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttributionConfig {
    /// Base URL of the attribution events API.
    #[serde(default = "default_attribution_base_url")]
    pub api_base_url: String,

    /// Timeout for conversion event calls, in seconds.
    #[serde(default = "default_attribution_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_attribution_base_url(),
            timeout_secs: default_attribution_timeout_secs(),
        }
    }
}

fn default_attribution_base_url() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

fn default_attribution_timeout_secs() -> u64 {
    10
}

// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./waflow.toml` > `~/.config/waflow/waflow.toml` > `/etc/waflow/waflow.toml`
//! with environment variable overrides via `WAFLOW_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::WaflowConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/waflow/waflow.toml` (system-wide)
/// 3. `~/.config/waflow/waflow.toml` (user XDG config)
/// 4. `./waflow.toml` (local directory)
/// 5. `WAFLOW_*` environment variables
pub fn load_config() -> Result<WaflowConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a specific TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<WaflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaflowConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WaflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaflowConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WaflowConfig::default()))
        .merge(Toml::file("/etc/waflow/waflow.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("waflow/waflow.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("waflow.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. `WAFLOW_STORAGE_DATABASE_PATH` must map
/// to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("WAFLOW_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("dedup_", "dedup.", 1)
            .replacen("provider_", "provider.", 1)
            .replacen("attribution_", "attribution.", 1);
        mapped.into()
    })
}

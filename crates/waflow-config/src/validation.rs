// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, non-empty paths, and sane
//! rate-limit/timeout values.

use crate::diagnostic::ConfigError;
use crate::model::WaflowConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WaflowConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.server.rate_limit_per_minute == 0 {
        errors.push(ConfigError::Validation {
            message: "server.rate_limit_per_minute must be at least 1".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.dedup.cache_ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "dedup.cache_ttl_secs must be at least 1".to_string(),
        });
    }

    for (key, url) in [
        ("provider.api_base_url", &config.provider.api_base_url),
        ("attribution.api_base_url", &config.attribution.api_base_url),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(ConfigError::Validation {
                message: format!("{key} must start with http:// or https://, got `{url}`"),
            });
        }
    }

    for (key, secs) in [
        ("provider.send_timeout_secs", config.provider.send_timeout_secs),
        ("attribution.timeout_secs", config.attribution.timeout_secs),
    ] {
        if secs == 0 {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be at least 1"),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

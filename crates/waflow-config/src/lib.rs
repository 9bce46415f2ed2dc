// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Waflow platform.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment variable
//! overrides, and Elm-style diagnostic error rendering with typo suggestions.
//!
//! This crate covers process-level settings only. Per-tenant credentials and
//! node toggles live in the database and are resolved by `waflow-tenant`.

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::WaflowConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to rich miette diagnostics with typo suggestions
pub fn load_and_validate() -> Result<WaflowConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let toml_sources = collect_toml_sources();
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from a specific TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<WaflowConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    if let Ok(content) = std::fs::read_to_string("waflow.toml") {
        let path = std::env::current_dir()
            .map(|d| d.join("waflow.toml").display().to_string())
            .unwrap_or_else(|_| "waflow.toml".to_string());
        sources.push((path, content));
    }

    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("waflow/waflow.toml");
        if let Ok(content) = std::fs::read_to_string(&path) {
            sources.push((path.display().to_string(), content));
        }
    }

    let system_path = std::path::Path::new("/etc/waflow/waflow.toml");
    if let Ok(content) = std::fs::read_to_string(system_path) {
        sources.push((system_path.display().to_string(), content));
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_inline_config_passes() {
        let config = load_and_validate_str(
            r#"
[service]
log_level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.service.log_level, "debug");
    }

    #[test]
    fn unknown_key_yields_diagnostic() {
        let errors = load_and_validate_str(
            r#"
[server]
prot = 9000
"#,
        )
        .unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn semantic_violation_yields_validation_error() {
        let errors = load_and_validate_str(
            r#"
[server]
rate_limit_per_minute = 0
"#,
        )
        .unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { .. })));
    }
}

// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for Voxline.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and diagnostic
//! error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use voxline_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("ESL at {}:{}", config.switch.esl_host, config.switch.esl_port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, attach_sources, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::VoxlineConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to miette diagnostics with typo suggestions
pub fn load_and_validate() -> Result<VoxlineConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => validated(config, || toml_sources(None)),
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &toml_sources(None))),
    }
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<VoxlineConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => validated(config, || toml_sources(Some(path))),
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &toml_sources(Some(path)),
        )),
    }
}

/// Load configuration from a specific TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<VoxlineConfig, Vec<ConfigError>> {
    let inline = || vec![("<inline>".to_string(), toml_content.to_string())];
    match loader::load_config_from_str(toml_content) {
        Ok(config) => validated(config, inline),
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &inline())),
    }
}

/// Runs semantic validation; failures get source spans when the offending
/// value can be found in `sources`.
fn validated(
    config: VoxlineConfig,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<VoxlineConfig, Vec<ConfigError>> {
    match validation::validate_config(&config) {
        Ok(()) => Ok(config),
        Err(mut errors) => {
            diagnostic::attach_sources(&mut errors, &sources());
            Err(errors)
        }
    }
}

/// `(path, content)` of every TOML file the loader would read: `explicit`
/// alone when given, otherwise the standard locations that exist.
pub fn toml_sources(explicit: Option<&std::path::Path>) -> Vec<(String, String)> {
    let mut candidates = Vec::new();
    match explicit {
        Some(path) => candidates.push(path.to_path_buf()),
        None => {
            candidates.push(std::path::PathBuf::from("/etc/voxline/voxline.toml"));
            if let Some(config_dir) = dirs::config_dir() {
                candidates.push(config_dir.join("voxline/voxline.toml"));
            }
            if let Ok(cwd) = std::env::current_dir() {
                candidates.push(cwd.join("voxline.toml"));
            }
        }
    }

    candidates
        .into_iter()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}

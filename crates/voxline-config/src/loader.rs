// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./voxline.toml` > `~/.config/voxline/voxline.toml` > `/etc/voxline/voxline.toml`
//! with environment variable overrides via `VOXLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::VoxlineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/voxline/voxline.toml` (system-wide)
/// 3. `~/.config/voxline/voxline.toml` (user XDG config)
/// 4. `./voxline.toml` (local directory)
/// 5. `VOXLINE_*` environment variables
pub fn load_config() -> Result<VoxlineConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config content.
pub fn load_config_from_str(toml_content: &str) -> Result<VoxlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VoxlineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<VoxlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VoxlineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(VoxlineConfig::default()))
        .merge(Toml::file("/etc/voxline/voxline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("voxline/voxline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("voxline.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `VOXLINE_SWITCH_ESL_PASSWORD` must map to `switch.esl_password`,
/// not `switch.esl.password`.
fn env_provider() -> Env {
    Env::prefixed("VOXLINE_").map(|key| map_env_key(key.as_str()).into())
}

/// Sections whose keys can be overridden from the environment.
const ENV_SECTIONS: &[&str] = &[
    "service",
    "switch",
    "session",
    "provider",
    "phone",
    "transfer",
    "routing",
    "callback",
    "webhook",
    "gateway",
    "prometheus",
];

/// Map a lowercased, prefix-stripped env var name to a dotted config key.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section)
            && let Some(field) = rest.strip_prefix('_')
        {
            return format!("{section}.{field}");
        }
    }
    key.to_string()
}

// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline subcommands that answer questions about the loaded config.

use std::sync::Arc;
use std::time::Duration;

use voxline_config::ConfigError;
use voxline_config::model::VoxlineConfig;
use voxline_core::VoxlineError;
use voxline_routing::{
    DestinationLoader, StaticStore, TimeConditionChecker, TimeConditionResult,
    check_time_conditions,
};
use voxline_switch::{EslClient, EslConfig};
use voxline_transfer::{ResolvedDestination, TransferHandler};

/// Problems the schema validation cannot see, such as schedules that do
/// not parse. Errors point into `sources` when the value is found there.
pub fn check_config(config: &VoxlineConfig, sources: &[(String, String)]) -> Vec<ConfigError> {
    let mut problems = check_time_conditions(config);
    voxline_config::attach_sources(&mut problems, sources);
    problems
}

/// Resolves `query` for `domain_uuid` against the configured tenants.
///
/// The switch client is built but never contacted.
pub async fn resolve(
    config: &VoxlineConfig,
    domain_uuid: &str,
    query: &str,
) -> Result<Option<ResolvedDestination>, VoxlineError> {
    let store = Arc::new(StaticStore::from_config(config));
    let loader = Arc::new(DestinationLoader::new(
        store,
        Duration::from_secs(config.routing.destination_cache_ttl_secs),
        config.service.default_timezone.clone(),
    ));
    let switch = Arc::new(EslClient::new(EslConfig::from_config(&config.switch)));
    let handler = TransferHandler::new(switch, loader, &config.transfer);
    handler.resolve_destination(domain_uuid, query, None).await
}

/// Evaluates one configured time condition at the current instant.
pub async fn check_hours(
    config: &VoxlineConfig,
    domain_uuid: &str,
    condition_uuid: &str,
) -> Result<TimeConditionResult, VoxlineError> {
    let store = Arc::new(StaticStore::from_config(config));
    let checker = TimeConditionChecker::new(store, Duration::ZERO);
    checker.check(domain_uuid, Some(condition_uuid)).await
}

pub fn render_resolution(query: &str, resolved: Option<&ResolvedDestination>) -> String {
    match resolved {
        Some(destination) => serde_json::to_string_pretty(destination)
            .unwrap_or_else(|e| format!("{query}: unprintable destination ({e})")),
        None => format!("{query}: no destination matched"),
    }
}

pub fn render_hours(result: &TimeConditionResult) -> String {
    let mut lines = vec![
        format!(
            "condition: {}",
            result.condition_name.as_deref().unwrap_or("-")
        ),
        format!("status:    {}", result.status),
    ];
    if let Some(holiday) = &result.holiday {
        lines.push(format!(
            "holiday:   {} {}",
            holiday.date,
            holiday.name.as_deref().unwrap_or("")
        ));
    }
    if let Some(next) = &result.next_open {
        lines.push(format!("next open: {}", next.to_rfc3339()));
    }
    lines.push(format!("message:   {}", result.message));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use voxline_config::load_config_from_str;
    use voxline_routing::TimeConditionStatus;

    use super::*;

    const TOML: &str = r#"
[[domains]]
domain_uuid = "d1"
timezone = "America/Sao_Paulo"

[[domains.destinations]]
uuid = "x1"
name = "Recepção"
destination_type = "extension"
destination_number = "1000"
aliases = ["recepcao", "portaria"]

[[domains.time_conditions]]
uuid = "always"
name = "Sempre"
schedule = "always"

[[domains.time_conditions]]
uuid = "broken"
name = "Quebrado"
schedule = "0:oito-dezoito"
"#;

    #[test]
    fn check_config_reports_bad_schedules() {
        let config = load_config_from_str(TOML).unwrap();
        let sources = [("voxline.toml".to_string(), TOML.to_string())];
        let problems = check_config(&config, &sources);
        assert_eq!(problems.len(), 1);
        assert_eq!(
            problems[0].field(),
            Some("domains[0].time_conditions[1].schedule")
        );
        assert!(matches!(
            &problems[0],
            ConfigError::InvalidSchedule { span: Some(_), .. }
        ));
    }

    #[tokio::test]
    async fn resolve_finds_configured_destination() {
        let config = load_config_from_str(TOML).unwrap();
        let resolved = resolve(&config, "d1", "portaria").await.unwrap().unwrap();
        assert_eq!(resolved.display_name, "Recepção");
        assert_eq!(resolved.dialplan_extension, "1000");
        assert!(render_resolution("portaria", Some(&resolved)).contains("\"1000\""));
    }

    #[tokio::test]
    async fn resolve_reports_misses() {
        let config = load_config_from_str(TOML).unwrap();
        let resolved = resolve(&config, "d1", "astronauta").await.unwrap();
        assert!(resolved.is_none());
        assert_eq!(
            render_resolution("astronauta", None),
            "astronauta: no destination matched"
        );
    }

    #[tokio::test]
    async fn check_hours_treats_unknown_condition_as_unrestricted() {
        let config = load_config_from_str(TOML).unwrap();
        let result = check_hours(&config, "d1", "missing").await.unwrap();
        assert!(result.is_open());
        assert_eq!(result.status, TimeConditionStatus::NoScheduleDefined);
        assert!(render_hours(&result).contains("no_schedule_defined"));
    }
}

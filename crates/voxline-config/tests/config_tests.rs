// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Voxline configuration system.

use std::io::Write;

use serial_test::serial;
use voxline_config::diagnostic::ConfigError;
use voxline_config::model::VoxlineConfig;
use voxline_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use voxline_core::DestinationType;

/// Valid TOML with tenant data deserializes successfully.
#[test]
fn valid_toml_deserializes_into_voxline_config() {
    let toml = r#"
[service]
name = "pbx-east"
log_level = "debug"

[switch]
esl_host = "10.0.0.5"
esl_port = 8022
esl_password = "secret"

[session]
max_sessions_per_domain = 5
session_timeout_seconds = 30

[phone]
default_country_code = "55"

[callback]
ticket_api_url = "https://tickets.example.com"

[[domains]]
domain_uuid = "d-1"
domain_name = "acme.pbx.example"
timezone = "America/Sao_Paulo"

[[domains.destinations]]
uuid = "dest-1"
name = "Suporte Técnico"
destination_type = "queue"
destination_number = "5001"
aliases = ["suporte", "ti"]
department = "TI"
priority = 5

[domains.destinations.working_hours]
monday = { start = "08:00", end = "18:00" }

[[domains.time_conditions]]
uuid = "tc-1"
name = "Horário Comercial"
schedule = "0-4:08:00-18:00;5:08:00-12:00"
holidays = [{ date = "2026-12-25", name = "Natal" }]
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should load");
    assert_eq!(config.service.name, "pbx-east");
    assert_eq!(config.switch.esl_port, 8022);
    assert_eq!(config.session.max_sessions_per_domain, 5);
    assert_eq!(
        config.callback.ticket_api_url.as_deref(),
        Some("https://tickets.example.com")
    );

    let domain = config.domain("d-1").expect("domain present");
    assert_eq!(domain.destinations.len(), 1);
    let dest = &domain.destinations[0];
    assert_eq!(dest.destination_type, DestinationType::Queue);
    assert_eq!(dest.aliases, vec!["suporte", "ti"]);
    assert!(dest.is_enabled);
    assert!(dest.working_hours.is_some());
    assert_eq!(domain.time_conditions[0].holidays.len(), 1);
}

/// Defaults apply when sections are omitted.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty config is valid");
    assert_eq!(config.switch.esl_port, 8021);
    assert_eq!(config.switch.esl_password, "ClueCon");
    assert_eq!(config.session.switch_sample_rate, 16_000);
    assert_eq!(config.session.provider_input_rate, 24_000);
    assert_eq!(config.session.output_warmup_ms, 600);
    assert_eq!(config.transfer.log_capacity, 1000);
    assert_eq!(config.transfer.log_trim_to, 500);
    assert_eq!(config.routing.destination_cache_ttl_secs, 300);
    assert_eq!(config.callback.default_expiration_hours, 24);
    assert_eq!(
        config.transfer.department_numbers.get("suporte").map(String::as_str),
        Some("300")
    );
    assert!(config.domains.is_empty());
}

/// Unknown field in [switch] produces an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_field_suggests_correction() {
    let toml = r#"
[switch]
esl_pasword = "x"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "esl_pasword");
            assert_eq!(suggestion.as_deref(), Some("esl_password"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// Wrong value type is reported as InvalidType.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[session]
max_sessions_per_domain = "many"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject string for usize");
    assert!(matches!(errors[0], ConfigError::InvalidType { .. }));
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_errors_surface_from_str_loader() {
    let toml = r#"
[phone]
min_digits = 12
max_digits = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("bounds are inverted");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { field, .. } if field == "phone.min_digits"))
    );
}

/// A destination missing its required number field is rejected.
#[test]
fn destination_missing_number_is_rejected() {
    let toml = r#"
[[domains]]
domain_uuid = "d-1"

[[domains.destinations]]
uuid = "dest-1"
name = "Vendas"
destination_type = "department"
"#;

    assert!(load_config_from_str(toml).is_err());
}

/// Config loads from an explicit file path.
#[test]
#[serial]
fn loads_from_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[gateway]\nport = 9090").unwrap();

    let config = load_and_validate_path(file.path()).expect("file config loads");
    assert_eq!(config.gateway.port, 9090);
}

/// Environment variables override file values with explicit section mapping.
#[test]
#[serial]
fn env_overrides_file_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[switch]\nesl_password = \"from-file\"").unwrap();

    // SAFETY: tests touching the environment are serialized.
    unsafe { std::env::set_var("VOXLINE_SWITCH_ESL_PASSWORD", "from-env") };
    let result = load_and_validate_path(file.path());
    unsafe { std::env::remove_var("VOXLINE_SWITCH_ESL_PASSWORD") };

    let config = result.expect("config loads");
    assert_eq!(config.switch.esl_password, "from-env");
}

/// The default struct and the empty-TOML load agree.
#[test]
fn default_struct_matches_empty_load() {
    let loaded = load_config_from_str("").unwrap();
    let default = VoxlineConfig::default();
    assert_eq!(loaded.service.default_timezone, default.service.default_timezone);
    assert_eq!(loaded.gateway.port, default.gateway.port);
}

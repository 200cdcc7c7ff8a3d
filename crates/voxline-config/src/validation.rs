// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks what serde attributes cannot express: timezones that resolve,
//! ordered bounds and unique tenant identifiers. Every problem is collected.

use std::collections::HashSet;

use chrono_tz::Tz;

use crate::diagnostic::ConfigError;
use crate::model::VoxlineConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &VoxlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    validate_switch(config, &mut errors);
    validate_session(config, &mut errors);
    validate_phone(config, &mut errors);
    validate_transfer(config, &mut errors);
    validate_endpoints(config, &mut errors);
    validate_domains(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn invalid(errors: &mut Vec<ConfigError>, field: impl Into<String>, message: impl Into<String>) {
    errors.push(ConfigError::Validation {
        field: field.into(),
        message: message.into(),
    });
}

fn validate_switch(config: &VoxlineConfig, errors: &mut Vec<ConfigError>) {
    let switch = &config.switch;
    if switch.esl_host.trim().is_empty() {
        invalid(errors, "switch.esl_host", "must not be empty");
    }
    if switch.esl_port == 0 {
        invalid(errors, "switch.esl_port", "must be greater than 0");
    }
    if switch.command_timeout_secs == 0 {
        invalid(errors, "switch.command_timeout_secs", "must be at least 1");
    }
    if switch.gateway.trim().is_empty() {
        invalid(errors, "switch.gateway", "must not be empty");
    }
}

fn validate_session(config: &VoxlineConfig, errors: &mut Vec<ConfigError>) {
    let session = &config.session;
    if session.max_sessions_per_domain == 0 {
        invalid(errors, "session.max_sessions_per_domain", "must be at least 1");
    }
    if session.session_timeout_seconds == 0 {
        invalid(errors, "session.session_timeout_seconds", "must be at least 1");
    }
    if session.sweep_interval_secs == 0 {
        invalid(errors, "session.sweep_interval_secs", "must be at least 1");
    }
    for (field, rate) in [
        ("session.switch_sample_rate", session.switch_sample_rate),
        ("session.provider_input_rate", session.provider_input_rate),
        ("session.provider_output_rate", session.provider_output_rate),
    ] {
        if rate == 0 {
            invalid(errors, field, "sample rate must be greater than 0");
        }
    }
    if session.output_warmup_ms > 5000 {
        invalid(
            errors,
            "session.output_warmup_ms",
            format!("must be at most 5000, got {}", session.output_warmup_ms),
        );
    }
    if session.frame_samples == 0 {
        invalid(errors, "session.frame_samples", "must be at least 1");
    }
    if session.event_buffer == 0 {
        invalid(errors, "session.event_buffer", "must be at least 1");
    }
}

fn validate_phone(config: &VoxlineConfig, errors: &mut Vec<ConfigError>) {
    let phone = &config.phone;
    if !phone.default_country_code.chars().all(|c| c.is_ascii_digit()) {
        invalid(
            errors,
            "phone.default_country_code",
            format!("must contain digits only, got `{}`", phone.default_country_code),
        );
    }
    if phone.min_digits == 0 || phone.max_digits > 15 || phone.min_digits > phone.max_digits {
        invalid(
            errors,
            "phone.min_digits",
            format!(
                "digit bounds must satisfy 1 <= min <= max <= 15, got {}..={}",
                phone.min_digits, phone.max_digits
            ),
        );
    }
    if phone.max_extension_digits >= phone.min_digits {
        invalid(
            errors,
            "phone.max_extension_digits",
            "must be shorter than phone.min_digits so extensions never pass as numbers",
        );
    }
}

fn validate_transfer(config: &VoxlineConfig, errors: &mut Vec<ConfigError>) {
    let transfer = &config.transfer;
    if transfer.default_context.trim().is_empty() {
        invalid(errors, "transfer.default_context", "must not be empty");
    }
    if transfer.log_capacity == 0 {
        invalid(errors, "transfer.log_capacity", "must be at least 1");
    }
    if transfer.log_trim_to >= transfer.log_capacity {
        invalid(
            errors,
            "transfer.log_trim_to",
            format!(
                "must be smaller than transfer.log_capacity ({})",
                transfer.log_capacity
            ),
        );
    }
    for (department, number) in &transfer.department_numbers {
        if number.trim().is_empty() {
            invalid(
                errors,
                format!("transfer.department_numbers.{department}"),
                "must not be empty",
            );
        }
    }

    let callback = &config.callback;
    if callback.default_expiration_hours == 0 {
        invalid(errors, "callback.default_expiration_hours", "must be at least 1");
    }
    if callback.reason_max_chars < 4 {
        invalid(errors, "callback.reason_max_chars", "must be at least 4");
    }
}

fn validate_endpoints(config: &VoxlineConfig, errors: &mut Vec<ConfigError>) {
    for (field, url) in [
        ("callback.ticket_api_url", &config.callback.ticket_api_url),
        ("webhook.url", &config.webhook.url),
    ] {
        if let Some(url) = url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            invalid(errors, field, format!("`{url}` must be an http(s) URL"));
        }
    }
    if let Some(url) = &config.provider.url
        && !(url.starts_with("ws://") || url.starts_with("wss://"))
    {
        invalid(errors, "provider.url", format!("`{url}` must be a ws(s) URL"));
    }

    let gateway = &config.gateway;
    if gateway.host.trim().is_empty() {
        invalid(errors, "gateway.host", "must not be empty");
    }
    if !(gateway.min_call_timeout_secs <= gateway.default_call_timeout_secs
        && gateway.default_call_timeout_secs <= gateway.max_call_timeout_secs)
    {
        invalid(
            errors,
            "gateway.default_call_timeout_secs",
            format!(
                "must lie within {}..={}",
                gateway.min_call_timeout_secs, gateway.max_call_timeout_secs
            ),
        );
    }
}

fn validate_timezone(errors: &mut Vec<ConfigError>, field: String, timezone: &str) {
    if timezone.parse::<Tz>().is_err() {
        errors.push(ConfigError::unknown_timezone(field, timezone));
    }
}

fn duplicate(errors: &mut Vec<ConfigError>, field: String, kind: &'static str, id: &str) {
    errors.push(ConfigError::Duplicate {
        field,
        kind,
        id: id.to_string(),
    });
}

fn validate_domains(config: &VoxlineConfig, errors: &mut Vec<ConfigError>) {
    validate_timezone(
        errors,
        "service.default_timezone".to_string(),
        &config.service.default_timezone,
    );

    let mut seen_domains = HashSet::new();
    for (i, domain) in config.domains.iter().enumerate() {
        if domain.domain_uuid.trim().is_empty() {
            invalid(errors, format!("domains[{i}].domain_uuid"), "must not be empty");
        } else if !seen_domains.insert(domain.domain_uuid.as_str()) {
            duplicate(errors, format!("domains[{i}].domain_uuid"), "domain", &domain.domain_uuid);
        }

        if let Some(tz) = &domain.timezone {
            validate_timezone(errors, format!("domains[{i}].timezone"), tz);
        }

        let mut seen_destinations = HashSet::new();
        for (j, dest) in domain.destinations.iter().enumerate() {
            if !seen_destinations.insert(dest.uuid.as_str()) {
                duplicate(
                    errors,
                    format!("domains[{i}].destinations[{j}].uuid"),
                    "destination",
                    &dest.uuid,
                );
            }
            if dest.destination_number.trim().is_empty() {
                invalid(
                    errors,
                    format!("domains[{i}].destinations[{j}].destination_number"),
                    "must not be empty",
                );
            }
        }
        if domain.destinations.iter().filter(|d| d.is_default).count() > 1 {
            tracing::warn!(
                domain_uuid = %domain.domain_uuid,
                "more than one destination flagged is_default; the first one wins"
            );
        }

        let mut seen_conditions = HashSet::new();
        for (j, condition) in domain.time_conditions.iter().enumerate() {
            if !seen_conditions.insert(condition.uuid.as_str()) {
                duplicate(
                    errors,
                    format!("domains[{i}].time_conditions[{j}].uuid"),
                    "time condition",
                    &condition.uuid,
                );
            }
            if let Some(tz) = &condition.timezone {
                validate_timezone(errors, format!("domains[{i}].time_conditions[{j}].timezone"), tz);
            }
            if condition.schedule.trim().is_empty() {
                errors.push(ConfigError::invalid_schedule(
                    format!("domains[{i}].time_conditions[{j}].schedule"),
                    "",
                    "schedule is empty",
                ));
            }
        }
    }
}

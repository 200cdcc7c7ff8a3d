// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics rendered through miette.
//!
//! Two sources feed [`ConfigError`]: Figment deserialization failures (unknown
//! keys, wrong types, missing fields) and the semantic checks that run on a
//! parsed [`VoxlineConfig`](crate::model::VoxlineConfig), where tenant data
//! such as timezones and schedules goes wrong most often. Errors that point
//! at a value can be given a source span afterwards with [`attach_sources`].

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use chrono_tz::TZ_VARIANTS;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a key must reach before it is offered as a fix.
const KEY_SUGGESTION_THRESHOLD: f64 = 0.75;

/// Timezone names are long and share prefixes, so they need a closer match.
const TIMEZONE_SUGGESTION_THRESHOLD: f64 = 0.9;

/// Accepted schedule notations, shown under schedule errors.
const SCHEDULE_FORMS: &str = "use a preset (`24h`, `always`, `weekday`, `weekend`, `comercial`), \
     compact text such as `0-4:08:00-18:00;5:08:00-12:00` (0 = Monday), \
     or a JSON map such as `{\"0\": [\"08:00-18:00\"]}`";

/// A configuration problem, ready for miette to render.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(voxline::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest valid key, if any is close enough.
        suggestion: Option<String>,
        /// Comma-separated keys accepted by the section.
        valid_keys: String,
        #[label("not a voxline setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(voxline::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(voxline::config::missing_key),
        help("{}", missing_key_help(key, section.as_deref()))
    )]
    MissingKey {
        key: String,
        /// Dotted table the key belongs in, e.g. `domains.destinations`.
        section: Option<String>,
    },

    /// A value deserialized fine but breaks a semantic rule.
    #[error("invalid value for `{field}`: {message}")]
    #[diagnostic(
        code(voxline::config::validation),
        help("fix `{field}` in your voxline.toml or the matching VOXLINE_* variable")
    )]
    Validation {
        /// Dotted path of the offending key, e.g. `session.output_warmup_ms`.
        field: String,
        message: String,
    },

    #[error("unknown timezone `{timezone}` in `{field}`")]
    #[diagnostic(
        code(voxline::config::timezone),
        help("{}", timezone_help(suggestion.as_deref()))
    )]
    UnknownTimezone {
        field: String,
        timezone: String,
        /// Closest IANA name, when the value looks like a misspelling.
        suggestion: Option<String>,
        #[label("not an IANA timezone")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("schedule `{schedule}` in `{field}` does not parse: {message}")]
    #[diagnostic(code(voxline::config::schedule), help("{}", SCHEDULE_FORMS))]
    InvalidSchedule {
        field: String,
        schedule: String,
        message: String,
        #[label("{message}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("duplicate {kind} `{id}` at `{field}`")]
    #[diagnostic(
        code(voxline::config::duplicate),
        help("each {kind} needs its own identifier; rename or remove one of them")
    )]
    Duplicate {
        field: String,
        /// What is duplicated: `domain`, `destination` or `time condition`.
        kind: &'static str,
        id: String,
    },

    #[error("configuration error: {0}")]
    #[diagnostic(code(voxline::config::other))]
    Other(String),
}

impl ConfigError {
    /// An unknown timezone, with the closest IANA name as a suggestion.
    pub fn unknown_timezone(field: impl Into<String>, timezone: &str) -> Self {
        ConfigError::UnknownTimezone {
            field: field.into(),
            timezone: timezone.to_string(),
            suggestion: suggest_timezone(timezone),
            span: None,
            src: None,
        }
    }

    pub fn invalid_schedule(
        field: impl Into<String>,
        schedule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidSchedule {
            field: field.into(),
            schedule: schedule.into(),
            message: message.into(),
            span: None,
            src: None,
        }
    }

    /// Dotted path of the setting this error is about, when it has one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::UnknownKey { key, .. }
            | ConfigError::InvalidType { key, .. }
            | ConfigError::MissingKey { key, .. } => Some(key),
            ConfigError::Validation { field, .. }
            | ConfigError::UnknownTimezone { field, .. }
            | ConfigError::InvalidSchedule { field, .. }
            | ConfigError::Duplicate { field, .. } => Some(field),
            ConfigError::Other(_) => None,
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

fn missing_key_help(key: &str, section: Option<&str>) -> String {
    match section {
        Some(section) if section.starts_with("domains") => {
            format!("every `[[{section}]]` entry needs `{key} = <value>`")
        }
        Some(section) => format!("add `{key} = <value>` under `[{section}]`"),
        None => format!("add `{key} = <value>` to your voxline.toml"),
    }
}

fn timezone_help(suggestion: Option<&str>) -> String {
    match suggestion {
        Some(tz) => format!("did you mean `{tz}`?"),
        None => "use an IANA name such as `America/Sao_Paulo` or `UTC`".to_string(),
    }
}

/// Converts a `figment::Error` (which may hold several failures) into
/// diagnostics, with spans when the failing key can be found in a TOML file.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let section = table_path(&error.path);
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = find_source_span(&error, &section, field, toml_sources);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: field.clone().into_owned(),
                    section: (!section.is_empty()).then(|| section.join(".")),
                },
                Kind::InvalidType(actual, expected) => {
                    let key = error.path.last().cloned().unwrap_or_default();
                    let parent = table_path(&error.path[..error.path.len().saturating_sub(1)]);
                    let (span, src) = find_source_span(&error, &parent, &key, toml_sources);
                    ConfigError::InvalidType {
                        key: error.path.join("."),
                        detail: format!("found {actual}, expected {expected}"),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Figment paths include array indices for `[[domains]]` entries; TOML
/// headers do not.
fn table_path(path: &[String]) -> Vec<String> {
    path.iter()
        .filter(|segment| segment.parse::<usize>().is_err())
        .cloned()
        .collect()
}

fn find_source_span(
    error: &figment::error::Error,
    section: &[String],
    key: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    // Inline sources carry no file metadata; fall back to the only source.
    let source = match origin {
        Some(origin) => toml_sources.iter().find(|(path, _)| *path == origin),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    source
        .and_then(|(path, content)| {
            let offset = find_key_offset(content, section, key)?;
            Some((
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(path, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Byte offset of `key` inside the table named by `section`.
///
/// `section = ["domains", "destinations"]` matches both `[domains.destinations]`
/// and `[[domains.destinations]]`; an empty section searches the top level.
pub fn find_key_offset(content: &str, section: &[String], key: &str) -> Option<usize> {
    let start = if section.is_empty() {
        0
    } else {
        let name = section.join(".");
        [format!("[[{name}]]"), format!("[{name}]")]
            .iter()
            .find_map(|header| content.find(header.as_str()).map(|pos| pos + header.len()))?
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') && offset != start {
            // Next table: the key is not in this one.
            return None;
        }
        if let Some(rest) = trimmed.strip_prefix(key)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Closest valid key by Jaro-Winkler similarity, if any clears the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    best_match(unknown, valid_keys.iter().copied(), KEY_SUGGESTION_THRESHOLD)
}

/// Closest IANA timezone name. Case and the space/underscore mix-up
/// (`america/sao paulo`) are forgiven before scoring.
pub fn suggest_timezone(unknown: &str) -> Option<String> {
    let wanted = unknown.trim().replace(' ', "_").to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    let mut best: Option<(f64, &'static str)> = None;
    for tz in TZ_VARIANTS.iter() {
        let name = tz.name();
        let score = strsim::jaro_winkler(&wanted, &name.to_lowercase());
        if score >= TIMEZONE_SUGGESTION_THRESHOLD && best.is_none_or(|(top, _)| score > top) {
            best = Some((score, name));
        }
    }
    best.map(|(_, name)| name.to_string())
}

fn best_match<'a>(
    unknown: &str,
    candidates: impl Iterator<Item = &'a str>,
    threshold: f64,
) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;
    for candidate in candidates {
        let score = strsim::jaro_winkler(unknown, candidate);
        if score > threshold && best.is_none_or(|(top, _)| score > top) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, candidate)| candidate.to_string())
}

/// Points timezone and schedule errors at the quoted value in the first
/// TOML source that contains it.
pub fn attach_sources(errors: &mut [ConfigError], toml_sources: &[(String, String)]) {
    for error in errors.iter_mut() {
        let (value, span, src) = match error {
            ConfigError::UnknownTimezone {
                timezone, span, src, ..
            } => (timezone.as_str(), span, src),
            ConfigError::InvalidSchedule {
                schedule, span, src, ..
            } => (schedule.as_str(), span, src),
            _ => continue,
        };
        if value.is_empty() {
            continue;
        }
        let quoted = format!("\"{value}\"");
        if let Some((path, content, offset)) = toml_sources
            .iter()
            .find_map(|(path, content)| content.find(&quoted).map(|at| (path, content, at)))
        {
            *span = Some(SourceSpan::new((offset + 1).into(), value.len()));
            *src = Some(NamedSource::new(path, content.clone()));
        }
    }
}

/// Renders `errors` to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn suggests_switch_key_for_typo() {
        let valid = &["esl_host", "esl_port", "esl_password", "gateway"];
        assert_eq!(suggest_key("esl_pasword", valid).as_deref(), Some("esl_password"));
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn suggests_timezone_for_misspelling() {
        assert_eq!(
            suggest_timezone("America/Sao Paulo").as_deref(),
            Some("America/Sao_Paulo")
        );
        assert_eq!(
            suggest_timezone("america/sao_paolo").as_deref(),
            Some("America/Sao_Paulo")
        );
        assert_eq!(suggest_timezone("Mars/Olympus"), None);
    }

    #[test]
    fn timezone_error_carries_suggestion() {
        let error = ConfigError::unknown_timezone("domains[0].timezone", "America/Sao Paulo");
        let help = error.help().map(|h| h.to_string()).unwrap_or_default();
        assert!(help.contains("America/Sao_Paulo"));
        assert_eq!(error.field(), Some("domains[0].timezone"));
    }

    #[test]
    fn finds_key_in_array_of_tables() {
        let content = "[[domains]]\ndomain_uuid = \"d1\"\n\n[[domains.destinations]]\nuuid = \"x\"\nnumbr = \"1000\"\n";
        let offset = find_key_offset(content, &section(&["domains", "destinations"]), "numbr").unwrap();
        assert_eq!(&content[offset..offset + 5], "numbr");
    }

    #[test]
    fn key_search_stops_at_next_table() {
        let content = "[service]\nname = \"x\"\n\n[switch]\nesl_host = \"pbx\"\n";
        assert!(find_key_offset(content, &section(&["service"]), "esl_host").is_none());
        assert!(find_key_offset(content, &section(&["gateway"]), "host").is_none());
    }

    #[test]
    fn figment_indices_are_not_table_names() {
        let path = section(&["domains", "0", "destinations", "2"]);
        assert_eq!(table_path(&path), section(&["domains", "destinations"]));
    }

    #[test]
    fn schedule_error_points_at_value() {
        let content = "[[domains.time_conditions]]\nuuid = \"tc\"\nschedule = \"0:oito-dezoito\"\n";
        let mut errors = vec![ConfigError::invalid_schedule(
            "domains[0].time_conditions[0].schedule",
            "0:oito-dezoito",
            "invalid time slot",
        )];
        attach_sources(&mut errors, &[("voxline.toml".into(), content.into())]);
        match &errors[0] {
            ConfigError::InvalidSchedule { span: Some(span), .. } => {
                assert_eq!(&content[span.offset()..span.offset() + span.len()], "0:oito-dezoito");
            }
            other => panic!("expected a located schedule error, got {other:?}"),
        }
    }

    #[test]
    fn missing_key_help_names_the_table() {
        assert!(missing_key_help("destination_number", Some("domains.destinations"))
            .contains("[[domains.destinations]]"));
        assert!(missing_key_help("url", Some("webhook")).contains("under `[webhook]`"));
    }
}

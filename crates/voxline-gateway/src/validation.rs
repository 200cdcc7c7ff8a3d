// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request field validation for the callback API.

use std::sync::LazyLock;

use regex::Regex;

use crate::server::GatewaySettings;

static EXTENSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{2,6}$").unwrap());
static CLIENT_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^55\d{10,11}$").unwrap());

const MAX_REASON_CHARS: usize = 500;
const MAX_CALLER_ID_NAME_CHARS: usize = 50;

/// A rejected request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// `domain_uuid` absent or blank.
    MissingDomain,
    Invalid { field: &'static str, reason: String },
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldError::MissingDomain => write!(f, "domain_uuid is required"),
            FieldError::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
        }
    }
}

pub fn require_domain(domain_uuid: Option<&str>) -> Result<String, FieldError> {
    match domain_uuid.map(str::trim) {
        Some(d) if !d.is_empty() => Ok(d.to_string()),
        _ => Err(FieldError::MissingDomain),
    }
}

pub fn extension(value: &str) -> Result<String, FieldError> {
    let value = value.trim();
    if EXTENSION.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(FieldError::Invalid {
            field: "extension",
            reason: "expected 2 to 6 digits".to_string(),
        })
    }
}

pub fn client_number(value: &str) -> Result<String, FieldError> {
    let value = value.trim();
    if CLIENT_NUMBER.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(FieldError::Invalid {
            field: "client_number",
            reason: "expected 55 followed by 10 or 11 digits".to_string(),
        })
    }
}

/// `None` picks the configured default.
pub fn call_timeout(value: Option<u32>, settings: &GatewaySettings) -> Result<u32, FieldError> {
    let timeout = value.unwrap_or(settings.default_call_timeout_secs);
    if (settings.min_call_timeout_secs..=settings.max_call_timeout_secs).contains(&timeout) {
        Ok(timeout)
    } else {
        Err(FieldError::Invalid {
            field: "call_timeout",
            reason: format!(
                "must be between {} and {} seconds",
                settings.min_call_timeout_secs, settings.max_call_timeout_secs
            ),
        })
    }
}

pub fn ticket_id(value: Option<u64>) -> Result<Option<String>, FieldError> {
    match value {
        Some(0) => Err(FieldError::Invalid {
            field: "ticket_id",
            reason: "must be positive".to_string(),
        }),
        other => Ok(other.map(|id| id.to_string())),
    }
}

pub fn callback_reason(value: Option<&str>) -> Result<Option<String>, FieldError> {
    match value.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) if r.chars().count() > MAX_REASON_CHARS => Err(FieldError::Invalid {
            field: "callback_reason",
            reason: format!("at most {MAX_REASON_CHARS} characters"),
        }),
        other => Ok(other.map(str::to_string)),
    }
}

pub fn caller_id_name(value: Option<&str>, settings: &GatewaySettings) -> Result<String, FieldError> {
    match value.map(str::trim).filter(|n| !n.is_empty()) {
        Some(n) if n.chars().count() > MAX_CALLER_ID_NAME_CHARS => Err(FieldError::Invalid {
            field: "caller_id_name",
            reason: format!("at most {MAX_CALLER_ID_NAME_CHARS} characters"),
        }),
        Some(n) => Ok(n.to_string()),
        None => Ok(settings.caller_id_name.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_pattern() {
        assert_eq!(extension(" 1001 ").unwrap(), "1001");
        assert!(extension("10").is_ok());
        assert!(extension("1").is_err());
        assert!(extension("1234567").is_err());
        assert!(extension("10a1").is_err());
    }

    #[test]
    fn client_number_pattern() {
        assert!(client_number("5518997752222").is_ok());
        assert!(client_number("551833334444").is_ok());
        assert!(client_number("18997752222").is_err());
        assert!(client_number("55189977522221").is_err());
    }

    #[test]
    fn call_timeout_bounds() {
        let settings = GatewaySettings::default();
        assert_eq!(call_timeout(None, &settings).unwrap(), 30);
        assert_eq!(call_timeout(Some(10), &settings).unwrap(), 10);
        assert_eq!(call_timeout(Some(120), &settings).unwrap(), 120);
        assert!(call_timeout(Some(9), &settings).is_err());
        assert!(call_timeout(Some(121), &settings).is_err());
    }

    #[test]
    fn domain_is_required() {
        assert_eq!(require_domain(None), Err(FieldError::MissingDomain));
        assert_eq!(require_domain(Some("  ")), Err(FieldError::MissingDomain));
        assert_eq!(require_domain(Some("d1")).unwrap(), "d1");
    }

    #[test]
    fn optional_fields() {
        assert_eq!(ticket_id(Some(7)).unwrap().as_deref(), Some("7"));
        assert!(ticket_id(Some(0)).is_err());
        assert_eq!(callback_reason(Some("  ")).unwrap(), None);
        assert!(callback_reason(Some(&"x".repeat(501))).is_err());

        let settings = GatewaySettings::default();
        assert_eq!(caller_id_name(None, &settings).unwrap(), "Callback");
        assert!(caller_id_name(Some(&"n".repeat(51)), &settings).is_err());
    }
}

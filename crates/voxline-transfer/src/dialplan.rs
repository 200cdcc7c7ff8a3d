// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from a destination to the dialplan extension and context the
//! switch transfers into.

use serde::Serialize;
use voxline_config::model::TransferConfig;
use voxline_core::{DestinationType, TransferDestination};
use voxline_routing::matching::fold_text;

/// A destination ready to hand to `uuid_transfer`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDestination {
    pub destination_type: DestinationType,
    /// What the caller asked for.
    pub value: String,
    pub display_name: String,
    pub dialplan_extension: String,
    pub context: String,
    /// The configured record, when the query matched one.
    #[serde(skip)]
    pub record: Option<TransferDestination>,
}

/// Dialplan naming rules for one deployment.
#[derive(Debug, Clone)]
pub struct DialplanRules {
    default_context: String,
    external_context: String,
    queue_prefix: String,
    voicemail_prefix: String,
    /// Folded department name and its extension, in configuration order.
    departments: Vec<(String, String)>,
}

impl Default for DialplanRules {
    fn default() -> Self {
        Self::from_config(&TransferConfig::default())
    }
}

impl DialplanRules {
    pub fn from_config(config: &TransferConfig) -> Self {
        Self {
            default_context: config.default_context.clone(),
            external_context: config.external_context.clone(),
            queue_prefix: config.queue_prefix.clone(),
            voicemail_prefix: config.voicemail_prefix.clone(),
            departments: config
                .department_numbers
                .iter()
                .map(|(name, number)| (fold_text(name), number.clone()))
                .collect(),
        }
    }

    /// Dialplan `(extension, context)` for a number of the given type.
    pub fn target(&self, destination_type: DestinationType, number: &str) -> (String, String) {
        let number = number.trim();
        match destination_type {
            DestinationType::Queue => {
                let extension = if number.starts_with(&self.queue_prefix) {
                    number.to_string()
                } else {
                    format!("{}{number}", self.queue_prefix)
                };
                (extension, self.default_context.clone())
            }
            DestinationType::Voicemail => {
                let extension = if number.starts_with('*') {
                    number.to_string()
                } else {
                    format!("{}{number}", self.voicemail_prefix)
                };
                (extension, self.default_context.clone())
            }
            DestinationType::External => {
                let digits: String = number.chars().filter(char::is_ascii_digit).collect();
                (digits, self.external_context.clone())
            }
            DestinationType::Extension
            | DestinationType::RingGroup
            | DestinationType::Department => (number.to_string(), self.default_context.clone()),
        }
    }

    /// Resolution for a configured destination record.
    ///
    /// Records keep their own context, except external numbers, which always
    /// dial out through the external context.
    pub fn for_record(&self, query: &str, record: &TransferDestination) -> ResolvedDestination {
        let (extension, mut context) =
            self.target(record.destination_type, &record.destination_number);
        if record.destination_type != DestinationType::External {
            context = record.destination_context.clone();
        }
        ResolvedDestination {
            destination_type: record.destination_type,
            value: query.to_string(),
            display_name: record.name.clone(),
            dialplan_extension: extension,
            context,
            record: Some(record.clone()),
        }
    }

    /// Resolution for a raw dialable token with no configured record.
    pub fn direct(&self, destination_type: DestinationType, token: &str) -> ResolvedDestination {
        let token = token.trim();
        let (extension, context) = self.target(destination_type, token);
        ResolvedDestination {
            destination_type,
            value: token.to_string(),
            display_name: display_name(destination_type, token),
            dialplan_extension: extension,
            context,
            record: None,
        }
    }

    /// Extension configured for a department name, compared case- and
    /// accent-insensitively.
    pub fn department(&self, query: &str) -> Option<ResolvedDestination> {
        let folded = fold_text(query);
        let (_, number) = self.departments.iter().find(|(name, _)| *name == folded)?;
        Some(ResolvedDestination {
            destination_type: DestinationType::Department,
            value: query.to_string(),
            display_name: display_name(DestinationType::Department, query.trim()),
            dialplan_extension: number.clone(),
            context: self.default_context.clone(),
            record: None,
        })
    }

    /// Strips the queue prefix from a `queue_5001` style token.
    pub fn queue_number<'a>(&self, token: &'a str) -> &'a str {
        let token = token.trim();
        token
            .get(..self.queue_prefix.len())
            .filter(|head| head.eq_ignore_ascii_case(&self.queue_prefix))
            .map(|_| &token[self.queue_prefix.len()..])
            .unwrap_or(token)
    }
}

/// Caller-facing name, in the language the prompts are spoken in.
fn display_name(destination_type: DestinationType, value: &str) -> String {
    match destination_type {
        DestinationType::Extension => format!("Ramal {value}"),
        DestinationType::Department => format!("Departamento {value}"),
        DestinationType::Queue => format!("Fila {value}"),
        DestinationType::Voicemail => format!("Caixa Postal {value}"),
        DestinationType::RingGroup => format!("Grupo {value}"),
        DestinationType::External => format!("Externo {value}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_per_type() {
        let rules = DialplanRules::default();
        assert_eq!(
            rules.target(DestinationType::Extension, "1001"),
            ("1001".to_string(), "default".to_string())
        );
        assert_eq!(
            rules.target(DestinationType::Queue, "5001").0,
            "queue_5001"
        );
        assert_eq!(
            rules.target(DestinationType::Queue, "queue_5001").0,
            "queue_5001"
        );
        assert_eq!(rules.target(DestinationType::Voicemail, "1001").0, "*991001");
        assert_eq!(rules.target(DestinationType::Voicemail, "*981001").0, "*981001");
        assert_eq!(
            rules.target(DestinationType::External, "+55 (18) 99775-2222"),
            ("5518997752222".to_string(), "external".to_string())
        );
        assert_eq!(
            rules.target(DestinationType::RingGroup, "6000"),
            ("6000".to_string(), "default".to_string())
        );
    }

    #[test]
    fn department_map_ignores_case_and_accents() {
        let rules = DialplanRules::default();
        let reception = rules.department("Recepção").unwrap();
        assert_eq!(reception.dialplan_extension, "100");
        assert_eq!(reception.display_name, "Departamento Recepção");
        assert_eq!(rules.department("VENDAS").unwrap().dialplan_extension, "200");
        assert!(rules.department("marketing").is_none());
    }

    #[test]
    fn record_keeps_its_context_except_external() {
        let rules = DialplanRules::default();
        let mut ext = TransferDestination::new("e", "Jeni", DestinationType::Extension, "1001");
        ext.destination_context = "acme.pbx".to_string();
        let resolved = rules.for_record("jeni", &ext);
        assert_eq!(resolved.context, "acme.pbx");
        assert_eq!(resolved.display_name, "Jeni");
        assert!(resolved.record.is_some());

        let out = TransferDestination::new("x", "Contador", DestinationType::External, "5511999990000");
        assert_eq!(rules.for_record("contador", &out).context, "external");
    }

    #[test]
    fn queue_number_strips_prefix() {
        let rules = DialplanRules::default();
        assert_eq!(rules.queue_number("queue_5001"), "5001");
        assert_eq!(rules.queue_number("QUEUE_5001"), "5001");
        assert_eq!(rules.queue_number("5001"), "5001");
    }
}

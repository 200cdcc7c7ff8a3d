// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extension availability for callback originates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use voxline_core::SwitchControl;

/// Presence of an agent extension as seen by the switch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExtensionStatus {
    Available,
    InCall,
    Ringing,
    Dnd,
    Offline,
    Unknown,
}

impl ExtensionStatus {
    pub fn is_available(self) -> bool {
        self == ExtensionStatus::Available
    }
}

/// Result of an availability probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub extension: String,
    pub status: ExtensionStatus,
    pub available: bool,
    pub reason: Option<String>,
}

impl Availability {
    fn new(extension: &str, status: ExtensionStatus, reason: Option<String>) -> Self {
        Self {
            extension: extension.to_string(),
            status,
            available: status.is_available(),
            reason,
        }
    }
}

/// Registration first, then active channels.
///
/// Command failures report `unknown` with the error text; they never
/// report the extension as available.
pub async fn check_availability(switch: &dyn SwitchControl, extension: &str) -> Availability {
    match switch.is_registered(extension).await {
        Ok(true) => {}
        Ok(false) => {
            return Availability::new(
                extension,
                ExtensionStatus::Offline,
                Some("Ramal não registrado".to_string()),
            );
        }
        Err(e) => {
            tracing::warn!(extension, error = %e, "registration check failed");
            return Availability::new(extension, ExtensionStatus::Unknown, Some(e.to_string()));
        }
    }

    match switch.has_active_call(extension).await {
        Ok(false) => Availability::new(extension, ExtensionStatus::Available, None),
        Ok(true) => Availability::new(
            extension,
            ExtensionStatus::InCall,
            Some("Em chamada ativa".to_string()),
        ),
        Err(e) => {
            tracing::warn!(extension, error = %e, "channel listing failed");
            Availability::new(extension, ExtensionStatus::Unknown, Some(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn status_names_are_snake_case() {
        assert_eq!(ExtensionStatus::InCall.to_string(), "in_call");
        assert_eq!(ExtensionStatus::from_str("dnd").unwrap(), ExtensionStatus::Dnd);
        assert_eq!(
            serde_json::to_string(&ExtensionStatus::Offline).unwrap(),
            "\"offline\""
        );
    }

    #[test]
    fn only_available_is_available() {
        for status in [
            ExtensionStatus::InCall,
            ExtensionStatus::Ringing,
            ExtensionStatus::Dnd,
            ExtensionStatus::Offline,
            ExtensionStatus::Unknown,
        ] {
            assert!(!status.is_available());
        }
        assert!(ExtensionStatus::Available.is_available());
    }
}

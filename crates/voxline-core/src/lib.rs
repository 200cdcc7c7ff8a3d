// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Voxline call orchestration core.
//!
//! This crate provides the error taxonomy, the shared data model and the
//! adapter traits through which the orchestration crates talk to the
//! telephony switch, the per-call media stream and the AI voice provider.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::VoxlineError;
pub use types::{
    AdapterType, CommandAck, DestinationType, HealthStatus, TranscriptEntry, TranscriptRole,
    TransferDestination,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    AudioChannel, PluginAdapter, ProviderConnection, ProviderConnector, ProviderSessionParams,
    SwitchControl, TicketSink,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voxline_error_has_all_variants() {
        let _config = VoxlineError::Config("test".into());
        let _number = VoxlineError::InvalidNumber {
            input: "12".into(),
            reason: "too short".into(),
        };
        let _unresolved = VoxlineError::UnresolvedDestination {
            query: "test".into(),
        };
        let _switch = VoxlineError::SwitchCommandFailed {
            command: "api status".into(),
            message: "test".into(),
            source: Some(Box::new(std::io::Error::other("test"))),
        };
        let _capacity = VoxlineError::DomainCapacityExceeded {
            domain_uuid: "d1".into(),
            limit: 5,
        };
        let _duplicate = VoxlineError::DuplicateSession {
            call_uuid: "c1".into(),
        };
        let _submission = VoxlineError::SubmissionFailed {
            message: "test".into(),
            source: None,
        };
        let _tz = VoxlineError::TimezoneError {
            timezone: "Mars/Olympus".into(),
        };
        let _store = VoxlineError::Store {
            source: Box::new(std::io::Error::other("test")),
        };
        let _channel = VoxlineError::Channel {
            message: "test".into(),
            source: None,
        };
        let _provider = VoxlineError::Provider {
            message: "test".into(),
            source: None,
        };
        let _state = VoxlineError::InvalidState("test".into());
        let _timeout = VoxlineError::Timeout {
            duration: std::time::Duration::from_secs(10),
        };
        let _internal = VoxlineError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Switch,
            AdapterType::AudioChannel,
            AdapterType::Provider,
            AdapterType::TicketSink,
            AdapterType::Webhook,
            AdapterType::Store,
        ];

        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        let degraded = HealthStatus::Degraded("slow".into());
        let unhealthy = HealthStatus::Unhealthy("down".into());
        assert_eq!(healthy, HealthStatus::Healthy);
        assert_ne!(degraded, unhealthy);
    }
}

// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Voxline crates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Switch,
    AudioChannel,
    Provider,
    TicketSink,
    Webhook,
    Store,
    Observability,
}

// --- Transfer destinations ---

/// Kind of transfer target configured for a tenant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DestinationType {
    Extension,
    Department,
    Queue,
    Voicemail,
    RingGroup,
    External,
}

/// What the conversation layer offers when a transfer cannot complete.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FallbackAction {
    #[default]
    OfferTicket,
    Voicemail,
    ReturnToAgent,
    Hangup,
}

/// A single local time-of-day window such as `08:00`-`18:00`.
///
/// Times are kept as text and parsed at evaluation time so malformed records
/// degrade to "not matching" instead of failing the whole tenant load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    pub start: String,
    pub end: String,
}

impl HourRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// Hours for one weekday: either a single window or a list of windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DayHours {
    Single(HourRange),
    Many(Vec<HourRange>),
}

impl DayHours {
    pub fn ranges(&self) -> &[HourRange] {
        match self {
            DayHours::Single(range) => std::slice::from_ref(range),
            DayHours::Many(ranges) => ranges,
        }
    }
}

/// Weekly availability of a destination, keyed by weekday name.
///
/// Keys are English weekday names, full or abbreviated, in any case
/// (`monday`, `Mon`, `TUE`). Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkingHours(pub BTreeMap<String, DayHours>);

impl WorkingHours {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a window for `day`, keeping any windows already configured.
    pub fn with_range(mut self, day: Weekday, start: &str, end: &str) -> Self {
        let key = day_key(day).to_string();
        let range = HourRange::new(start, end);
        let entry = self
            .0
            .remove(&key)
            .map(|existing| {
                let mut ranges = existing.ranges().to_vec();
                ranges.push(range.clone());
                DayHours::Many(ranges)
            })
            .unwrap_or(DayHours::Single(range));
        self.0.insert(key, entry);
        self
    }

    /// All windows configured for `day`, in configuration order.
    pub fn ranges_for(&self, day: Weekday) -> Vec<&HourRange> {
        self.0
            .iter()
            .filter(|(key, _)| key.trim().parse::<Weekday>().ok() == Some(day))
            .flat_map(|(_, hours)| hours.ranges())
            .collect()
    }
}

fn day_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// A configured transfer target for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferDestination {
    pub uuid: String,
    pub name: String,
    pub destination_type: DestinationType,
    pub destination_number: String,

    #[serde(default = "default_context")]
    pub destination_context: String,

    /// Case-insensitive strings a caller may use to name this destination.
    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default)]
    pub department: Option<String>,

    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Higher wins when two destinations match at the same tier.
    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_ring_timeout")]
    pub ring_timeout_seconds: u32,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u32,

    #[serde(default)]
    pub fallback_action: FallbackAction,

    #[serde(default = "default_true")]
    pub is_enabled: bool,

    #[serde(default)]
    pub is_default: bool,

    /// `None` means always available.
    #[serde(default)]
    pub working_hours: Option<WorkingHours>,
}

fn default_context() -> String {
    "default".to_string()
}

fn default_ring_timeout() -> u32 {
    30
}

fn default_max_retries() -> u32 {
    1
}

fn default_retry_delay() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl TransferDestination {
    /// Creates an enabled destination with default timeouts and no aliases.
    pub fn new(
        uuid: impl Into<String>,
        name: impl Into<String>,
        destination_type: DestinationType,
        destination_number: impl Into<String>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            destination_type,
            destination_number: destination_number.into(),
            destination_context: default_context(),
            aliases: Vec::new(),
            department: None,
            role: None,
            description: None,
            priority: 0,
            ring_timeout_seconds: default_ring_timeout(),
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay(),
            fallback_action: FallbackAction::default(),
            is_enabled: true,
            is_default: false,
            working_hours: None,
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_working_hours(mut self, hours: WorkingHours) -> Self {
        self.working_hours = Some(hours);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }
}

// --- Conversation ---

/// Speaker of a transcript line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TranscriptRole {
    User,
    Assistant,
    System,
}

/// One line of a call transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: TranscriptRole,
    pub content: String,
}

impl TranscriptEntry {
    pub fn new(role: TranscriptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

// --- Provider stream ---

/// Events surfaced by the AI voice provider connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// PCM16 audio at the provider's output rate.
    Audio(Vec<i16>),
    /// A finished utterance from either side of the conversation.
    Transcript(TranscriptEntry),
    /// The assistant decided to hand the call to a human destination.
    TransferRequested {
        destination: String,
        reason: Option<String>,
    },
    /// The assistant captured a deferred-contact request.
    CallbackRequested { reason: Option<String> },
    /// The provider interrupted playback (caller barged in).
    Interrupted,
    /// The provider ended the conversation.
    Ended,
}

// --- Switch originate ---

/// Parameters of an outbound originate: ring an extension, then bridge a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginateRequest {
    pub domain_uuid: String,
    /// SIP domain name the extension is registered under.
    pub domain_name: String,
    pub extension: String,
    pub client_number: String,
    pub caller_id_name: String,
    pub call_timeout_secs: u32,
    pub ticket_id: Option<String>,
    pub callback_reason: Option<String>,
}

/// Switch reply to a call-control command such as `uuid_transfer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandAck {
    pub accepted: bool,
    /// Reply text as sent by the switch, trimmed.
    pub reply: String,
}

impl CommandAck {
    pub fn accepted(reply: impl Into<String>) -> Self {
        Self {
            accepted: true,
            reply: reply.into().trim().to_string(),
        }
    }

    pub fn refused(reply: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reply: reply.into().trim().to_string(),
        }
    }
}

/// Switch reply to an originate command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginateOutcome {
    pub accepted: bool,
    /// Channel or job identifier reported by the switch.
    pub call_uuid: Option<String>,
    /// Raw reply text when the switch refused.
    pub error: Option<String>,
}

// --- Callback tickets ---

/// Callback ticket handed to the ticketing system, serialized in its
/// camelCase wire shape. Absent optional fields are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackTicket {
    pub ticket_type: String,
    pub callback_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_intended_for_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_scheduled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_expires_at: Option<DateTime<Utc>>,
    #[serde(rename = "callbackNotifyViaWhatsApp")]
    pub callback_notify_via_whatsapp: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_call_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_call_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_recording_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_summary: Option<String>,
    pub voice_domain_uuid: String,
    pub contact: String,
    pub channel: String,
    pub status: String,
}

/// Confirmation returned by the ticketing system once a ticket is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketReceipt {
    pub ticket_id: Option<i64>,
    pub ticket_uuid: Option<String>,
    pub whatsapp_sent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_defaults_match_record_defaults() {
        let dest = TransferDestination::new("d1", "Recepção", DestinationType::Extension, "1000");
        assert!(dest.is_enabled);
        assert!(!dest.is_default);
        assert_eq!(dest.priority, 0);
        assert_eq!(dest.ring_timeout_seconds, 30);
        assert_eq!(dest.max_retries, 1);
        assert_eq!(dest.destination_context, "default");
        assert!(dest.aliases.is_empty());
        assert!(dest.working_hours.is_none());
    }

    #[test]
    fn destination_deserializes_with_defaults() {
        let json = r#"{
            "uuid": "dest-2",
            "name": "João Silva",
            "destination_type": "extension",
            "destination_number": "1001",
            "aliases": ["joão", "silva"],
            "priority": 10
        }"#;
        let dest: TransferDestination = serde_json::from_str(json).unwrap();
        assert_eq!(dest.destination_type, DestinationType::Extension);
        assert_eq!(dest.aliases.len(), 2);
        assert_eq!(dest.priority, 10);
        assert!(dest.is_enabled);
        assert_eq!(dest.fallback_action, FallbackAction::OfferTicket);
    }

    #[test]
    fn working_hours_accept_single_and_list_forms() {
        let json = r#"{
            "monday": {"start": "08:00", "end": "18:00"},
            "Tue": [{"start": "08:00", "end": "12:00"}, {"start": "13:00", "end": "18:00"}]
        }"#;
        let hours: WorkingHours = serde_json::from_str(json).unwrap();
        assert_eq!(hours.ranges_for(Weekday::Mon).len(), 1);
        assert_eq!(hours.ranges_for(Weekday::Tue).len(), 2);
        assert!(hours.ranges_for(Weekday::Sun).is_empty());
    }

    #[test]
    fn with_range_appends_to_existing_day() {
        let hours = WorkingHours::new()
            .with_range(Weekday::Wed, "08:00", "12:00")
            .with_range(Weekday::Wed, "13:00", "17:00");
        let ranges = hours.ranges_for(Weekday::Wed);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1].start, "13:00");
    }

    #[test]
    fn destination_type_round_trips_through_strum() {
        use std::str::FromStr;

        for ty in [
            DestinationType::Extension,
            DestinationType::Department,
            DestinationType::Queue,
            DestinationType::Voicemail,
            DestinationType::RingGroup,
            DestinationType::External,
        ] {
            assert_eq!(DestinationType::from_str(&ty.to_string()).unwrap(), ty);
        }
        assert_eq!(DestinationType::RingGroup.to_string(), "ring_group");
    }

    #[test]
    fn callback_ticket_uses_camel_case_and_skips_missing_fields() {
        let ticket = CallbackTicket {
            ticket_type: "callback".into(),
            callback_number: "5518997752222".into(),
            callback_extension: None,
            callback_intended_for_name: Some("Jeni".into()),
            callback_department: None,
            callback_reason: None,
            callback_scheduled_at: None,
            callback_expires_at: None,
            callback_notify_via_whatsapp: true,
            voice_call_uuid: Some("c1".into()),
            voice_call_duration: Some(42),
            voice_recording_path: None,
            voice_transcript: None,
            voice_summary: None,
            voice_domain_uuid: "d1".into(),
            contact: "5518997752222".into(),
            channel: "voice".into(),
            status: "pending".into(),
        };
        let json = serde_json::to_value(&ticket).unwrap();
        assert_eq!(json["callbackNumber"], "5518997752222");
        assert_eq!(json["callbackIntendedForName"], "Jeni");
        assert_eq!(json["callbackNotifyViaWhatsApp"], true);
        assert_eq!(json["voiceCallDuration"], 42);
        assert!(json.get("callbackDepartment").is_none());
        assert!(json.get("voiceSummary").is_none());
    }
}

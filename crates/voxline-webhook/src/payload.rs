// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook body shapes.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use strum::Display;
use voxline_core::TranscriptEntry;
use voxline_session::{CallRef, SessionSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WebhookEvent {
    ConversationEnded,
    TransferRequested,
}

/// What the conversation ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionType {
    Hangup,
    Transfer,
    Callback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookAction {
    #[serde(rename = "type")]
    pub kind: ActionType,
    pub destination: Option<String>,
    pub reason: Option<String>,
}

impl WebhookAction {
    pub fn hangup() -> Self {
        Self {
            kind: ActionType::Hangup,
            destination: None,
            reason: None,
        }
    }

    pub fn transfer(destination: impl Into<String>, reason: Option<String>) -> Self {
        Self {
            kind: ActionType::Transfer,
            destination: Some(destination.into()),
            reason,
        }
    }

    pub fn callback(reason: Option<String>) -> Self {
        Self {
            kind: ActionType::Callback,
            destination: None,
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecretaryInfo {
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallInfo {
    pub uuid: String,
    pub caller_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_timestamp"
    )]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_timestamp"
    )]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationInfo {
    pub total_turns: usize,
    pub messages: Vec<TranscriptEntry>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookMetadata {
    pub domain_uuid: String,
}

/// The JSON document posted to the webhook URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub event: WebhookEvent,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub secretary: SecretaryInfo,
    pub call: CallInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationInfo>,
    pub action: WebhookAction,
    pub metadata: WebhookMetadata,
}

impl WebhookPayload {
    /// Built from the summary the session reports when it ends.
    pub fn conversation_ended(
        summary: &SessionSummary,
        action: WebhookAction,
        conversation_summary: Option<String>,
    ) -> Self {
        Self {
            event: WebhookEvent::ConversationEnded,
            timestamp: Utc::now(),
            secretary: SecretaryInfo {
                uuid: summary.secretary_uuid.clone(),
            },
            call: CallInfo {
                uuid: summary.call.call_uuid.clone(),
                caller_id: summary.call.caller_id.clone(),
                duration_seconds: Some(summary.duration_secs),
                start_time: Some(summary.started_at),
                end_time: Some(summary.ended_at),
            },
            conversation: Some(ConversationInfo {
                total_turns: summary.transcript.len(),
                messages: summary.transcript.clone(),
                summary: conversation_summary,
            }),
            action,
            metadata: WebhookMetadata {
                domain_uuid: summary.call.domain_uuid.clone(),
            },
        }
    }

    pub fn transfer_requested(
        call: &CallRef,
        secretary_uuid: Option<&str>,
        destination: &str,
        reason: Option<String>,
    ) -> Self {
        Self {
            event: WebhookEvent::TransferRequested,
            timestamp: Utc::now(),
            secretary: SecretaryInfo {
                uuid: secretary_uuid.map(str::to_string),
            },
            call: CallInfo {
                uuid: call.call_uuid.clone(),
                caller_id: call.caller_id.clone(),
                duration_seconds: None,
                start_time: None,
                end_time: None,
            },
            conversation: None,
            action: WebhookAction::transfer(destination, reason),
            metadata: WebhookMetadata {
                domain_uuid: call.domain_uuid.clone(),
            },
        }
    }
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn serialize_opt_timestamp<S: Serializer>(
    ts: &Option<DateTime<Utc>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match ts {
        Some(ts) => serialize_timestamp(ts, s),
        None => s.serialize_none(),
    }
}

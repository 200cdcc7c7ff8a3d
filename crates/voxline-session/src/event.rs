// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events a session reports to whoever orchestrates the call.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use voxline_core::TranscriptEntry;

/// Why a session's bridge stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EndReason {
    /// The switch closed the audio stream.
    Hangup,
    /// The provider finished the conversation.
    ProviderEnded,
    /// The provider stream closed or failed.
    ProviderLost,
    /// The session was removed from the manager.
    Removed,
}

/// Identity of the call an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRef {
    pub call_uuid: String,
    pub domain_uuid: String,
    pub caller_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub call: CallRef,
    pub secretary_uuid: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub transcript: Vec<TranscriptEntry>,
    pub reason: EndReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The assistant wants the call handed to a human.
    TransferRequested {
        call: CallRef,
        destination: String,
        reason: Option<String>,
    },
    /// The assistant captured a request to be called back.
    CallbackRequested { call: CallRef, reason: Option<String> },
    /// The bridge stopped. Sent exactly once per session.
    Ended(SessionSummary),
}

impl SessionEvent {
    pub fn call(&self) -> &CallRef {
        match self {
            SessionEvent::TransferRequested { call, .. }
            | SessionEvent::CallbackRequested { call, .. } => call,
            SessionEvent::Ended(summary) => &summary.call,
        }
    }
}

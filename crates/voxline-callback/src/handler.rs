// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callback capture for one call.
//!
//! A [`CallbackHandler`] is a plain value owned by the task driving the
//! call. Setters validate their input and report whether it was accepted;
//! lifecycle moves go through [`CallbackState::next`], so an illegal move
//! is an error rather than a silent overwrite.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use strum::Display;
use voxline_config::model::CallbackConfig;
use voxline_core::types::{CallbackTicket, TicketReceipt};
use voxline_core::{TicketSink, TranscriptEntry, TransferDestination, VoxlineError};
use voxline_routing::PhoneRules;

use crate::status::CallbackStatus;

/// How far ahead a callback may be scheduled.
pub const MAX_SCHEDULE_AHEAD_DAYS: i64 = 366;

/// Lifecycle of a callback request inside the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CallbackState {
    /// Gathering data; no callback number yet.
    Collecting,
    /// Callback number known; can be submitted.
    Ready,
    /// The ticketing system confirmed the ticket.
    Submitted,
    /// `expires_at` passed before submission.
    Expired,
}

/// Inputs that move a callback through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CallbackEvent {
    NumberCaptured,
    SubmissionConfirmed,
    ExpiryReached,
}

impl CallbackState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CallbackState::Submitted | CallbackState::Expired)
    }

    pub fn next(self, event: CallbackEvent) -> Result<Self, VoxlineError> {
        use CallbackEvent::*;
        use CallbackState::*;
        match (self, event) {
            (Collecting | Ready, NumberCaptured) => Ok(Ready),
            (Ready, SubmissionConfirmed) => Ok(Submitted),
            (Collecting | Ready, ExpiryReached) => Ok(Expired),
            (state, event) => Err(VoxlineError::InvalidState(format!(
                "callback in state {state} cannot accept {event}"
            ))),
        }
    }
}

/// Tunables taken from `[callback]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackSettings {
    pub default_expiration_hours: u32,
    pub reason_max_chars: usize,
}

impl Default for CallbackSettings {
    fn default() -> Self {
        Self::from_config(&CallbackConfig::default())
    }
}

impl CallbackSettings {
    pub fn from_config(config: &CallbackConfig) -> Self {
        Self {
            default_expiration_hours: config.default_expiration_hours,
            reason_max_chars: config.reason_max_chars,
        }
    }
}

/// Provenance of the call that produced the callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceCallData {
    pub call_uuid: String,
    pub duration_secs: u64,
    pub recording_url: Option<String>,
    pub transcript: Vec<TranscriptEntry>,
}

/// Everything captured about the callback so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallbackData {
    pub callback_number: Option<String>,
    /// Return extension when the client asked for a specific one.
    pub callback_extension: Option<String>,
    pub intended_for_name: Option<String>,
    pub department: Option<String>,
    pub reason: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub notify_via_whatsapp: bool,
    pub voice_call: Option<VoiceCallData>,
}

#[derive(Debug, Clone)]
pub struct CallbackHandler {
    domain_uuid: String,
    call_uuid: String,
    caller_id: String,
    rules: PhoneRules,
    settings: CallbackSettings,
    state: CallbackState,
    data: CallbackData,
    receipt: Option<TicketReceipt>,
}

impl CallbackHandler {
    pub fn new(
        domain_uuid: impl Into<String>,
        call_uuid: impl Into<String>,
        caller_id: impl Into<String>,
        rules: PhoneRules,
        settings: CallbackSettings,
    ) -> Self {
        Self {
            domain_uuid: domain_uuid.into(),
            call_uuid: call_uuid.into(),
            caller_id: caller_id.into(),
            rules,
            settings,
            state: CallbackState::Collecting,
            data: CallbackData::default(),
            receipt: None,
        }
    }

    pub fn call_uuid(&self) -> &str {
        &self.call_uuid
    }

    pub fn domain_uuid(&self) -> &str {
        &self.domain_uuid
    }

    pub fn data(&self) -> &CallbackData {
        &self.data
    }

    pub fn receipt(&self) -> Option<&TicketReceipt> {
        self.receipt.as_ref()
    }

    /// Current state. A callback past its expiry reads as `Expired` even
    /// before anything observed it.
    pub fn state(&self) -> CallbackState {
        self.state_at(Utc::now())
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> CallbackState {
        match self.state {
            CallbackState::Collecting | CallbackState::Ready if self.is_expired_at(now) => {
                CallbackState::Expired
            }
            state => state,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.data.expires_at.is_some_and(|expires| expires <= now)
    }

    fn is_open(&self) -> bool {
        !self.state().is_terminal()
    }

    fn apply(&mut self, event: CallbackEvent) -> Result<(), VoxlineError> {
        self.state = self.state.next(event)?;
        Ok(())
    }

    /// Uses the number the caller is calling from. Internal extensions are
    /// refused and leave the handler unchanged.
    pub fn use_caller_id_as_callback(&mut self) -> bool {
        if !self.is_open() || self.rules.is_internal_extension(&self.caller_id) {
            return false;
        }
        match self.rules.normalize(&self.caller_id) {
            Ok(number) => self.store_number(number),
            Err(e) => {
                tracing::debug!(call_uuid = %self.call_uuid, error = %e, "caller id not usable for callback");
                false
            }
        }
    }

    /// Normalizes and stores a number the caller dictated.
    pub fn set_callback_number(&mut self, raw: &str) -> bool {
        if !self.is_open() {
            return false;
        }
        match self.rules.normalize(raw) {
            Ok(number) => self.store_number(number),
            Err(e) => {
                tracing::debug!(call_uuid = %self.call_uuid, error = %e, "callback number rejected");
                false
            }
        }
    }

    fn store_number(&mut self, number: String) -> bool {
        if self.apply(CallbackEvent::NumberCaptured).is_err() {
            return false;
        }
        tracing::info!(call_uuid = %self.call_uuid, callback_number = %number, "callback number captured");
        self.data.callback_number = Some(number);
        true
    }

    pub fn set_callback_extension(&mut self, extension: &str) -> bool {
        let extension = extension.trim();
        if !self.is_open() || extension.is_empty() || !self.rules.is_internal_extension(extension) {
            return false;
        }
        self.data.callback_extension = Some(extension.to_string());
        true
    }

    pub fn set_intended_destination(&mut self, destination: &TransferDestination) -> bool {
        if !self.is_open() {
            return false;
        }
        self.data.intended_for_name = Some(destination.name.clone());
        self.data.department = destination.department.clone();
        true
    }

    /// Stores the reason, cut to `reason_max_chars` with a trailing `...`.
    pub fn set_reason(&mut self, text: &str) -> bool {
        if !self.is_open() {
            return false;
        }
        self.data.reason = Some(truncate_reason(text.trim(), self.settings.reason_max_chars));
        true
    }

    pub fn set_notify_via_whatsapp(&mut self, notify: bool) -> bool {
        if !self.is_open() {
            return false;
        }
        self.data.notify_via_whatsapp = notify;
        true
    }

    /// Schedules the callback. Only timestamps in the future and at most
    /// [`MAX_SCHEDULE_AHEAD_DAYS`] away are accepted.
    pub fn set_scheduled_at(&mut self, at: DateTime<Utc>) -> bool {
        self.set_scheduled_at_from(at, Utc::now())
    }

    pub fn set_scheduled_at_from(&mut self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if !self.is_open() || at <= now {
            return false;
        }
        let horizon = now.checked_add_signed(Duration::days(MAX_SCHEDULE_AHEAD_DAYS));
        if horizon.is_none_or(|limit| at > limit) {
            return false;
        }
        self.data.scheduled_at = Some(at);
        // Keep an earlier expiry consistent with the new schedule.
        if self.data.expires_at.is_some_and(|expires| expires <= at) {
            self.data.expires_at = None;
        }
        true
    }

    /// `expires_at = max(scheduled_at, now) + hours`, with at least one hour.
    ///
    /// Returns `None` and keeps the previous expiry when the result does not
    /// fit in a timestamp.
    pub fn calculate_expiration(&mut self, hours: u32) -> Option<DateTime<Utc>> {
        self.calculate_expiration_from(hours, Utc::now())
    }

    pub fn calculate_expiration_from(
        &mut self,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let base = self.data.scheduled_at.map_or(now, |at| at.max(now));
        let expires = Duration::try_hours(i64::from(hours.max(1)))
            .and_then(|window| base.checked_add_signed(window))?;
        self.data.expires_at = Some(expires);
        Some(expires)
    }

    /// Records the originating call. The first call wins; later calls are
    /// refused.
    pub fn set_voice_call_data(
        &mut self,
        duration_secs: u64,
        recording_url: Option<String>,
        transcript: Vec<TranscriptEntry>,
    ) -> bool {
        if self.data.voice_call.is_some() || self.state().is_terminal() {
            return false;
        }
        self.data.voice_call = Some(VoiceCallData {
            call_uuid: self.call_uuid.clone(),
            duration_secs,
            recording_url,
            transcript,
        });
        true
    }

    /// Ticket payload for the current data. `None` until a number is set.
    pub fn to_ticket(&self, summary: Option<&str>) -> Option<CallbackTicket> {
        let number = self.data.callback_number.clone()?;
        let voice = self.data.voice_call.as_ref();
        Some(CallbackTicket {
            ticket_type: "callback".to_string(),
            callback_number: number.clone(),
            callback_extension: self.data.callback_extension.clone(),
            callback_intended_for_name: self.data.intended_for_name.clone(),
            callback_department: self.data.department.clone(),
            callback_reason: self.data.reason.clone(),
            callback_scheduled_at: self.data.scheduled_at,
            callback_expires_at: self.data.expires_at,
            callback_notify_via_whatsapp: self.data.notify_via_whatsapp,
            voice_call_uuid: voice.map(|v| v.call_uuid.clone()),
            voice_call_duration: voice.map(|v| v.duration_secs),
            voice_recording_path: voice.and_then(|v| v.recording_url.clone()),
            voice_transcript: voice
                .filter(|v| !v.transcript.is_empty())
                .map(|v| render_transcript(&v.transcript)),
            voice_summary: summary.map(str::to_string),
            voice_domain_uuid: self.domain_uuid.clone(),
            contact: number,
            channel: "voice".to_string(),
            status: CallbackStatus::Pending.to_string(),
        })
    }

    /// Hands the ticket to the ticketing system.
    ///
    /// Only a `Ready` callback can be submitted; a missing expiry is filled
    /// in with the default first. On failure the handler stays `Ready` so
    /// the caller may try again.
    pub async fn submit(
        &mut self,
        sink: &dyn TicketSink,
        summary: Option<&str>,
    ) -> Result<TicketReceipt, VoxlineError> {
        match self.state() {
            CallbackState::Ready => {}
            CallbackState::Expired => {
                self.state = CallbackState::Expired;
                return Err(VoxlineError::InvalidState(
                    "callback expired before submission".to_string(),
                ));
            }
            CallbackState::Collecting => {
                return Err(VoxlineError::InvalidState(
                    "callback number not set".to_string(),
                ));
            }
            CallbackState::Submitted => {
                return Err(VoxlineError::InvalidState(
                    "callback already submitted".to_string(),
                ));
            }
        }

        if self.data.expires_at.is_none()
            && self
                .calculate_expiration(self.settings.default_expiration_hours)
                .is_none()
        {
            tracing::warn!(call_uuid = %self.call_uuid, "callback expiry out of range, sent without one");
        }
        let Some(ticket) = self.to_ticket(summary) else {
            return Err(VoxlineError::InvalidState(
                "callback number not set".to_string(),
            ));
        };

        tracing::info!(
            call_uuid = %self.call_uuid,
            domain_uuid = %self.domain_uuid,
            callback_number = %ticket.callback_number,
            intended_for = ?ticket.callback_intended_for_name,
            "submitting callback ticket"
        );
        match sink.submit(&ticket).await {
            Ok(receipt) => {
                self.apply(CallbackEvent::SubmissionConfirmed)?;
                tracing::info!(
                    call_uuid = %self.call_uuid,
                    ticket_id = ?receipt.ticket_id,
                    whatsapp_sent = receipt.whatsapp_sent,
                    "callback ticket created"
                );
                metrics::counter!("voxline_callbacks_total", "outcome" => "submitted").increment(1);
                self.receipt = Some(receipt.clone());
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!(call_uuid = %self.call_uuid, error = %e, "callback ticket not created");
                metrics::counter!("voxline_callbacks_total", "outcome" => "failed").increment(1);
                Err(match e {
                    VoxlineError::SubmissionFailed { .. } => e,
                    other => VoxlineError::SubmissionFailed {
                        message: other.to_string(),
                        source: Some(Box::new(other)),
                    },
                })
            }
        }
    }

    /// Marks the callback expired if its deadline passed. Returns whether
    /// the handler is now expired.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.state == CallbackState::Expired {
            return true;
        }
        if self.is_expired_at(now) && self.apply(CallbackEvent::ExpiryReached).is_ok() {
            tracing::info!(call_uuid = %self.call_uuid, "callback expired");
            metrics::counter!("voxline_callbacks_total", "outcome" => "expired").increment(1);
            return true;
        }
        false
    }
}

fn truncate_reason(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn render_transcript(transcript: &[TranscriptEntry]) -> String {
    transcript
        .iter()
        .map(|entry| format!("{}: {}", entry.role, entry.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use voxline_core::{DestinationType, TranscriptRole};

    use super::*;

    fn handler(caller_id: &str) -> CallbackHandler {
        CallbackHandler::new(
            "d1",
            "c1",
            caller_id,
            PhoneRules::default(),
            CallbackSettings::default(),
        )
    }

    #[test]
    fn transition_table() {
        use CallbackEvent::*;
        use CallbackState::*;
        assert_eq!(Collecting.next(NumberCaptured).unwrap(), Ready);
        assert_eq!(Ready.next(NumberCaptured).unwrap(), Ready);
        assert_eq!(Ready.next(SubmissionConfirmed).unwrap(), Submitted);
        assert_eq!(Collecting.next(ExpiryReached).unwrap(), Expired);
        assert!(Collecting.next(SubmissionConfirmed).is_err());
        assert!(Submitted.next(NumberCaptured).is_err());
        assert!(Expired.next(SubmissionConfirmed).is_err());
    }

    #[test]
    fn extension_caller_cannot_be_called_back() {
        let mut h = handler("1001");
        assert!(!h.use_caller_id_as_callback());
        assert_eq!(h.state(), CallbackState::Collecting);
        assert!(h.data().callback_number.is_none());

        assert!(h.set_callback_number("18997752222"));
        assert_eq!(h.data().callback_number.as_deref(), Some("5518997752222"));
        assert_eq!(h.state(), CallbackState::Ready);
    }

    #[test]
    fn external_caller_id_is_normalized() {
        let mut h = handler("+55 (18) 99775-2222");
        assert!(h.use_caller_id_as_callback());
        assert_eq!(h.data().callback_number.as_deref(), Some("5518997752222"));
    }

    #[test]
    fn invalid_number_leaves_state_unchanged() {
        let mut h = handler("1001");
        assert!(!h.set_callback_number("12"));
        assert_eq!(h.state(), CallbackState::Collecting);
    }

    #[test]
    fn reason_is_truncated() {
        let mut h = handler("1001");
        h.set_reason(&"a".repeat(600));
        let reason = h.data().reason.clone().unwrap();
        assert_eq!(reason.chars().count(), 500);
        assert!(reason.ends_with("..."));

        h.set_reason("Segunda via do boleto");
        assert_eq!(h.data().reason.as_deref(), Some("Segunda via do boleto"));
    }

    #[test]
    fn schedule_must_be_in_the_future() {
        let now = Utc::now();
        let mut h = handler("1001");
        assert!(!h.set_scheduled_at_from(now - Duration::minutes(1), now));
        assert!(!h.set_scheduled_at_from(now, now));
        assert!(h.set_scheduled_at_from(now + Duration::hours(2), now));
    }

    #[test]
    fn far_future_schedule_is_rejected() {
        let now = Utc::now();
        let mut h = handler("1001");
        assert!(!h.set_scheduled_at_from(DateTime::<Utc>::MAX_UTC - Duration::minutes(30), now));
        assert!(!h.set_scheduled_at_from(now + Duration::days(MAX_SCHEDULE_AHEAD_DAYS + 1), now));
        assert!(h.data().scheduled_at.is_none());

        assert!(h.set_scheduled_at_from(now + Duration::days(MAX_SCHEDULE_AHEAD_DAYS), now));
        assert!(h.calculate_expiration_from(24, now).is_some());
    }

    #[test]
    fn unrepresentable_expiry_keeps_the_previous_one() {
        let mut h = handler("1001");
        let now = Utc::now();
        let first = h.calculate_expiration_from(2, now).unwrap();

        let end_of_time = DateTime::<Utc>::MAX_UTC - Duration::minutes(30);
        assert_eq!(h.calculate_expiration_from(24, end_of_time), None);
        assert_eq!(h.calculate_expiration_from(u32::MAX, now), None);
        assert_eq!(h.data().expires_at, Some(first));
    }

    #[test]
    fn expiration_follows_schedule() {
        let now = Utc::now();
        let mut h = handler("1001");
        let scheduled = now + Duration::hours(5);
        h.set_scheduled_at_from(scheduled, now);
        let expires = h.calculate_expiration_from(24, now);
        assert_eq!(expires, Some(scheduled + Duration::hours(24)));

        let mut unscheduled = handler("1001");
        let expires = unscheduled.calculate_expiration_from(0, now).unwrap();
        assert!(expires > now);
    }

    #[test]
    fn voice_call_data_is_set_once() {
        let mut h = handler("1001");
        let transcript = vec![TranscriptEntry::new(TranscriptRole::User, "Quero falar com a Jeni")];
        assert!(h.set_voice_call_data(95, Some("/rec/c1.wav".into()), transcript));
        assert!(!h.set_voice_call_data(10, None, Vec::new()));
        assert_eq!(h.data().voice_call.as_ref().unwrap().duration_secs, 95);
    }

    #[test]
    fn ticket_requires_number_and_carries_context() {
        let mut h = handler("1001");
        assert!(h.to_ticket(None).is_none());

        let jeni = TransferDestination::new("e1", "Jeni", DestinationType::Extension, "1001")
            .with_department("Financeiro");
        h.set_intended_destination(&jeni);
        h.set_callback_number("18997752222");
        h.set_notify_via_whatsapp(true);
        h.set_voice_call_data(
            30,
            None,
            vec![
                TranscriptEntry::new(TranscriptRole::Assistant, "Olá"),
                TranscriptEntry::new(TranscriptRole::User, "Oi"),
            ],
        );

        let ticket = h.to_ticket(Some("Cliente quer segunda via")).unwrap();
        assert_eq!(ticket.callback_intended_for_name.as_deref(), Some("Jeni"));
        assert_eq!(ticket.callback_department.as_deref(), Some("Financeiro"));
        assert_eq!(ticket.voice_call_uuid.as_deref(), Some("c1"));
        assert_eq!(ticket.voice_transcript.as_deref(), Some("assistant: Olá\nuser: Oi"));
        assert_eq!(ticket.contact, "5518997752222");
        assert_eq!(ticket.status, "pending");
        assert!(ticket.callback_notify_via_whatsapp);
    }

    #[test]
    fn past_expiry_reads_as_expired() {
        let now = Utc::now();
        let mut h = handler("1001");
        h.set_callback_number("18997752222");
        h.calculate_expiration_from(1, now);
        assert_eq!(h.state_at(now), CallbackState::Ready);
        let later = now + Duration::hours(2);
        assert_eq!(h.state_at(later), CallbackState::Expired);
        assert!(h.expire_if_due(later));
        assert!(!h.set_reason("tarde demais"));
    }
}

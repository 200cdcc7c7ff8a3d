// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live call transfers.
//!
//! A transfer moves through `Resolving -> Executing -> Succeeded | Failed`.
//! Resolution failures and closed destinations end in `Failed` without any
//! switch command being issued.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumString};
use voxline_config::model::TransferConfig;
use voxline_core::{DestinationType, SwitchControl, VoxlineError};
use voxline_routing::{DestinationLoader, infer_destination_type};

use crate::dialplan::{DialplanRules, ResolvedDestination};
use crate::log::{TransferLog, TransferLogEntry};

/// Reason reported when a destination is closed at transfer time.
pub const OUTSIDE_WORKING_HOURS: &str = "Destination unavailable outside working hours";

/// Reason reported when the switch refused the transfer without reply text.
pub const TRANSFER_REFUSED: &str = "Transfer command failed";

/// How the caller is handed over.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferKind {
    /// Transfer immediately.
    #[default]
    Blind,
    /// Play an announcement to the caller first.
    Attended,
    /// Resolve the query as a queue.
    Queue,
}

/// Progress of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferState {
    Resolving,
    Executing,
    Succeeded,
    Failed,
}

impl TransferState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferState::Succeeded | TransferState::Failed)
    }

    /// `Resolving -> Executing`, once a destination is known.
    pub fn resolved(self) -> Result<Self, VoxlineError> {
        match self {
            TransferState::Resolving => Ok(TransferState::Executing),
            other => Err(invalid_transition(other, TransferState::Executing)),
        }
    }

    /// `Executing -> Succeeded`.
    pub fn succeed(self) -> Result<Self, VoxlineError> {
        match self {
            TransferState::Executing => Ok(TransferState::Succeeded),
            other => Err(invalid_transition(other, TransferState::Succeeded)),
        }
    }

    /// Any non-terminal state may fail.
    pub fn fail(self) -> Result<Self, VoxlineError> {
        if self.is_terminal() {
            return Err(invalid_transition(self, TransferState::Failed));
        }
        Ok(TransferState::Failed)
    }
}

fn invalid_transition(from: TransferState, to: TransferState) -> VoxlineError {
    VoxlineError::InvalidState(format!("transfer cannot move from {from} to {to}"))
}

/// Why a transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferFailure {
    Unresolved,
    OutsideWorkingHours,
    /// The switch answered `-ERR`.
    Refused,
    /// The command could not be delivered or read.
    SwitchError,
    /// The tenant store could not be read.
    StoreError,
}

impl TransferFailure {
    /// Failures worth repeating against the same destination.
    pub fn is_retryable(self) -> bool {
        matches!(self, TransferFailure::Refused | TransferFailure::SwitchError)
    }
}

/// Outcome of a transfer. `error` is set exactly when `success` is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferResult {
    pub success: bool,
    pub destination: Option<ResolvedDestination>,
    pub error: Option<String>,
    pub failure: Option<TransferFailure>,
    /// Switch commands issued, retries included.
    pub attempts: u32,
    pub timestamp: DateTime<Utc>,
}

impl TransferResult {
    fn succeeded(destination: ResolvedDestination, attempts: u32) -> Self {
        Self {
            success: true,
            destination: Some(destination),
            error: None,
            failure: None,
            attempts,
            timestamp: Utc::now(),
        }
    }

    fn failed(
        destination: Option<ResolvedDestination>,
        failure: TransferFailure,
        error: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            success: false,
            destination,
            error: Some(error.into()),
            failure: Some(failure),
            attempts,
            timestamp: Utc::now(),
        }
    }

    pub fn state(&self) -> TransferState {
        if self.success {
            TransferState::Succeeded
        } else {
            TransferState::Failed
        }
    }
}

/// Resolves destinations and executes transfers against the switch.
pub struct TransferHandler {
    switch: Arc<dyn SwitchControl>,
    loader: Arc<DestinationLoader>,
    rules: DialplanRules,
    log: TransferLog,
    announce_audio: String,
    announce_delay: Duration,
}

impl TransferHandler {
    pub fn new(
        switch: Arc<dyn SwitchControl>,
        loader: Arc<DestinationLoader>,
        config: &TransferConfig,
    ) -> Self {
        Self {
            switch,
            loader,
            rules: DialplanRules::from_config(config),
            log: TransferLog::new(config.log_capacity, config.log_trim_to),
            announce_audio: config.announce_audio.clone(),
            announce_delay: Duration::from_millis(config.attended_announce_delay_ms),
        }
    }

    pub fn loader(&self) -> &Arc<DestinationLoader> {
        &self.loader
    }

    /// Resolves a free-text or dialable query for one tenant.
    ///
    /// With a type hint the lookup is scoped to that type; without one the
    /// type is inferred from the query's shape. Dialable tokens (digits,
    /// `queue_` and `*` forms) fall back to a direct dial when no record
    /// matches; free text falls back to the department map.
    pub async fn resolve_destination(
        &self,
        domain_uuid: &str,
        query: &str,
        hint: Option<DestinationType>,
    ) -> Result<Option<ResolvedDestination>, VoxlineError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }
        let destination_type = hint.unwrap_or_else(|| infer_destination_type(query));

        let resolved = match destination_type {
            DestinationType::Department => {
                match self.loader.find(domain_uuid, query).await? {
                    Some(record) => Some(self.rules.for_record(query, &record)),
                    None => self.rules.department(query),
                }
            }
            DestinationType::Queue => {
                let number = self.rules.queue_number(query);
                let record = self
                    .loader
                    .find_of_type(domain_uuid, number, DestinationType::Queue)
                    .await?;
                match record {
                    Some(record) => Some(self.rules.for_record(query, &record)),
                    None if is_dialable(number) => {
                        Some(self.rules.direct(DestinationType::Queue, number))
                    }
                    None => None,
                }
            }
            DestinationType::Extension
            | DestinationType::Voicemail
            | DestinationType::RingGroup
            | DestinationType::External => {
                let record = self
                    .loader
                    .find_of_type(domain_uuid, query, destination_type)
                    .await?;
                match record {
                    Some(record) => Some(self.rules.for_record(query, &record)),
                    None if is_dialable(query) => {
                        Some(self.rules.direct(destination_type, query))
                    }
                    None => None,
                }
            }
        };

        match &resolved {
            Some(dest) => tracing::debug!(
                domain_uuid,
                query,
                destination_type = %dest.destination_type,
                dialplan = %dest.dialplan_extension,
                context = %dest.context,
                "destination resolved"
            ),
            None => tracing::info!(domain_uuid, query, "destination not resolved"),
        }
        Ok(resolved)
    }

    /// Resolves `query` and transfers the call once.
    pub async fn transfer_call(
        &self,
        call_uuid: &str,
        domain_uuid: &str,
        query: &str,
        kind: TransferKind,
    ) -> TransferResult {
        self.run(call_uuid, domain_uuid, query, kind, false).await
    }

    /// Like [`transfer_call`](Self::transfer_call), repeating a refused or
    /// undelivered transfer up to the destination's `max_retries` times,
    /// `retry_delay_seconds` apart. Destinations without a record are tried
    /// once.
    pub async fn transfer_with_retries(
        &self,
        call_uuid: &str,
        domain_uuid: &str,
        query: &str,
        kind: TransferKind,
    ) -> TransferResult {
        self.run(call_uuid, domain_uuid, query, kind, true).await
    }

    /// Recent transfers of one tenant, oldest first.
    pub fn get_transfer_log(&self, domain_uuid: &str, limit: usize) -> Vec<TransferLogEntry> {
        self.log.entries(domain_uuid, limit)
    }

    pub fn transfer_log(&self) -> &TransferLog {
        &self.log
    }

    async fn run(
        &self,
        call_uuid: &str,
        domain_uuid: &str,
        query: &str,
        kind: TransferKind,
        retry: bool,
    ) -> TransferResult {
        let started = Instant::now();
        let state = TransferState::Resolving;
        let hint = (kind == TransferKind::Queue).then_some(DestinationType::Queue);

        let result = match self.resolve_destination(domain_uuid, query, hint).await {
            Err(e) => {
                tracing::error!(call_uuid, domain_uuid, query, error = %e, "destination lookup failed");
                TransferResult::failed(None, TransferFailure::StoreError, e.to_string(), 0)
            }
            Ok(None) => {
                let error = VoxlineError::UnresolvedDestination {
                    query: query.to_string(),
                };
                TransferResult::failed(None, TransferFailure::Unresolved, error.to_string(), 0)
            }
            Ok(Some(destination)) => {
                self.execute(call_uuid, domain_uuid, destination, kind, retry, state)
                    .await
            }
        };

        if result.attempts == 0 {
            self.log.record(log_entry(call_uuid, domain_uuid, &result, 0));
        }
        record_outcome(&result, started.elapsed());
        result
    }

    async fn execute(
        &self,
        call_uuid: &str,
        domain_uuid: &str,
        destination: ResolvedDestination,
        kind: TransferKind,
        retry: bool,
        state: TransferState,
    ) -> TransferResult {
        if let Some(record) = &destination.record {
            match self.loader.is_available_now(domain_uuid, record).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::info!(
                        call_uuid,
                        domain_uuid,
                        destination = %record.name,
                        "destination closed, transfer not attempted"
                    );
                    return TransferResult::failed(
                        Some(destination),
                        TransferFailure::OutsideWorkingHours,
                        OUTSIDE_WORKING_HOURS,
                        0,
                    );
                }
                Err(e) => {
                    return TransferResult::failed(
                        Some(destination),
                        TransferFailure::StoreError,
                        e.to_string(),
                        0,
                    );
                }
            }
        }

        let state = match state.resolved() {
            Ok(next) => next,
            Err(e) => {
                return TransferResult::failed(
                    Some(destination),
                    TransferFailure::SwitchError,
                    e.to_string(),
                    0,
                );
            }
        };
        tracing::debug!(call_uuid, %state, "executing transfer");

        if kind == TransferKind::Attended {
            self.announce(call_uuid).await;
        }

        let max_attempts = match (&destination.record, retry) {
            (Some(record), true) => record.max_retries.saturating_add(1),
            _ => 1,
        };
        let retry_delay = destination
            .record
            .as_ref()
            .map(|r| Duration::from_secs(u64::from(r.retry_delay_seconds)))
            .unwrap_or_default();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = self
                .switch
                .uuid_transfer(call_uuid, &destination.dialplan_extension, &destination.context)
                .await;
            let result = match outcome {
                Ok(ack) if ack.accepted => TransferResult::succeeded(destination.clone(), attempt),
                Ok(ack) => TransferResult::failed(
                    Some(destination.clone()),
                    TransferFailure::Refused,
                    refusal_text(ack.reply),
                    attempt,
                ),
                Err(e) => TransferResult::failed(
                    Some(destination.clone()),
                    TransferFailure::SwitchError,
                    e.to_string(),
                    attempt,
                ),
            };
            self.log
                .record(log_entry(call_uuid, domain_uuid, &result, attempt));

            let retryable = result.failure.is_some_and(TransferFailure::is_retryable);
            if result.success || !retryable || attempt >= max_attempts {
                let final_state = if result.success {
                    state.succeed()
                } else {
                    state.fail()
                };
                tracing::info!(
                    call_uuid,
                    domain_uuid,
                    destination = %destination.display_name,
                    dialplan = %destination.dialplan_extension,
                    attempts = attempt,
                    state = %final_state.unwrap_or(TransferState::Failed),
                    error = ?result.error,
                    "transfer finished"
                );
                return result;
            }

            tracing::warn!(
                call_uuid,
                attempt,
                max_attempts,
                error = ?result.error,
                "transfer attempt failed, retrying"
            );
            tokio::time::sleep(retry_delay).await;
        }
    }

    /// Best effort: a failed announcement does not stop the transfer.
    async fn announce(&self, call_uuid: &str) {
        match self
            .switch
            .uuid_broadcast(call_uuid, &self.announce_audio)
            .await
        {
            Ok(ack) if ack.accepted => tokio::time::sleep(self.announce_delay).await,
            Ok(ack) => tracing::warn!(call_uuid, reply = %ack.reply, "announcement refused by switch"),
            Err(e) => tracing::warn!(call_uuid, error = %e, "announcement failed"),
        }
    }
}

/// Digits, `*` voicemail codes and `queue_` tokens can be dialled as-is.
fn is_dialable(token: &str) -> bool {
    let digits = token.trim_start_matches('*');
    !digits.is_empty()
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')' | '.' | '+'))
}

fn refusal_text(reply: String) -> String {
    if reply.is_empty() {
        TRANSFER_REFUSED.to_string()
    } else {
        reply
    }
}

fn log_entry(
    call_uuid: &str,
    domain_uuid: &str,
    result: &TransferResult,
    attempt: u32,
) -> TransferLogEntry {
    let dest = result.destination.as_ref();
    TransferLogEntry {
        timestamp: result.timestamp,
        call_uuid: call_uuid.to_string(),
        domain_uuid: domain_uuid.to_string(),
        success: result.success,
        destination_type: dest.map(|d| d.destination_type),
        destination_value: dest.map(|d| d.value.clone()),
        destination_dialplan: dest.map(|d| d.dialplan_extension.clone()),
        error: result.error.clone(),
        attempt,
    }
}

fn record_outcome(result: &TransferResult, elapsed: Duration) {
    let outcome = match result.failure {
        None => "success",
        Some(TransferFailure::Unresolved) => "unresolved",
        Some(TransferFailure::OutsideWorkingHours) => "closed",
        Some(_) => "failed",
    };
    metrics::counter!("voxline_transfers_total", "outcome" => outcome).increment(1);
    metrics::histogram!("voxline_transfer_latency_seconds").record(elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;
    use voxline_test_utils::{MockSwitch, fixtures};

    use super::*;

    #[test]
    fn state_transitions() {
        let state = TransferState::Resolving;
        let executing = state.resolved().unwrap();
        assert_eq!(executing, TransferState::Executing);
        assert_eq!(executing.succeed().unwrap(), TransferState::Succeeded);
        assert_eq!(state.fail().unwrap(), TransferState::Failed);

        assert!(state.succeed().is_err());
        assert!(TransferState::Succeeded.fail().is_err());
        assert!(TransferState::Failed.resolved().is_err());
        assert!(TransferState::Failed.is_terminal());
        assert!(!TransferState::Executing.is_terminal());
    }

    #[test]
    fn kind_parses_from_snake_case() {
        use std::str::FromStr;
        assert_eq!(TransferKind::from_str("attended").unwrap(), TransferKind::Attended);
        assert_eq!(TransferKind::default(), TransferKind::Blind);
        assert_eq!(TransferState::Succeeded.to_string(), "succeeded");
    }

    #[test]
    fn dialable_tokens() {
        assert!(is_dialable("1001"));
        assert!(is_dialable("*991001"));
        assert!(is_dialable("+55 18 99775-2222"));
        assert!(!is_dialable("*"));
        assert!(!is_dialable("vendas"));
    }

    #[test]
    fn only_switch_failures_retry() {
        assert!(TransferFailure::Refused.is_retryable());
        assert!(TransferFailure::SwitchError.is_retryable());
        assert!(!TransferFailure::Unresolved.is_retryable());
        assert!(!TransferFailure::OutsideWorkingHours.is_retryable());
    }

    #[tokio::test]
    #[traced_test]
    async fn logs_unresolved_and_finished_transfers() {
        let switch = Arc::new(MockSwitch::new());
        let handler =
            TransferHandler::new(switch, fixtures::loader(), &TransferConfig::default());

        handler
            .transfer_call("c1", fixtures::DOMAIN, "marketing digital", TransferKind::Blind)
            .await;
        assert!(logs_contain("destination not resolved"));

        handler
            .transfer_call("c1", fixtures::DOMAIN, "jeni", TransferKind::Blind)
            .await;
        assert!(logs_contain("transfer finished"));
        assert!(logs_contain("attempts=1"));
    }
}

// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of active sessions with per-tenant admission control.
//!
//! Admission is a hard gate: when a tenant already runs
//! `max_sessions_per_domain` sessions, creation fails. The capacity check,
//! the duplicate check and the reservation happen under the tenant's
//! counter entry, so two concurrent creations can never both pass.
//!
//! Lock order is always counter entry, then session entry. Removal takes
//! the session entry alone and touches the counter afterwards.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use voxline_config::model::SessionConfig;
use voxline_core::{AudioChannel, ProviderConnector, ProviderSessionParams, VoxlineError};

use crate::event::{CallRef, EndReason, SessionEvent};
use crate::session::{AudioSettings, RealtimeSession, spawn_bridge};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub max_sessions_per_domain: usize,
    pub session_timeout: Duration,
    pub sweep_interval: Duration,
    pub event_buffer: usize,
    pub audio: AudioSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

impl SessionSettings {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            max_sessions_per_domain: config.max_sessions_per_domain,
            session_timeout: Duration::from_secs(config.session_timeout_seconds),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
            event_buffer: config.event_buffer.max(1),
            audio: AudioSettings::from_config(config),
        }
    }
}

/// What a new session needs to know about its call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub call_uuid: String,
    pub domain_uuid: String,
    pub caller_id: String,
    pub secretary_uuid: Option<String>,
}

enum Slot {
    /// Admitted, provider connection still being opened.
    Reserved,
    Active(Arc<RealtimeSession>),
}

impl Slot {
    fn active(&self) -> Option<&Arc<RealtimeSession>> {
        match self {
            Slot::Active(session) => Some(session),
            Slot::Reserved => None,
        }
    }
}

pub struct SessionManager {
    sessions: DashMap<String, Slot>,
    domain_counts: DashMap<String, usize>,
    connector: Arc<dyn ProviderConnector>,
    settings: SessionSettings,
    events: mpsc::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new(
        connector: Arc<dyn ProviderConnector>,
        settings: SessionSettings,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            domain_counts: DashMap::new(),
            connector,
            settings,
            events,
        }
    }

    /// Builds a manager together with the receiving end of its event queue.
    pub fn with_events(
        connector: Arc<dyn ProviderConnector>,
        settings: SessionSettings,
    ) -> (Arc<Self>, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel(settings.event_buffer);
        (Arc::new(Self::new(connector, settings, tx)), rx)
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Admits a call, connects the provider and starts the audio bridge.
    pub async fn create_session(
        &self,
        request: SessionRequest,
        channel: Arc<dyn AudioChannel>,
    ) -> Result<Arc<RealtimeSession>, VoxlineError> {
        self.reserve(&request.call_uuid, &request.domain_uuid)?;

        let params = ProviderSessionParams {
            call_uuid: request.call_uuid.clone(),
            domain_uuid: request.domain_uuid.clone(),
            caller_id: request.caller_id.clone(),
            secretary_uuid: request.secretary_uuid.clone(),
            input_rate: self.settings.audio.provider_input_rate,
        };
        let provider = match self.connector.connect(&params).await {
            Ok(provider) => provider,
            Err(e) => {
                warn!(
                    call_uuid = %request.call_uuid,
                    domain_uuid = %request.domain_uuid,
                    error = %e,
                    "provider connection failed"
                );
                self.release(&request.call_uuid, &request.domain_uuid);
                metrics::counter!("voxline_sessions_rejected_total", "reason" => "provider").increment(1);
                return Err(e);
            }
        };

        let call = CallRef {
            call_uuid: request.call_uuid,
            domain_uuid: request.domain_uuid,
            caller_id: request.caller_id,
        };
        let session = Arc::new(RealtimeSession::new(
            call,
            request.secretary_uuid,
            channel,
            provider,
        ));
        self.sessions.insert(
            session.call_uuid().to_string(),
            Slot::Active(Arc::clone(&session)),
        );
        metrics::gauge!("voxline_active_sessions").increment(1.0);

        spawn_bridge(
            Arc::clone(&session),
            self.settings.audio.clone(),
            self.events.clone(),
        );
        info!(
            call_uuid = %session.call_uuid(),
            domain_uuid = %session.domain_uuid(),
            caller_id = %session.caller_id(),
            domain_sessions = self.get_domain_session_count(session.domain_uuid()),
            "session created"
        );
        Ok(session)
    }

    /// Atomic admission: capacity check, duplicate check and reservation.
    fn reserve(&self, call_uuid: &str, domain_uuid: &str) -> Result<(), VoxlineError> {
        let limit = self.settings.max_sessions_per_domain;
        let mut count = self
            .domain_counts
            .entry(domain_uuid.to_string())
            .or_insert(0);

        if *count >= limit {
            warn!(domain_uuid, call_uuid, limit, "domain session limit reached");
            metrics::counter!("voxline_sessions_rejected_total", "reason" => "capacity").increment(1);
            return Err(VoxlineError::DomainCapacityExceeded {
                domain_uuid: domain_uuid.to_string(),
                limit,
            });
        }

        match self.sessions.entry(call_uuid.to_string()) {
            Entry::Occupied(_) => {
                warn!(domain_uuid, call_uuid, "duplicate session rejected");
                metrics::counter!("voxline_sessions_rejected_total", "reason" => "duplicate")
                    .increment(1);
                Err(VoxlineError::DuplicateSession {
                    call_uuid: call_uuid.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(Slot::Reserved);
                *count += 1;
                Ok(())
            }
        }
    }

    fn release(&self, call_uuid: &str, domain_uuid: &str) {
        self.sessions.remove(call_uuid);
        self.decrement(domain_uuid);
    }

    fn decrement(&self, domain_uuid: &str) {
        if let Some(mut count) = self.domain_counts.get_mut(domain_uuid) {
            *count = count.saturating_sub(1);
        }
        self.domain_counts.remove_if(domain_uuid, |_, count| *count == 0);
    }

    pub fn get_session(&self, call_uuid: &str) -> Option<Arc<RealtimeSession>> {
        self.sessions
            .get(call_uuid)
            .and_then(|slot| slot.active().cloned())
    }

    /// Deregisters the session and closes both legs. Returns whether a
    /// session was actually removed.
    pub async fn remove_session(&self, call_uuid: &str) -> bool {
        let Some((_, Slot::Active(session))) = self
            .sessions
            .remove_if(call_uuid, |_, slot| slot.active().is_some())
        else {
            return false;
        };
        self.decrement(session.domain_uuid());
        metrics::gauge!("voxline_active_sessions").decrement(1.0);

        session.close(EndReason::Removed).await;
        debug!(
            call_uuid,
            elapsed_secs = session.elapsed().as_secs(),
            "session removed"
        );
        true
    }

    /// Removes every session older than `session_timeout`.
    pub async fn cleanup_expired_sessions(&self) -> usize {
        let timeout = self.settings.session_timeout;
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .active()
                    .filter(|session| session.elapsed() > timeout)
                    .map(|_| entry.key().clone())
            })
            .collect();

        let mut removed = 0;
        for call_uuid in expired {
            if self.remove_session(&call_uuid).await {
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, "expired sessions cleaned up");
        }
        removed
    }

    /// Sessions admitted for the tenant, including ones still connecting.
    pub fn get_domain_session_count(&self, domain_uuid: &str) -> usize {
        self.domain_counts
            .get(domain_uuid)
            .map(|count| *count)
            .unwrap_or(0)
    }

    pub fn get_all_sessions(&self) -> Vec<Arc<RealtimeSession>> {
        self.sessions
            .iter()
            .filter_map(|entry| entry.value().active().cloned())
            .collect()
    }

    pub fn get_sessions_by_domain(&self, domain_uuid: &str) -> Vec<Arc<RealtimeSession>> {
        self.sessions
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .active()
                    .filter(|session| session.domain_uuid() == domain_uuid)
                    .cloned()
            })
            .collect()
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| entry.value().active().is_some())
            .count()
    }

    /// Removes every session, e.g. on process shutdown.
    pub async fn shutdown(&self) -> usize {
        let all: Vec<String> = self
            .get_all_sessions()
            .iter()
            .map(|session| session.call_uuid().to_string())
            .collect();
        let mut removed = 0;
        for call_uuid in all {
            if self.remove_session(&call_uuid).await {
                removed += 1;
            }
        }
        info!(removed, "all sessions closed");
        removed
    }
}

#[cfg(test)]
mod tests {
    use voxline_test_utils::{MockAudioChannel, MockConnector};

    use super::*;

    fn request(call_uuid: &str, domain_uuid: &str) -> SessionRequest {
        SessionRequest {
            call_uuid: call_uuid.into(),
            domain_uuid: domain_uuid.into(),
            caller_id: "5518997752222".into(),
            secretary_uuid: None,
        }
    }

    #[tokio::test]
    async fn failed_provider_connect_releases_reservation() {
        let connector = Arc::new(MockConnector::new());
        connector.set_failing(true);
        let settings = SessionSettings {
            max_sessions_per_domain: 1,
            ..SessionSettings::default()
        };
        let (manager, _events) = SessionManager::with_events(connector.clone(), settings);

        let err = manager
            .create_session(request("c1", "d1"), Arc::new(MockAudioChannel::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, VoxlineError::Provider { .. }));
        assert_eq!(manager.get_domain_session_count("d1"), 0);
        assert!(manager.get_session("c1").is_none());

        connector.set_failing(false);
        manager
            .create_session(request("c1", "d1"), Arc::new(MockAudioChannel::new()))
            .await
            .unwrap();
        assert_eq!(manager.get_domain_session_count("d1"), 1);
    }

    #[test]
    fn reservation_is_invisible_to_lookups() {
        let (manager, _events) = SessionManager::with_events(
            Arc::new(MockConnector::new()),
            SessionSettings::default(),
        );
        manager.reserve("c1", "d1").unwrap();
        assert_eq!(manager.get_domain_session_count("d1"), 1);
        assert!(manager.get_session("c1").is_none());
        assert!(matches!(
            manager.reserve("c1", "d1"),
            Err(VoxlineError::DuplicateSession { .. })
        ));
        manager.release("c1", "d1");
        assert_eq!(manager.get_domain_session_count("d1"), 0);
    }
}

// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock AI voice provider for deterministic session tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use voxline_core::traits::adapter::PluginAdapter;
use voxline_core::traits::provider::{ProviderConnection, ProviderConnector, ProviderSessionParams};
use voxline_core::types::{AdapterType, HealthStatus, ProviderEvent};
use voxline_core::VoxlineError;

/// One scripted provider connection.
///
/// Events are popped from a FIFO queue; `recv_event()` waits for more until
/// the connection is closed. Audio sent by the session is captured.
pub struct MockProvider {
    events: Mutex<VecDeque<ProviderEvent>>,
    received: Mutex<Vec<i16>>,
    notify: Notify,
    closed: AtomicBool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_events(Vec::new())
    }

    pub fn with_events(events: Vec<ProviderEvent>) -> Self {
        Self {
            events: Mutex::new(VecDeque::from(events)),
            received: Mutex::new(Vec::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub async fn push_event(&self, event: ProviderEvent) {
        self.events.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Every sample the session forwarded, concatenated.
    pub async fn received_audio(&self) -> Vec<i16> {
        self.received.lock().await.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderConnection for MockProvider {
    async fn send_audio(&self, samples: &[i16]) -> Result<(), VoxlineError> {
        if self.is_closed() {
            return Err(VoxlineError::Provider {
                message: "connection closed".to_string(),
                source: None,
            });
        }
        self.received.lock().await.extend_from_slice(samples);
        Ok(())
    }

    async fn recv_event(&self) -> Result<Option<ProviderEvent>, VoxlineError> {
        loop {
            if let Some(event) = self.events.lock().await.pop_front() {
                return Ok(Some(event));
            }
            if self.is_closed() {
                return Ok(None);
            }
            self.notify.notified().await;
        }
    }

    async fn close(&self) -> Result<(), VoxlineError> {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
        Ok(())
    }
}

/// Opens [`MockProvider`] connections and keeps a handle to each one.
pub struct MockConnector {
    script: Vec<ProviderEvent>,
    connections: Mutex<Vec<(ProviderSessionParams, Arc<MockProvider>)>>,
    fail: AtomicBool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::with_script(Vec::new())
    }

    /// Every new connection starts with these events queued.
    pub fn with_script(script: Vec<ProviderEvent>) -> Self {
        Self {
            script,
            connections: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// Make subsequent `connect()` calls fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// The connection opened for `call_uuid`, if any.
    pub async fn connection(&self, call_uuid: &str) -> Option<Arc<MockProvider>> {
        self.connections
            .lock()
            .await
            .iter()
            .find(|(params, _)| params.call_uuid == call_uuid)
            .map(|(_, conn)| Arc::clone(conn))
    }

    pub async fn connect_count(&self) -> usize {
        self.connections.lock().await.len()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockConnector {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VoxlineError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderConnector for MockConnector {
    async fn connect(
        &self,
        params: &ProviderSessionParams,
    ) -> Result<Arc<dyn ProviderConnection>, VoxlineError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(VoxlineError::Provider {
                message: "mock connect refused".to_string(),
                source: None,
            });
        }
        let conn = Arc::new(MockProvider::with_events(self.script.clone()));
        self.connections
            .lock()
            .await
            .push((params.clone(), Arc::clone(&conn)));
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use voxline_core::types::TranscriptEntry;
    use voxline_core::TranscriptRole;

    use super::*;

    fn params(call_uuid: &str) -> ProviderSessionParams {
        ProviderSessionParams {
            call_uuid: call_uuid.to_string(),
            domain_uuid: "d1".to_string(),
            caller_id: "5518997752222".to_string(),
            secretary_uuid: None,
            input_rate: 24_000,
        }
    }

    #[tokio::test]
    async fn connector_hands_out_scripted_connections() {
        let connector = MockConnector::with_script(vec![ProviderEvent::Transcript(
            TranscriptEntry::new(TranscriptRole::Assistant, "Olá"),
        )]);
        let conn = connector.connect(&params("c1")).await.unwrap();
        assert!(matches!(
            conn.recv_event().await.unwrap(),
            Some(ProviderEvent::Transcript(_))
        ));
        conn.send_audio(&[1, 2]).await.unwrap();
        conn.close().await.unwrap();
        assert_eq!(conn.recv_event().await.unwrap(), None);

        let handle = connector.connection("c1").await.unwrap();
        assert_eq!(handle.received_audio().await, vec![1, 2]);
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn failing_connector() {
        let connector = MockConnector::new();
        connector.set_failing(true);
        assert!(connector.connect(&params("c1")).await.is_err());
        assert_eq!(connector.connect_count().await, 0);
    }
}

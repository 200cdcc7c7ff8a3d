// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock media stream for deterministic session tests.
//!
//! `MockAudioChannel` implements `AudioChannel` with injectable caller frames
//! and captured outbound frames.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use voxline_core::traits::adapter::PluginAdapter;
use voxline_core::traits::channel::AudioChannel;
use voxline_core::types::{AdapterType, HealthStatus};
use voxline_core::VoxlineError;

/// A mock caller leg.
///
/// - **inbound**: frames injected via `inject_frame()` are returned by `recv_frame()`
/// - **sent**: frames passed to `send_frame()` are captured for assertions
///
/// `hangup()` (or `close()`) ends the stream once queued frames are drained.
pub struct MockAudioChannel {
    inbound: Mutex<VecDeque<Vec<i16>>>,
    sent: Mutex<Vec<Vec<i16>>>,
    notify: Notify,
    closed: AtomicBool,
}

impl MockAudioChannel {
    pub fn new() -> Self {
        Self {
            inbound: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Queue a caller frame.
    pub async fn inject_frame(&self, samples: Vec<i16>) {
        self.inbound.lock().await.push_back(samples);
        self.notify.notify_one();
    }

    /// Simulate the caller hanging up.
    pub fn hangup(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Frames sent towards the caller, in order.
    pub async fn sent_frames(&self) -> Vec<Vec<i16>> {
        self.sent.lock().await.clone()
    }

    /// Every sample sent towards the caller, concatenated.
    pub async fn sent_samples(&self) -> Vec<i16> {
        self.sent.lock().await.concat()
    }
}

impl Default for MockAudioChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockAudioChannel {
    fn name(&self) -> &str {
        "mock-audio"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::AudioChannel
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VoxlineError> {
        self.hangup();
        Ok(())
    }
}

#[async_trait]
impl AudioChannel for MockAudioChannel {
    async fn recv_frame(&self) -> Result<Option<Vec<i16>>, VoxlineError> {
        loop {
            if let Some(frame) = self.inbound.lock().await.pop_front() {
                return Ok(Some(frame));
            }
            if self.is_closed() {
                return Ok(None);
            }
            self.notify.notified().await;
        }
    }

    async fn send_frame(&self, samples: &[i16]) -> Result<(), VoxlineError> {
        if self.is_closed() {
            return Err(VoxlineError::Channel {
                message: "channel closed".to_string(),
                source: None,
            });
        }
        self.sent.lock().await.push(samples.to_vec());
        Ok(())
    }

    async fn close(&self) -> Result<(), VoxlineError> {
        self.hangup();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_drain_before_hangup() {
        let channel = MockAudioChannel::new();
        channel.inject_frame(vec![1, 2, 3]).await;
        channel.hangup();
        assert_eq!(channel.recv_frame().await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(channel.recv_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn send_captures_and_fails_after_close() {
        let channel = MockAudioChannel::new();
        channel.send_frame(&[5, 6]).await.unwrap();
        assert_eq!(channel.sent_samples().await, vec![5, 6]);
        channel.close().await.unwrap();
        assert!(channel.send_frame(&[7]).await.is_err());
    }
}

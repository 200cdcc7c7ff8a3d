// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock switch for deterministic call-control tests.
//!
//! `MockSwitch` implements `SwitchControl` with scripted transfer replies,
//! an in-memory registration and channel table, and a log of every command
//! it received.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use voxline_core::traits::adapter::PluginAdapter;
use voxline_core::traits::switch::SwitchControl;
use voxline_core::types::{
    AdapterType, CommandAck, HealthStatus, OriginateOutcome, OriginateRequest,
};
use voxline_core::VoxlineError;

/// Scripted answer to a transfer command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchReply {
    /// `+OK`
    Accept,
    /// The switch answered but refused with this reply text.
    Refuse(String),
    /// The command could not be delivered.
    Fail(String),
}

/// A command received by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchCommand {
    Transfer {
        call_uuid: String,
        destination: String,
        context: String,
    },
    Broadcast {
        call_uuid: String,
        audio_path: String,
    },
    RegistrationCheck(String),
    ChannelCheck(String),
    Originate(OriginateRequest),
}

/// A mock telephony switch.
///
/// Transfer replies are popped from a FIFO queue; when it is empty every
/// transfer is accepted.
pub struct MockSwitch {
    transfer_replies: Mutex<VecDeque<SwitchReply>>,
    registered: Mutex<HashSet<String>>,
    in_call: Mutex<HashSet<String>>,
    originate_outcome: Mutex<Option<OriginateOutcome>>,
    commands: Mutex<Vec<SwitchCommand>>,
    healthy: AtomicBool,
}

impl MockSwitch {
    pub fn new() -> Self {
        Self {
            transfer_replies: Mutex::new(VecDeque::new()),
            registered: Mutex::new(HashSet::new()),
            in_call: Mutex::new(HashSet::new()),
            originate_outcome: Mutex::new(None),
            commands: Mutex::new(Vec::new()),
            healthy: AtomicBool::new(true),
        }
    }

    /// Queue the reply for the next transfer command.
    pub async fn push_transfer_reply(&self, reply: SwitchReply) {
        self.transfer_replies.lock().await.push_back(reply);
    }

    /// Mark an extension as registered.
    pub async fn register(&self, extension: &str) {
        self.registered.lock().await.insert(extension.to_string());
    }

    /// Mark an extension as being in an active call.
    pub async fn set_in_call(&self, extension: &str) {
        self.in_call.lock().await.insert(extension.to_string());
    }

    /// Override the reply to originate commands. Defaults to accepted with a
    /// generated job id.
    pub async fn set_originate_outcome(&self, outcome: OriginateOutcome) {
        *self.originate_outcome.lock().await = Some(outcome);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Every command received so far.
    pub async fn commands(&self) -> Vec<SwitchCommand> {
        self.commands.lock().await.clone()
    }

    /// Number of transfer commands received so far.
    pub async fn transfer_count(&self) -> usize {
        self.commands
            .lock()
            .await
            .iter()
            .filter(|c| matches!(c, SwitchCommand::Transfer { .. }))
            .count()
    }

    async fn record(&self, command: SwitchCommand) {
        self.commands.lock().await.push(command);
    }
}

impl Default for MockSwitch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockSwitch {
    fn name(&self) -> &str {
        "mock-switch"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Switch
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxlineError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy("mock switch down".to_string()))
        }
    }

    async fn shutdown(&self) -> Result<(), VoxlineError> {
        Ok(())
    }
}

#[async_trait]
impl SwitchControl for MockSwitch {
    async fn uuid_transfer(
        &self,
        call_uuid: &str,
        destination: &str,
        context: &str,
    ) -> Result<CommandAck, VoxlineError> {
        self.record(SwitchCommand::Transfer {
            call_uuid: call_uuid.to_string(),
            destination: destination.to_string(),
            context: context.to_string(),
        })
        .await;
        let reply = self
            .transfer_replies
            .lock()
            .await
            .pop_front()
            .unwrap_or(SwitchReply::Accept);
        match reply {
            SwitchReply::Accept => Ok(CommandAck::accepted("+OK")),
            SwitchReply::Refuse(reply) => Ok(CommandAck::refused(reply)),
            SwitchReply::Fail(message) => Err(VoxlineError::switch("uuid_transfer", message)),
        }
    }

    async fn uuid_broadcast(
        &self,
        call_uuid: &str,
        audio_path: &str,
    ) -> Result<CommandAck, VoxlineError> {
        self.record(SwitchCommand::Broadcast {
            call_uuid: call_uuid.to_string(),
            audio_path: audio_path.to_string(),
        })
        .await;
        Ok(CommandAck::accepted("+OK"))
    }

    async fn is_registered(&self, extension: &str) -> Result<bool, VoxlineError> {
        self.record(SwitchCommand::RegistrationCheck(extension.to_string()))
            .await;
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(VoxlineError::switch("sofia status", "mock switch down"));
        }
        Ok(self.registered.lock().await.contains(extension))
    }

    async fn has_active_call(&self, extension: &str) -> Result<bool, VoxlineError> {
        self.record(SwitchCommand::ChannelCheck(extension.to_string()))
            .await;
        Ok(self.in_call.lock().await.contains(extension))
    }

    async fn originate(
        &self,
        request: &OriginateRequest,
    ) -> Result<OriginateOutcome, VoxlineError> {
        self.record(SwitchCommand::Originate(request.clone())).await;
        let scripted = self.originate_outcome.lock().await.clone();
        Ok(scripted.unwrap_or_else(|| OriginateOutcome {
            accepted: true,
            call_uuid: Some(format!("job-{}", request.extension)),
            error: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transfer_replies_are_scripted_in_order() {
        let switch = MockSwitch::new();
        switch
            .push_transfer_reply(SwitchReply::Refuse("-ERR No such channel!".into()))
            .await;
        switch
            .push_transfer_reply(SwitchReply::Fail("socket closed".into()))
            .await;

        let refused = switch.uuid_transfer("c1", "1001", "default").await.unwrap();
        assert!(!refused.accepted);
        assert_eq!(refused.reply, "-ERR No such channel!");
        assert!(switch.uuid_transfer("c1", "1001", "default").await.is_err());
        // Queue drained: accept.
        assert!(switch.uuid_transfer("c1", "1001", "default").await.unwrap().accepted);
        assert_eq!(switch.transfer_count().await, 3);
    }

    #[tokio::test]
    async fn registration_and_channels() {
        let switch = MockSwitch::new();
        switch.register("1001").await;
        switch.set_in_call("1002").await;
        assert!(switch.is_registered("1001").await.unwrap());
        assert!(!switch.is_registered("1002").await.unwrap());
        assert!(switch.has_active_call("1002").await.unwrap());

        switch.set_healthy(false);
        assert!(switch.is_registered("1001").await.is_err());
        assert!(matches!(
            switch.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }
}

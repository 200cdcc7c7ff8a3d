// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock ticketing collaborator.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use voxline_core::traits::adapter::PluginAdapter;
use voxline_core::traits::ticket::TicketSink;
use voxline_core::types::{AdapterType, CallbackTicket, HealthStatus, TicketReceipt};
use voxline_core::VoxlineError;

/// Captures submitted tickets. Scripted failures are popped first; with
/// nothing scripted every submission is confirmed with an increasing id.
pub struct MockTicketSink {
    failures: Mutex<VecDeque<String>>,
    submitted: Mutex<Vec<CallbackTicket>>,
}

impl MockTicketSink {
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Make the next submission fail with `message`.
    pub async fn fail_next(&self, message: &str) {
        self.failures.lock().await.push_back(message.to_string());
    }

    pub async fn submitted(&self) -> Vec<CallbackTicket> {
        self.submitted.lock().await.clone()
    }
}

impl Default for MockTicketSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTicketSink {
    fn name(&self) -> &str {
        "mock-tickets"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::TicketSink
    }

    async fn health_check(&self) -> Result<HealthStatus, VoxlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VoxlineError> {
        Ok(())
    }
}

#[async_trait]
impl TicketSink for MockTicketSink {
    async fn submit(&self, ticket: &CallbackTicket) -> Result<TicketReceipt, VoxlineError> {
        if let Some(message) = self.failures.lock().await.pop_front() {
            return Err(VoxlineError::SubmissionFailed {
                message,
                source: None,
            });
        }
        let mut submitted = self.submitted.lock().await;
        submitted.push(ticket.clone());
        let id = submitted.len() as i64;
        Ok(TicketReceipt {
            ticket_id: Some(id),
            ticket_uuid: Some(format!("ticket-{id}")),
            whatsapp_sent: ticket.callback_notify_via_whatsapp,
        })
    }
}

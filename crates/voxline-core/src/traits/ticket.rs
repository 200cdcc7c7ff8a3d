// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticketing collaborator trait.

use async_trait::async_trait;

use crate::error::VoxlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CallbackTicket, TicketReceipt};

/// Persists callback tickets in the external ticketing system.
///
/// One submission is one attempt: implementations do not retry, and any
/// answer other than a confirmed write is reported as
/// [`VoxlineError::SubmissionFailed`].
#[async_trait]
pub trait TicketSink: PluginAdapter {
    async fn submit(&self, ticket: &CallbackTicket) -> Result<TicketReceipt, VoxlineError>;
}

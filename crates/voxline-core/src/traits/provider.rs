// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI voice provider connection traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::VoxlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ProviderEvent;

/// Per-call parameters handed to the provider when a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSessionParams {
    pub call_uuid: String,
    pub domain_uuid: String,
    pub caller_id: String,
    /// Secretary (assistant profile) serving this call, if known.
    pub secretary_uuid: Option<String>,
    /// Rate the provider expects for inbound audio.
    pub input_rate: u32,
}

/// A live bidirectional audio and event stream to the AI voice provider.
#[async_trait]
pub trait ProviderConnection: Send + Sync + 'static {
    /// Forwards caller audio at the provider's input rate.
    async fn send_audio(&self, samples: &[i16]) -> Result<(), VoxlineError>;

    /// Receives the next provider event. `Ok(None)` means the stream closed.
    async fn recv_event(&self) -> Result<Option<ProviderEvent>, VoxlineError>;

    /// Closes the connection and unblocks any pending `recv_event`.
    async fn close(&self) -> Result<(), VoxlineError>;
}

/// Opens provider connections for new sessions.
#[async_trait]
pub trait ProviderConnector: PluginAdapter {
    async fn connect(
        &self,
        params: &ProviderSessionParams,
    ) -> Result<Arc<dyn ProviderConnection>, VoxlineError>;
}

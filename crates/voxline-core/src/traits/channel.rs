// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telephony audio channel trait (the switch's media stream for one call).

use async_trait::async_trait;

use crate::error::VoxlineError;
use crate::traits::adapter::PluginAdapter;

/// Bidirectional PCM16 audio stream between the switch and one session.
///
/// Samples are mono, at the switch's fixed rate.
#[async_trait]
pub trait AudioChannel: PluginAdapter {
    /// Receives the next frame from the caller. `Ok(None)` means hangup.
    async fn recv_frame(&self) -> Result<Option<Vec<i16>>, VoxlineError>;

    /// Sends a frame of audio to the caller.
    async fn send_frame(&self, samples: &[i16]) -> Result<(), VoxlineError>;

    /// Closes the stream. Subsequent receives return `Ok(None)`.
    async fn close(&self) -> Result<(), VoxlineError>;
}

// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telephony switch control trait (FreeSWITCH Event Socket and test doubles).

use async_trait::async_trait;

use crate::error::VoxlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CommandAck, OriginateOutcome, OriginateRequest};

/// Call-control commands issued against the telephony switch.
///
/// Each method is one request/response round-trip with no built-in retry.
/// An `Ok` ack with `accepted == false` means the switch answered but
/// refused, and carries its reply text; `Err` means the command could not be
/// delivered or the reply could not be read.
#[async_trait]
pub trait SwitchControl: PluginAdapter {
    /// Transfers `call_uuid` to `destination` within the dialplan `context`.
    async fn uuid_transfer(
        &self,
        call_uuid: &str,
        destination: &str,
        context: &str,
    ) -> Result<CommandAck, VoxlineError>;

    /// Plays `audio_path` to the caller leg of `call_uuid`.
    async fn uuid_broadcast(
        &self,
        call_uuid: &str,
        audio_path: &str,
    ) -> Result<CommandAck, VoxlineError>;

    /// Whether `extension` currently has a SIP registration.
    async fn is_registered(&self, extension: &str) -> Result<bool, VoxlineError>;

    /// Whether `extension` appears in the switch's active channel listing.
    async fn has_active_call(&self, extension: &str) -> Result<bool, VoxlineError>;

    /// Rings an extension and bridges it to an external client number.
    async fn originate(&self, request: &OriginateRequest)
    -> Result<OriginateOutcome, VoxlineError>;
}

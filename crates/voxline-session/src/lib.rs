// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime call sessions for Voxline.
//!
//! A session bridges one call's switch audio stream to an AI voice provider
//! connection, converting sample rates in both directions and surfacing the
//! provider's transfer and callback requests as [`SessionEvent`]s. The
//! [`SessionManager`] registers sessions per call and enforces the
//! per-tenant session limit.

pub mod buffer;
pub mod event;
pub mod manager;
pub mod pcm;
pub mod relay;
pub mod resampler;
pub mod session;
pub mod sweeper;

pub use buffer::{AudioBuffer, FrameAssembler, ResamplerPair};
pub use event::{CallRef, EndReason, SessionEvent, SessionSummary};
pub use manager::{SessionManager, SessionRequest, SessionSettings};
pub use pcm::{decode_pcm16le, encode_pcm16le};
pub use relay::{RelayConnection, RelayProvider};
pub use resampler::Resampler;
pub use session::{AudioSettings, RealtimeSession};
pub use sweeper::spawn_sweeper;

// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface of the Voxline call orchestration core.
//!
//! Serves the callback originate and availability API, health and metrics
//! endpoints, and the WebSocket the switch streams call audio into. Each
//! audio-stream socket becomes the [`voxline_core::AudioChannel`] of one
//! realtime session.

pub mod handlers;
pub mod server;
pub mod stream;
pub mod validation;

pub use server::{GatewaySettings, GatewayState, HealthState, router, start_server};
pub use stream::{StreamMetadata, WsAudioChannel};

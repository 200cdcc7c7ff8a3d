// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Voxline integration tests.
//!
//! Provides scripted doubles for every collaborator seam so the transfer,
//! callback and session flows run without a switch, a media socket or a
//! provider.
//!
//! # Components
//!
//! - [`MockSwitch`] - call-control commands with scripted replies and a command log
//! - [`MockAudioChannel`] - injectable caller audio, captured outbound audio
//! - [`MockProvider`] / [`MockConnector`] - scripted provider events, captured audio
//! - [`MockTicketSink`] - scripted ticket confirmations
//! - [`fixtures`] - a sample tenant with destinations and a time condition

pub mod fixtures;
pub mod mock_channel;
pub mod mock_provider;
pub mod mock_switch;
pub mod mock_ticket;

pub use mock_channel::MockAudioChannel;
pub use mock_provider::{MockConnector, MockProvider};
pub use mock_switch::{MockSwitch, SwitchCommand, SwitchReply};
pub use mock_ticket::MockTicketSink;

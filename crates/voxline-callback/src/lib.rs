// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callback requests for Voxline.
//!
//! When nobody can take the call, [`CallbackHandler`] captures who should
//! be called back, by whom and why, then hands a ticket to a
//! [`TicketSink`](voxline_core::TicketSink) such as [`HttpTicketSink`].

pub mod handler;
pub mod sink;
pub mod status;

pub use handler::{
    CallbackData, CallbackEvent, CallbackHandler, CallbackSettings, CallbackState,
    MAX_SCHEDULE_AHEAD_DAYS, VoiceCallData,
};
pub use sink::HttpTicketSink;
pub use status::{CallbackStatus, needs_review};

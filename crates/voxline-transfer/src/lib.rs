// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call transfers for Voxline.
//!
//! [`TransferHandler`] resolves what the caller asked for into a dialplan
//! target, gates it on the destination's working hours, issues the
//! transfer against the switch and records every attempt in a bounded
//! per-tenant log.

pub mod dialplan;
pub mod handler;
pub mod log;

pub use dialplan::{DialplanRules, ResolvedDestination};
pub use handler::{
    OUTSIDE_WORKING_HOURS, TransferFailure, TransferHandler, TransferKind, TransferResult,
    TransferState,
};
pub use log::{TransferLog, TransferLogEntry};

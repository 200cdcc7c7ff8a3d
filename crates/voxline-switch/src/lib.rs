// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! FreeSWITCH Event Socket adapter for Voxline.
//!
//! [`EslClient`] implements [`voxline_core::SwitchControl`] over an inbound
//! Event Socket connection: transfer, broadcast, registration and channel
//! checks, and agent-first callback originates.

pub mod availability;
pub mod client;
pub mod commands;
pub mod protocol;

pub use availability::{Availability, ExtensionStatus, check_availability};
pub use client::{EslClient, EslConfig};

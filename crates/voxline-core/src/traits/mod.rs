// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the switch, media, provider and ticketing seams.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod channel;
pub mod provider;
pub mod switch;
pub mod ticket;

pub use adapter::PluginAdapter;
pub use channel::AudioChannel;
pub use provider::{ProviderConnection, ProviderConnector, ProviderSessionParams};
pub use switch::SwitchControl;
pub use ticket::TicketSink;

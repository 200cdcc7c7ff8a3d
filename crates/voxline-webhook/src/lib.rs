// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound webhooks for finished conversations and transfer requests.
//!
//! Delivery is at-most-once and never fails the caller: a webhook that
//! cannot be delivered is logged and reported as
//! [`DeliveryOutcome::Failed`].

pub mod notifier;
pub mod payload;

pub use notifier::{DeliveryOutcome, WebhookNotifier};
pub use payload::{ActionType, WebhookAction, WebhookEvent, WebhookPayload};

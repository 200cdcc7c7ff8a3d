// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric descriptions.
//!
//! The metrics themselves are recorded at their call sites through the
//! metrics-rs facade, so any recorder can collect them.

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

/// Every metric Voxline records.
pub const METRIC_NAMES: &[&str] = &[
    "voxline_active_sessions",
    "voxline_sessions_rejected_total",
    "voxline_transfers_total",
    "voxline_transfer_latency_seconds",
    "voxline_callbacks_total",
    "voxline_webhook_deliveries_total",
    "voxline_originates_total",
];

/// Register all Voxline metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_gauge!("voxline_active_sessions", "Realtime sessions currently bridged");
    describe_counter!(
        "voxline_sessions_rejected_total",
        "Session creations refused, by reason (capacity, duplicate, provider)"
    );
    describe_counter!(
        "voxline_transfers_total",
        "Transfer attempts, by outcome"
    );
    describe_histogram!(
        "voxline_transfer_latency_seconds",
        Unit::Seconds,
        "Time from transfer request to switch acknowledgement"
    );
    describe_counter!(
        "voxline_callbacks_total",
        "Callback ticket submissions, by outcome"
    );
    describe_counter!(
        "voxline_webhook_deliveries_total",
        "Webhook deliveries, by outcome"
    );
    describe_counter!(
        "voxline_originates_total",
        "Callback originate requests, by outcome"
    );
}

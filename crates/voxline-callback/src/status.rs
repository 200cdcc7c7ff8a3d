// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket-side lifecycle of a callback, as tracked by the ticketing system
//! and its monitoring loop.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CallbackStatus {
    /// Waiting for the agent to be notified.
    #[default]
    Pending,
    Notified,
    ReadyToCall,
    InProgress,
    Completed,
    /// No agent picked it up before `expires_at`.
    Expired,
    /// The client withdrew the request.
    Canceled,
    Failed,
    /// Too many notifications went unanswered.
    NeedsReview,
}

impl CallbackStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CallbackStatus::Completed
                | CallbackStatus::Expired
                | CallbackStatus::Canceled
                | CallbackStatus::Failed
        )
    }

    /// Status after another unanswered notification. Open callbacks move to
    /// `needs_review` once `notification_count` reaches `max_notifications`.
    pub fn after_notification(self, notification_count: u32, max_notifications: u32) -> Self {
        if self.is_terminal() || self == CallbackStatus::InProgress {
            return self;
        }
        if needs_review(notification_count, max_notifications) {
            CallbackStatus::NeedsReview
        } else {
            CallbackStatus::Notified
        }
    }
}

/// Whether an open callback should be escalated to manual review.
pub fn needs_review(notification_count: u32, max_notifications: u32) -> bool {
    max_notifications > 0 && notification_count >= max_notifications
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn wire_names() {
        assert_eq!(CallbackStatus::ReadyToCall.to_string(), "ready_to_call");
        assert_eq!(
            CallbackStatus::from_str("needs_review").unwrap(),
            CallbackStatus::NeedsReview
        );
        assert_eq!(CallbackStatus::default(), CallbackStatus::Pending);
    }

    #[test]
    fn escalation_threshold() {
        assert!(!needs_review(2, 3));
        assert!(needs_review(3, 3));
        assert!(!needs_review(10, 0));

        assert_eq!(
            CallbackStatus::Pending.after_notification(1, 3),
            CallbackStatus::Notified
        );
        assert_eq!(
            CallbackStatus::Notified.after_notification(3, 3),
            CallbackStatus::NeedsReview
        );
        assert_eq!(
            CallbackStatus::Completed.after_notification(9, 3),
            CallbackStatus::Completed
        );
    }
}

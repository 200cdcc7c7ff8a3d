// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destination routing for Voxline.
//!
//! Phone number rules, caller reply classification, destination matching
//! with a cached per-tenant loader, and business-hours evaluation against
//! named weekly schedules. The matching and evaluation functions are pure;
//! the loader and checker add caching on top of the tenant stores.

pub mod analyzer;
mod cache;
pub mod loader;
pub mod matching;
pub mod phone;
pub mod schedule;
pub mod store;
pub mod time_condition;

pub use analyzer::ResponseAnalyzer;
pub use loader::DestinationLoader;
pub use matching::{find_by_alias, get_default, is_within_working_hours};
pub use phone::{PhoneRules, infer_destination_type, wants_same_number};
pub use schedule::{ScheduleError, TimeSlot, WeeklySchedule};
pub use store::{DestinationStore, StaticStore, TimeConditionStore};
pub use time_condition::{
    TimeConditionChecker, TimeConditionConfig, TimeConditionResult, TimeConditionStatus,
};

use voxline_config::ConfigError;
use voxline_config::model::VoxlineConfig;

/// Parses every configured schedule and holiday, collecting the failures.
pub fn check_time_conditions(config: &VoxlineConfig) -> Vec<ConfigError> {
    let mut problems = Vec::new();
    for (i, domain) in config.domains.iter().enumerate() {
        for (j, entry) in domain.time_conditions.iter().enumerate() {
            if let Err(e) =
                TimeConditionConfig::from_entry(entry, &config.service.default_timezone)
            {
                problems.push(ConfigError::invalid_schedule(
                    format!("domains[{i}].time_conditions[{j}].schedule"),
                    entry.schedule.clone(),
                    e.to_string(),
                ));
            }
        }
    }
    problems
}

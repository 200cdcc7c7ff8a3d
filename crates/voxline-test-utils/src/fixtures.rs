// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A sample tenant shared by integration tests.

use std::sync::Arc;
use std::time::Duration;

use voxline_core::types::WorkingHours;
use voxline_core::{DestinationType, TransferDestination};
use voxline_routing::{
    DestinationLoader, StaticStore, TimeConditionChecker, TimeConditionConfig, WeeklySchedule,
};

pub const DOMAIN: &str = "acme-domain";
pub const TIMEZONE: &str = "America/Sao_Paulo";
pub const BUSINESS_HOURS: &str = "horario-comercial";

/// Destinations of the sample tenant:
///
/// - `Jeni` extension 1001 (aliases jeni, jennifer, financeiro), priority 10
/// - `Suporte` queue 5001 (department Suporte), flagged default
/// - `Diretoria` ring group 6000, working hours set but no window open (always closed)
/// - `Ramal Antigo` extension 1099, disabled
pub fn destinations() -> Vec<TransferDestination> {
    vec![
        TransferDestination::new("dest-jeni", "Jeni", DestinationType::Extension, "1001")
            .with_aliases(["jeni", "jennifer", "financeiro"])
            .with_department("Financeiro")
            .with_priority(10)
            .with_max_retries(2),
        TransferDestination::new("dest-suporte", "Suporte", DestinationType::Queue, "5001")
            .with_department("Suporte")
            .as_default(),
        TransferDestination::new("dest-diretoria", "Diretoria", DestinationType::RingGroup, "6000")
            .with_aliases(["diretoria", "diretor"])
            .with_working_hours(WorkingHours::new()),
        TransferDestination::new("dest-antigo", "Ramal Antigo", DestinationType::Extension, "1099")
            .with_aliases(["jeni"])
            .with_priority(99)
            .disabled(),
    ]
}

/// Mon-Fri 08:00-12:00 and 13:00-18:00.
pub fn business_hours() -> TimeConditionConfig {
    let schedule = WeeklySchedule::preset("comercial").unwrap_or_default();
    TimeConditionConfig::new(BUSINESS_HOURS, "Horário Comercial", TIMEZONE, schedule)
}

pub fn store() -> Arc<StaticStore> {
    Arc::new(
        StaticStore::default()
            .with_destinations(DOMAIN, destinations())
            .with_timezone(DOMAIN, TIMEZONE)
            .with_time_condition(DOMAIN, business_hours()),
    )
}

pub fn loader() -> Arc<DestinationLoader> {
    Arc::new(DestinationLoader::new(
        store(),
        Duration::from_secs(300),
        TIMEZONE,
    ))
}

pub fn checker() -> Arc<TimeConditionChecker> {
    Arc::new(TimeConditionChecker::new(store(), Duration::from_secs(300)))
}

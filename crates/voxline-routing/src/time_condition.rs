// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Business-hours evaluation against a tenant's named weekly schedules.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use voxline_config::model::TimeConditionEntry;
use voxline_core::VoxlineError;

use crate::cache::TtlCache;
use crate::schedule::{ScheduleError, TimeSlot, WeeklySchedule};
use crate::store::TimeConditionStore;

/// How many days ahead the next opening is searched for, today included.
const NEXT_OPEN_SEARCH_DAYS: u64 = 8;

const WEEKDAY_NAMES_PT: [&str; 7] = [
    "segunda-feira",
    "terça-feira",
    "quarta-feira",
    "quinta-feira",
    "sexta-feira",
    "sábado",
    "domingo",
];

/// A closed calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: Option<String>,
}

/// A parsed, ready-to-evaluate time condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeConditionConfig {
    pub uuid: String,
    pub name: String,
    /// IANA identifier. Resolved at evaluation time.
    pub timezone: String,
    pub schedule: WeeklySchedule,
    pub holidays: Vec<Holiday>,
    pub enabled: bool,
}

impl TimeConditionConfig {
    pub fn new(
        uuid: impl Into<String>,
        name: impl Into<String>,
        timezone: impl Into<String>,
        schedule: WeeklySchedule,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            timezone: timezone.into(),
            schedule,
            holidays: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_holiday(mut self, date: NaiveDate, name: Option<&str>) -> Self {
        self.holidays.push(Holiday {
            date,
            name: name.map(str::to_string),
        });
        self
    }

    /// Builds from a configuration entry; `fallback_timezone` applies when
    /// the entry names none.
    pub fn from_entry(
        entry: &TimeConditionEntry,
        fallback_timezone: &str,
    ) -> Result<Self, ScheduleError> {
        let holidays = entry
            .holidays
            .iter()
            .map(|h| {
                NaiveDate::parse_from_str(h.date.trim(), "%Y-%m-%d")
                    .map(|date| Holiday {
                        date,
                        name: h.name.clone(),
                    })
                    .map_err(|_| ScheduleError::InvalidDate(h.date.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            uuid: entry.uuid.clone(),
            name: entry.name.clone(),
            timezone: entry
                .timezone
                .clone()
                .unwrap_or_else(|| fallback_timezone.to_string()),
            schedule: WeeklySchedule::parse(&entry.schedule)?,
            holidays,
            enabled: entry.enabled,
        })
    }

    fn holiday_on(&self, date: NaiveDate) -> Option<&Holiday> {
        self.holidays.iter().find(|h| h.date == date)
    }
}

/// Outcome class of a business-hours check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeConditionStatus {
    WithinHours,
    OutsideHours,
    NoScheduleDefined,
    TimezoneError,
}

impl fmt::Display for TimeConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeConditionStatus::WithinHours => write!(f, "within_hours"),
            TimeConditionStatus::OutsideHours => write!(f, "outside_hours"),
            TimeConditionStatus::NoScheduleDefined => write!(f, "no_schedule_defined"),
            TimeConditionStatus::TimezoneError => write!(f, "timezone_error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeConditionResult {
    pub status: TimeConditionStatus,
    pub matched_slot: Option<TimeSlot>,
    /// Set when the day is closed for a holiday.
    pub holiday: Option<Holiday>,
    /// Next slot start in the schedule's timezone, for closed results.
    pub next_open: Option<DateTime<Tz>>,
    pub condition_name: Option<String>,
    /// Caller-facing sentence (Portuguese).
    pub message: String,
}

impl TimeConditionResult {
    fn unrestricted(message: impl Into<String>, condition_name: Option<String>) -> Self {
        Self {
            status: TimeConditionStatus::NoScheduleDefined,
            matched_slot: None,
            holiday: None,
            next_open: None,
            condition_name,
            message: message.into(),
        }
    }

    /// True unless the schedule positively says closed. Timezone failures
    /// do not gate.
    pub fn is_open(&self) -> bool {
        self.status != TimeConditionStatus::OutsideHours
    }

    /// Closed calls are offered a callback instead of a transfer.
    pub fn should_offer_callback(&self) -> bool {
        self.status == TimeConditionStatus::OutsideHours
    }
}

/// Evaluates `config` at instant `at`.
pub fn evaluate(config: &TimeConditionConfig, at: DateTime<Utc>) -> TimeConditionResult {
    let name = Some(config.name.clone());
    if !config.enabled {
        return TimeConditionResult::unrestricted(
            format!("Condição '{}' desabilitada.", config.name),
            name,
        );
    }
    if config.schedule.is_empty() {
        return TimeConditionResult::unrestricted("Sem restrição de horário configurada.", name);
    }

    let tz: Tz = match config.timezone.parse() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(
                time_condition = %config.uuid,
                timezone = %config.timezone,
                "unknown timezone, business hours cannot be determined"
            );
            return TimeConditionResult {
                status: TimeConditionStatus::TimezoneError,
                matched_slot: None,
                holiday: None,
                next_open: None,
                condition_name: name,
                message: format!("Fuso horário desconhecido: {}", config.timezone),
            };
        }
    };
    let local = at.with_timezone(&tz);

    if let Some(holiday) = config.holiday_on(local.date_naive()) {
        let next_open = next_open(config, &local);
        return TimeConditionResult {
            status: TimeConditionStatus::OutsideHours,
            matched_slot: None,
            holiday: Some(holiday.clone()),
            message: closed_message(&local, next_open.as_ref(), true),
            next_open,
            condition_name: name,
        };
    }

    let day = config.schedule.day(local.weekday());
    if let Some(slot) = day.matching_slot(local.time()) {
        return TimeConditionResult {
            status: TimeConditionStatus::WithinHours,
            matched_slot: Some(*slot),
            holiday: None,
            next_open: None,
            condition_name: name,
            message: "Dentro do horário de atendimento.".to_string(),
        };
    }

    let next_open = next_open(config, &local);
    TimeConditionResult {
        status: TimeConditionStatus::OutsideHours,
        matched_slot: None,
        holiday: None,
        message: closed_message(&local, next_open.as_ref(), false),
        next_open,
        condition_name: name,
    }
}

/// Next slot start strictly after `local`, skipping holidays.
pub fn next_open(config: &TimeConditionConfig, local: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let tz = local.timezone();
    let today = local.date_naive();
    (0..NEXT_OPEN_SEARCH_DAYS)
        .filter_map(|ahead| today.checked_add_days(Days::new(ahead)))
        .filter(|date| config.holiday_on(*date).is_none())
        .flat_map(|date| {
            config
                .schedule
                .day(date.weekday())
                .slots()
                .iter()
                .map(move |slot| date.and_time(slot.start()))
        })
        .filter_map(|naive| tz.from_local_datetime(&naive).earliest())
        .find(|candidate| candidate > local)
}

fn closed_message(local: &DateTime<Tz>, next_open: Option<&DateTime<Tz>>, holiday: bool) -> String {
    let base = if holiday {
        "Estamos em feriado."
    } else {
        "Estamos fora do horário de atendimento."
    };
    let Some(next) = next_open else {
        return base.to_string();
    };
    let time = next.format("%H:%M");
    let days_ahead = (next.date_naive() - local.date_naive()).num_days();
    match days_ahead {
        0 => format!("{base} Retornaremos às {time}."),
        1 => format!("{base} Retornaremos amanhã às {time}."),
        _ => {
            let day = WEEKDAY_NAMES_PT[next.weekday().num_days_from_monday() as usize];
            format!("{base} Retornaremos na {day} às {time}.")
        }
    }
}

/// Loads time conditions per tenant and evaluates them, caching loads.
pub struct TimeConditionChecker {
    store: Arc<dyn TimeConditionStore>,
    cache: TtlCache<Option<TimeConditionConfig>>,
}

impl TimeConditionChecker {
    pub fn new(store: Arc<dyn TimeConditionStore>, cache_ttl: Duration) -> Self {
        Self {
            store,
            cache: TtlCache::new(cache_ttl),
        }
    }

    /// Evaluates the condition now. No condition means no restriction.
    pub async fn check(
        &self,
        domain_uuid: &str,
        condition_uuid: Option<&str>,
    ) -> Result<TimeConditionResult, VoxlineError> {
        self.check_at(domain_uuid, condition_uuid, Utc::now()).await
    }

    pub async fn check_at(
        &self,
        domain_uuid: &str,
        condition_uuid: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<TimeConditionResult, VoxlineError> {
        let Some(condition_uuid) = condition_uuid.filter(|c| !c.trim().is_empty()) else {
            return Ok(TimeConditionResult::unrestricted(
                "Sem restrição de horário configurada.",
                None,
            ));
        };

        let key = format!("{domain_uuid}:{condition_uuid}");
        let config = match self.cache.get(&key) {
            Some(config) => config,
            None => {
                let loaded = self
                    .store
                    .time_condition(domain_uuid, condition_uuid)
                    .await?;
                self.cache.insert(key, loaded.clone());
                loaded
            }
        };

        let Some(config) = config else {
            tracing::warn!(
                domain_uuid,
                time_condition = condition_uuid,
                "time condition not found, treating as unrestricted"
            );
            return Ok(TimeConditionResult::unrestricted(
                "Condição de horário não encontrada.",
                None,
            ));
        };

        let result = evaluate(&config, at);
        tracing::debug!(
            domain_uuid,
            time_condition = condition_uuid,
            status = %result.status,
            "time condition evaluated"
        );
        Ok(result)
    }

    /// Drops cached conditions for one tenant.
    pub fn invalidate(&self, domain_uuid: &str) {
        self.cache.invalidate(domain_uuid);
    }

    pub fn invalidate_all(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comercial(tz: &str) -> TimeConditionConfig {
        TimeConditionConfig::new(
            "tc1",
            "Comercial",
            tz,
            WeeklySchedule::parse("0-4:08:00-12:00,13:00-18:00").unwrap(),
        )
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn within_hours_reports_matched_slot() {
        // Monday 10:00 in Sao Paulo (UTC-3).
        let result = evaluate(&comercial("America/Sao_Paulo"), utc("2026-01-05T13:00:00Z"));
        assert_eq!(result.status, TimeConditionStatus::WithinHours);
        assert_eq!(result.matched_slot.unwrap().to_string(), "08:00-12:00");
        assert!(result.is_open());
        assert!(!result.should_offer_callback());
    }

    #[test]
    fn timezone_shifts_the_weekday() {
        // Tuesday 02:00 UTC is still Monday 23:00 in Sao Paulo.
        let result = evaluate(&comercial("America/Sao_Paulo"), utc("2026-01-06T02:00:00Z"));
        assert_eq!(result.status, TimeConditionStatus::OutsideHours);
        let next = result.next_open.unwrap();
        assert_eq!(next.weekday(), chrono::Weekday::Tue);
        assert_eq!(next.format("%H:%M").to_string(), "08:00");
        assert!(result.message.contains("amanhã às 08:00"));
    }

    #[test]
    fn lunch_break_reopens_same_day() {
        let result = evaluate(&comercial("America/Sao_Paulo"), utc("2026-01-05T15:30:00Z"));
        assert_eq!(result.status, TimeConditionStatus::OutsideHours);
        assert!(result.message.ends_with("Retornaremos às 13:00."));
        assert!(result.should_offer_callback());
    }

    #[test]
    fn weekend_points_to_monday() {
        // Saturday noon.
        let result = evaluate(&comercial("UTC"), utc("2026-01-10T12:00:00Z"));
        assert_eq!(result.status, TimeConditionStatus::OutsideHours);
        assert_eq!(result.next_open.unwrap().weekday(), chrono::Weekday::Mon);
        assert!(result.message.contains("segunda-feira"));
    }

    #[test]
    fn holiday_forces_closed_and_is_reported() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let config = comercial("UTC").with_holiday(date, Some("Recesso"));
        let result = evaluate(&config, utc("2026-01-05T10:00:00Z"));
        assert_eq!(result.status, TimeConditionStatus::OutsideHours);
        assert_eq!(result.holiday.unwrap().name.as_deref(), Some("Recesso"));
        // The holiday itself is skipped when searching for the next opening.
        assert_eq!(result.next_open.unwrap().date_naive(), date.succ_opt().unwrap());
    }

    #[test]
    fn unknown_timezone_is_reported_not_defaulted() {
        let result = evaluate(&comercial("Mars/Olympus"), utc("2026-01-05T13:00:00Z"));
        assert_eq!(result.status, TimeConditionStatus::TimezoneError);
        assert!(result.is_open());
        assert!(result.matched_slot.is_none());
    }

    #[test]
    fn disabled_condition_is_unrestricted() {
        let mut config = comercial("UTC");
        config.enabled = false;
        let result = evaluate(&config, utc("2026-01-10T12:00:00Z"));
        assert_eq!(result.status, TimeConditionStatus::NoScheduleDefined);
    }

    #[test]
    fn status_display_is_snake_case() {
        assert_eq!(TimeConditionStatus::NoScheduleDefined.to_string(), "no_schedule_defined");
        assert_eq!(TimeConditionStatus::TimezoneError.to_string(), "timezone_error");
    }

    #[test]
    fn from_entry_falls_back_to_tenant_timezone() {
        let entry = TimeConditionEntry {
            uuid: "tc9".into(),
            name: "Plantão".into(),
            timezone: None,
            schedule: "24h".into(),
            holidays: vec![voxline_config::model::HolidayEntry {
                date: "2026-12-25".into(),
                name: Some("Natal".into()),
            }],
            enabled: true,
        };
        let config = TimeConditionConfig::from_entry(&entry, "America/Recife").unwrap();
        assert_eq!(config.timezone, "America/Recife");
        assert_eq!(config.holidays.len(), 1);

        let bad = TimeConditionEntry {
            schedule: "9:08:00-18:00".into(),
            ..entry
        };
        assert!(TimeConditionConfig::from_entry(&bad, "UTC").is_err());
    }
}

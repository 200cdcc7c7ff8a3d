// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weekly schedules: time slots, per-day slot lists and the schedule parser.
//!
//! Three textual forms are accepted:
//!
//! - presets: `24h` / `always`, `weekday`, `weekend`, `comercial` / `business`
//! - a JSON map keyed by day index (0 = Monday): `{"0": ["08:00-18:00"]}`
//! - compact text: `0-4:08:00-18:00;5:08:00-12:00`, several slots per day
//!   separated by commas (`1:08:00-12:00,13:00-18:00`)

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveTime, Timelike, Weekday};
use thiserror::Error;

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%H%M"];
const SECONDS_PER_DAY: u32 = 86_400;

/// Errors produced while parsing a schedule definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid time of day `{0}`")]
    InvalidTime(String),

    #[error("invalid time slot `{0}`, expected `HH:MM-HH:MM`")]
    InvalidSlot(String),

    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid day `{0}`, expected 0 (Monday) through 6 (Sunday)")]
    InvalidDay(String),

    #[error("slots {first} and {second} overlap on {day}")]
    Overlap {
        day: Weekday,
        first: String,
        second: String,
    },

    #[error("invalid JSON schedule: {0}")]
    Json(String),

    #[error("schedule defines no open slots")]
    Empty,
}

/// Parses `HH:MM:SS`, `HH:MM` or `HHMM`.
pub fn parse_time_of_day(text: &str) -> Result<NaiveTime, ScheduleError> {
    let text = text.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
        .ok_or_else(|| ScheduleError::InvalidTime(text.to_string()))
}

/// An inclusive time-of-day window. A slot whose end precedes its start
/// wraps past midnight (`22:00-06:00`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ScheduleError> {
        if start == end {
            return Err(ScheduleError::InvalidSlot(format!(
                "{}-{}",
                fmt_time(start),
                fmt_time(end)
            )));
        }
        Ok(Self { start, end })
    }

    /// Parses `start-end` using any accepted time format.
    pub fn parse(text: &str) -> Result<Self, ScheduleError> {
        let (start, end) = text
            .trim()
            .split_once('-')
            .ok_or_else(|| ScheduleError::InvalidSlot(text.trim().to_string()))?;
        Self::new(parse_time_of_day(start)?, parse_time_of_day(end)?)
    }

    /// The whole day, `00:00:00` through `23:59:59`.
    pub fn all_day() -> Self {
        Self {
            start: NaiveTime::default(),
            end: NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default(),
        }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }

    /// Inclusive at both ends.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.wraps_midnight() {
            time >= self.start || time <= self.end
        } else {
            self.start <= time && time <= self.end
        }
    }

    /// Second-of-day spans covered by this slot, split at midnight.
    fn spans(&self) -> Vec<(u32, u32)> {
        let start = self.start.num_seconds_from_midnight();
        let end = self.end.num_seconds_from_midnight();
        if self.wraps_midnight() {
            vec![(start, SECONDS_PER_DAY), (0, end)]
        } else {
            vec![(start, end)]
        }
    }

    fn overlaps(&self, other: &TimeSlot) -> bool {
        self.spans()
            .iter()
            .any(|a| other.spans().iter().any(|b| a.0 < b.1 && b.0 < a.1))
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", fmt_time(self.start), fmt_time(self.end))
    }
}

fn fmt_time(time: NaiveTime) -> String {
    if time.second() == 0 {
        time.format("%H:%M").to_string()
    } else {
        time.format("%H:%M:%S").to_string()
    }
}

/// Ordered, non-overlapping slots for one weekday.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaySchedule {
    slots: Vec<TimeSlot>,
}

impl DaySchedule {
    /// Sorts `slots` by start and rejects overlapping pairs.
    pub fn new(day: Weekday, mut slots: Vec<TimeSlot>) -> Result<Self, ScheduleError> {
        slots.sort_by_key(|slot| slot.start);
        for (i, first) in slots.iter().enumerate() {
            if let Some(second) = slots[i + 1..].iter().find(|s| first.overlaps(s)) {
                return Err(ScheduleError::Overlap {
                    day,
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
        }
        Ok(Self { slots })
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// First slot containing `time`, scanning in start order.
    pub fn matching_slot(&self, time: NaiveTime) -> Option<&TimeSlot> {
        self.slots.iter().find(|slot| slot.contains(time))
    }
}

/// Seven [`DaySchedule`]s, Monday first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklySchedule {
    days: [DaySchedule; 7],
}

impl WeeklySchedule {
    /// Parses a preset name, a JSON day map or the compact text form.
    pub fn parse(text: &str) -> Result<Self, ScheduleError> {
        let text = text.trim();
        if let Some(preset) = Self::preset(text) {
            return Ok(preset);
        }
        let schedule = if text.starts_with('{') {
            Self::parse_json(text)?
        } else {
            Self::parse_compact(text)?
        };
        if schedule.is_empty() {
            return Err(ScheduleError::Empty);
        }
        Ok(schedule)
    }

    /// Named presets. `comercial` is Monday-Friday 08-12 and 13-18.
    pub fn preset(name: &str) -> Option<Self> {
        let business = || TimeSlot::parse("08:00-18:00");
        let built = match name.trim().to_lowercase().as_str() {
            "24h" | "24x7" | "always" => {
                Self::with_days(0..7, || Ok(vec![TimeSlot::all_day()]))
            }
            "weekday" | "weekdays" => Self::with_days(0..5, || Ok(vec![business()?])),
            "weekend" => Self::with_days(5..7, || Ok(vec![business()?])),
            "comercial" | "business" => Self::with_days(0..5, || {
                Ok(vec![
                    TimeSlot::parse("08:00-12:00")?,
                    TimeSlot::parse("13:00-18:00")?,
                ])
            }),
            _ => return None,
        };
        built.ok()
    }

    fn with_days(
        days: std::ops::Range<usize>,
        slots: impl Fn() -> Result<Vec<TimeSlot>, ScheduleError>,
    ) -> Result<Self, ScheduleError> {
        let mut schedule = Self::default();
        for index in days {
            schedule.set_day(index, slots()?)?;
        }
        Ok(schedule)
    }

    fn parse_json(text: &str) -> Result<Self, ScheduleError> {
        let map: BTreeMap<String, Vec<String>> =
            serde_json::from_str(text).map_err(|e| ScheduleError::Json(e.to_string()))?;
        let mut schedule = Self::default();
        for (day, slots) in map {
            let index = parse_day_index(&day)?;
            let slots = slots
                .iter()
                .map(|slot| TimeSlot::parse(slot))
                .collect::<Result<Vec<_>, _>>()?;
            schedule.set_day(index, slots)?;
        }
        Ok(schedule)
    }

    fn parse_compact(text: &str) -> Result<Self, ScheduleError> {
        let mut schedule = Self::default();
        for part in text.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (days, times) = part
                .split_once(':')
                .ok_or_else(|| ScheduleError::InvalidSlot(part.to_string()))?;
            let slots = times
                .split(',')
                .filter(|t| !t.trim().is_empty())
                .map(TimeSlot::parse)
                .collect::<Result<Vec<_>, _>>()?;
            let range = match days.split_once('-') {
                Some((first, last)) => parse_day_index(first)?..=parse_day_index(last)?,
                None => {
                    let day = parse_day_index(days)?;
                    day..=day
                }
            };
            if range.is_empty() {
                return Err(ScheduleError::InvalidDay(days.to_string()));
            }
            for index in range {
                schedule.set_day(index, slots.clone())?;
            }
        }
        Ok(schedule)
    }

    /// Replaces the slots of `day`.
    pub fn with_day(mut self, day: Weekday, slots: Vec<TimeSlot>) -> Result<Self, ScheduleError> {
        self.set_day(day.num_days_from_monday() as usize, slots)?;
        Ok(self)
    }

    fn set_day(&mut self, index: usize, slots: Vec<TimeSlot>) -> Result<(), ScheduleError> {
        let weekday = weekday_from_index(index);
        self.days[index] = DaySchedule::new(weekday, slots)?;
        Ok(())
    }

    pub fn day(&self, day: Weekday) -> &DaySchedule {
        &self.days[day.num_days_from_monday() as usize]
    }

    /// True when no day has any slot.
    pub fn is_empty(&self) -> bool {
        self.days.iter().all(DaySchedule::is_empty)
    }

    /// Days with at least one slot, Monday first.
    pub fn open_days(&self) -> impl Iterator<Item = (Weekday, &DaySchedule)> {
        self.days
            .iter()
            .enumerate()
            .filter(|(_, day)| !day.is_empty())
            .map(|(i, day)| (weekday_from_index(i), day))
    }
}

fn parse_day_index(text: &str) -> Result<usize, ScheduleError> {
    text.trim()
        .parse::<usize>()
        .ok()
        .filter(|day| *day < 7)
        .ok_or_else(|| ScheduleError::InvalidDay(text.trim().to_string()))
}

fn weekday_from_index(index: usize) -> Weekday {
    // `index` is always < 7 here; `Weekday::try_from` takes a u8 and 0 is Monday.
    Weekday::try_from(index as u8).unwrap_or(Weekday::Mon)
}

/// Validates a schedule string, returning the parse error if any.
pub fn check_schedule(text: &str) -> Result<(), ScheduleError> {
    WeeklySchedule::parse(text).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn parses_all_time_formats() {
        assert_eq!(parse_time_of_day("08:30").unwrap(), t(8, 30));
        assert_eq!(parse_time_of_day(" 0830 ").unwrap(), t(8, 30));
        assert_eq!(
            parse_time_of_day("08:30:15").unwrap(),
            NaiveTime::from_hms_opt(8, 30, 15).unwrap()
        );
        assert!(parse_time_of_day("8h30").is_err());
        assert!(parse_time_of_day("25:00").is_err());
    }

    #[test]
    fn slot_containment_is_inclusive() {
        let slot = TimeSlot::parse("08:00-18:00").unwrap();
        assert!(slot.contains(t(8, 0)));
        assert!(slot.contains(t(18, 0)));
        assert!(!slot.contains(t(7, 59)));
        assert!(!slot.contains(t(18, 1)));
    }

    #[test]
    fn overnight_slot_wraps() {
        let slot = TimeSlot::parse("22:00-06:00").unwrap();
        assert!(slot.wraps_midnight());
        assert!(slot.contains(t(23, 0)));
        assert!(slot.contains(t(0, 0)));
        assert!(slot.contains(t(6, 0)));
        assert!(!slot.contains(t(12, 0)));
    }

    #[test]
    fn zero_length_slot_is_rejected() {
        assert!(matches!(
            TimeSlot::parse("08:00-08:00"),
            Err(ScheduleError::InvalidSlot(_))
        ));
    }

    #[test]
    fn compact_text_with_range_and_multiple_slots() {
        let schedule =
            WeeklySchedule::parse("0-4:08:00-12:00,13:00-18:00;5:08:00-12:00").unwrap();
        assert_eq!(schedule.day(Weekday::Mon).slots().len(), 2);
        assert_eq!(schedule.day(Weekday::Fri).slots().len(), 2);
        assert_eq!(schedule.day(Weekday::Sat).slots().len(), 1);
        assert!(schedule.day(Weekday::Sun).is_empty());
        assert_eq!(schedule.open_days().count(), 6);
    }

    #[test]
    fn json_map_form() {
        let schedule =
            WeeklySchedule::parse(r#"{"0": ["08:00-18:00"], "6": ["10:00-14:00"]}"#).unwrap();
        assert_eq!(schedule.day(Weekday::Mon).slots()[0].to_string(), "08:00-18:00");
        assert_eq!(schedule.day(Weekday::Sun).slots()[0].to_string(), "10:00-14:00");
        assert!(schedule.day(Weekday::Tue).is_empty());
    }

    #[test]
    fn presets() {
        let always = WeeklySchedule::parse("24h").unwrap();
        assert!(always.day(Weekday::Sun).matching_slot(t(3, 0)).is_some());

        let comercial = WeeklySchedule::parse("Comercial").unwrap();
        let monday = comercial.day(Weekday::Mon);
        assert!(monday.matching_slot(t(12, 30)).is_none());
        assert!(monday.matching_slot(t(14, 0)).is_some());
        assert!(comercial.day(Weekday::Sat).is_empty());

        let weekend = WeeklySchedule::parse("weekend").unwrap();
        assert!(weekend.day(Weekday::Mon).is_empty());
        assert!(!weekend.day(Weekday::Sat).is_empty());
    }

    #[test]
    fn overlapping_slots_are_rejected() {
        let err = WeeklySchedule::parse("0:08:00-12:00,11:00-14:00").unwrap_err();
        assert!(matches!(err, ScheduleError::Overlap { day: Weekday::Mon, .. }));

        let err = WeeklySchedule::parse("0:22:00-06:00,05:00-07:00").unwrap_err();
        assert!(matches!(err, ScheduleError::Overlap { .. }));
    }

    #[test]
    fn touching_slots_are_allowed() {
        assert!(WeeklySchedule::parse("0:08:00-12:00,12:00-18:00").is_ok());
    }

    #[test]
    fn slots_are_sorted_by_start() {
        let schedule = WeeklySchedule::parse("2:13:00-18:00,08:00-12:00").unwrap();
        let slots = schedule.day(Weekday::Wed).slots();
        assert_eq!(slots[0].start(), t(8, 0));
        assert_eq!(slots[1].start(), t(13, 0));
    }

    #[test]
    fn malformed_input_is_reported() {
        assert!(matches!(
            WeeklySchedule::parse("7:08:00-18:00"),
            Err(ScheduleError::InvalidDay(_))
        ));
        assert!(matches!(
            WeeklySchedule::parse("4-1:08:00-18:00"),
            Err(ScheduleError::InvalidDay(_))
        ));
        assert!(matches!(
            WeeklySchedule::parse("0:0800"),
            Err(ScheduleError::InvalidSlot(_))
        ));
        assert!(matches!(
            WeeklySchedule::parse("{not json"),
            Err(ScheduleError::Json(_))
        ));
        assert!(matches!(WeeklySchedule::parse(";"), Err(ScheduleError::Empty)));
    }
}

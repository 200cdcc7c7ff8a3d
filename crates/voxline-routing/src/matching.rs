// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure destination matching over an immutable destination list.
//!
//! Matching is tiered. A candidate's tier is the best way it matches the
//! query; the best tier wins, then the highest `priority`, then input order.

use chrono::{Datelike, NaiveDateTime};
use voxline_core::{DestinationType, TransferDestination};

use crate::schedule::TimeSlot;

/// Shortest query allowed to match an alias by containment.
const MIN_PARTIAL_QUERY_CHARS: usize = 3;

/// How a destination matched a query, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    AliasContains,
    Department,
    NameContains,
    ExactAlias,
}

/// Lowercases and strips Portuguese diacritics so `Recepção` matches `recepcao`.
pub fn fold_text(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Best tier at which `dest` matches an already-folded query.
pub fn match_tier(folded_query: &str, dest: &TransferDestination) -> Option<MatchTier> {
    if folded_query.is_empty() {
        return None;
    }
    let aliases: Vec<String> = dest.aliases.iter().map(|a| fold_text(a)).collect();

    if aliases.iter().any(|a| a == folded_query) {
        return Some(MatchTier::ExactAlias);
    }

    let name = fold_text(&dest.name);
    if !name.is_empty() && (name.contains(folded_query) || folded_query.contains(&name)) {
        return Some(MatchTier::NameContains);
    }

    let partial_allowed = folded_query.chars().count() >= MIN_PARTIAL_QUERY_CHARS;
    if let Some(department) = dest.department.as_deref().map(fold_text)
        && !department.is_empty()
        && (department == folded_query
            || folded_query.contains(&department)
            || (partial_allowed && department.contains(folded_query)))
    {
        return Some(MatchTier::Department);
    }

    if partial_allowed
        && aliases
            .iter()
            .filter(|a| !a.is_empty())
            .any(|a| a.contains(folded_query) || folded_query.contains(a.as_str()))
    {
        return Some(MatchTier::AliasContains);
    }

    None
}

/// Best enabled destination for a free-text query, or `None`.
///
/// Comparison goes through [`fold_text`], so it ignores case and Portuguese
/// accents: `Recepção` is an exact hit on the alias `recepcao`. Disabled
/// destinations never match. Ties on tier and priority keep the destination
/// that appears first.
pub fn find_by_alias<'a>(
    query: &str,
    destinations: &'a [TransferDestination],
) -> Option<&'a TransferDestination> {
    best_match(query, destinations.iter())
}

/// Like [`find_by_alias`], restricted to one destination type.
pub fn find_by_alias_of_type<'a>(
    query: &str,
    destinations: &'a [TransferDestination],
    destination_type: DestinationType,
) -> Option<&'a TransferDestination> {
    best_match(
        query,
        destinations
            .iter()
            .filter(|d| d.destination_type == destination_type),
    )
}

/// Enabled destination whose dialable number equals `number`.
pub fn find_by_number<'a>(
    number: &str,
    destinations: &'a [TransferDestination],
) -> Option<&'a TransferDestination> {
    let number = number.trim();
    destinations
        .iter()
        .find(|d| d.is_enabled && d.destination_number == number)
}

fn best_match<'a>(
    query: &str,
    candidates: impl Iterator<Item = &'a TransferDestination>,
) -> Option<&'a TransferDestination> {
    let folded = fold_text(query);
    let mut best: Option<(MatchTier, i32, &TransferDestination)> = None;
    for dest in candidates.filter(|d| d.is_enabled) {
        let Some(tier) = match_tier(&folded, dest) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((best_tier, best_priority, _)) => (tier, dest.priority) > (best_tier, best_priority),
        };
        if better {
            best = Some((tier, dest.priority, dest));
        }
    }
    best.map(|(_, _, dest)| dest)
}

/// The destination flagged `is_default`, else the first enabled one.
///
/// Only enabled destinations are considered. When several are flagged the
/// first flagged one wins.
pub fn get_default(destinations: &[TransferDestination]) -> Option<&TransferDestination> {
    destinations
        .iter()
        .find(|d| d.is_enabled && d.is_default)
        .or_else(|| destinations.iter().find(|d| d.is_enabled))
}

/// Whether `now_local` falls in the destination's working hours.
///
/// Unset hours mean always available. A day missing from the map is closed,
/// and so is a day whose windows cannot be parsed.
pub fn is_within_working_hours(dest: &TransferDestination, now_local: NaiveDateTime) -> bool {
    let Some(hours) = &dest.working_hours else {
        return true;
    };
    let time = now_local.time();
    hours
        .ranges_for(now_local.weekday())
        .into_iter()
        .filter_map(|range| {
            match TimeSlot::parse(&format!("{}-{}", range.start, range.end)) {
                Ok(slot) => Some(slot),
                Err(e) => {
                    tracing::warn!(
                        destination = %dest.uuid,
                        error = %e,
                        "ignoring malformed working hours window"
                    );
                    None
                }
            }
        })
        .any(|slot| slot.contains(time))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Weekday};
    use voxline_core::types::WorkingHours;

    use super::*;

    fn dest(uuid: &str, name: &str) -> TransferDestination {
        TransferDestination::new(uuid, name, DestinationType::Extension, "1000")
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn fold_text_strips_accents_and_case() {
        assert_eq!(fold_text("  Recepção "), "recepcao");
        assert_eq!(fold_text("JOÃO"), "joao");
    }

    #[test]
    fn exact_alias_beats_name_substring_regardless_of_priority() {
        let destinations = vec![
            dest("a", "Suporte Técnico").with_priority(100),
            dest("b", "Helpdesk").with_aliases(["suporte"]),
        ];
        assert_eq!(find_by_alias("Suporte", &destinations).unwrap().uuid, "b");
    }

    #[test]
    fn name_substring_beats_department() {
        let destinations = vec![
            dest("a", "Ana").with_department("Financeiro").with_priority(9),
            dest("b", "Financeiro Geral"),
        ];
        assert_eq!(find_by_alias("financeiro", &destinations).unwrap().uuid, "b");
    }

    #[test]
    fn priority_breaks_ties_within_a_tier() {
        let destinations = vec![
            dest("a", "Vendas 1").with_aliases(["vendas"]).with_priority(1),
            dest("b", "Vendas 2").with_aliases(["vendas"]).with_priority(5),
        ];
        assert_eq!(find_by_alias("vendas", &destinations).unwrap().uuid, "b");
    }

    #[test]
    fn first_seen_wins_on_full_tie() {
        let destinations = vec![
            dest("a", "Vendas 1").with_aliases(["vendas"]),
            dest("b", "Vendas 2").with_aliases(["vendas"]),
        ];
        assert_eq!(find_by_alias("VENDAS", &destinations).unwrap().uuid, "a");
    }

    #[test]
    fn disabled_destinations_never_match() {
        let destinations = vec![dest("a", "Jeni").with_aliases(["jeni"]).disabled()];
        assert!(find_by_alias("jeni", &destinations).is_none());
    }

    #[test]
    fn alias_containment_needs_three_chars() {
        let destinations = vec![dest("a", "Maria").with_aliases(["financeiro"])];
        assert_eq!(find_by_alias("finan", &destinations).unwrap().uuid, "a");
        assert!(find_by_alias("fi", &destinations).is_none());
    }

    #[test]
    fn unmatched_query_returns_none() {
        let destinations = vec![dest("a", "Maria").with_aliases(["financeiro"])];
        assert!(find_by_alias("departamento_inexistente", &destinations).is_none());
        assert!(find_by_alias("", &destinations).is_none());
    }

    #[test]
    fn typed_lookup_filters_by_type() {
        let queue = TransferDestination::new("q", "Suporte", DestinationType::Queue, "5001");
        let destinations = vec![dest("e", "Suporte"), queue];
        let found = find_by_alias_of_type("suporte", &destinations, DestinationType::Queue);
        assert_eq!(found.unwrap().uuid, "q");
    }

    #[test]
    fn default_prefers_flagged_then_first_enabled() {
        let destinations = vec![
            dest("a", "A").disabled(),
            dest("b", "B"),
            dest("c", "C").as_default(),
        ];
        assert_eq!(get_default(&destinations).unwrap().uuid, "c");

        let destinations = vec![dest("a", "A").disabled(), dest("b", "B"), dest("c", "C")];
        assert_eq!(get_default(&destinations).unwrap().uuid, "b");

        let destinations = vec![dest("a", "A").as_default().disabled(), dest("b", "B")];
        assert_eq!(get_default(&destinations).unwrap().uuid, "b");

        assert!(get_default(&[]).is_none());
        assert!(get_default(&[dest("a", "A").disabled()]).is_none());
    }

    #[test]
    fn working_hours_gate() {
        let hours = WorkingHours::new().with_range(Weekday::Mon, "08:00", "18:00");
        let d = dest("a", "A").with_working_hours(hours);
        // 2026-01-05 is a Monday.
        assert!(is_within_working_hours(&d, at(2026, 1, 5, 9, 0)));
        assert!(is_within_working_hours(&d, at(2026, 1, 5, 18, 0)));
        assert!(!is_within_working_hours(&d, at(2026, 1, 5, 19, 0)));
        assert!(!is_within_working_hours(&d, at(2026, 1, 6, 9, 0)));
    }

    #[test]
    fn unset_working_hours_always_available() {
        assert!(is_within_working_hours(&dest("a", "A"), at(2026, 1, 4, 3, 0)));
    }

    #[test]
    fn working_hours_wrap_past_midnight() {
        let hours = WorkingHours::new().with_range(Weekday::Fri, "22:00", "06:00");
        let d = dest("a", "A").with_working_hours(hours);
        // 2026-01-09 is a Friday.
        assert!(is_within_working_hours(&d, at(2026, 1, 9, 23, 30)));
        assert!(is_within_working_hours(&d, at(2026, 1, 9, 5, 0)));
        assert!(!is_within_working_hours(&d, at(2026, 1, 9, 12, 0)));
    }

    #[test]
    fn malformed_window_is_closed() {
        let hours = WorkingHours::new().with_range(Weekday::Mon, "eight", "18:00");
        let d = dest("a", "A").with_working_hours(hours);
        assert!(!is_within_working_hours(&d, at(2026, 1, 5, 9, 0)));
    }
}

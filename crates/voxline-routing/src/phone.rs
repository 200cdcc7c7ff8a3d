// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone number normalization and transfer-target classification.
//!
//! Everything here is a pure function over its inputs so the callback and
//! transfer flows can call it from any task without coordination.

use std::sync::LazyLock;

use regex::Regex;
use voxline_config::model::PhoneConfig;
use voxline_core::{DestinationType, VoxlineError};

/// Shortest national significant number that can follow the country code.
const NATIONAL_NUMBER_DIGITS: usize = 10;

const BRAZIL_COUNTRY_CODE: &str = "55";

/// Runs of digits with common separators, long enough to be a phone number.
static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d\s().\-]{7,}\d").unwrap());

const SAME_NUMBER_KEYWORDS: &[&str] = &[
    "mesmo",
    "esse",
    "este",
    "atual",
    "desse",
    "deste",
    "daqui",
    "que tô ligando",
    "que estou ligando",
    "de onde tô",
    "de onde estou",
];

/// Normalization rules for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneRules {
    country_code: String,
    min_digits: usize,
    max_digits: usize,
    max_extension_digits: usize,
}

impl Default for PhoneRules {
    fn default() -> Self {
        Self::from_config(&PhoneConfig::default())
    }
}

impl PhoneRules {
    pub fn from_config(config: &PhoneConfig) -> Self {
        Self {
            country_code: config.default_country_code.clone(),
            min_digits: config.min_digits,
            max_digits: config.max_digits,
            max_extension_digits: config.max_extension_digits,
        }
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Normalizes `raw` into an E.164-like digit string (no `+`).
    ///
    /// Non-digits are stripped. Numbers written with `+` or `00` already carry
    /// a country code; a single leading trunk `0` is dropped; anything else
    /// that does not start with the default country code gets it prepended.
    pub fn normalize(&self, raw: &str) -> Result<String, VoxlineError> {
        let invalid = |reason: String| VoxlineError::InvalidNumber {
            input: raw.to_string(),
            reason,
        };

        let trimmed = raw.trim();
        let mut digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(invalid("no digits".to_string()));
        }

        let mut has_prefix = trimmed.starts_with('+');
        if !has_prefix {
            if let Some(rest) = digits.strip_prefix("00") {
                digits = rest.to_string();
                has_prefix = true;
            } else if digits.starts_with('0') {
                digits.remove(0);
            }
        }
        if !has_prefix {
            has_prefix = digits.starts_with(&self.country_code)
                && digits.len() >= self.country_code.len() + NATIONAL_NUMBER_DIGITS;
        }
        if !has_prefix {
            digits.insert_str(0, &self.country_code);
        }

        let count = digits.len();
        if count < self.min_digits || count > self.max_digits {
            return Err(invalid(format!(
                "{count} digits, expected {}..={}",
                self.min_digits, self.max_digits
            )));
        }

        if digits.starts_with(BRAZIL_COUNTRY_CODE) && (count == 12 || count == 13) {
            check_brazilian_plan(&digits).map_err(|reason| invalid(reason.to_string()))?;
        }

        Ok(digits)
    }

    /// True for empty input or numbers short enough to be a PBX extension.
    pub fn is_internal_extension(&self, number: &str) -> bool {
        let digits = number.chars().filter(|c| c.is_ascii_digit()).count();
        digits <= self.max_extension_digits
    }

    /// Normalizes `raw` only when it is an external (non-extension) number.
    pub fn normalize_external(&self, raw: &str) -> Option<String> {
        if self.is_internal_extension(raw) {
            return None;
        }
        self.normalize(raw).ok()
    }

    /// Pulls a phone number out of a speech transcript.
    ///
    /// Tries written digit runs first ("18 99775-2222"), then spoken
    /// Portuguese digit words ("um oito nove nove ...").
    pub fn extract_phone_from_text(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }

        for found in DIGIT_RUN.find_iter(text) {
            let digit_count = found.as_str().chars().filter(|c| c.is_ascii_digit()).count();
            if digit_count >= NATIONAL_NUMBER_DIGITS
                && let Ok(number) = self.normalize(found.as_str())
            {
                return Some(number);
            }
        }

        let lowered = text.to_lowercase();
        let mut digits = String::new();
        for token in lowered.split(|c: char| !c.is_alphanumeric()) {
            if let Some(d) = spoken_digit(token) {
                digits.push(d);
            } else if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
                digits.push_str(token);
            }
        }

        if digits.len() >= NATIONAL_NUMBER_DIGITS {
            self.normalize(&digits).ok()
        } else {
            None
        }
    }

    /// Renders a number for text-to-speech with comma pauses.
    ///
    /// The country code is dropped, the area code is spoken as a pair and the
    /// remaining digits one by one.
    pub fn format_for_speech(&self, number: &str) -> String {
        let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
        let national = match digits.strip_prefix(&self.country_code) {
            Some(rest) if rest.len() >= NATIONAL_NUMBER_DIGITS => rest,
            _ => digits.as_str(),
        };

        let spaced = |s: &str| {
            s.chars()
                .map(String::from)
                .collect::<Vec<_>>()
                .join(", ")
        };

        if national.len() == 10 || national.len() == 11 {
            format!("{}, {}", &national[..2], spaced(&national[2..]))
        } else {
            spaced(national)
        }
    }
}

/// Area code 11..=99; 13-digit (mobile) numbers carry a 9 after the area code.
fn check_brazilian_plan(digits: &str) -> Result<(), &'static str> {
    let area: u32 = digits[2..4].parse().map_err(|_| "malformed area code")?;
    if !(11..=99).contains(&area) {
        return Err("area code must be between 11 and 99");
    }
    if digits.len() == 13 && !digits[4..].starts_with('9') {
        return Err("mobile numbers must start with 9");
    }
    Ok(())
}

fn spoken_digit(word: &str) -> Option<char> {
    let digit = match word {
        "zero" => '0',
        "um" | "uma" => '1',
        "dois" | "duas" => '2',
        "três" | "tres" => '3',
        "quatro" => '4',
        "cinco" => '5',
        "seis" | "meia" => '6',
        "sete" => '7',
        "oito" => '8',
        "nove" => '9',
        _ => return None,
    };
    Some(digit)
}

/// Classifies a free-text transfer target. First match wins:
///
/// 1. all digits, 10 or more -> external
/// 2. all digits, 4 or fewer -> extension
/// 3. `*` followed by digits -> voicemail
/// 4. `queue_` prefix -> queue
/// 5. anything else names a department
pub fn infer_destination_type(token: &str) -> DestinationType {
    let token = token.trim();
    let compact: String = token
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.' | '+'))
        .collect();
    let all_digits = !compact.is_empty() && compact.chars().all(|c| c.is_ascii_digit());

    if all_digits && compact.len() >= 10 {
        return DestinationType::External;
    }
    if all_digits && compact.len() <= 4 {
        return DestinationType::Extension;
    }
    if let Some(rest) = token.strip_prefix('*')
        && !rest.is_empty()
        && rest.chars().all(|c| c.is_ascii_digit())
    {
        return DestinationType::Voicemail;
    }
    if token.to_lowercase().starts_with("queue_") {
        return DestinationType::Queue;
    }
    DestinationType::Department
}

/// True when the caller asks to be called back on the number they are calling from.
pub fn wants_same_number(text: &str) -> bool {
    let lowered = text.to_lowercase();
    SAME_NUMBER_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

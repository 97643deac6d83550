//! Date normalization for archive listings.
//!
//! Archive index pages spell release dates several ways depending on the
//! decade. [`DateNormalizer`] reduces them to a validated calendar date, which
//! is rendered as `MM/DD/YYYY` everywhere downstream.
//!
//! Recognized shapes, tried in order:
//!
//! | Shape | Example |
//! |-------|---------|
//! | `M/D/YY` or `M/D/YYYY` | `1/2/97`, `01/02/1997` |
//! | `Month D, YYYY` | `March 5, 1998`, `Mar. 5 1998` |
//! | `D Month YYYY` | `5 March 1998` |

use crate::models::DATE_FORMAT;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Month names and their abbreviations. Only the first three letters decide
/// which month matched.
pub const MONTH_PATTERN: &str = r"(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)";

/// Two-digit years at or above this value belong to the 1900s.
pub const DEFAULT_CENTURY_PIVOT: u32 = 77;

static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2}|\d{4})$").expect("slash date regex"));

static MONTH_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b({MONTH_PATTERN})\.?\s+(\d{{1,2}})(?:,|\s)\s*(\d{{4}})"
    ))
    .expect("month-first date regex")
});

static DAY_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})\s+({MONTH_PATTERN})\.?\s+(\d{{4}})"
    ))
    .expect("day-first date regex")
});

/// Converts free-form date strings into calendar dates.
#[derive(Debug, Clone, Copy)]
pub struct DateNormalizer {
    century_pivot: u32,
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_CENTURY_PIVOT)
    }
}

impl DateNormalizer {
    /// Build a normalizer with the given two-digit-year pivot. `YY >= pivot`
    /// maps to `19YY`, anything lower to `20YY`.
    pub fn new(century_pivot: u32) -> Self {
        Self {
            century_pivot: century_pivot.min(99),
        }
    }

    /// Parse `raw` into a date, or `None` when the shape is unknown or the
    /// resulting date does not exist on the calendar.
    pub fn parse(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Some(date) = self.parse_slashed(raw) {
            return Some(date);
        }

        if let Some(caps) = MONTH_FIRST.captures(raw) {
            return calendar_date(&caps[3], month_number(&caps[1])?, &caps[2]);
        }

        if let Some(caps) = DAY_FIRST.captures(raw) {
            return calendar_date(&caps[3], month_number(&caps[2])?, &caps[1]);
        }

        None
    }

    /// Parse `raw` and render it as `MM/DD/YYYY`.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        self.parse(raw)
            .map(|date| date.format(DATE_FORMAT).to_string())
    }

    fn parse_slashed(&self, raw: &str) -> Option<NaiveDate> {
        let caps = SLASH_DATE.captures(raw)?;
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year_digits = &caps[3];
        let mut year: i32 = year_digits.parse().ok()?;
        if year_digits.len() == 2 {
            year += if year as u32 >= self.century_pivot { 1900 } else { 2000 };
        }
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

/// Map a month name or abbreviation to its number, keyed on the first three
/// letters.
pub fn month_number(name: &str) -> Option<u32> {
    let key: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let month = match key.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn calendar_date(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

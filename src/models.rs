//! Data models for press releases and the failure ledger.
//!
//! This module defines the records that flow through the pipeline:
//! - [`ReleaseEntry`]: one press release as listed in a year's archive index,
//!   later enriched with its body text
//! - [`FailedItem`]: a ledger row for a release whose body could not be extracted
//! - [`YearReport`]: what one archive year produced, including completeness
//!
//! Serialized field names (`Date`, `Headlines`, `URL`, `Text`) match the
//! column names of the CSV output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical date layout used for every emitted record.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Serde adapter writing a [`NaiveDate`] as `MM/DD/YYYY`.
pub mod release_date {
    use super::DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// A single press release.
///
/// Created by the listing extractor with `date`, `headline` and `url` set and
/// `body_text` empty, then filled in exactly once by a body extractor. An
/// empty `body_text` after extraction means the body was unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    /// Release date, always a real calendar date.
    #[serde(rename = "Date", with = "release_date")]
    pub date: NaiveDate,
    /// Headline as shown in the archive index.
    #[serde(rename = "Headlines")]
    pub headline: String,
    /// Absolute document URL.
    #[serde(rename = "URL")]
    pub url: String,
    /// Cleaned narrative text; empty when extraction failed.
    #[serde(rename = "Text", default)]
    pub body_text: String,
}

impl ReleaseEntry {
    pub fn new(date: NaiveDate, headline: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            date,
            headline: headline.into(),
            url: url.into(),
            body_text: String::new(),
        }
    }

    /// The date in its canonical `MM/DD/YYYY` form.
    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    pub fn has_text(&self) -> bool {
        !self.body_text.trim().is_empty()
    }
}

/// The CSV row persisted for each release. The URL column is dropped.
#[derive(Debug, Serialize)]
pub struct OutputRecord<'a> {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Headlines")]
    pub headline: &'a str,
    #[serde(rename = "Text")]
    pub text: &'a str,
}

impl<'a> From<&'a ReleaseEntry> for OutputRecord<'a> {
    fn from(entry: &'a ReleaseEntry) -> Self {
        Self {
            date: entry.date_string(),
            headline: &entry.headline,
            text: &entry.body_text,
        }
    }
}

/// One row of the failure ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub year: i32,
    /// 1-based position of the release within its year's listing.
    pub index: usize,
    pub url: String,
    pub error: String,
}

/// Outcome of collecting one archive year.
#[derive(Debug, Default)]
pub struct YearReport {
    pub year: i32,
    /// Every listed release, with or without body text.
    pub entries: Vec<ReleaseEntry>,
    /// Releases whose body extraction exhausted its retries.
    pub failures: Vec<FailedItem>,
    /// Whether the success ratio met the completeness threshold.
    pub complete: bool,
}

impl YearReport {
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.has_text()).count()
    }

    /// Fraction of listed releases that received body text.
    pub fn success_ratio(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.succeeded() as f64 / self.entries.len() as f64
    }
}

/// Aggregated result of a whole run.
#[derive(Debug, Default)]
pub struct Collection {
    /// Releases from complete years only.
    pub releases: Vec<ReleaseEntry>,
    /// Ledger rows from every processed year.
    pub failures: Vec<FailedItem>,
    /// Years that fell below the completeness threshold.
    pub incomplete_years: Vec<i32>,
    /// Years whose listing could not be retrieved.
    pub unavailable_years: Vec<i32>,
}

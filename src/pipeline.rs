//! Year-by-year collection of press releases.
//!
//! The pipeline drives the scrapers over a year range:
//! 1. **Listing**: fetch the year's archive index, retrying while it comes back empty
//! 2. **Bodies**: extract every listed release, retrying documents whose text
//!    fails validation and recording exhausted ones in the failure ledger
//! 3. **Completeness**: keep the year only if enough releases received text
//!
//! Bodies are extracted one at a time by default. With a [`BatchConfig`] they
//! run in fixed-size concurrent batches; each batch finishes before the next
//! one starts.

use crate::dates::DateNormalizer;
use crate::fetcher::{Fetcher, PageSource};
use crate::models::{Collection, FailedItem, ReleaseEntry, YearReport};
use crate::scrapers::listing::{self, SeenUrls};
use crate::scrapers::{self, Era, LEGACY_TEXT_YEARS};
use crate::utils::{looks_like_raw_html, truncate_for_log};
use futures::future::join_all;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://www.sec.gov";
pub const DEFAULT_COMPLETENESS_THRESHOLD: f64 = 0.8;
pub const DEFAULT_MIN_TEXT_LEN: usize = 20;
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Concurrent body extraction settings.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub size: usize,
    /// Pause between consecutive batches.
    pub delay: Duration,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub base_url: String,
    pub years: RangeInclusive<i32>,
    /// Years whose listings use the legacy-text rules.
    pub legacy_years: RangeInclusive<i32>,
    /// Attempts for a year's listing and for each release body.
    pub max_retries: usize,
    /// Minimum share of releases with text for a year to be kept.
    pub completeness_threshold: f64,
    /// Shortest body accepted as a successful extraction.
    pub min_text_len: usize,
    pub batch: Option<BatchConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            years: 1997..=2011,
            legacy_years: LEGACY_TEXT_YEARS,
            max_retries: DEFAULT_MAX_RETRIES,
            completeness_threshold: DEFAULT_COMPLETENESS_THRESHOLD,
            min_text_len: DEFAULT_MIN_TEXT_LEN,
            batch: None,
        }
    }
}

pub struct Pipeline<S> {
    fetcher: Fetcher<S>,
    dates: DateNormalizer,
    config: PipelineConfig,
}

impl<S: PageSource> Pipeline<S> {
    pub fn new(fetcher: Fetcher<S>, dates: DateNormalizer, config: PipelineConfig) -> Self {
        Self {
            fetcher,
            dates,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Collect every year in the configured range.
    ///
    /// Incomplete years are left out of `releases` but their ledger rows are
    /// kept.
    #[instrument(level = "info", skip(self), fields(years = ?self.config.years))]
    pub async fn run(&self) -> Collection {
        let t0 = Instant::now();
        let mut seen: HashMap<Era, SeenUrls> = HashMap::new();
        let mut collection = Collection::default();

        for year in self.config.years.clone() {
            info!(year, "Processing year");
            let era = Era::for_year(year, &self.config.legacy_years);
            let index = seen.entry(era).or_default();

            let Some(report) = self.collect_year(year, index).await else {
                collection.unavailable_years.push(year);
                continue;
            };

            let YearReport {
                entries,
                failures,
                complete,
                ..
            } = report;
            collection.failures.extend(failures);
            if complete {
                info!(year, count = entries.len(), "Collected releases for year");
                collection.releases.extend(entries);
            } else {
                collection.incomplete_years.push(year);
            }
        }

        if collection.releases.is_empty() {
            error!("No releases were collected");
        }
        if !collection.failures.is_empty() {
            warn!(count = collection.failures.len(), "Some releases could not be extracted");
        }
        info!(
            releases = collection.releases.len(),
            failures = collection.failures.len(),
            incomplete_years = ?collection.incomplete_years,
            unavailable_years = ?collection.unavailable_years,
            secs = t0.elapsed().as_secs(),
            "Collection finished"
        );
        collection
    }

    /// Collect one year. `None` when its listing stayed empty after every
    /// attempt.
    #[instrument(level = "info", skip(self, seen))]
    pub async fn collect_year(&self, year: i32, seen: &mut SeenUrls) -> Option<YearReport> {
        let mut entries = self.list_year(year, seen).await;
        if entries.is_empty() {
            warn!(year, "No releases found for year");
            return None;
        }

        let failures = match &self.config.batch {
            Some(batch) => self.fill_bodies_batched(year, &mut entries, batch).await,
            None => self.fill_bodies(year, &mut entries).await,
        };

        let mut report = YearReport {
            year,
            entries,
            failures,
            complete: false,
        };
        report.complete = report.success_ratio() >= self.config.completeness_threshold;

        if report.complete {
            info!(year = report.year, succeeded = report.succeeded(), total = report.entries.len(), "Year complete");
        } else {
            error!(
                year = report.year,
                succeeded = report.succeeded(),
                total = report.entries.len(),
                threshold = self.config.completeness_threshold,
                "Year data might be incomplete"
            );
        }
        Some(report)
    }

    async fn list_year(&self, year: i32, seen: &mut SeenUrls) -> Vec<ReleaseEntry> {
        let era = Era::for_year(year, &self.config.legacy_years);
        let max = self.config.max_retries.max(1);

        for attempt in 1..=max {
            let entries =
                listing::fetch_listing(&self.fetcher, &self.config.base_url, year, &self.dates, seen).await;
            if !entries.is_empty() {
                info!(year, ?era, count = entries.len(), seen = seen.len(), "Found releases");
                return entries;
            }
            if attempt < max {
                warn!(year, ?era, attempt, max, "Listing empty; retrying");
            }
        }

        error!(year, max, "Failed to get releases for year");
        Vec::new()
    }

    async fn fill_bodies(&self, year: i32, entries: &mut [ReleaseEntry]) -> Vec<FailedItem> {
        let total = entries.len();
        let mut failures = Vec::new();
        for (i, entry) in entries.iter_mut().enumerate() {
            if let Some(failure) = self.fill_body(year, i + 1, total, entry).await {
                failures.push(failure);
            }
        }
        failures
    }

    async fn fill_bodies_batched(
        &self,
        year: i32,
        entries: &mut [ReleaseEntry],
        batch: &BatchConfig,
    ) -> Vec<FailedItem> {
        let total = entries.len();
        let size = batch.size.max(1);
        let batches = total.div_ceil(size);
        let mut failures = Vec::new();

        for (n, chunk) in entries.chunks_mut(size).enumerate() {
            info!(year, batch = n + 1, batches, "Processing batch");
            let offset = n * size;
            let results = join_all(
                chunk
                    .iter_mut()
                    .enumerate()
                    .map(|(i, entry)| self.fill_body(year, offset + i + 1, total, entry)),
            )
            .await;
            failures.extend(results.into_iter().flatten());

            if n + 1 < batches {
                debug!(delay = ?batch.delay, "Waiting before next batch");
                sleep(batch.delay).await;
            }
        }
        failures
    }

    /// Extract one release body, retrying until it validates. Returns the
    /// ledger row when every attempt failed; the entry then keeps empty text.
    async fn fill_body(
        &self,
        year: i32,
        index: usize,
        total: usize,
        entry: &mut ReleaseEntry,
    ) -> Option<FailedItem> {
        let max = self.config.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max {
            let text = scrapers::fetch_release_text(&self.fetcher, &entry.url).await;
            match self.validate(&text) {
                Ok(()) => {
                    entry.body_text = text;
                    info!(year, index, total, "Processed release");
                    return None;
                }
                Err(reason) => {
                    if attempt < max {
                        warn!(
                            year,
                            index,
                            attempt,
                            max,
                            reason = %reason,
                            preview = %truncate_for_log(&text, 80),
                            "Retrying release"
                        );
                    }
                    last_error = reason;
                }
            }
        }

        error!(year, index, max, url = %entry.url, error = %last_error, "Failed to collect release");
        entry.body_text.clear();
        Some(FailedItem {
            year,
            index,
            url: entry.url.clone(),
            error: last_error,
        })
    }

    fn validate(&self, text: &str) -> Result<(), String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err("Empty text returned".to_string());
        }
        if looks_like_raw_html(trimmed) {
            return Err("Text looks like an unrendered HTML page".to_string());
        }
        if trimmed.chars().count() < self.config.min_text_len {
            return Err(format!("Text too short (< {} characters)", self.config.min_text_len));
        }
        Ok(())
    }
}

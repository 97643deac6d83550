//! Command-line interface definitions for the SEC press release archiver.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every option has a default, and the identifying user agent can also be
//! provided through the environment.

use crate::dates::DEFAULT_CENTURY_PIVOT;
use crate::fetcher::DEFAULT_USER_AGENT;
use crate::pipeline::{
    DEFAULT_BASE_URL, DEFAULT_COMPLETENESS_THRESHOLD, DEFAULT_MAX_RETRIES, DEFAULT_MIN_TEXT_LEN,
};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the archiver.
///
/// # Examples
///
/// ```sh
/// # Whole archive with the default outputs
/// sec_press_archive
///
/// # A few HTML-era years, concurrently, with a JSON snapshot
/// sec_press_archive --start-year 2005 --end-year 2007 --batched -j ./json
///
/// # Identify yourself to the archive
/// SEC_USER_AGENT="Jane Roe jane@example.com" sec_press_archive
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// First archive year to collect
    #[arg(long, default_value_t = 1997)]
    pub start_year: i32,

    /// Last archive year to collect (inclusive)
    #[arg(long, default_value_t = 2011)]
    pub end_year: i32,

    /// CSV file receiving the collected releases
    #[arg(short, long, default_value = "sec_press_releases.csv")]
    pub output: PathBuf,

    /// CSV file the failure ledger is appended to
    #[arg(short, long, default_value = "failed_items.csv")]
    pub failed_output: PathBuf,

    /// Optional directory for a JSON snapshot of the run
    #[arg(short, long)]
    pub json_output_dir: Option<PathBuf>,

    /// Attempts per year listing and per release body
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: usize,

    /// Minimum share of releases with text for a year to be kept
    #[arg(long, default_value_t = DEFAULT_COMPLETENESS_THRESHOLD, value_parser = parse_ratio)]
    pub completeness_threshold: f64,

    /// Two-digit years at or above this are 19xx, below are 20xx
    #[arg(long, default_value_t = DEFAULT_CENTURY_PIVOT)]
    pub century_pivot: u32,

    /// Shortest body text accepted as a successful extraction
    #[arg(long, default_value_t = DEFAULT_MIN_TEXT_LEN)]
    pub min_text_len: usize,

    /// Delay before every request, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub request_delay_ms: u64,

    /// Per-request timeout, in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Responses shorter than this many bytes are treated as truncated
    #[arg(long, default_value_t = 100)]
    pub min_content_len: usize,

    /// Identifying User-Agent sent with every request
    #[arg(long, env = "SEC_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Site root the archive paths are resolved against
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Extract release bodies in concurrent batches
    #[arg(long)]
    pub batched: bool,

    /// Releases per batch when `--batched` is set
    #[arg(long, default_value_t = 5)]
    pub batch_size: usize,

    /// Pause between batches, in seconds
    #[arg(long, default_value_t = 1)]
    pub batch_delay_secs: u64,
}

fn parse_ratio(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not between 0 and 1"))
    }
}

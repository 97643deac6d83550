//! # SEC Press Archive
//!
//! Collects historical SEC press releases from the yearly archive indexes and
//! normalizes them into one record set of date, headline, URL and body text.
//!
//! ## Features
//!
//! - Parses both archive eras: plain-text releases (1997-2001) and HTML
//!   releases (2002 onwards)
//! - Normalizes the many date spellings found in the listings to `MM/DD/YYYY`
//! - Rate-limited, retried retrieval with an identifying user agent
//! - Per-release validation with a failure ledger, and a per-year
//!   completeness check
//! - Outputs a CSV table, an appended failure ledger and an optional JSON
//!   snapshot
//!
//! ## Usage
//!
//! ```sh
//! sec_press_archive --start-year 1997 --end-year 2011 -o releases.csv
//! ```
//!
//! ## Architecture
//!
//! 1. **Listing**: fetch and parse each year's archive index
//! 2. **Bodies**: fetch every listed release and extract its narrative text
//! 3. **Completeness**: drop years where too few releases have text
//! 4. **Output**: write the CSV table, the ledger and the JSON snapshot

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod dates;
mod fetcher;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;
use dates::DateNormalizer;
use fetcher::{FetchPolicy, Fetcher, HttpPageSource};
use outputs::{csv, json};
use pipeline::{BatchConfig, Pipeline, PipelineConfig};
use scrapers::LEGACY_TEXT_YEARS;
use utils::ensure_parent_writable;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("sec_press_archive starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    if args.end_year < args.start_year {
        error!(start_year = args.start_year, end_year = args.end_year, "Empty year range");
        return Err(format!(
            "end year {} is before start year {}",
            args.end_year, args.start_year
        )
        .into());
    }

    // Early check: output locations must be writable before hours of fetching
    for path in [&args.output, &args.failed_output] {
        if let Err(e) = ensure_parent_writable(path).await {
            error!(
                path = %path.display(),
                error = %e,
                "Output location is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let policy = FetchPolicy {
        request_delay: Duration::from_millis(args.request_delay_ms),
        timeout: Duration::from_secs(args.timeout_secs),
        min_content_len: args.min_content_len,
        user_agent: args.user_agent.clone(),
        ..FetchPolicy::default()
    };
    let source = HttpPageSource::new(&policy)?;
    let fetcher = Fetcher::new(source, policy);

    let batch = args.batched.then(|| BatchConfig {
        size: args.batch_size.max(1),
        delay: Duration::from_secs(args.batch_delay_secs),
    });
    let config = PipelineConfig {
        base_url: args.base_url.trim_end_matches('/').to_string(),
        years: args.start_year..=args.end_year,
        legacy_years: LEGACY_TEXT_YEARS,
        max_retries: args.max_retries,
        completeness_threshold: args.completeness_threshold,
        min_text_len: args.min_text_len,
        batch,
    };
    info!(
        years = ?config.years,
        batched = config.batch.is_some(),
        threshold = config.completeness_threshold,
        "Pipeline configured"
    );

    let pipeline = Pipeline::new(fetcher, DateNormalizer::new(args.century_pivot), config);
    let collection = pipeline.run().await;

    // ---- Outputs ----
    let saved = csv::write_releases(&collection.releases, &args.output).await?;

    if let Err(e) = csv::append_failures(&collection.failures, &args.failed_output).await {
        error!(path = %args.failed_output.display(), error = %e, "Failed to write failure ledger");
    }

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = json::write_collection(&collection, &pipeline.config().years, dir).await {
            error!(error = %e, "Failed to write JSON snapshot");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        saved,
        failures = collection.failures.len(),
        incomplete_years = ?collection.incomplete_years,
        unavailable_years = ?collection.unavailable_years,
        "Execution complete"
    );

    Ok(())
}

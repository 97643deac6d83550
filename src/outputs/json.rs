//! JSON snapshot of a collection run.
//!
//! Unlike the CSV table, the snapshot keeps release URLs and records which
//! years were left out and why.
//!
//! # Output Path
//!
//! `{json_output_dir}/press_releases_{first_year}_{last_year}.json`

use crate::models::{Collection, FailedItem, ReleaseEntry};
use chrono::Local;
use serde::Serialize;
use std::error::Error;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
pub struct RunSnapshot<'a> {
    pub generated_at: String,
    pub first_year: i32,
    pub last_year: i32,
    pub releases: &'a [ReleaseEntry],
    pub failures: &'a [FailedItem],
    pub incomplete_years: &'a [i32],
    pub unavailable_years: &'a [i32],
}

impl<'a> RunSnapshot<'a> {
    pub fn new(collection: &'a Collection, years: &RangeInclusive<i32>) -> Self {
        Self {
            generated_at: Local::now().to_rfc3339(),
            first_year: *years.start(),
            last_year: *years.end(),
            releases: &collection.releases,
            failures: &collection.failures,
            incomplete_years: &collection.incomplete_years,
            unavailable_years: &collection.unavailable_years,
        }
    }
}

/// Write the snapshot for `collection` and return the file path.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir.display()))]
pub async fn write_collection(
    collection: &Collection,
    years: &RangeInclusive<i32>,
    json_output_dir: &Path,
) -> Result<PathBuf, Box<dyn Error>> {
    let snapshot = RunSnapshot::new(collection, years);
    let json = serde_json::to_string_pretty(&snapshot)?;

    info!("Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(json_output_dir).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = json_output_dir.join(format!(
        "press_releases_{}_{}.json",
        snapshot.first_year, snapshot.last_year
    ));
    fs::write(&path, json).await?;
    info!(path = %path.display(), releases = snapshot.releases.len(), "Wrote JSON snapshot");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_write_collection_keeps_urls_and_year_status() {
        let dir = std::env::temp_dir().join(format!("sec_press_archive_json_{}", std::process::id()));
        let mut entry = ReleaseEntry::new(
            NaiveDate::from_ymd_opt(2003, 2, 14).unwrap(),
            "Commission Adopts Rule",
            "https://www.sec.gov/news/press/2003-20.htm",
        );
        entry.body_text = "The Commission today adopted a rule.".to_string();
        let collection = Collection {
            releases: vec![entry],
            failures: vec![],
            incomplete_years: vec![2004],
            unavailable_years: vec![2005],
        };

        let path = write_collection(&collection, &(2003..=2005), &dir).await.unwrap();
        assert!(path.ends_with("press_releases_2003_2005.json"));

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["releases"][0]["Date"], "02/14/2003");
        assert_eq!(value["releases"][0]["URL"], "https://www.sec.gov/news/press/2003-20.htm");
        assert_eq!(value["incomplete_years"][0], 2004);
        assert_eq!(value["unavailable_years"][0], 2005);
        assert!(value["generated_at"].is_string());

        let _ = std::fs::remove_dir_all(&dir);
    }
}

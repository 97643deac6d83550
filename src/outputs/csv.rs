//! CSV output for releases and the failure ledger.

use crate::models::{FailedItem, OutputRecord, ReleaseEntry};
use crate::utils::looks_like_raw_html;
use ::csv::WriterBuilder;
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

/// Write releases as `Date,Headlines,Text`, newest first.
///
/// Entries whose text is still a raw HTML page are dropped. Entries with
/// empty text are kept. Returns the number of rows written.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_releases(releases: &[ReleaseEntry], path: &Path) -> Result<usize, Box<dyn Error>> {
    let mut rows: Vec<&ReleaseEntry> = releases
        .iter()
        .filter(|entry| !looks_like_raw_html(&entry.body_text))
        .collect();

    let dropped = releases.len() - rows.len();
    if dropped > 0 {
        warn!(count = dropped, "Dropped releases whose text is a raw HTML page");
    }
    if rows.is_empty() {
        warn!("No press releases to save");
        return Ok(0);
    }

    let empty = rows.iter().filter(|entry| !entry.has_text()).count();
    if empty > 0 {
        warn!(count = empty, "Saving releases with empty text");
    }

    rows.sort_by(|a, b| b.date.cmp(&a.date));
    let bytes = to_csv_bytes(rows.iter().map(|entry| OutputRecord::from(*entry)), true)?;
    fs::write(path, bytes).await?;

    info!(count = rows.len(), "Saved press releases");
    Ok(rows.len())
}

/// Append ledger rows to `path`, writing the header only when the file is
/// new.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = failures.len()))]
pub async fn append_failures(failures: &[FailedItem], path: &Path) -> Result<(), Box<dyn Error>> {
    if failures.is_empty() {
        return Ok(());
    }

    let exists = fs::try_exists(path).await.unwrap_or(false);
    let bytes = to_csv_bytes(failures.iter(), !exists)?;

    let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;

    info!("Appended failure ledger");
    Ok(())
}

fn to_csv_bytes<T, I>(records: I, headers: bool) -> Result<Vec<u8>, Box<dyn Error>>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = WriterBuilder::new().has_headers(headers).from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

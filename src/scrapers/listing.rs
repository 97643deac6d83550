//! Yearly archive index parsing.
//!
//! Each year of the press archive has an index page at
//! `{base}/news/press/pressarchive/{year}press.shtml`. The page is a table
//! whose rows look like:
//!
//! ```text
//! <tr><td><a href="/news/press/2003-12.htm">2003-12</a></td>
//!     <td>Jan. 28, 2003</td>
//!     <td>SEC Adopts Attorney Conduct Rule</td></tr>
//! ```
//!
//! Rows are handled one at a time; a malformed row is skipped without
//! affecting the rest of the page. Deduplication by URL goes through a
//! [`SeenUrls`] index owned by the caller, so the same index can span many
//! years.

use super::{fragment_text, row_cells};
use crate::dates::DateNormalizer;
use crate::fetcher::{Fetcher, PageSource};
use crate::models::ReleaseEntry;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

static TABLE_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("table tr").expect("row selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("link selector"));

/// URLs already emitted by a listing.
#[derive(Debug, Default, Clone)]
pub struct SeenUrls(HashSet<String>);

impl SeenUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `url`; `false` if it had already been seen.
    pub fn insert(&mut self, url: &str) -> bool {
        self.0.insert(url.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Address of a year's archive index page.
pub fn archive_index_url(base_url: &str, year: i32) -> String {
    format!(
        "{}/news/press/pressarchive/{year}press.shtml",
        base_url.trim_end_matches('/')
    )
}

/// Fetch and parse one year's archive index.
///
/// Returns an empty list when the page is unavailable.
#[instrument(level = "info", skip(fetcher, dates, seen))]
pub async fn fetch_listing<S: PageSource>(
    fetcher: &Fetcher<S>,
    base_url: &str,
    year: i32,
    dates: &DateNormalizer,
    seen: &mut SeenUrls,
) -> Vec<ReleaseEntry> {
    let index_url = archive_index_url(base_url, year);
    let Some(html) = fetcher.fetch(&index_url).await else {
        warn!(%index_url, "Archive index unavailable");
        return Vec::new();
    };

    let page_url = match Url::parse(&index_url) {
        Ok(url) => url,
        Err(e) => {
            warn!(%index_url, error = %e, "Archive index URL is not absolute");
            return Vec::new();
        }
    };

    let entries = parse_listing(&html, &page_url, dates, seen);
    info!(count = entries.len(), source = %index_url, "Indexed press releases");
    entries
}

/// Parse an archive index page into release stubs.
///
/// Relative links are resolved against `page_url`. URLs present in `seen` are
/// skipped; every emitted URL is added to it.
pub fn parse_listing(
    html: &str,
    page_url: &Url,
    dates: &DateNormalizer,
    seen: &mut SeenUrls,
) -> Vec<ReleaseEntry> {
    let document = Html::parse_document(html);
    let mut entries = Vec::new();

    for row in document.select(&TABLE_ROW) {
        let cells = row_cells(row);
        if cells.len() < 3 {
            continue;
        }

        let Some(entry) = parse_row(&cells, page_url, dates) else {
            debug!(row = %fragment_text(row), "Skipping malformed listing row");
            continue;
        };

        if !seen.insert(&entry.url) {
            debug!(url = %entry.url, "Skipping duplicate release");
            continue;
        }
        entries.push(entry);
    }

    entries
}

fn parse_row(cells: &[ElementRef<'_>], page_url: &Url, dates: &DateNormalizer) -> Option<ReleaseEntry> {
    let link = cells[0].select(&LINK).next()?;
    let href = link.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }
    let url = page_url.join(href).ok()?;

    let date = dates.parse(&single_line(cells[1]))?;

    let mut headline = single_line(cells[2]);
    if headline.is_empty() {
        headline = single_line(link);
    }
    if headline.is_empty() {
        return None;
    }

    Some(ReleaseEntry::new(date, headline, url.to_string()))
}

fn single_line(element: ElementRef<'_>) -> String {
    fragment_text(element).replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    impl SeenUrls {
        fn contains(&self, url: &str) -> bool {
            self.0.contains(url)
        }
    }

    const BASE: &str = "https://www.sec.gov";

    fn page_url(year: i32) -> Url {
        Url::parse(&archive_index_url(BASE, year)).unwrap()
    }

    fn row(href: &str, date: &str, headline: &str) -> String {
        format!(r#"<tr><td><a href="{href}">link text</a></td><td>{date}</td><td>{headline}</td></tr>"#)
    }

    fn page(rows: &[String]) -> String {
        format!(
            "<html><body><h1>Press Releases</h1><table><tr><th>No.</th><th>Date</th><th>Title</th></tr>{}</table></body></html>",
            rows.concat()
        )
    }

    #[test]
    fn test_archive_index_url() {
        assert_eq!(
            archive_index_url("https://www.sec.gov/", 1999),
            "https://www.sec.gov/news/press/pressarchive/1999press.shtml"
        );
    }

    #[test]
    fn test_rows_become_entries_with_absolute_urls() {
        let html = page(&[
            row("/news/press/2003-12.htm", "Jan. 28, 2003", "SEC Adopts Attorney Conduct Rule"),
            row("2003-13.htm", "1/29/03", "Second Release"),
            row("https://www.sec.gov/litigation/2003-14.txt", "30 January 2003", "Third"),
        ]);
        let mut seen = SeenUrls::new();
        let entries = parse_listing(&html, &page_url(2003), &DateNormalizer::default(), &mut seen);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].url, "https://www.sec.gov/news/press/2003-12.htm");
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2003, 1, 28).unwrap());
        assert_eq!(entries[0].headline, "SEC Adopts Attorney Conduct Rule");
        assert_eq!(entries[1].url, "https://www.sec.gov/news/press/pressarchive/2003-13.htm");
        assert_eq!(entries[1].date_string(), "01/29/2003");
        assert_eq!(entries[2].url, "https://www.sec.gov/litigation/2003-14.txt");
        assert!(entries.iter().all(|e| e.body_text.is_empty()));
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_duplicate_urls_yield_one_entry() {
        let html = page(&[
            row("/news/press/2004-1.htm", "1/5/04", "First"),
            row("/news/press/2004-1.htm", "1/5/04", "First again"),
        ]);
        let mut seen = SeenUrls::new();
        let entries = parse_listing(&html, &page_url(2004), &DateNormalizer::default(), &mut seen);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].headline, "First");
    }

    #[test]
    fn test_dedup_spans_calls_sharing_an_index() {
        let mut seen = SeenUrls::new();
        let dates = DateNormalizer::default();
        let first = parse_listing(
            &page(&[row("/news/press/2000-99.txt", "12/29/00", "Year End")]),
            &page_url(2000),
            &dates,
            &mut seen,
        );
        let second = parse_listing(
            &page(&[
                row("/news/press/2000-99.txt", "1/2/01", "Year End"),
                row("/news/press/2001-1.txt", "1/3/01", "New Year"),
            ]),
            &page_url(2001),
            &dates,
            &mut seen,
        );

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].headline, "New Year");
    }

    #[test]
    fn test_malformed_rows_are_skipped_individually() {
        let html = page(&[
            r#"<tr><td>no link</td><td>1/5/04</td><td>Missing anchor</td></tr>"#.to_string(),
            row("/news/press/2004-2.htm", "February 30, 2004", "Bad date"),
            row("", "1/6/04", "Empty href"),
            r#"<tr><td><a href="/x.htm">x</a></td><td>1/7/04</td></tr>"#.to_string(),
            row("/news/press/2004-3.htm", "1/8/04", "Good row"),
        ]);
        let mut seen = SeenUrls::new();
        let entries = parse_listing(&html, &page_url(2004), &DateNormalizer::default(), &mut seen);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].headline, "Good row");
        assert!(!seen.contains("https://www.sec.gov/news/press/2004-2.htm"));
    }

    #[test]
    fn test_empty_headline_falls_back_to_link_text() {
        let html = page(&[r#"<tr><td><a href="/news/press/2005-7.htm">Commission Votes</a></td><td>2/1/05</td><td>  </td></tr>"#.to_string()]);
        let mut seen = SeenUrls::new();
        let entries = parse_listing(&html, &page_url(2005), &DateNormalizer::default(), &mut seen);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].headline, "Commission Votes");
    }

    #[test]
    fn test_page_without_tables_is_empty() {
        let mut seen = SeenUrls::new();
        let entries = parse_listing(
            "<html><body><p>Not found</p></body></html>",
            &page_url(2006),
            &DateNormalizer::default(),
            &mut seen,
        );
        assert!(entries.is_empty());
        assert!(seen.is_empty());
    }
}

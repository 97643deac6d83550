//! Press archive scrapers.
//!
//! Each archive year is processed in two phases, mirroring how the archive
//! itself is organized:
//!
//! 1. **Listing**: the year's index page is parsed into [`ReleaseEntry`] stubs
//!    (see [`listing`])
//! 2. **Body extraction**: each stub's document is fetched and reduced to its
//!    narrative text by the extractor for its [`Era`]
//!
//! | Era | Module | Documents |
//! |-----|--------|-----------|
//! | Legacy text | [`text_release`] | plain-text releases, 1997-2001 |
//! | HTML | [`html_release`] | marked-up releases |
//!
//! [`ReleaseEntry`]: crate::models::ReleaseEntry

pub mod html_release;
pub mod listing;
pub mod text_release;

use crate::dates::MONTH_PATTERN;
use crate::fetcher::{Fetcher, PageSource};
use scraper::ElementRef;
use std::ops::RangeInclusive;
use tracing::{instrument, warn};
use url::Url;

/// Lines conventionally closing the body of a release.
pub const SECTION_END_MARKERS: [&str; 6] = ["###", "# # #", "* * *", "#  #  #", "*  *  *", "***"];

/// Years whose archive listings are processed with the legacy-text rules.
pub const LEGACY_TEXT_YEARS: RangeInclusive<i32> = 1997..=2001;

/// Document family a release belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Era {
    LegacyText,
    Html,
}

impl Era {
    /// Era used for a year's listing.
    pub fn for_year(year: i32, legacy_years: &RangeInclusive<i32>) -> Self {
        if legacy_years.contains(&year) {
            Era::LegacyText
        } else {
            Era::Html
        }
    }

    /// Era used for a single document, decided only by its file extension.
    /// This may disagree with the listing's era.
    pub fn for_url(url: &str) -> Self {
        let path = match Url::parse(url) {
            Ok(parsed) => parsed.path().to_ascii_lowercase(),
            Err(_) => url.to_ascii_lowercase(),
        };
        if path.ends_with(".htm") || path.ends_with(".html") {
            Era::Html
        } else {
            Era::LegacyText
        }
    }

    /// Reduce a fetched document to its cleaned body text.
    pub fn extract_body(self, raw: &str) -> String {
        match self {
            Era::LegacyText => text_release::extract(raw),
            Era::Html => html_release::extract(raw),
        }
    }
}

/// Fetch one release and extract its body. Empty when the page is
/// unavailable or nothing could be extracted.
#[instrument(level = "info", skip(fetcher))]
pub async fn fetch_release_text<S: PageSource>(fetcher: &Fetcher<S>, url: &str) -> String {
    let Some(raw) = fetcher.fetch(url).await else {
        warn!("Release document unavailable");
        return String::new();
    };
    Era::for_url(url).extract_body(&raw)
}

/// Regex source for a "Washington, D.C., <Month> <Day>, <Year>" dateline,
/// without any trailing dash.
pub(crate) fn dateline_pattern() -> String {
    format!(r"Washington,?\s*D\.?\s*C\.?,?\s*{MONTH_PATTERN}\.?\s+\d{{1,2}},?\s+\d{{4}}")
}

/// Split `text` at the earliest section-end marker. The flag tells whether a
/// marker was found.
pub(crate) fn cut_at_section_end(text: &str) -> (&str, bool) {
    match SECTION_END_MARKERS
        .iter()
        .filter_map(|marker| text.find(marker))
        .min()
    {
        Some(pos) => (text[..pos].trim_end(), true),
        None => (text, false),
    }
}

/// `td` cells that are direct children of a table row.
pub(crate) fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| cell.value().name() == "td")
        .collect()
}

/// Text of an element with `<br>` turned into line breaks, whitespace
/// collapsed within each line and blank lines dropped.
pub(crate) fn fragment_text(element: ElementRef<'_>) -> String {
    raw_fragment_text(element)
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text of an element as it appears in the document. Only `<br>` produces a
/// line break; source newlines are plain whitespace.
pub(crate) fn raw_fragment_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            scraper::Node::Text(text) => {
                out.extend(text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }))
            }
            scraper::Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{FetchPolicy, HttpPageSource};
    use scraper::{Html, Selector};
    use std::time::Duration;

    fn windows_1252(parts: &[&str]) -> Vec<u8> {
        // 0x97 is the em dash in windows-1252 and invalid on its own in UTF-8.
        parts.join("\u{0}").into_bytes().into_iter().map(|b| if b == 0 { 0x97 } else { b }).collect()
    }

    fn fetcher() -> Fetcher<HttpPageSource> {
        let policy = FetchPolicy {
            request_delay: Duration::ZERO,
            backoff_step: Duration::ZERO,
            ..FetchPolicy::default()
        };
        Fetcher::new(HttpPageSource::new(&policy).unwrap(), policy)
    }

    #[test]
    fn test_era_for_year() {
        assert_eq!(Era::for_year(1997, &LEGACY_TEXT_YEARS), Era::LegacyText);
        assert_eq!(Era::for_year(2001, &LEGACY_TEXT_YEARS), Era::LegacyText);
        assert_eq!(Era::for_year(2002, &LEGACY_TEXT_YEARS), Era::Html);
        assert_eq!(Era::for_year(1996, &LEGACY_TEXT_YEARS), Era::Html);
    }

    #[test]
    fn test_era_for_url_uses_extension_only() {
        assert_eq!(Era::for_url("https://www.sec.gov/news/press/2000-12.htm"), Era::Html);
        assert_eq!(Era::for_url("https://www.sec.gov/news/press/2000-12.HTML"), Era::Html);
        assert_eq!(Era::for_url("https://www.sec.gov/news/press/2000-12.htm?print=1"), Era::Html);
        assert_eq!(Era::for_url("https://www.sec.gov/news/press/98-12.txt"), Era::LegacyText);
        assert_eq!(Era::for_url("https://www.sec.gov/news/press/pressarchive/1998/98-12"), Era::LegacyText);
    }

    #[test]
    fn test_cut_at_section_end_picks_earliest_marker() {
        assert_eq!(cut_at_section_end("Body text. * * * more ### end"), ("Body text.", true));
        assert_eq!(cut_at_section_end("No marker here"), ("No marker here", false));
        assert_eq!(cut_at_section_end("###"), ("", true));
    }

    #[test]
    fn test_fragment_text_keeps_line_breaks() {
        let html = Html::parse_fragment("<p>  First   line<br>second <b>bold</b>\n line<br><br></p>");
        let p = html.select(&Selector::parse("p").unwrap()).next().unwrap();
        assert_eq!(fragment_text(p), "First line\nsecond bold line");
    }

    #[test]
    fn test_row_cells_ignores_nested_tables() {
        let html = Html::parse_document(
            "<table><tr><td>a</td><td><table><tr><td>x</td><td>y</td></tr></table></td></tr></table>",
        );
        let row = html.select(&Selector::parse("tr").unwrap()).next().unwrap();
        assert_eq!(row_cells(row).len(), 2);
    }

    #[tokio::test]
    async fn test_windows_1252_releases_keep_their_dashes() {
        let mut server = mockito::Server::new_async().await;
        let html = server
            .mock("GET", "/r.htm")
            .with_status(200)
            .with_header("content-type", "text/html; charset=windows-1252")
            .with_body(windows_1252(&[
                "<html><body><p>Washington, D.C., May 1, 2000 ",
                " The Commission today announced a settlement with a broker-dealer.</p><p>###</p></body></html>",
            ]))
            .create_async()
            .await;
        let text = server
            .mock("GET", "/r.txt")
            .with_status(200)
            .with_header("content-type", "text/plain; charset=windows-1252")
            .with_body(windows_1252(&[
                "SECURITIES AND EXCHANGE COMMISSION\nWashington, D.C. 20549\n\nWashington, D.C., May 1, 2000 ",
                " Staff today released its annual report\non market structure.\n###\nContact\n",
            ]))
            .create_async()
            .await;

        let fetcher = fetcher();
        let html_body = fetch_release_text(&fetcher, &format!("{}/r.htm", server.url())).await;
        let text_body = fetch_release_text(&fetcher, &format!("{}/r.txt", server.url())).await;

        assert_eq!(html_body, "The Commission today announced a settlement with a broker-dealer.");
        assert_eq!(text_body, "Staff today released its annual report on market structure.");
        html.assert_async().await;
        text.assert_async().await;
    }
}

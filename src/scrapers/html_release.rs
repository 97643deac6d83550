//! Body extraction for HTML-era press releases.
//!
//! HTML releases span a decade of hand-edited markup, so there is no single
//! selector for the body. Extraction runs an ordered chain of strategies and
//! keeps the first one that yields text after cleanup:
//!
//! 1. [`washington_dateline`]: paragraphs from the "Washington, D.C., <date> —"
//!    lead-in (bare or wrapped in `<i>`/`<em>`/`<b>`) up to the section-end
//!    marker
//! 2. [`media_advisory_table`]: the What/Who/When/Where/Contact/Other table
//!    used by media advisories
//! 3. [`heading_accumulation`]: every block after the first heading, minus
//!    page chrome
//!
//! Paragraphs are rendered as plain text separated by blank lines, then
//! passed through [`clean_body`].

use super::{cut_at_section_end, dateline_pattern, fragment_text, raw_fragment_text, row_cells};
use crate::dates::MONTH_PATTERN;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Pure extraction strategy over a parsed document.
type Strategy = fn(&Html) -> Option<Vec<String>>;

const STRATEGIES: [(&str, Strategy); 3] = [
    ("washington_dateline", washington_dateline),
    ("media_advisory_table", media_advisory_table),
    ("heading_accumulation", heading_accumulation),
];

const ADVISORY_FIELDS: [&str; 6] = ["What:", "Who:", "When:", "Where:", "Contact:", "Other:"];

const BOILERPLATE_PREFIXES: [&str; 7] = [
    "FOR IMMEDIATE RELEASE",
    "Modified:",
    "Last modified:",
    "Contact",
    "Employment",
    "Links",
    "FOIA",
];

const CHROME_PREFIXES: [&str; 5] = ["http://", "Home", "Previous Page", "Forms", "Privacy"];

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("paragraph selector"));
static TABLE_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("row selector"));
static BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6, p").expect("block selector"));

static DATE_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i){MONTH_PATTERN}\.?\s+\d{{1,2}},?\s+\d{{4}}")).expect("date regex")
});
static DASH_LEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[—–-]{1,2}\s*").expect("dash lead regex"));
static TRAILING_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"[—–-]\s*$").expect("trailing dash regex"));
static BARE_DATELINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i){}\s*[—–-]{{1,2}}\s*", dateline_pattern())).expect("bare dateline regex")
});
static NEWS_BREADCRUMB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Home\s*>\s*News").expect("breadcrumb regex"));
static AGENCY_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:(?:Board of Governors|Department of|Federal|Office of|Securities)[^\n]*\n\s*)+\d{4}-\d+\s*[—–-]?",
    )
    .expect("agency list regex")
});

static FOOTER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)Home\s*\|\s*Previous Page",
        r"(?i)(?:Last )?Modified:\s*\d{1,2}/\d{1,2}/\d{4}",
        r"(?i)https?://www\.sec\.gov/\S*?\.html?\s*$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("footer regex"))
    .collect()
});
static HEADER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)FOR IMMEDIATE RELEASE[ \t]*(?:\d{4}-\d+)?").expect("release stamp regex"),
        Regex::new(&format!(r"(?i){}[ \t]*(?:[—–-]{{1,2}})?[ \t]*", dateline_pattern()))
            .expect("dateline regex"),
        Regex::new(r"(?i)Joint Release").expect("joint release regex"),
    ]
});
static LINE_DASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*[—–-]{1,2}[ \t]*").expect("line dash regex"));
static EXCESS_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){3,}").expect("blank line regex"));

/// Extract the cleaned body of an HTML release. Empty when no strategy finds
/// any text.
pub fn extract(raw: &str) -> String {
    let document = Html::parse_document(raw);
    for (name, strategy) in STRATEGIES {
        let Some(paragraphs) = strategy(&document) else {
            continue;
        };
        let body = clean_body(&render_paragraphs(&paragraphs));
        if !body.is_empty() {
            debug!(strategy = name, bytes = body.len(), "Extracted HTML release body");
            return body;
        }
    }
    debug!("No extraction strategy produced text");
    String::new()
}

/// Collect paragraphs starting at the Washington dateline.
pub fn washington_dateline(document: &Html) -> Option<Vec<String>> {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut header_found = false;

    for p in document.select(&PARAGRAPH) {
        let text = fragment_text(p);

        if !header_found {
            let Some(lead) = dateline_lead(p, &text) else {
                continue;
            };
            header_found = true;
            let (kept, ended) = cut_at_section_end(&lead);
            if !kept.is_empty() {
                paragraphs.push(kept.to_string());
            }
            if ended {
                break;
            }
            continue;
        }

        let (kept, ended) = cut_at_section_end(&text);
        if !kept.is_empty() && !is_boilerplate(kept) && !paragraphs.iter().any(|seen| seen == kept) {
            paragraphs.push(kept.to_string());
        }
        if ended {
            break;
        }
    }

    non_empty(paragraphs)
}

/// Collect the label/value pairs of a media advisory table.
pub fn media_advisory_table(document: &Html) -> Option<Vec<String>> {
    let mut items = Vec::new();
    for row in document.select(&TABLE_ROW) {
        let cells = row_cells(row);
        if cells.len() < 2 {
            continue;
        }
        let label = fragment_text(cells[0]);
        let Some(field) = ADVISORY_FIELDS.iter().find(|f| label.eq_ignore_ascii_case(f)) else {
            continue;
        };
        let value = fragment_text(cells[1]).replace('\n', " ");
        if !value.is_empty() {
            items.push(format!("{field} {value}"));
        }
    }
    non_empty(items)
}

/// Collect every block after the first heading, skipping page chrome, until
/// a section-end marker. A block starting with an uppercase letter after the
/// first one gets an extra blank line before it.
pub fn heading_accumulation(document: &Html) -> Option<Vec<String>> {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut started = false;

    for block in document.select(&BLOCK) {
        if block.value().name() != "p" {
            started = true;
        }
        if !started {
            continue;
        }

        let text = fragment_text(block);
        let (kept, ended) = cut_at_section_end(&text);
        if !kept.is_empty() && !is_page_chrome(kept) {
            if !paragraphs.is_empty() && kept.starts_with(|c: char| c.is_ascii_uppercase()) {
                paragraphs.push(String::new());
            }
            paragraphs.push(kept.to_string());
        }
        if ended {
            break;
        }
    }

    non_empty(paragraphs)
}

/// Text following the dateline when `p` opens with one, either an emphasized
/// date followed by a dash or a bare "Washington, D.C., <date> —".
fn dateline_lead(p: ElementRef<'_>, text: &str) -> Option<String> {
    if let Some(rest) = emphasized_dateline(p) {
        return Some(rest);
    }
    BARE_DATELINE
        .find(text)
        .map(|m| text[m.end()..].trim().to_string())
}

fn emphasized_dateline(p: ElementRef<'_>) -> Option<String> {
    let first = p
        .children()
        .find(|node| node.value().as_text().is_none_or(|t| !t.trim().is_empty()))
        .and_then(ElementRef::wrap)?;
    if !matches!(first.value().name(), "em" | "i" | "b" | "strong") {
        return None;
    }

    let lead = raw_fragment_text(first);
    if !DATE_TEXT.is_match(&lead) {
        return None;
    }

    let full = raw_fragment_text(p);
    let rest = full.trim_start().strip_prefix(lead.trim_start())?;
    let rest = if TRAILING_DASH.is_match(&lead) {
        rest
    } else {
        let dash = DASH_LEAD.find(rest)?;
        &rest[dash.end()..]
    };

    Some(normalize_lines(rest))
}

fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether a fragment is letterhead, navigation or footer text rather than
/// release body.
pub fn is_boilerplate(text: &str) -> bool {
    AGENCY_LIST.is_match(text)
        || NEWS_BREADCRUMB.is_match(text)
        || BOILERPLATE_PREFIXES.iter().any(|prefix| text.starts_with(prefix))
}

fn is_page_chrome(text: &str) -> bool {
    is_boilerplate(text) || CHROME_PREFIXES.iter().any(|prefix| text.starts_with(prefix))
}

/// Join paragraphs with blank lines. An empty paragraph adds one extra line
/// break instead of a full paragraph gap.
fn render_paragraphs(paragraphs: &[String]) -> String {
    let mut out = String::new();
    for paragraph in paragraphs {
        if paragraph.is_empty() {
            out.push('\n');
            continue;
        }
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(paragraph);
    }
    out
}

/// Strip stamps, datelines, agency blocks, footers and everything after the
/// section-end marker from a rendered body.
pub fn clean_body(text: &str) -> String {
    let mut body = text.to_string();

    for pattern in FOOTER_PATTERNS.iter().chain(HEADER_PATTERNS.iter()) {
        body = pattern.replace_all(&body, "").into_owned();
    }
    body = AGENCY_LIST.replace_all(&body, "").into_owned();
    body = LINE_DASH.replace_all(&body, "").into_owned();

    let (kept, _) = cut_at_section_end(&body);
    let body = EXCESS_BLANK_LINES.replace_all(kept, "\n\n");
    body.trim().to_string()
}

fn non_empty(paragraphs: Vec<String>) -> Option<Vec<String>> {
    if paragraphs.is_empty() { None } else { Some(paragraphs) }
}

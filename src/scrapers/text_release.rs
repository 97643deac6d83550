//! Body extraction for legacy plain-text releases (1997-2001).
//!
//! Text releases carry a letterhead preamble, the dateline, the body and a
//! signature block after a marker line such as `###` or `* * *`. The body is
//! returned as a single whitespace-normalized paragraph.

use super::{SECTION_END_MARKERS, dateline_pattern};
use once_cell::sync::Lazy;
use regex::Regex;

static LEAD_IN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?is)^.*?{}\s*(?:[—–-]{{1,2}})?\s*", dateline_pattern()))
        .expect("lead-in regex")
});
static LEADING_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:-{1,2}|—|–)\s*").expect("leading dash regex"));
static INLINE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\s*[#*](?:\s*[#*]\s*){2,}.*$").expect("inline marker regex"));

/// Extract the body of a plain-text release. Empty when nothing remains.
pub fn extract(raw: &str) -> String {
    let content = LEAD_IN.replace(raw, "");
    let content = LEADING_DASH.replace(content.trim(), "");

    let mut lines = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if SECTION_END_MARKERS.contains(&line) {
            break;
        }
        lines.push(line);
    }

    let text = lines.join(" ").split_whitespace().collect::<Vec<_>>().join(" ");
    INLINE_MARKER.replace(&text, "").trim().to_string()
}

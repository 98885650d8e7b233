//! Content sniffing for uploaded exports.
//!
//! The declared source is always authoritative. Sniffing exists only to warn
//! when an upload looks like it came from a different tool.

use crate::domain::SourceKind;
use crate::io::ingest::{parse_date, parse_month};

/// Markers found in Google Analytics export header blocks (English and Italian UI).
const GA_MARKERS: [&str; 3] = ["Account:", "Esportazione CSV rapporto", "Week Index"];

/// Guess the source of an export from its content.
pub fn sniff_source(content: &str) -> Option<SourceKind> {
    let first_line = content.lines().map(str::trim).find(|l| !l.is_empty())?;
    if first_line.starts_with('#') || GA_MARKERS.iter().any(|m| content.contains(m)) {
        return Some(SourceKind::GoogleAnalytics);
    }

    // Look at the first cell of the first data row.
    let first_cell = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .nth(1)?
        .split(',')
        .next()?
        .trim()
        .trim_matches('"');

    if first_cell.len() == 7 && parse_month(first_cell).is_ok() {
        return Some(SourceKind::Semrush);
    }
    if parse_date(first_cell).is_ok() {
        return Some(SourceKind::Ahrefs);
    }
    None
}

/// Compare the declared source with the sniffed one.
///
/// Returns a warning message on mismatch; the declared source is never overridden.
pub fn confirm_source(declared: SourceKind, content: &str) -> Option<String> {
    let sniffed = sniff_source(content)?;
    if sniffed == declared {
        return None;
    }
    Some(format!(
        "upload declared as {declared} looks like a {sniffed} export; continuing with {declared}"
    ))
}

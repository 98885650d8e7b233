//! CSV ingest and normalization.
//!
//! This module turns one of the supported traffic exports into a
//! [`CanonicalSeries`] of `(date, value)` records.
//!
//! Design goals:
//! - **Explicit contracts**: each [`SourceKind`] declares its required columns
//!   and the synonyms accepted for them (case-insensitive).
//! - **Row-level validation**: bad rows are dropped and reported with their line
//!   number, never silently included.
//! - **Strict series invariants**: sorted, unique dates, non-negative values.

use std::collections::HashMap;
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::domain::{CanonicalSeries, ColumnRole, Observation, SourceKind};
use crate::error::{PipelineError, SchemaError, Stage};
use crate::io::sniff;

/// Google Analytics exports put `# YYYYMMDD-YYYYMMDD` on this (0-based) line.
pub const GA_DATE_RANGE_ROW: usize = 3;

/// Raw uploaded export plus the user-declared source.
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub content: String,
    pub source_kind: SourceKind,
}

impl RawUpload {
    pub fn new(content: impl Into<String>, source_kind: SourceKind) -> Self {
        Self {
            content: content.into(),
            source_kind,
        }
    }

    pub fn from_path(path: &Path, source_kind: SourceKind) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            stage: Stage::Normalizer,
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(content, source_kind))
    }
}

/// Caller-supplied parameters some sources need.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Week-0 date for Google Analytics exports.
    pub start_date: Option<NaiveDate>,
}

/// Where the Google Analytics start date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDateOrigin {
    Explicit,
    ExportHeader,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: canonical series + row diagnostics.
#[derive(Debug, Clone)]
pub struct IngestedSeries {
    pub series: CanonicalSeries,
    pub source_kind: SourceKind,
    pub start_date: Option<(NaiveDate, StartDateOrigin)>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
    /// Set when content sniffing disagrees with the declared source.
    pub sniff_warning: Option<String>,
}

impl IngestedSeries {
    /// Number of rows dropped for unparseable dates or values.
    pub fn dropped(&self) -> usize {
        self.row_errors.len()
    }
}

/// Required-column contract of one source.
struct ColumnContract {
    date_role: ColumnRole,
    date: &'static [&'static str],
    value: &'static [&'static str],
}

const TRAFFIC_COLUMNS: &[&str] = &["Organic Traffic", "Traffic"];

fn contract(kind: SourceKind) -> ColumnContract {
    match kind {
        SourceKind::GoogleAnalytics => ColumnContract {
            date_role: ColumnRole::WeekIndex,
            date: &["Week Index", "Indice settimana", "Week"],
            value: &["Users", "Utenti", "Sessions", "Sessioni", "Organic Traffic", "Traffic"],
        },
        SourceKind::Ahrefs | SourceKind::Semrush => ColumnContract {
            date_role: ColumnRole::Date,
            date: &["Date"],
            value: TRAFFIC_COLUMNS,
        },
    }
}

/// Normalize an upload into a canonical series.
pub fn normalize(upload: &RawUpload, opts: &NormalizeOptions) -> Result<IngestedSeries, SchemaError> {
    let kind = upload.source_kind;

    let sniff_warning = sniff::confirm_source(kind, &upload.content);
    if let Some(warning) = &sniff_warning {
        tracing::warn!("{warning}");
    }

    let start_date = match kind {
        SourceKind::GoogleAnalytics => Some(resolve_start_date(&upload.content, opts.start_date)?),
        SourceKind::Ahrefs | SourceKind::Semrush => None,
    };

    // Leading `#` comment lines and blank lines form the export's header block.
    let (skipped_lines, body) = split_header_block(&upload.content);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SchemaError::Malformed(format!("failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    let contract = contract(kind);
    let date_idx = resolve_column(&header_map, kind, contract.date_role, contract.date)?;
    let value_idx = resolve_column(&header_map, kind, ColumnRole::Value, contract.value)?;

    let mut rows: Vec<(usize, Observation)> = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        rows_read += 1;

        let line = match &result {
            Ok(record) => record.position().map(|p| p.line() as usize),
            Err(e) => e.position().map(|p| p.line() as usize),
        }
        .unwrap_or(idx + 2)
            + skipped_lines;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, kind, date_idx, value_idx, start_date.map(|(d, _)| d)) {
            Ok(obs) => rows.push((line, obs)),
            Err(message) => {
                tracing::debug!(line, %message, "dropping row");
                row_errors.push(RowError { line, message });
            }
        }
    }

    if !row_errors.is_empty() {
        tracing::warn!(
            dropped = row_errors.len(),
            rows_read,
            "dropped rows with unparseable dates or values"
        );
    }

    if rows.is_empty() {
        return Err(SchemaError::NoValidRows {
            rows_read,
            dropped: row_errors.len(),
        });
    }

    rows.sort_by_key(|(line, obs)| (obs.date, *line));
    if let Some(pair) = rows.windows(2).find(|w| w[0].1.date == w[1].1.date) {
        return Err(SchemaError::DuplicateDate {
            date: pair[0].1.date,
            lines: Some((pair[0].0, pair[1].0)),
        });
    }

    let rows_used = rows.len();
    let series = CanonicalSeries::new(rows.into_iter().map(|(_, obs)| obs).collect())?;

    tracing::info!(
        source = %kind,
        rows_read,
        rows_used,
        first = ?series.first_date(),
        last = ?series.last_date(),
        "normalized upload"
    );

    Ok(IngestedSeries {
        series,
        source_kind: kind,
        start_date,
        row_errors,
        rows_read,
        rows_used,
        sniff_warning,
    })
}

fn resolve_start_date(
    content: &str,
    explicit: Option<NaiveDate>,
) -> Result<(NaiveDate, StartDateOrigin), SchemaError> {
    let from_header = header_start_date(content);

    match (explicit, from_header) {
        (Some(explicit), Some(header)) => {
            if explicit != header {
                tracing::warn!(
                    %explicit,
                    %header,
                    "explicit start date differs from the export header; using the explicit date"
                );
            }
            Ok((explicit, StartDateOrigin::Explicit))
        }
        (Some(explicit), None) => Ok((explicit, StartDateOrigin::Explicit)),
        (None, Some(header)) => {
            tracing::info!(start_date = %header, "start date taken from export header");
            Ok((header, StartDateOrigin::ExportHeader))
        }
        (None, None) => Err(SchemaError::MissingParameter {
            name: "start_date",
            hint: "Google Analytics week indices need a week-0 date; pass --start-date YYYYMMDD \
                   or upload an export that keeps its `# YYYYMMDD-YYYYMMDD` header",
        }),
    }
}

/// Extract the start date from a Google Analytics header block.
///
/// The line at [`GA_DATE_RANGE_ROW`] reads `# YYYYMMDD-YYYYMMDD`.
pub fn header_start_date(content: &str) -> Option<NaiveDate> {
    let line = content.lines().nth(GA_DATE_RANGE_ROW)?;
    let range = line.trim().strip_prefix('#')?.trim();
    let start = range.split('-').next()?.trim();
    parse_compact_date(start).ok()
}

/// Parse a `YYYYMMDD` date (the format shared by `--start-date` and the GA header).
pub fn parse_compact_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("Invalid date '{s}'. Expected YYYYMMDD."));
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|e| format!("Invalid date '{s}': {e}"))
}

/// Split off leading comment/blank lines; returns the count and the remaining text.
fn split_header_block(content: &str) -> (usize, &str) {
    let mut offset = 0usize;
    let mut skipped = 0usize;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if !(trimmed.is_empty() || trimmed.starts_with('#')) {
            break;
        }
        offset += line.len();
        skipped += 1;
    }
    (skipped, &content[offset..])
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins for repeated header names.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet tools sometimes emit UTF-8 CSVs with a BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_lowercase()
}

fn resolve_column(
    header_map: &HashMap<String, usize>,
    kind: SourceKind,
    role: ColumnRole,
    accepted: &'static [&'static str],
) -> Result<usize, SchemaError> {
    accepted
        .iter()
        .find_map(|name| header_map.get(&normalize_header_name(name)).copied())
        .ok_or_else(|| SchemaError::MissingColumn {
            kind,
            role,
            accepted: accepted.to_vec(),
        })
}

fn parse_row(
    record: &StringRecord,
    kind: SourceKind,
    date_idx: usize,
    value_idx: usize,
    start_date: Option<NaiveDate>,
) -> Result<Observation, String> {
    let date_cell = get_required(record, date_idx, "date")?;
    let value_cell = get_required(record, value_idx, "value")?;

    let date = match kind {
        SourceKind::GoogleAnalytics => {
            let start = start_date.ok_or_else(|| "Missing start date.".to_string())?;
            week_index_date(start, date_cell)?
        }
        SourceKind::Ahrefs => parse_date(date_cell)?,
        SourceKind::Semrush => parse_month(date_cell)?,
    };
    let value = parse_value(value_cell)?;

    Ok(Observation { date, value })
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, what: &str) -> Result<&'a str, String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing {what}."))
}

fn week_index_date(start: NaiveDate, cell: &str) -> Result<NaiveDate, String> {
    let week = cell
        .parse::<u32>()
        .map_err(|_| format!("Invalid week index '{cell}'."))?;
    start
        .checked_add_signed(Duration::weeks(i64::from(week)))
        .ok_or_else(|| format!("Week index {week} is out of range."))
}

/// Parse a daily date cell.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // Ahrefs emits ISO dates, sometimes with a time part; spreadsheet round-trips
    // turn them into `YYYY/MM/DD` or `DD/MM/YYYY`.
    const FMTS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    const DATETIME_FMTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%SZ"];
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS, YYYY/MM/DD, DD/MM/YYYY."
    ))
}

/// Parse a Semrush `YYYY-MM` cell as the first day of that month.
pub fn parse_month(s: &str) -> Result<NaiveDate, String> {
    let is_month = s.len() == 7
        && s.as_bytes()[4] == b'-'
        && s.bytes().enumerate().all(|(i, b)| i == 4 || b.is_ascii_digit());
    if is_month {
        return NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
            .map_err(|_| format!("Invalid month '{s}'."));
    }
    parse_date(s).map_err(|_| format!("Invalid month '{s}'. Expected YYYY-MM."))
}

/// Parse a traffic count; must be finite and `>= 0`.
pub fn parse_value(s: &str) -> Result<f64, String> {
    let v = match s.parse::<f64>() {
        Ok(v) => v,
        Err(_) => parse_grouped_integer(s).ok_or_else(|| format!("Non-numeric value '{s}'."))?,
    };
    if !v.is_finite() {
        return Err(format!("Non-finite value '{s}'."));
    }
    if v < 0.0 {
        return Err(format!("Negative value '{s}'."));
    }
    Ok(v)
}

/// Integers with comma thousands separators, e.g. `12,345`.
fn parse_grouped_integer(s: &str) -> Option<f64> {
    let mut groups = s.split(',');
    let head = groups.next()?;
    if head.is_empty() || head.len() > 3 || !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut digits = head.to_string();
    let mut saw_group = false;
    for group in groups {
        if group.len() != 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.push_str(group);
        saw_group = true;
    }
    if !saw_group {
        return None;
    }
    digits.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dates(ingest: &IngestedSeries) -> Vec<NaiveDate> {
        ingest.series.points().iter().map(|p| p.date).collect()
    }

    #[test]
    fn ahrefs_one_record_per_row_sorted_non_negative() {
        let csv = "Date,Organic Traffic\n2024-01-03,30\n2024-01-01,10\n2024-01-02,20\n";
        let ingest = normalize(&RawUpload::new(csv, SourceKind::Ahrefs), &NormalizeOptions::default()).unwrap();

        assert_eq!(ingest.series.len(), 3);
        assert_eq!(ingest.dropped(), 0);
        let d = dates(&ingest);
        assert!(d.windows(2).all(|w| w[0] < w[1]));
        assert!(ingest.series.points().iter().all(|p| p.value >= 0.0));
        assert_eq!(ingest.series.points()[0].value, 10.0);
    }

    #[test]
    fn ahrefs_accepts_traffic_synonym_in_any_case() {
        let csv = "date,TRAFFIC,Keywords\n2024-01-01,5,1\n2024-01-02,6,2\n";
        let ingest = normalize(&RawUpload::new(csv, SourceKind::Ahrefs), &NormalizeOptions::default()).unwrap();
        assert_eq!(ingest.series.len(), 2);
        assert_eq!(ingest.series.points()[1].value, 6.0);
    }

    #[test]
    fn missing_traffic_column_is_an_error_not_an_empty_series() {
        for header in ["Date,Visits", "DATE,organic", "Date,Traffico"] {
            let csv = format!("{header}\n2024-01-01,5\n");
            for kind in [SourceKind::Ahrefs, SourceKind::Semrush] {
                let err = normalize(&RawUpload::new(csv.clone(), kind), &NormalizeOptions::default()).unwrap_err();
                assert!(
                    matches!(err, SchemaError::MissingColumn { role: ColumnRole::Value, .. }),
                    "{header}: {err:?}"
                );
            }
        }
    }

    #[test]
    fn missing_date_column_is_reported() {
        let csv = "Day,Organic Traffic\n2024-01-01,5\n";
        let err = normalize(&RawUpload::new(csv, SourceKind::Ahrefs), &NormalizeOptions::default()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn { role: ColumnRole::Date, .. }));
    }

    #[test]
    fn parsed_dates_round_trip_through_iso_output() {
        let csv = "Date,Organic Traffic\n2024-02-28,1\n2024-02-29,2\n2024-03-01T00:00:00,3\n";
        let ingest = normalize(&RawUpload::new(csv, SourceKind::Ahrefs), &NormalizeOptions::default()).unwrap();
        for p in ingest.series.points() {
            let reparsed = parse_date(&p.date.to_string()).unwrap();
            assert_eq!(reparsed, p.date);
        }
    }

    #[test]
    fn google_analytics_week_index_with_explicit_start() {
        let csv = "Week Index,Users\n0,100\n1,110\n2,120\n";
        let opts = NormalizeOptions {
            start_date: Some(ymd(2023, 3, 20)),
        };
        let ingest = normalize(&RawUpload::new(csv, SourceKind::GoogleAnalytics), &opts).unwrap();
        assert_eq!(dates(&ingest), vec![ymd(2023, 3, 20), ymd(2023, 3, 27), ymd(2023, 4, 3)]);
        assert_eq!(ingest.start_date, Some((ymd(2023, 3, 20), StartDateOrigin::Explicit)));
    }

    #[test]
    fn google_analytics_start_date_from_header_block() {
        let csv = "\
# ----------------------------------------
# Tutti i dati del sito web
# Panoramica del pubblico
# 20230320-20230409
# ----------------------------------------

Indice settimana,Utenti
0,100
1,\"1,250\"
2,120

,1470
";
        let ingest = normalize(
            &RawUpload::new(csv, SourceKind::GoogleAnalytics),
            &NormalizeOptions::default(),
        )
        .unwrap();
        assert_eq!(dates(&ingest), vec![ymd(2023, 3, 20), ymd(2023, 3, 27), ymd(2023, 4, 3)]);
        assert_eq!(ingest.series.points()[1].value, 1250.0);
        assert_eq!(ingest.start_date, Some((ymd(2023, 3, 20), StartDateOrigin::ExportHeader)));
        // The trailing total row has no week index.
        assert_eq!(ingest.dropped(), 1);
        assert!(ingest.row_errors[0].message.contains("Missing date"));
    }

    #[test]
    fn explicit_start_date_wins_over_header() {
        let csv = "# a\n# b\n# c\n# 20230320-20230409\n\nWeek Index,Users\n0,1\n1,2\n";
        let opts = NormalizeOptions {
            start_date: Some(ymd(2023, 1, 2)),
        };
        let ingest = normalize(&RawUpload::new(csv, SourceKind::GoogleAnalytics), &opts).unwrap();
        assert_eq!(ingest.series.first_date(), Some(ymd(2023, 1, 2)));
    }

    #[test]
    fn google_analytics_without_start_date_fails() {
        let csv = "Week Index,Users\n0,100\n";
        let err = normalize(
            &RawUpload::new(csv, SourceKind::GoogleAnalytics),
            &NormalizeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::MissingParameter { name: "start_date", .. }));
    }

    #[test]
    fn semrush_month_gets_first_day() {
        let csv = "Date,Organic Traffic,Organic Keywords\n2024-01,1000,50\n2024-02,1100,55\n";
        let ingest = normalize(&RawUpload::new(csv, SourceKind::Semrush), &NormalizeOptions::default()).unwrap();
        assert_eq!(dates(&ingest), vec![ymd(2024, 1, 1), ymd(2024, 2, 1)]);
    }

    #[test]
    fn bad_rows_are_dropped_and_counted() {
        let csv = "Date,Organic Traffic\n2024-01-01,10\nnot-a-date,5\n2024-01-03,n/a\n2024-01-04,-2\n2024-01-05,7\n";
        let ingest = normalize(&RawUpload::new(csv, SourceKind::Ahrefs), &NormalizeOptions::default()).unwrap();
        assert_eq!(ingest.rows_read, 5);
        assert_eq!(ingest.rows_used, 2);
        assert_eq!(ingest.dropped(), 3);
        let lines: Vec<usize> = ingest.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
    }

    #[test]
    fn duplicate_dates_are_rejected() {
        let csv = "Date,Organic Traffic\n2024-01-01,10\n2024-01-02,5\n2024-01-01,7\n";
        let err = normalize(&RawUpload::new(csv, SourceKind::Ahrefs), &NormalizeOptions::default()).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateDate {
                date: ymd(2024, 1, 1),
                lines: Some((2, 4)),
            }
        );
    }

    #[test]
    fn all_rows_invalid_is_an_error() {
        let csv = "Date,Organic Traffic\nfoo,1\nbar,2\n";
        let err = normalize(&RawUpload::new(csv, SourceKind::Ahrefs), &NormalizeOptions::default()).unwrap_err();
        assert_eq!(err, SchemaError::NoValidRows { rows_read: 2, dropped: 2 });
    }

    #[test]
    fn compact_dates_are_strict() {
        assert_eq!(parse_compact_date("20230320").unwrap(), ymd(2023, 3, 20));
        assert!(parse_compact_date("2023-03-20").is_err());
        assert!(parse_compact_date("20231340").is_err());
    }

    #[test]
    fn grouped_integers_parse() {
        assert_eq!(parse_value("12,345").unwrap(), 12345.0);
        assert_eq!(parse_value("1,234,567").unwrap(), 1234567.0);
        assert!(parse_value("12,34").is_err());
        assert_eq!(parse_value("3.5").unwrap(), 3.5);
    }

    #[test]
    fn hash_prefixed_body_row_is_dropped_and_counted() {
        let csv = "Date,Organic Traffic\n2024-01-01,1\n# 2024-01-02,2\n2024-01-03,3\n";
        let ingest = normalize(&RawUpload::new(csv, SourceKind::Ahrefs), &NormalizeOptions::default()).unwrap();
        assert_eq!(ingest.series.len(), 2);
        assert_eq!(ingest.rows_read, 3);
        assert_eq!(ingest.dropped(), 1);
        assert_eq!(ingest.row_errors[0].line, 3);
    }

    #[test]
    fn bom_prefixed_header_is_matched() {
        let csv = "\u{feff}Date,Organic Traffic\n2024-01-01,1\n2024-01-02,2\n";
        let ingest = normalize(&RawUpload::new(csv, SourceKind::Ahrefs), &NormalizeOptions::default()).unwrap();
        assert_eq!(ingest.series.len(), 2);
    }
}

//! Reporting: narrative text and the machine-readable run summary.

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::{CALENDAR_VERSION, HolidayCalendar};
use crate::domain::{ComparisonResult, ModelDiagnostics, SourceKind};
use crate::forecast::ForecastOutcome;
use crate::io::ingest::{IngestedSeries, StartDateOrigin};

pub mod format;

pub use format::*;

/// JSON summary of one forecast run (`--json PATH`).
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub source: SourceKind,
    pub start_date: Option<NaiveDate>,
    pub start_date_origin: Option<&'static str>,
    pub rows_read: usize,
    pub rows_used: usize,
    pub rows_dropped: usize,
    pub history_start: Option<NaiveDate>,
    pub history_end: Option<NaiveDate>,
    pub forecast_end: Option<NaiveDate>,
    pub calendar_version: &'static str,
    pub holiday_days_before: u32,
    pub holiday_days_after: u32,
    pub model: ModelDiagnostics,
    pub comparison: ComparisonResult,
}

impl RunSummary {
    pub fn new(
        ingest: &IngestedSeries,
        calendar: &HolidayCalendar,
        forecast: &ForecastOutcome,
        comparison: &ComparisonResult,
    ) -> Self {
        let window = calendar.window();
        Self {
            source: ingest.source_kind,
            start_date: ingest.start_date.map(|(d, _)| d),
            start_date_origin: ingest.start_date.map(|(_, origin)| match origin {
                StartDateOrigin::Explicit => "explicit",
                StartDateOrigin::ExportHeader => "export_header",
            }),
            rows_read: ingest.rows_read,
            rows_used: ingest.rows_used,
            rows_dropped: ingest.dropped(),
            history_start: ingest.series.first_date(),
            history_end: ingest.series.last_date(),
            forecast_end: forecast.series.last_date(),
            calendar_version: CALENDAR_VERSION,
            holiday_days_before: window.days_before,
            holiday_days_after: window.days_after,
            model: forecast.diagnostics.clone(),
            comparison: *comparison,
        }
    }
}

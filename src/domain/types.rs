//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages by value
//! - exported to CSV/JSON
//! - printed in the terminal summary

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::calendar::EffectWindow;
use crate::error::SchemaError;

/// Days to forecast past the last input date.
pub const DEFAULT_HORIZON_DAYS: u32 = 365;

/// Length of each comparison window.
pub const DEFAULT_WINDOW_DAYS: u32 = 365;

/// Upper bound accepted for the horizon and comparison window (about a century).
pub const MAX_SPAN_DAYS: u32 = 36_525;

/// Upper bound accepted on either side of a holiday effect window.
pub const MAX_HOLIDAY_WINDOW_DAYS: u32 = 365;

/// File name offered for the forecast download.
pub const EXPORT_FILENAME: &str = "previsioni_traffico_futuro.csv";

/// Media type of the forecast download.
pub const EXPORT_MEDIA_TYPE: &str = "text/csv";

/// Which tool produced the uploaded export.
///
/// The user-declared value is authoritative; content sniffing only warns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Google Analytics weekly-index export.
    #[value(name = "ga", alias = "google-analytics")]
    GoogleAnalytics,
    /// Ahrefs daily organic traffic export.
    Ahrefs,
    /// Semrush monthly organic traffic export.
    Semrush,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::GoogleAnalytics, SourceKind::Ahrefs, SourceKind::Semrush];

    pub fn display_name(self) -> &'static str {
        match self {
            SourceKind::GoogleAnalytics => "Google Analytics",
            SourceKind::Ahrefs => "Ahrefs",
            SourceKind::Semrush => "Semrush",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Role a column plays in a source's required-column contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Date,
    WeekIndex,
    Value,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnRole::Date => "date",
            ColumnRole::WeekIndex => "week index",
            ColumnRole::Value => "value",
        };
        f.write_str(name)
    }
}

/// Output language for the narrative summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    It,
}

/// One `(date, value)` record of the canonical series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(rename = "ds")]
    pub date: NaiveDate,
    #[serde(rename = "y")]
    pub value: f64,
}

/// Normalized traffic history: sorted ascending, unique dates, values `>= 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalSeries {
    points: Vec<Observation>,
}

impl CanonicalSeries {
    /// Sort and validate observations.
    ///
    /// Duplicate dates are rejected rather than merged.
    pub fn new(mut points: Vec<Observation>) -> Result<Self, SchemaError> {
        if let Some(bad) = points.iter().find(|p| !(p.value.is_finite() && p.value >= 0.0)) {
            return Err(SchemaError::Malformed(format!(
                "value {} on {} is not a non-negative number",
                bad.value, bad.date
            )));
        }

        points.sort_by_key(|p| p.date);
        if let Some(pair) = points.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(SchemaError::DuplicateDate {
                date: pair[0].date,
                lines: None,
            });
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Dates are unique, so this equals `len()`.
    pub fn distinct_dates(&self) -> usize {
        self.points.len()
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }
}

/// One row of the forecast, including the additive components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub trend: f64,
    pub yearly: f64,
    pub weekly: f64,
    pub holidays: f64,
}

/// Predicted series over the history dates plus the requested horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSeries {
    pub points: Vec<ForecastPoint>,
    /// Last date of the input history; later rows are projections.
    pub history_end: NaiveDate,
}

impl ForecastSeries {
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.ds)
    }

    /// Rows strictly after the input history.
    pub fn projected(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(move |p| p.ds > self.history_end)
    }
}

/// Diagnostics of the selected forecasting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDiagnostics {
    pub label: String,
    pub changepoints: usize,
    pub yearly_order: usize,
    pub weekly_order: usize,
    pub holiday_regressors: usize,
    pub n: usize,
    pub sse: f64,
    pub rmse: f64,
    pub bic: f64,
    pub candidates_fitted: usize,
    pub candidates_skipped: usize,
}

/// Half-open date window `(start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start_exclusive: NaiveDate,
    pub end_inclusive: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date > self.start_exclusive && date <= self.end_inclusive
    }

    pub fn days(&self) -> i64 {
        (self.end_inclusive - self.start_exclusive).num_days()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", self.start_exclusive, self.end_inclusive)
    }
}

/// Direction of the period-over-period change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increase,
    Decrease,
    Unchanged,
}

impl Trend {
    /// Derived from the percent change itself, so label and sign always agree.
    pub fn from_percent(percent_change: f64) -> Self {
        if percent_change > 0.0 {
            Trend::Increase
        } else if percent_change < 0.0 {
            Trend::Decrease
        } else {
            Trend::Unchanged
        }
    }

    pub fn label(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Trend::Increase, Locale::En) => "increase",
            (Trend::Decrease, Locale::En) => "decrease",
            (Trend::Unchanged, Locale::En) => "no change",
            (Trend::Increase, Locale::It) => "aumento",
            (Trend::Decrease, Locale::It) => "diminuzione",
            (Trend::Unchanged, Locale::It) => "nessuna variazione",
        }
    }
}

/// Trailing period-over-period comparison on the forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub window_days: u32,
    pub period_a: DateWindow,
    pub period_b: DateWindow,
    pub sum_a: f64,
    pub sum_b: f64,
    pub percent_change: f64,
    pub trend: Trend,
}

/// A full run's configuration as understood by the pipeline.
///
/// Derived from CLI flags (with env fallbacks) plus defaults.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub source: SourceKind,
    /// Google Analytics week-0 date; overrides the export header when set.
    pub start_date: Option<NaiveDate>,
    pub horizon_days: u32,
    pub window_days: u32,
    pub holiday_window: EffectWindow,
    pub locale: Locale,
    pub export: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

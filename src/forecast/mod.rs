//! Forecast adapter.
//!
//! The pipeline talks to a forecasting engine only through [`ForecastEngine`] /
//! [`FittedModel`], using the engine's row shapes:
//!
//! - history: `{ds, y}`
//! - holidays: `{holiday, ds, lower_window, upper_window}`
//! - predictions: `{ds, yhat, yhat_lower, yhat_upper, ...components}`
//!
//! [`forecast_series`] translates the canonical series and holiday calendar into
//! those shapes, requests the horizon, and translates the predictions back.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{EffectWindow, HolidayCalendar};
use crate::domain::{CanonicalSeries, ForecastPoint, ForecastSeries, ModelDiagnostics};
use crate::error::{ModelError, PipelineError};

pub mod additive;

pub use additive::{AdditiveEngine, AdditiveForecaster};

/// Fewest distinct dates an engine needs to fit a trend.
pub const MIN_DISTINCT_DATES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub ds: NaiveDate,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayRow {
    pub holiday: String,
    pub ds: NaiveDate,
    /// Days before the event, as a non-positive offset.
    pub lower_window: i32,
    /// Days after the event.
    pub upper_window: i32,
}

impl HolidayRow {
    /// Effect window of the row; a positive `lower_window` or negative
    /// `upper_window` contributes no days.
    pub fn window(&self) -> EffectWindow {
        EffectWindow {
            days_before: self.lower_window.min(0).unsigned_abs(),
            days_after: self.upper_window.max(0).unsigned_abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub ds: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub trend: f64,
    pub yearly: f64,
    pub weekly: f64,
    pub holidays: f64,
}

/// A forecasting capability that can be fitted on history plus holidays.
pub trait ForecastEngine {
    type Model: FittedModel;

    /// `history` is sorted ascending with unique dates.
    fn fit(&self, history: &[HistoryRow], holidays: &[HolidayRow]) -> Result<Self::Model, ModelError>;
}

/// A fitted model.
pub trait FittedModel {
    /// History dates followed by future dates, at the history's spacing, up to
    /// `horizon_days` days past the history end.
    fn make_future_dates(&self, horizon_days: u32) -> Vec<NaiveDate>;

    fn predict(&self, dates: &[NaiveDate]) -> Vec<PredictionRow>;

    fn diagnostics(&self) -> ModelDiagnostics;
}

/// Result of the adapter: the forecast plus what was fitted.
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    pub series: ForecastSeries,
    pub diagnostics: ModelDiagnostics,
}

pub fn to_history_rows(series: &CanonicalSeries) -> Vec<HistoryRow> {
    series
        .points()
        .iter()
        .map(|o| HistoryRow { ds: o.date, y: o.value })
        .collect()
}

pub fn to_holiday_rows(calendar: &HolidayCalendar) -> Vec<HolidayRow> {
    let window = calendar.window();
    let lower = -i32::try_from(window.days_before).unwrap_or(i32::MAX);
    let upper = i32::try_from(window.days_after).unwrap_or(i32::MAX);
    calendar
        .events()
        .iter()
        .map(|e| HolidayRow {
            holiday: e.name.to_string(),
            ds: e.date,
            lower_window: lower,
            upper_window: upper,
        })
        .collect()
}

fn from_prediction(row: PredictionRow) -> ForecastPoint {
    ForecastPoint {
        ds: row.ds,
        yhat: row.yhat,
        yhat_lower: row.yhat_lower,
        yhat_upper: row.yhat_upper,
        trend: row.trend,
        yearly: row.yearly,
        weekly: row.weekly,
        holidays: row.holidays,
    }
}

/// Fit `engine` on the series and predict through `horizon_days` past its end.
pub fn forecast_series<E: ForecastEngine>(
    engine: &E,
    series: &CanonicalSeries,
    calendar: &HolidayCalendar,
    horizon_days: u32,
) -> Result<ForecastOutcome, PipelineError> {
    let distinct_dates = series.distinct_dates();
    let Some(history_end) = series.last_date().filter(|_| distinct_dates >= MIN_DISTINCT_DATES) else {
        return Err(PipelineError::InsufficientData {
            distinct_dates,
            required: MIN_DISTINCT_DATES,
        });
    };

    if history_end
        .checked_add_signed(chrono::Duration::days(i64::from(horizon_days)))
        .is_none()
    {
        return Err(PipelineError::InvalidHorizon { horizon_days });
    }

    let history = to_history_rows(series);
    let holidays = to_holiday_rows(calendar);
    tracing::info!(
        rows = history.len(),
        holidays = holidays.len(),
        horizon_days,
        "fitting forecast model"
    );

    let model = engine.fit(&history, &holidays)?;
    let dates = model.make_future_dates(horizon_days);
    let points: Vec<ForecastPoint> = model.predict(&dates).into_iter().map(from_prediction).collect();
    if points.is_empty() {
        return Err(PipelineError::EmptyForecast);
    }

    let diagnostics = model.diagnostics();
    tracing::info!(model = %diagnostics.label, rmse = diagnostics.rmse, points = points.len(), "forecast ready");

    Ok(ForecastOutcome {
        series: ForecastSeries { points, history_end },
        diagnostics,
    })
}

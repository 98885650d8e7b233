//! Trailing period-over-period comparison on a forecast.
//!
//! With `W = window_days` and `max` the last forecast date:
//!
//! ```text
//! period_b = (max - W,  max    ]
//! period_a = (max - 2W, max - W]
//! percent_change = (sum_b - sum_a) / sum_a * 100
//! ```

use chrono::Duration;

use crate::domain::{ComparisonResult, DateWindow, ForecastSeries, Trend};
use crate::error::PipelineError;

/// Compare the trailing `window_days` of `forecast` with the window before it.
///
/// Sums use `yhat`. A zero baseline is an error rather than an infinite change.
pub fn compare_trailing_windows(forecast: &ForecastSeries, window_days: u32) -> Result<ComparisonResult, PipelineError> {
    if window_days == 0 {
        return Err(PipelineError::InvalidWindow { window_days });
    }
    let max_date = forecast.last_date().ok_or(PipelineError::EmptyForecast)?;

    // Windows reaching before the first representable date are rejected.
    let w = Duration::days(i64::from(window_days));
    let split = max_date
        .checked_sub_signed(w)
        .ok_or(PipelineError::InvalidWindow { window_days })?;
    let first = split
        .checked_sub_signed(w)
        .ok_or(PipelineError::InvalidWindow { window_days })?;
    let period_b = DateWindow {
        start_exclusive: split,
        end_inclusive: max_date,
    };
    let period_a = DateWindow {
        start_exclusive: first,
        end_inclusive: split,
    };

    let sum_in = |window: &DateWindow| -> f64 {
        forecast
            .points
            .iter()
            .filter(|p| window.contains(p.ds))
            .map(|p| p.yhat)
            .sum()
    };
    let sum_a = sum_in(&period_a);
    let sum_b = sum_in(&period_b);

    if sum_a == 0.0 {
        return Err(PipelineError::DivisionByZero {
            window: period_a,
            sum_b,
        });
    }

    let percent_change = (sum_b - sum_a) / sum_a * 100.0;
    tracing::debug!(%period_a, %period_b, sum_a, sum_b, percent_change, "compared trailing windows");

    Ok(ComparisonResult {
        window_days,
        period_a,
        period_b,
        sum_a,
        sum_b,
        percent_change,
        trend: Trend::from_percent(percent_change),
    })
}

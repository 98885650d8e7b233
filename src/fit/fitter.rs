//! Low-level fitting routines for a single candidate configuration.
//!
//! Given:
//! - a prepared history (scaled time, scaled values)
//! - holiday regressors
//! - a candidate spec (changepoint count, Fourier orders)
//!
//! we build the design matrix, solve the ridge-penalized least squares problem,
//! and report SSE / RMSE / BIC for model selection.

use chrono::{Duration, Months, NaiveDate};
use nalgebra::{DMatrix, DVector};

use crate::error::ModelError;
use crate::fit::changepoints::changepoint_grid;
use crate::forecast::HistoryRow;
use crate::math::solve_ridge;
use crate::models::{HolidayRegressor, ModelLayout, RowTime, fill_design_row, predict_components};

/// Mean squared errors below this (scaled units) are numerical noise.
const MSE_FLOOR: f64 = 1e-12;

/// Mean Gregorian month length in days.
const MONTH_DAYS: f64 = 30.436_875;

/// Spacing at which future dates continue the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Days(u32),
    Months(u32),
}

impl Cadence {
    /// The date `k` steps after `from`, or `None` past the calendar range.
    pub fn step(self, from: NaiveDate, k: u32) -> Option<NaiveDate> {
        match self {
            Cadence::Days(d) => from.checked_add_signed(Duration::days(i64::from(d) * i64::from(k))),
            Cadence::Months(m) => from.checked_add_months(Months::new(m.checked_mul(k)?)),
        }
    }
}

/// Ridge penalties (in scaled units) applied during fitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Weight on hinge (rate change) coefficients.
    pub changepoint_penalty: f64,
    /// Weight on Fourier coefficients.
    pub seasonality_penalty: f64,
    /// Weight on holiday indicator coefficients.
    pub holiday_penalty: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            changepoint_penalty: 1.0,
            seasonality_penalty: 1e-3,
            holiday_penalty: 1e-2,
        }
    }
}

/// History in the coordinates the model is fitted in.
#[derive(Debug, Clone)]
pub struct PreparedHistory {
    pub rows: Vec<RowTime>,
    /// Values divided by `y_scale`.
    pub y: Vec<f64>,
    pub y_scale: f64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Days between the first and last history date (at least 1).
    pub span_days: f64,
}

impl PreparedHistory {
    /// Scale time to `[0, 1]` and values by `max |y|`.
    ///
    /// `history` must be sorted ascending by date.
    pub fn new(history: &[HistoryRow]) -> Result<Self, ModelError> {
        let (Some(first), Some(last)) = (history.first(), history.last()) else {
            return Err(ModelError::EmptyHistory);
        };
        let start = first.ds;
        let end = last.ds;
        let span_days = ((end - start).num_days() as f64).max(1.0);

        let y_max = history.iter().map(|r| r.y.abs()).fold(0.0, f64::max);
        let y_scale = if y_max > 0.0 { y_max } else { 1.0 };

        let mut prepared = Self {
            rows: Vec::with_capacity(history.len()),
            y: history.iter().map(|r| r.y / y_scale).collect(),
            y_scale,
            start,
            end,
            span_days,
        };
        prepared.rows = history.iter().map(|r| prepared.row_time(r.ds)).collect();
        Ok(prepared)
    }

    pub fn n(&self) -> usize {
        self.y.len()
    }

    /// Time coordinates of any date (history or future).
    pub fn row_time(&self, date: NaiveDate) -> RowTime {
        let epoch_days = date.signed_duration_since(NaiveDate::default()).num_days() as f64;
        RowTime {
            date,
            t: (date - self.start).num_days() as f64 / self.span_days,
            epoch_days,
        }
    }

    /// Median gap between consecutive history dates, in days.
    pub fn median_spacing_days(&self) -> f64 {
        let mut gaps: Vec<i64> = self
            .rows
            .windows(2)
            .map(|w| (w[1].date - w[0].date).num_days())
            .collect();
        if gaps.is_empty() {
            return 0.0;
        }
        gaps.sort_unstable();
        gaps[gaps.len() / 2] as f64
    }

    /// Daily, weekly or monthly continuation of the history dates.
    ///
    /// Gaps of four weeks or more are counted in calendar months so monthly
    /// exports stay on the first of the month.
    pub fn cadence(&self) -> Cadence {
        let median = self.median_spacing_days();
        if median >= 28.0 {
            Cadence::Months(((median / MONTH_DAYS).round() as u32).max(1))
        } else {
            Cadence::Days(median.max(1.0) as u32)
        }
    }
}

/// One point in the configuration search space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateSpec {
    pub n_changepoints: usize,
    pub yearly_order: usize,
    pub weekly_order: usize,
}

impl CandidateSpec {
    pub const TREND_ONLY: CandidateSpec = CandidateSpec {
        n_changepoints: 0,
        yearly_order: 0,
        weekly_order: 0,
    };

    pub fn label(&self) -> String {
        format!(
            "cp={} yearly={} weekly={}",
            self.n_changepoints, self.yearly_order, self.weekly_order
        )
    }
}

/// Fitted coefficients and diagnostics for one candidate.
#[derive(Debug, Clone)]
pub struct CandidateFit {
    pub spec: CandidateSpec,
    pub layout: ModelLayout,
    pub betas: Vec<f64>,
    /// SSE in scaled units.
    pub sse: f64,
    /// RMSE in original units.
    pub rmse: f64,
    pub bic: f64,
    /// Residual standard deviation in scaled units.
    pub sigma: f64,
}

/// Fit one candidate configuration.
pub fn fit_candidate(
    history: &PreparedHistory,
    holidays: &[HolidayRegressor],
    spec: &CandidateSpec,
    opts: &FitOptions,
) -> Result<CandidateFit, ModelError> {
    let n = history.n();
    if n == 0 {
        return Err(ModelError::EmptyHistory);
    }

    let t: Vec<f64> = history.rows.iter().map(|r| r.t).collect();
    let layout = ModelLayout {
        changepoints: changepoint_grid(&t, spec.n_changepoints),
        yearly_order: spec.yearly_order,
        weekly_order: spec.weekly_order,
        n_holidays: holidays.len(),
    };
    let p = layout.beta_len();

    let mut x = DMatrix::<f64>::zeros(n, p);
    let mut row = vec![0.0; p];
    for (i, rt) in history.rows.iter().enumerate() {
        fill_design_row(&layout, holidays, rt, &mut row);
        for (j, v) in row.iter().enumerate() {
            x[(i, j)] = *v;
        }
    }
    let y = DVector::from_column_slice(&history.y);

    let penalties = layout.penalties(opts.changepoint_penalty, opts.seasonality_penalty, opts.holiday_penalty);
    let beta = solve_ridge(&x, &y, &penalties).ok_or_else(|| ModelError::Singular(spec.label()))?;
    let betas: Vec<f64> = beta.iter().copied().collect();

    let sse: f64 = history
        .rows
        .iter()
        .zip(history.y.iter())
        .map(|(rt, &yi)| {
            let r = yi - predict_components(&layout, holidays, &betas, rt).total();
            r * r
        })
        .sum();

    let k = layout.param_count();
    let n_f = n as f64;
    let bic = n_f * (sse / n_f).max(MSE_FLOOR).ln() + k as f64 * n_f.ln();
    let rmse = (sse / n_f).sqrt() * history.y_scale;
    let dof = n.saturating_sub(k).max(1) as f64;
    let sigma = (sse / dof).sqrt();

    Ok(CandidateFit {
        spec: *spec,
        layout,
        betas,
        sse,
        rmse,
        bic,
        sigma,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_history(n: usize) -> Vec<HistoryRow> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| HistoryRow {
                ds: start + chrono::Duration::days(i as i64),
                y: 100.0 + 2.0 * i as f64,
            })
            .collect()
    }

    #[test]
    fn prepared_history_scales_to_unit_interval() {
        let h = PreparedHistory::new(&linear_history(11)).unwrap();
        assert_eq!(h.rows[0].t, 0.0);
        assert!((h.rows[10].t - 1.0).abs() < 1e-12);
        assert!((h.y_scale - 120.0).abs() < 1e-12);
        assert!((h.y[10] - 1.0).abs() < 1e-12);
        assert_eq!(h.median_spacing_days(), 1.0);
    }

    fn dated(dates: &[NaiveDate]) -> PreparedHistory {
        let rows: Vec<HistoryRow> = dates.iter().map(|&ds| HistoryRow { ds, y: 1.0 }).collect();
        PreparedHistory::new(&rows).unwrap()
    }

    #[test]
    fn cadence_follows_history_spacing() {
        let ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(PreparedHistory::new(&linear_history(5)).unwrap().cadence(), Cadence::Days(1));

        let weekly = dated(&[ymd(2024, 1, 1), ymd(2024, 1, 8), ymd(2024, 1, 15)]);
        assert_eq!(weekly.cadence(), Cadence::Days(7));

        let monthly = dated(&[ymd(2024, 1, 1), ymd(2024, 2, 1), ymd(2024, 3, 1), ymd(2024, 4, 1)]);
        assert_eq!(monthly.cadence(), Cadence::Months(1));
        assert_eq!(Cadence::Months(1).step(ymd(2024, 4, 1), 10), Some(ymd(2025, 2, 1)));
        assert_eq!(Cadence::Days(7).step(NaiveDate::MAX, 1), None);
    }

    #[test]
    fn empty_history_is_rejected() {
        assert_eq!(PreparedHistory::new(&[]).unwrap_err(), ModelError::EmptyHistory);
    }

    #[test]
    fn trend_only_recovers_linear_series() {
        let h = PreparedHistory::new(&linear_history(60)).unwrap();
        let fit = fit_candidate(&h, &[], &CandidateSpec::TREND_ONLY, &FitOptions::default()).unwrap();
        assert!(fit.rmse < 1e-6, "rmse={}", fit.rmse);

        // Extrapolate 10 days past the end: 100 + 2 * 69 = 238.
        let future = h.row_time(h.end + chrono::Duration::days(10));
        let yhat = predict_components(&fit.layout, &[], &fit.betas, &future).total() * h.y_scale;
        assert!((yhat - 238.0).abs() < 1e-6, "yhat={yhat}");
    }

    #[test]
    fn bic_penalizes_extra_parameters_on_a_line() {
        let h = PreparedHistory::new(&linear_history(60)).unwrap();
        let opts = FitOptions::default();
        let simple = fit_candidate(&h, &[], &CandidateSpec::TREND_ONLY, &opts).unwrap();
        let wiggly = fit_candidate(
            &h,
            &[],
            &CandidateSpec {
                n_changepoints: 10,
                yearly_order: 0,
                weekly_order: 3,
            },
            &opts,
        )
        .unwrap();
        assert!(wiggly.layout.param_count() > simple.layout.param_count());
        assert!(simple.bic <= wiggly.bic + 1e-9);
    }
}

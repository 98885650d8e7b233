//! The built-in additive forecasting engine.
//!
//! trend (piecewise linear) + yearly + weekly Fourier seasonality + holiday
//! indicators, fitted by ridge least squares with BIC configuration search.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};

use crate::domain::ModelDiagnostics;
use crate::error::ModelError;
use crate::fit::{FitOptions, FitSelection, PreparedHistory, fit_and_select};
use crate::forecast::{FittedModel, ForecastEngine, HistoryRow, HolidayRow, PredictionRow};
use crate::models::{HolidayRegressor, build_holiday_regressors, predict_components};

/// Two-sided 80% normal quantile.
const Z_80: f64 = 1.281_551_565_545;

#[derive(Debug, Clone, Copy, Default)]
pub struct AdditiveEngine {
    pub options: FitOptions,
}

impl AdditiveEngine {
    pub fn new(options: FitOptions) -> Self {
        Self { options }
    }
}

/// Fitted additive model.
#[derive(Debug, Clone)]
pub struct AdditiveForecaster {
    history: PreparedHistory,
    holidays: Vec<HolidayRegressor>,
    selection: FitSelection,
}

impl AdditiveForecaster {
    pub fn selection(&self) -> &FitSelection {
        &self.selection
    }
}

impl ForecastEngine for AdditiveEngine {
    type Model = AdditiveForecaster;

    fn fit(&self, history: &[HistoryRow], holidays: &[HolidayRow]) -> Result<AdditiveForecaster, ModelError> {
        let prepared = PreparedHistory::new(history)?;

        // Regressors that never fire inside the history cannot be estimated.
        let observed: HashSet<NaiveDate> = history.iter().map(|r| r.ds).collect();
        let regressors: Vec<HolidayRegressor> = build_holiday_regressors(holidays)
            .into_iter()
            .filter(|r| r.active.iter().any(|d| observed.contains(d)))
            .collect();
        tracing::debug!(regressors = regressors.len(), "holiday regressors in range");

        let selection = fit_and_select(&prepared, &regressors, &self.options)?;
        Ok(AdditiveForecaster {
            history: prepared,
            holidays: regressors,
            selection,
        })
    }
}

impl FittedModel for AdditiveForecaster {
    fn make_future_dates(&self, horizon_days: u32) -> Vec<NaiveDate> {
        let end = self.history.end;
        let cadence = self.history.cadence();
        let limit = end
            .checked_add_signed(Duration::days(i64::from(horizon_days)))
            .unwrap_or(NaiveDate::MAX);
        let future = (1..)
            .map_while(|k| cadence.step(end, k))
            .take_while(|d| *d <= limit);
        self.history.rows.iter().map(|r| r.date).chain(future).collect()
    }

    fn predict(&self, dates: &[NaiveDate]) -> Vec<PredictionRow> {
        let best = &self.selection.best;
        let scale = self.history.y_scale;
        let base_width = Z_80 * best.sigma * scale;

        dates
            .iter()
            .map(|&ds| {
                let rt = self.history.row_time(ds);
                let c = predict_components(&best.layout, &self.holidays, &best.betas, &rt).scaled(scale);
                let yhat = c.total();
                let h = (ds - self.history.end).num_days().max(0) as f64;
                let width = base_width * (1.0 + h / self.history.span_days).sqrt();
                PredictionRow {
                    ds,
                    yhat,
                    yhat_lower: yhat - width,
                    yhat_upper: yhat + width,
                    trend: c.trend,
                    yearly: c.yearly,
                    weekly: c.weekly,
                    holidays: c.holidays,
                }
            })
            .collect()
    }

    fn diagnostics(&self) -> ModelDiagnostics {
        let best = &self.selection.best;
        ModelDiagnostics {
            label: best.spec.label(),
            changepoints: best.layout.changepoints.len(),
            yearly_order: best.layout.yearly_order,
            weekly_order: best.layout.weekly_order,
            holiday_regressors: self.holidays.len(),
            n: self.history.n(),
            sse: best.sse * self.history.y_scale * self.history.y_scale,
            rmse: best.rmse,
            bic: best.bic,
            candidates_fitted: self.selection.fits.len(),
            candidates_skipped: self.selection.skipped.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily(n: usize, f: impl Fn(usize) -> f64) -> Vec<HistoryRow> {
        let start = ymd(2023, 1, 2);
        (0..n)
            .map(|i| HistoryRow {
                ds: start + Duration::days(i as i64),
                y: f(i),
            })
            .collect()
    }

    #[test]
    fn linear_history_extrapolates_linearly() {
        let history = daily(100, |i| 1000.0 + 5.0 * i as f64);
        let model = AdditiveEngine::default().fit(&history, &[]).unwrap();
        let dates = model.make_future_dates(30);
        assert_eq!(dates.len(), 130);

        let preds = model.predict(&dates);
        let last = preds.last().unwrap();
        assert_eq!(last.ds, ymd(2023, 1, 2) + Duration::days(129));
        assert!((last.yhat - (1000.0 + 5.0 * 129.0)).abs() < 1e-3, "yhat={}", last.yhat);
        assert!(last.yhat_lower <= last.yhat && last.yhat <= last.yhat_upper);
    }

    #[test]
    fn weekly_history_continues_weekly() {
        let start = ymd(2023, 1, 2);
        let history: Vec<HistoryRow> = (0..30)
            .map(|i| HistoryRow {
                ds: start + Duration::weeks(i),
                y: 7000.0,
            })
            .collect();
        let model = AdditiveEngine::default().fit(&history, &[]).unwrap();
        let dates = model.make_future_dates(365);
        let future = &dates[30..];
        assert_eq!(future.len(), 52);
        assert_eq!(future[0], start + Duration::weeks(30));
        assert!(future.windows(2).all(|w| (w[1] - w[0]).num_days() == 7));
    }

    #[test]
    fn monthly_history_continues_on_month_starts() {
        let history: Vec<HistoryRow> = (1..=12)
            .map(|m| HistoryRow {
                ds: ymd(2023, m, 1),
                y: 30_000.0,
            })
            .collect();
        let model = AdditiveEngine::default().fit(&history, &[]).unwrap();
        // 2024 is a leap year: 365 days past 2023-12-01 stop at 2024-11-30.
        let dates = model.make_future_dates(365);
        assert_eq!(&dates[12..], (1..=11).map(|m| ymd(2024, m, 1)).collect::<Vec<_>>().as_slice());
    }

    #[test]
    fn band_widens_past_history() {
        let history = daily(60, |i| 100.0 + (i % 5) as f64 * 3.0 + i as f64);
        let model = AdditiveEngine::default().fit(&history, &[]).unwrap();
        let dates = model.make_future_dates(60);
        let preds = model.predict(&dates);

        let at_end = &preds[59];
        let far = preds.last().unwrap();
        let w_end = at_end.yhat_upper - at_end.yhat_lower;
        let w_far = far.yhat_upper - far.yhat_lower;
        assert!(w_end > 0.0);
        assert!(w_far > w_end);
    }

    #[test]
    fn holiday_outside_history_is_ignored() {
        let history = daily(40, |i| 50.0 + i as f64);
        let holidays = vec![
            HolidayRow {
                holiday: "Google Update".to_string(),
                ds: ymd(2023, 1, 20),
                lower_window: 0,
                upper_window: 1,
            },
            HolidayRow {
                holiday: "Google Update".to_string(),
                ds: ymd(2019, 6, 3),
                lower_window: 0,
                upper_window: 1,
            },
        ];
        let model = AdditiveEngine::default().fit(&history, &holidays).unwrap();
        // Both offsets fire on 2023-01-20/21 inside the history.
        assert_eq!(model.diagnostics().holiday_regressors, 2);
    }

    #[test]
    fn holiday_dip_is_captured() {
        let event = ymd(2023, 2, 15);
        let history: Vec<HistoryRow> = daily(90, |i| 500.0 + 2.0 * i as f64)
            .into_iter()
            .map(|mut r| {
                if r.ds == event {
                    r.y -= 200.0;
                }
                r
            })
            .collect();
        let holidays = vec![HolidayRow {
            holiday: "Google Update".to_string(),
            ds: event,
            lower_window: 0,
            upper_window: 0,
        }];
        let model = AdditiveEngine::default().fit(&history, &holidays).unwrap();
        let pred = model.predict(&[event]);
        assert!(pred[0].holidays < -100.0, "holiday effect={}", pred[0].holidays);
    }

    #[test]
    fn diagnostics_report_the_selection() {
        let history = daily(30, |i| 10.0 + i as f64);
        let model = AdditiveEngine::default().fit(&history, &[]).unwrap();
        let diag = model.diagnostics();
        assert_eq!(diag.n, 30);
        assert_eq!(diag.candidates_fitted, model.selection().fits.len());
        assert_eq!(diag.label, "cp=0 yearly=0 weekly=0");
    }
}

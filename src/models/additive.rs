//! Additive model evaluation.
//!
//! The fitter relies on two primitive operations:
//! - build a design row for a given date (for least squares)
//! - split a prediction into its additive components (for the forecast output)
//!
//! Column layout of a design row:
//!
//! ```text
//! [1, t, hinge(t, s_1) .. hinge(t, s_C), yearly Fourier (2·Y), weekly Fourier (2·W), holiday indicators (H)]
//! ```

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate};

use crate::forecast::HolidayRow;
use crate::math::{WEEKLY_PERIOD_DAYS, YEARLY_PERIOD_DAYS, fill_fourier, hinge};

/// One indicator column: active on the event dates shifted by `offset` days.
#[derive(Debug, Clone, PartialEq)]
pub struct HolidayRegressor {
    pub name: String,
    pub offset: i64,
    pub active: HashSet<NaiveDate>,
}

impl HolidayRegressor {
    pub fn label(&self) -> String {
        format!("{}{:+}", self.name, self.offset)
    }
}

/// Expand holiday rows into one regressor per `(name, offset)` pair.
///
/// Shifted dates outside the calendar range are skipped.
pub fn build_holiday_regressors(rows: &[HolidayRow]) -> Vec<HolidayRegressor> {
    let mut grouped: BTreeMap<(String, i64), HashSet<NaiveDate>> = BTreeMap::new();
    for row in rows {
        for offset in row.window().offsets() {
            let active = grouped.entry((row.holiday.clone(), offset)).or_default();
            if let Some(date) = row.ds.checked_add_signed(Duration::days(offset)) {
                active.insert(date);
            }
        }
    }
    grouped
        .into_iter()
        .map(|((name, offset), active)| HolidayRegressor { name, offset, active })
        .collect()
}

/// Time coordinates of one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowTime {
    pub date: NaiveDate,
    /// Time scaled so the history spans `[0, 1]`.
    pub t: f64,
    /// Days since 1970-01-01, used for seasonality.
    pub epoch_days: f64,
}

/// Shape of one fitted configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLayout {
    /// Changepoint locations in scaled time.
    pub changepoints: Vec<f64>,
    pub yearly_order: usize,
    pub weekly_order: usize,
    pub n_holidays: usize,
}

impl ModelLayout {
    /// Number of columns in a design row.
    pub fn beta_len(&self) -> usize {
        self.holiday_start() + self.n_holidays
    }

    /// Parameter count for information criteria.
    ///
    /// Holiday indicators are excluded: they are sparse and ridge-shrunk.
    pub fn param_count(&self) -> usize {
        self.holiday_start()
    }

    fn yearly_start(&self) -> usize {
        2 + self.changepoints.len()
    }

    fn weekly_start(&self) -> usize {
        self.yearly_start() + 2 * self.yearly_order
    }

    fn holiday_start(&self) -> usize {
        self.weekly_start() + 2 * self.weekly_order
    }

    /// Per-column ridge penalties (intercept and base slope are free).
    pub fn penalties(&self, changepoint: f64, seasonality: f64, holiday: f64) -> Vec<f64> {
        let mut out = vec![0.0; self.beta_len()];
        out[2..self.yearly_start()].fill(changepoint);
        out[self.yearly_start()..self.holiday_start()].fill(seasonality);
        out[self.holiday_start()..].fill(holiday);
        out
    }
}

/// Additive components of a prediction (model units).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Components {
    pub trend: f64,
    pub yearly: f64,
    pub weekly: f64,
    pub holidays: f64,
}

impl Components {
    pub fn total(&self) -> f64 {
        self.trend + self.yearly + self.weekly + self.holidays
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self {
            trend: self.trend * factor,
            yearly: self.yearly * factor,
            weekly: self.weekly * factor,
            holidays: self.holidays * factor,
        }
    }
}

/// Fill a design row for the given layout.
///
/// # Panics
/// Panics if `out.len() != layout.beta_len()` or `holidays.len() != layout.n_holidays`.
pub fn fill_design_row(layout: &ModelLayout, holidays: &[HolidayRegressor], row: &RowTime, out: &mut [f64]) {
    assert_eq!(holidays.len(), layout.n_holidays, "one regressor per holiday column");

    out[0] = 1.0;
    out[1] = row.t;
    for (j, &s) in layout.changepoints.iter().enumerate() {
        out[2 + j] = hinge(row.t, s);
    }

    let ys = layout.yearly_start();
    let ws = layout.weekly_start();
    let hs = layout.holiday_start();
    fill_fourier(row.epoch_days, YEARLY_PERIOD_DAYS, layout.yearly_order, &mut out[ys..ws]);
    fill_fourier(row.epoch_days, WEEKLY_PERIOD_DAYS, layout.weekly_order, &mut out[ws..hs]);

    for (j, reg) in holidays.iter().enumerate() {
        out[hs + j] = if reg.active.contains(&row.date) { 1.0 } else { 0.0 };
    }
}

/// Predict the additive components for one row.
pub fn predict_components(
    layout: &ModelLayout,
    holidays: &[HolidayRegressor],
    betas: &[f64],
    row: &RowTime,
) -> Components {
    let mut x = vec![0.0; layout.beta_len()];
    fill_design_row(layout, holidays, row, &mut x);

    let dot = |range: std::ops::Range<usize>| -> f64 { range.map(|j| x[j] * betas[j]).sum() };

    Components {
        trend: dot(0..layout.yearly_start()),
        yearly: dot(layout.yearly_start()..layout.weekly_start()),
        weekly: dot(layout.weekly_start()..layout.holiday_start()),
        holidays: dot(layout.holiday_start()..layout.beta_len()),
    }
}

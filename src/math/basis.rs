//! Basis functions for the additive model.
//!
//! - Fourier terms for a period `P` and order `N`:
//!   `[sin(2π·1·t/P), cos(2π·1·t/P), ..., sin(2π·N·t/P), cos(2π·N·t/P)]`
//! - Hinge terms for piecewise-linear trends: `max(t - s, 0)`.

use std::f64::consts::PI;

/// Period of the yearly seasonality, in days.
pub const YEARLY_PERIOD_DAYS: f64 = 365.25;

/// Period of the weekly seasonality, in days.
pub const WEEKLY_PERIOD_DAYS: f64 = 7.0;

/// Fill `out` (length `2 * order`) with Fourier terms at time `t_days`.
///
/// # Panics
/// Panics if `out.len() < 2 * order`.
pub fn fill_fourier(t_days: f64, period: f64, order: usize, out: &mut [f64]) {
    for k in 0..order {
        let x = 2.0 * PI * (k as f64 + 1.0) * t_days / period;
        out[2 * k] = x.sin();
        out[2 * k + 1] = x.cos();
    }
}

/// Hinge term `max(t - s, 0)`.
pub fn hinge(t: f64, s: f64) -> f64 {
    (t - s).max(0.0)
}

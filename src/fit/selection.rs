//! Configuration search and selection using BIC with guardrails.
//!
//! Every candidate (changepoint count × yearly order × weekly order) is fitted
//! and scored with:
//! - SSE / RMSE
//! - BIC = n * ln(SSE/n) + k * ln(n)
//!
//! Selection rules:
//! 1. Exclude underdetermined candidates: require `n >= k + 5`
//!    (the trend-only candidate is always attempted)
//! 2. Find the minimum BIC
//! 3. Among candidates within 2 BIC points of it, pick the one with the fewest parameters

use rayon::prelude::*;

use crate::error::ModelError;
use crate::fit::changepoints::changepoint_grid;
use crate::fit::fitter::{CandidateFit, CandidateSpec, FitOptions, PreparedHistory, fit_candidate};
use crate::models::HolidayRegressor;

/// Minimum number of extra observations beyond parameter count.
const MIN_N_BUFFER: usize = 5;

/// BIC difference below which the simpler candidate wins.
const BIC_TOLERANCE: f64 = 2.0;

const CHANGEPOINT_COUNTS: [usize; 4] = [0, 5, 15, 25];
const YEARLY_ORDERS: [usize; 3] = [3, 6, 10];
const WEEKLY_ORDER: usize = 3;

/// Yearly seasonality needs two full cycles of history.
const MIN_YEARLY_SPAN_DAYS: f64 = 730.0;
const MIN_WEEKLY_SPAN_DAYS: f64 = 14.0;

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct FitSelection {
    pub best: CandidateFit,
    /// Fits for all attempted candidates (after guardrails).
    pub fits: Vec<CandidateFit>,
    /// Candidates that were skipped and why (for diagnostics).
    pub skipped: Vec<(CandidateSpec, String)>,
}

/// Candidate configurations worth trying for this history.
///
/// Yearly terms require two years of history; weekly terms require sub-weekly
/// sampling (weekly or monthly exports cannot resolve a weekly cycle).
pub fn candidate_specs(history: &PreparedHistory) -> Vec<CandidateSpec> {
    let yearly: Vec<usize> = if history.span_days >= MIN_YEARLY_SPAN_DAYS {
        std::iter::once(0).chain(YEARLY_ORDERS).collect()
    } else {
        vec![0]
    };
    let weekly: Vec<usize> =
        if history.span_days >= MIN_WEEKLY_SPAN_DAYS && history.median_spacing_days() < 7.0 {
            vec![0, WEEKLY_ORDER]
        } else {
            vec![0]
        };

    let mut specs = Vec::new();
    for &n_changepoints in &CHANGEPOINT_COUNTS {
        for &yearly_order in &yearly {
            for &weekly_order in &weekly {
                specs.push(CandidateSpec {
                    n_changepoints,
                    yearly_order,
                    weekly_order,
                });
            }
        }
    }
    specs
}

/// Parameter count a candidate would have on this history.
fn planned_param_count(history: &PreparedHistory, spec: &CandidateSpec) -> usize {
    let t: Vec<f64> = history.rows.iter().map(|r| r.t).collect();
    2 + changepoint_grid(&t, spec.n_changepoints).len() + 2 * spec.yearly_order + 2 * spec.weekly_order
}

/// Fit every admissible candidate (in parallel) and select the best one.
pub fn fit_and_select(
    history: &PreparedHistory,
    holidays: &[HolidayRegressor],
    opts: &FitOptions,
) -> Result<FitSelection, ModelError> {
    let n = history.n();
    let mut skipped = Vec::new();
    let mut admitted = Vec::new();

    for spec in candidate_specs(history) {
        let k = planned_param_count(history, &spec);
        if spec != CandidateSpec::TREND_ONLY && n < k + MIN_N_BUFFER {
            skipped.push((
                spec,
                format!("Underdetermined: n={n} < k+{MIN_N_BUFFER}={}", k + MIN_N_BUFFER),
            ));
            continue;
        }
        admitted.push(spec);
    }

    let results: Vec<(CandidateSpec, Result<CandidateFit, ModelError>)> = admitted
        .par_iter()
        .map(|spec| (*spec, fit_candidate(history, holidays, spec, opts)))
        .collect();

    let mut fits = Vec::with_capacity(results.len());
    for (spec, result) in results {
        match result {
            Ok(fit) if fit.bic.is_finite() => fits.push(fit),
            Ok(_) => skipped.push((spec, "Non-finite BIC".to_string())),
            Err(err) => skipped.push((spec, err.to_string())),
        }
    }

    if fits.is_empty() {
        let reasons: Vec<String> = skipped
            .iter()
            .map(|(spec, why)| format!("{}: {why}", spec.label()))
            .collect();
        return Err(ModelError::NoCandidates(reasons.join("; ")));
    }

    let best = select_by_bic(&fits).clone();
    tracing::debug!(
        best = %best.spec.label(),
        bic = best.bic,
        fitted = fits.len(),
        skipped = skipped.len(),
        "model selection complete"
    );

    Ok(FitSelection { best, fits, skipped })
}

fn select_by_bic(fits: &[CandidateFit]) -> &CandidateFit {
    let best_bic = fits.iter().map(|f| f.bic).fold(f64::INFINITY, f64::min);

    // Prefer simplicity if within the tolerance; break ties by BIC.
    fits.iter()
        .filter(|f| f.bic <= best_bic + BIC_TOLERANCE)
        .min_by(|a, b| {
            a.layout
                .param_count()
                .cmp(&b.layout.param_count())
                .then(a.bic.total_cmp(&b.bic))
        })
        .unwrap_or(&fits[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::HistoryRow;
    use chrono::{Duration, NaiveDate};

    fn history(n: usize, step_days: i64, f: impl Fn(usize) -> f64) -> PreparedHistory {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        let rows: Vec<HistoryRow> = (0..n)
            .map(|i| HistoryRow {
                ds: start + Duration::days(i as i64 * step_days),
                y: f(i),
            })
            .collect();
        PreparedHistory::new(&rows).unwrap()
    }

    #[test]
    fn short_daily_history_gets_weekly_but_not_yearly_terms() {
        let h = history(60, 1, |i| i as f64);
        let specs = candidate_specs(&h);
        assert!(specs.iter().all(|s| s.yearly_order == 0));
        assert!(specs.iter().any(|s| s.weekly_order == WEEKLY_ORDER));
        assert!(specs.contains(&CandidateSpec::TREND_ONLY));
    }

    #[test]
    fn weekly_history_never_gets_weekly_terms() {
        let h = history(120, 7, |i| i as f64);
        let specs = candidate_specs(&h);
        assert!(specs.iter().all(|s| s.weekly_order == 0));
        // 119 weeks span more than two years.
        assert!(specs.iter().any(|s| s.yearly_order == 10));
    }

    #[test]
    fn two_points_still_fit_trend_only() {
        let h = history(2, 7, |i| 100.0 + 10.0 * i as f64);
        let sel = fit_and_select(&h, &[], &FitOptions::default()).unwrap();
        assert_eq!(sel.best.spec, CandidateSpec::TREND_ONLY);
        assert!(!sel.skipped.is_empty());
    }

    #[test]
    fn line_selects_trend_only_even_if_richer_fit_is_exact() {
        let h = history(90, 1, |i| 500.0 + 3.0 * i as f64);
        let sel = fit_and_select(&h, &[], &FitOptions::default()).unwrap();
        assert_eq!(sel.best.spec, CandidateSpec::TREND_ONLY);
        assert!(sel.fits.len() > 1);
    }

    #[test]
    fn strong_weekly_cycle_is_selected() {
        let h = history(140, 1, |i| {
            let dow = (i % 7) as f64;
            1000.0 + 2.0 * i as f64 + if dow >= 5.0 { -300.0 } else { 50.0 * dow }
        });
        let sel = fit_and_select(&h, &[], &FitOptions::default()).unwrap();
        assert_eq!(sel.best.spec.weekly_order, WEEKLY_ORDER);
    }

    #[test]
    fn simpler_wins_within_tolerance() {
        let h = history(90, 1, |i| 500.0 + 3.0 * i as f64);
        let opts = FitOptions::default();
        let simple = fit_candidate(&h, &[], &CandidateSpec::TREND_ONLY, &opts).unwrap();
        let mut richer = fit_candidate(
            &h,
            &[],
            &CandidateSpec {
                n_changepoints: 5,
                yearly_order: 0,
                weekly_order: 0,
            },
            &opts,
        )
        .unwrap();
        richer.bic = simple.bic - 1.5;
        let fits = vec![richer, simple];
        assert_eq!(select_by_bic(&fits).spec, CandidateSpec::TREND_ONLY);
    }
}

//! Trend changepoint placement.
//!
//! Changepoints are placed deterministically at evenly spaced history rows
//! within the first [`CHANGEPOINT_RANGE`] of the history. Ridge shrinkage on
//! the hinge coefficients then decides which of them actually bend the trend.

/// Fraction of the history eligible for changepoints.
pub const CHANGEPOINT_RANGE: f64 = 0.8;

/// Changepoint locations (scaled time) for `n` requested changepoints.
///
/// `t` must be sorted ascending. Fewer than `n` locations are returned when the
/// eligible history is too short.
pub fn changepoint_grid(t: &[f64], n: usize) -> Vec<f64> {
    let hist_size = (t.len() as f64 * CHANGEPOINT_RANGE).floor() as usize;
    if n == 0 || hist_size < 2 {
        return Vec::new();
    }
    let n = n.min(hist_size - 1);

    let last = (hist_size - 1) as f64;
    let mut out: Vec<f64> = (1..=n)
        .map(|i| {
            let idx = (last * i as f64 / n as f64).round() as usize;
            t[idx]
        })
        .collect();
    out.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linspace(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 / (n - 1) as f64).collect()
    }

    #[test]
    fn changepoints_stay_in_first_eighty_percent() {
        let t = linspace(101);
        let cps = changepoint_grid(&t, 25);
        assert_eq!(cps.len(), 25);
        assert!(cps.iter().all(|&c| c > 0.0 && c <= 0.8 + 1e-12));
        assert!(cps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn short_history_caps_changepoints() {
        let t = linspace(6);
        // floor(6 * 0.8) = 4 eligible rows -> at most 3 changepoints.
        assert_eq!(changepoint_grid(&t, 25).len(), 3);
        assert!(changepoint_grid(&t[..2], 25).is_empty());
    }

    #[test]
    fn zero_requested_gives_none() {
        assert!(changepoint_grid(&linspace(50), 0).is_empty());
    }
}

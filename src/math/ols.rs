//! Least squares solvers.
//!
//! The additive model is linear in its coefficients once the changepoints and
//! Fourier orders are fixed, so every candidate configuration reduces to:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2 + Σ λ_j β_j^2
//! ```
//!
//! Implementation choices:
//! - The ridge term is added as `sqrt(λ_j)` pseudo-rows below the design matrix,
//!   so a single SVD solve handles both plain and penalized problems.
//! - SVD rather than QR: the design matrix is tall and hinge/holiday columns can
//!   be nearly collinear. (Nalgebra's `QR::solve` is intended for square systems
//!   and will panic for non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve a ridge-penalized least squares problem.
///
/// `penalties[j]` is the L2 weight on `β_j`; zero leaves the coefficient free.
///
/// # Panics
/// Panics if `penalties.len() != x.ncols()`.
pub fn solve_ridge(x: &DMatrix<f64>, y: &DVector<f64>, penalties: &[f64]) -> Option<DVector<f64>> {
    assert_eq!(penalties.len(), x.ncols(), "one penalty per column");

    let penalized: Vec<(usize, f64)> = penalties
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, l)| l > 0.0)
        .collect();
    if penalized.is_empty() {
        return solve_least_squares(x, y);
    }

    let n = x.nrows();
    let p = x.ncols();
    let mut xa = DMatrix::<f64>::zeros(n + penalized.len(), p);
    xa.view_mut((0, 0), (n, p)).copy_from(x);
    for (row, &(col, lambda)) in penalized.iter().enumerate() {
        xa[(n + row, col)] = lambda.sqrt();
    }

    let mut ya = DVector::<f64>::zeros(n + penalized.len());
    ya.rows_mut(0, n).copy_from(y);

    solve_least_squares(&xa, &ya)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn ridge_with_zero_penalty_matches_ols() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);
        let beta = solve_ridge(&x, &y, &[0.0, 0.0]).unwrap();
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn ridge_shrinks_penalized_coefficient() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);
        let beta = solve_ridge(&x, &y, &[0.0, 10.0]).unwrap();
        assert!(beta[1] < 3.0 && beta[1] > 0.0, "slope={}", beta[1]);
    }

    #[test]
    fn ridge_handles_underdetermined_system() {
        // Two rows, three columns: only solvable thanks to the penalty rows.
        let x = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 1.0, 1.0, 1.0, 0.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0]);
        let beta = solve_ridge(&x, &y, &[0.0, 1.0, 1.0]).unwrap();
        assert!(beta.iter().all(|v| v.is_finite()));
    }
}

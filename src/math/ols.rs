//! Least squares solver for VAR calibration.
//!
//! Calibration regresses each state variable's current value on the lagged
//! state vector plus an intercept. All equations share one design matrix, so
//! the whole system is solved at once as a multi-column least squares
//! problem:
//!
//! ```text
//! minimize ‖Y - X B‖_F
//! ```
//!
//! Implementation choices:
//! - SVD rather than QR: the design matrix is tall (one row per usable
//!   observation, a handful of columns) and macro ratio series can be close
//!   to collinear over short samples, so we want the solve to degrade
//!   gracefully instead of panicking.
//! - The parameter dimension is tiny (k + 1 columns for a VAR(1) on k
//!   variables), so SVD cost is irrelevant next to the Monte Carlo step.

use nalgebra::DMatrix;

/// Solve `X B ≈ Y` for `B` using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if the strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

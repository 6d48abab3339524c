//! VAR(1) calibration of the macro-fiscal panel.
//!
//! The joint dynamics of growth, the effective rate, and the primary balance
//! are fitted as a first-order vector autoregression by least squares on the
//! companion form: each row regresses the current state on an intercept and
//! the previous state. The innovation covariance comes from the regression
//! residuals with the usual degrees-of-freedom correction.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use tracing::debug;

use crate::math::solve_least_squares;
use crate::timeseries::AlignedPanel;

/// One lag captures what the short macro panels on offer can support.
const LAGS: usize = 1;
/// Fewer usable rows than this cannot be calibrated reliably.
const MIN_OBS: usize = LAGS + 10;
/// Smallest eigenvalue tolerated before the covariance is repaired.
const EIGENVALUE_FLOOR: f64 = 1e-8;
/// Diagonal jitter added when the covariance is not positive definite.
const JITTER: f64 = 1e-4;

/// Fitted VAR(1) parameters, `x[t] = c + A x[t-1] + e[t]`.
#[derive(Debug, Clone)]
pub struct VarParameters {
    /// `A`: row `i` maps the lagged state onto variable `i`.
    pub coefficients: DMatrix<f64>,
    /// `c`.
    pub intercept: DVector<f64>,
    /// Innovation covariance of `e`, positive definite after repair.
    pub covariance: DMatrix<f64>,
    /// Panel ids in state order.
    pub columns: Vec<String>,
    /// Transition rows used in the regression.
    pub n_obs: usize,
}

impl VarParameters {
    pub fn dimension(&self) -> usize {
        self.columns.len()
    }
}

/// Fit a VAR(1) to the panel. Rows with any gap are dropped first; `None`
/// when too few rows remain or the regression cannot be solved.
pub fn calibrate_var(panel: &AlignedPanel) -> Option<VarParameters> {
    let clean = panel.drop_nan_rows();
    let n = clean.n_rows();
    let k = clean.ids.len();
    if k == 0 || n < MIN_OBS {
        return None;
    }
    let n_obs = n - LAGS;
    if n_obs <= k * LAGS + 1 {
        return None;
    }

    // Design matrix [1 | x[t-1]] against targets x[t].
    let mut x = DMatrix::zeros(n_obs, 1 + k);
    let mut y = DMatrix::zeros(n_obs, k);
    for row in 0..n_obs {
        x[(row, 0)] = 1.0;
        for (col, column) in clean.columns.iter().enumerate() {
            x[(row, 1 + col)] = column[row];
            y[(row, col)] = column[row + 1];
        }
    }
    let beta = solve_least_squares(&x, &y)?;

    let intercept = beta.row(0).transpose();
    let coefficients = beta.rows(1, k).transpose();
    let residuals = &y - &x * &beta;
    let dof = (n_obs - (k * LAGS + 1)) as f64;
    let mut covariance = residuals.transpose() * &residuals / dof;

    let min_eig = SymmetricEigen::new(covariance.clone()).eigenvalues.min();
    if min_eig <= EIGENVALUE_FLOOR {
        debug!(min_eig, "near-singular innovation covariance, adding jitter");
        covariance += DMatrix::identity(k, k) * JITTER;
    }

    Some(VarParameters {
        coefficients,
        intercept,
        covariance,
        columns: clean.ids.clone(),
        n_obs,
    })
}

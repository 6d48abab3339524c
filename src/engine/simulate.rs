//! Monte Carlo simulation of the calibrated VAR and the debt-ratio fan.
//!
//! Each path draws its innovations from its own generator, seeded by mixing
//! the run seed with the path index. Results are therefore bit-identical for
//! a given seed no matter how rayon schedules the paths.

use nalgebra::{Cholesky, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;

use crate::engine::calibrate::VarParameters;
use crate::math::nan_percentile;
use crate::timeseries::{Period, TimeSeries};

/// Percentile levels reported in the fan, ascending.
pub const FAN_PERCENTILES: [u8; 7] = [5, 10, 25, 50, 75, 90, 95];

/// SplitMix64 mix of the run seed and path index. Each path gets an
/// independent stream that does not depend on the parallel schedule.
fn path_seed(seed: u64, path: u64) -> u64 {
    let mut z = seed.wrapping_add(path.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Simulated states, laid out path-major: all steps of path 0, then path 1.
#[derive(Debug, Clone, PartialEq)]
pub struct PathCube {
    pub n_paths: usize,
    pub n_steps: usize,
    pub n_vars: usize,
    values: Vec<f64>,
}

impl PathCube {
    pub fn at(&self, path: usize, step: usize, var: usize) -> f64 {
        self.values[(path * self.n_steps + step) * self.n_vars + var]
    }

    /// The state vector of one path at one step.
    pub fn state(&self, path: usize, step: usize) -> &[f64] {
        let start = (path * self.n_steps + step) * self.n_vars;
        &self.values[start..start + self.n_vars]
    }
}

/// Simulate `x[t] = c + A x[t-1] + L eps[t]`, `eps ~ N(0, I)`, with `L` the
/// lower Cholesky factor of the innovation covariance. Bounds, when given,
/// clamp the state elementwise after each update.
///
/// `None` when the shapes disagree, there is nothing to simulate, or the
/// covariance is not positive definite.
pub fn simulate_var_paths(
    params: &VarParameters,
    initial_state: &[f64],
    n_steps: usize,
    n_paths: usize,
    seed: u64,
    lower_bounds: Option<&[f64]>,
    upper_bounds: Option<&[f64]>,
) -> Option<PathCube> {
    let k = params.dimension();
    if k == 0 || n_steps == 0 || n_paths == 0 || initial_state.len() != k {
        return None;
    }
    if lower_bounds.is_some_and(|b| b.len() != k) || upper_bounds.is_some_and(|b| b.len() != k) {
        return None;
    }
    let scale = Cholesky::new(params.covariance.clone())?.l();

    let mut values = vec![0.0; n_paths * n_steps * k];
    values
        .par_chunks_mut(n_steps * k)
        .enumerate()
        .for_each(|(path, chunk)| {
            let mut rng = StdRng::seed_from_u64(path_seed(seed, path as u64));
            let mut x = DVector::from_column_slice(initial_state);
            let mut eps = DVector::zeros(k);
            for step in 0..n_steps {
                for e in eps.iter_mut() {
                    *e = StandardNormal.sample(&mut rng);
                }
                x = &params.intercept + &params.coefficients * &x + &scale * &eps;
                if let Some(bounds) = lower_bounds {
                    for (v, &lo) in x.iter_mut().zip(bounds) {
                        if *v < lo {
                            *v = lo;
                        }
                    }
                }
                if let Some(bounds) = upper_bounds {
                    for (v, &hi) in x.iter_mut().zip(bounds) {
                        if *v > hi {
                            *v = hi;
                        }
                    }
                }
                chunk[step * k..(step + 1) * k].copy_from_slice(x.as_slice());
            }
        });

    Some(PathCube {
        n_paths,
        n_steps,
        n_vars: k,
        values,
    })
}

/// Percentile bands of the simulated debt ratio, one column per entry of
/// [`FAN_PERCENTILES`].
#[derive(Debug, Clone, PartialEq)]
pub struct FanChart {
    pub periods: Vec<Period>,
    /// `bands[i]` holds percentile `FAN_PERCENTILES[i]` over `periods`.
    pub bands: Vec<Vec<f64>>,
}

impl FanChart {
    pub fn band(&self, percentile: u8) -> Option<&[f64]> {
        let i = FAN_PERCENTILES.iter().position(|&p| p == percentile)?;
        Some(&self.bands[i])
    }

    /// One band as a series on the fan's period index.
    pub fn band_series(&self, percentile: u8) -> Option<TimeSeries> {
        let freq = self.periods.first()?.frequency();
        let band = self.band(percentile)?;
        Some(TimeSeries::from_points(
            freq,
            self.periods.iter().copied().zip(band.iter().copied()).collect(),
        ))
    }
}

/// Run the debt recursion over VAR-simulated `(r, g, pb)` paths and reduce
/// to percentile bands per date.
///
/// The state starts at zero, matching the calibration in deviations-free
/// form; `sfa_ratio`, when given, is positional over `dates`. `None` when
/// the parameters lack one of the three required columns, the shapes
/// disagree, or the simulation itself fails.
pub fn mc_distribution(
    b0: f64,
    dates: &[Period],
    params: &VarParameters,
    sfa_ratio: Option<&[f64]>,
    n_paths: usize,
    seed: u64,
) -> Option<FanChart> {
    let n_steps = dates.len();
    if n_steps == 0 || sfa_ratio.is_some_and(|s| s.len() != n_steps) {
        return None;
    }
    let r_idx = params.columns.iter().position(|c| c == "effective_r")?;
    let g_idx = params.columns.iter().position(|c| c == "nominal_g")?;
    let pb_idx = params.columns.iter().position(|c| c == "pb_ratio")?;

    let x0 = vec![0.0; params.dimension()];
    let cube = simulate_var_paths(params, &x0, n_steps, n_paths, seed, None, None)?;

    let mut debt = vec![0.0; n_paths * n_steps];
    debt.par_chunks_mut(n_steps)
        .enumerate()
        .for_each(|(path, row)| {
            let mut prev = b0;
            for (step, slot) in row.iter_mut().enumerate() {
                let state = cube.state(path, step);
                let sfa = sfa_ratio.map_or(0.0, |s| s[step]);
                prev = (1.0 + state[r_idx]) / (1.0 + state[g_idx]) * prev - state[pb_idx] + sfa;
                *slot = prev;
            }
        });

    let mut column = vec![0.0; n_paths];
    let mut bands = vec![Vec::with_capacity(n_steps); FAN_PERCENTILES.len()];
    for step in 0..n_steps {
        for (path, slot) in column.iter_mut().enumerate() {
            *slot = debt[path * n_steps + step];
        }
        for (band, &q) in bands.iter_mut().zip(FAN_PERCENTILES.iter()) {
            band.push(nan_percentile(&column, f64::from(q)));
        }
    }

    Some(FanChart {
        periods: dates.to_vec(),
        bands,
    })
}

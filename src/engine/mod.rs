//! Quantitative engine.
//!
//! `dynamics` holds the deterministic debt arithmetic, `calibrate` fits the
//! VAR(1) used by `simulate` for Monte Carlo fan charts, `scenarios` is the
//! stress-shock catalogue, and `projection` wires all of it to a session's
//! data manager.

pub mod calibrate;
pub mod dynamics;
pub mod projection;
pub mod scenarios;
pub mod simulate;

pub use calibrate::{VarParameters, calibrate_var};
pub use projection::{
    BaselineAssumptions, BaselineReport, ComparisonRow, FinancingDiagnostics, MonteCarloRun,
    ProjectionPath, RatioKit, ReferenceRow, StressRun, baseline_projection, compare_reference,
    financing_diagnostics, monte_carlo_fan, reference_metric_ids, reference_series, stress_runs,
};
pub use scenarios::{ShockScenario, default_scenarios, merge_scenarios};
pub use simulate::{FAN_PERCENTILES, FanChart, PathCube, mc_distribution, simulate_var_paths};

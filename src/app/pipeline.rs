//! Shared command pipeline used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest -> ratio kit -> assumptions -> projection -> diagnostics
//!
//! The command handlers in `app` can then focus on presentation (printing
//! and exports).

use std::path::Path;

use tracing::{debug, warn};

use crate::engine::{
    BaselineAssumptions, BaselineReport, FinancingDiagnostics, RatioKit, ShockScenario,
    baseline_projection, default_scenarios, financing_diagnostics, merge_scenarios,
};
use crate::error::EngineError;
use crate::io::{ObservationIngest, load_observations, load_scenarios};
use crate::metrics::STANDARD_FREQUENCY_RULES;
use crate::timeseries::DataManager;

/// Distance from the last observed debt ratio to the default horizon.
pub const DEFAULT_HORIZON_YEARS: i32 = 10;

/// A loaded observation session: the manager plus the ingest report.
pub struct Session {
    pub manager: DataManager,
    pub ingest: ObservationIngest,
}

/// Build a standard manager and load the observations CSV into it.
pub fn load_session(data: &Path) -> Result<Session, EngineError> {
    let mut manager = DataManager::standard();
    let ingest = load_observations(&mut manager, data)?;
    if !ingest.row_errors.is_empty() {
        warn!(
            count = ingest.row_errors.len(),
            "ingest skipped rows; run `qa` for details"
        );
    }
    manager.enforce_frequency_dependencies(STANDARD_FREQUENCY_RULES);
    debug!(
        metrics = ingest.per_metric.len(),
        rows = ingest.rows_used,
        "observations loaded"
    );
    Ok(Session { manager, ingest })
}

/// Everything the deterministic commands share.
pub struct ProjectionOutput {
    pub kit: RatioKit,
    pub assumptions: BaselineAssumptions,
    pub baseline: BaselineReport,
    pub diagnostics: FinancingDiagnostics,
}

/// Derive ratios, resolve the horizon, and run the baseline projection.
pub fn run_projection(
    dm: &mut DataManager,
    horizon: Option<i32>,
) -> Result<ProjectionOutput, EngineError> {
    let kit = RatioKit::from_manager(dm)?;
    let horizon_end = resolve_horizon(&kit, horizon)?;
    let assumptions = BaselineAssumptions::from_history(&kit, horizon_end)?;
    debug!(
        anchor = assumptions.last_history_year,
        horizon = horizon_end,
        "projection assumptions resolved"
    );
    let baseline = baseline_projection(&kit, &assumptions);
    let diagnostics = financing_diagnostics(dm)?;
    Ok(ProjectionOutput {
        kit,
        assumptions,
        baseline,
        diagnostics,
    })
}

/// An explicit `--horizon` wins; otherwise project ten years past the last
/// observed debt ratio.
pub fn resolve_horizon(kit: &RatioKit, requested: Option<i32>) -> Result<i32, EngineError> {
    if let Some(year) = requested {
        return Ok(year);
    }
    let (last, _) = kit.debt_ratio.last_finite().ok_or_else(|| {
        EngineError::config("no usable historical debt ratio to anchor the projection")
    })?;
    Ok(last.year() + DEFAULT_HORIZON_YEARS)
}

/// The built-in catalogue, with file entries merged over it when given.
pub fn resolve_scenarios(path: Option<&Path>) -> Result<Vec<ShockScenario>, EngineError> {
    let base = default_scenarios();
    match path {
        Some(path) => Ok(merge_scenarios(base, load_scenarios(path)?)),
        None => Ok(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frequency;
    use crate::timeseries::{Period, TimeSeries};

    fn year_series(points: &[(i32, f64)]) -> TimeSeries {
        TimeSeries::from_points(
            Frequency::Yearly,
            points
                .iter()
                .map(|&(y, v)| (Period::Year(y), v))
                .collect(),
        )
    }

    fn kit_with_debt(points: &[(i32, f64)]) -> RatioKit {
        RatioKit {
            debt_ratio: year_series(points),
            effective_r: year_series(&[]),
            nominal_g: year_series(&[]),
            pb_ratio: year_series(&[]),
            sfa_ratio: year_series(&[]),
        }
    }

    #[test]
    fn load_session_populates_the_manager() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.csv");
        std::fs::write(
            &path,
            "metric_id,period,value\npsnd_ex,2020,2000\npsnd_ex,2021,2100\n",
        )
        .unwrap();

        let mut session = load_session(&path).unwrap();
        assert_eq!(session.ingest.rows_used, 2);
        let psnd = session.manager.get_series("psnd_ex").unwrap();
        assert_eq!(psnd.get(Period::Year(2020)), Some(2000.0));
    }

    #[test]
    fn horizon_defaults_ten_years_past_history() {
        let kit = kit_with_debt(&[(2023, 0.9), (2024, 0.95)]);
        assert_eq!(resolve_horizon(&kit, None).unwrap(), 2034);
        assert_eq!(resolve_horizon(&kit, Some(2030)).unwrap(), 2030);
    }

    #[test]
    fn horizon_requires_a_debt_anchor() {
        let kit = kit_with_debt(&[]);
        assert!(resolve_horizon(&kit, None).is_err());
        // An explicit horizon does not need history at resolve time.
        assert_eq!(resolve_horizon(&kit, Some(2030)).unwrap(), 2030);
    }

    #[test]
    fn scenarios_default_to_the_catalogue() {
        let scenarios = resolve_scenarios(None).unwrap();
        assert_eq!(scenarios.len(), 5);
    }

    #[test]
    fn scenario_file_merges_over_the_catalogue() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenarios.toml");
        std::fs::write(
            &path,
            "[[scenario]]\nname = \"Rate +300bps\"\nr_pp = 0.05\n\n\
             [[scenario]]\nname = \"Extra\"\ng_pp = -0.02\n",
        )
        .unwrap();

        let scenarios = resolve_scenarios(Some(&path)).unwrap();
        assert_eq!(scenarios.len(), 6);
        let rate = scenarios.iter().find(|s| s.name == "Rate +300bps").unwrap();
        assert_eq!(rate.r_pp, 0.05);
        assert!(scenarios.iter().any(|s| s.name == "Extra"));
    }
}

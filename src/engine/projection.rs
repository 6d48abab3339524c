//! Projection orchestration.
//!
//! Builds the historical ratio kit out of the data manager, derives baseline
//! assumptions from it, and runs the three projection modes on top: the
//! deterministic baseline, the scenario stress table, and the Monte Carlo
//! fan. Also hosts the reference-path comparison used against external
//! projections.

use tracing::debug;

use crate::domain::{Aggregation, AlignMode, Frequency, Unit};
use crate::engine::calibrate::{VarParameters, calibrate_var};
use crate::engine::dynamics::{
    debt_dynamics, debt_stress_response, gross_financing_need, interest_to_gdp,
    present_value_of_surpluses, stabilize_primary_balance, stock_flow_adjustment_ratio,
};
use crate::engine::scenarios::ShockScenario;
use crate::engine::simulate::{FanChart, mc_distribution};
use crate::error::EngineError;
use crate::timeseries::{DataManager, Period, SeriesStore, TimeSeries};

/// Horizon of the present-value-of-surpluses diagnostic.
const PV_HORIZON: usize = 50;
/// Assumption fallbacks when a ratio has no observed history.
const FALLBACK_EFFECTIVE_R: f64 = 0.03;
const FALLBACK_NOMINAL_G: f64 = 0.04;

/// The historical ratio series every projection mode starts from, all yearly.
#[derive(Debug, Clone)]
pub struct RatioKit {
    pub debt_ratio: TimeSeries,
    pub effective_r: TimeSeries,
    pub nominal_g: TimeSeries,
    pub pb_ratio: TimeSeries,
    pub sfa_ratio: TimeSeries,
}

impl RatioKit {
    /// Assemble the kit from stored data. Fails up front when any required
    /// core metric has no observations.
    pub fn from_manager(dm: &mut DataManager) -> Result<RatioKit, EngineError> {
        dm.ensure_required()?;
        let debt_ratio = dm.get_series("debt_ratio")?;
        let effective_r = dm.get_series("effective_r")?;
        let nominal_g = dm.get_series("nominal_g")?;
        let pb = dm.get_series("primary_balance")?;
        let gdp = dm
            .get_series("gdp_nominal")?
            .resample(Frequency::Yearly, Aggregation::Sum);
        let pb_ratio = ratio_of(&pb, &gdp);
        let psnd = dm
            .get_series("psnd_ex")?
            .resample(Frequency::Yearly, Aggregation::Mean);
        let psnb = dm
            .get_series("psnb_ex")?
            .resample(Frequency::Yearly, Aggregation::Sum);
        let sfa_ratio = stock_flow_adjustment_ratio(&psnd, &psnb, &gdp);
        Ok(RatioKit {
            debt_ratio,
            effective_r,
            nominal_g,
            pb_ratio,
            sfa_ratio,
        })
    }
}

/// Elementwise `numerator / denominator` on the shared index.
fn ratio_of(numerator: &TimeSeries, denominator: &TimeSeries) -> TimeSeries {
    let points = numerator
        .points()
        .iter()
        .filter_map(|&(p, n)| denominator.get(p).map(|d| (p, n / d)))
        .collect();
    TimeSeries::from_points(numerator.frequency(), points)
}

fn constant_series(periods: &[Period], value: f64) -> TimeSeries {
    TimeSeries::from_points(
        Frequency::Yearly,
        periods.iter().map(|&p| (p, value)).collect(),
    )
}

/// Projection-period inputs: r, g, and pb held at their last observed
/// values, the stock-flow adjustment at zero.
#[derive(Debug, Clone)]
pub struct BaselineAssumptions {
    /// Anchor debt ratio, the last observed value.
    pub b0: f64,
    pub last_history_year: i32,
    pub horizon_end: i32,
    pub r: TimeSeries,
    pub g: TimeSeries,
    pub pb: TimeSeries,
    pub sfa: TimeSeries,
}

impl BaselineAssumptions {
    /// Derive assumptions over `(last historical year, horizon_end]`.
    ///
    /// A kit whose debt ratio has no usable observation cannot anchor a
    /// projection and is a configuration error, as is a horizon that does
    /// not extend past the history.
    pub fn from_history(kit: &RatioKit, horizon_end: i32) -> Result<BaselineAssumptions, EngineError> {
        let Some((last_period, b0)) = kit.debt_ratio.last_finite() else {
            return Err(EngineError::config(
                "no usable historical debt ratio to anchor the projection",
            ));
        };
        let last_history_year = last_period.year();
        if horizon_end <= last_history_year {
            return Err(EngineError::config(format!(
                "projection horizon {horizon_end} ends at or before the last historical year {last_history_year}"
            )));
        }
        let periods: Vec<Period> = (last_history_year + 1..=horizon_end)
            .map(Period::Year)
            .collect();
        let r_last = last_value(&kit.effective_r).unwrap_or(FALLBACK_EFFECTIVE_R);
        let g_last = last_value(&kit.nominal_g).unwrap_or(FALLBACK_NOMINAL_G);
        let pb_last = last_value(&kit.pb_ratio).unwrap_or(0.0);
        Ok(BaselineAssumptions {
            b0,
            last_history_year,
            horizon_end,
            r: constant_series(&periods, r_last),
            g: constant_series(&periods, g_last),
            pb: constant_series(&periods, pb_last),
            sfa: constant_series(&periods, 0.0),
        })
    }

    /// The projection dates.
    pub fn periods(&self) -> Vec<Period> {
        self.r.periods().collect()
    }
}

fn last_value(series: &TimeSeries) -> Option<f64> {
    series.last_finite().map(|(_, v)| v)
}

/// Historical debt ratio and its projected continuation.
#[derive(Debug, Clone)]
pub struct ProjectionPath {
    pub history: TimeSeries,
    pub projection: TimeSeries,
}

impl ProjectionPath {
    /// History and projection spliced into one series.
    pub fn combined(&self) -> TimeSeries {
        let mut points = self.history.points().to_vec();
        points.extend_from_slice(self.projection.points());
        TimeSeries::from_points(Frequency::Yearly, points)
    }
}

/// Deterministic baseline plus its sustainability diagnostics.
#[derive(Debug, Clone)]
pub struct BaselineReport {
    pub path: ProjectionPath,
    pub pb_star_history: TimeSeries,
    pub pb_star_projection: TimeSeries,
    /// `pb - pb*` at the last historical observation, NaN when unavailable.
    pub latest_fiscal_gap: f64,
    /// Present value of the held-constant primary surplus over a 50-year
    /// horizon.
    pub pv_surpluses: f64,
}

/// Run the baseline debt recursion and its diagnostics.
pub fn baseline_projection(kit: &RatioKit, assumptions: &BaselineAssumptions) -> BaselineReport {
    let history = kit.debt_ratio.drop_nan();
    let projection = debt_dynamics(
        assumptions.b0,
        &assumptions.r,
        &assumptions.g,
        &assumptions.pb,
        Some(&assumptions.sfa),
    );

    let r_hist = kit.effective_r.drop_nan();
    let g_hist = kit.nominal_g.drop_nan();
    let pb_hist = kit.pb_ratio.drop_nan();
    let pb_star_history = stabilize_primary_balance(&history, &r_hist, &g_hist).drop_nan();
    let pb_star_projection =
        stabilize_primary_balance(&projection, &assumptions.r, &assumptions.g);
    let latest_fiscal_gap = match (pb_hist.points().last(), pb_star_history.points().last()) {
        (Some(&(_, pb)), Some(&(_, star))) => pb - star,
        _ => f64::NAN,
    };
    let pv_surpluses = present_value_of_surpluses(&pb_hist, &r_hist, &g_hist, PV_HORIZON);

    BaselineReport {
        path: ProjectionPath {
            history,
            projection,
        },
        pb_star_history,
        pb_star_projection,
        latest_fiscal_gap,
        pv_surpluses,
    }
}

/// Level-space diagnostics over the stored history: gross financing need and
/// the interest burden.
#[derive(Debug, Clone)]
pub struct FinancingDiagnostics {
    pub gross_financing_need: TimeSeries,
    pub interest_to_gdp: TimeSeries,
}

pub fn financing_diagnostics(dm: &mut DataManager) -> Result<FinancingDiagnostics, EngineError> {
    let b = dm.get_series("debt_ratio")?;
    let gdp = dm
        .get_series("gdp_nominal")?
        .resample(Frequency::Yearly, Aggregation::Sum);
    let deficit = dm
        .get_series("psnb_ex")?
        .resample(Frequency::Yearly, Aggregation::Sum);
    let interest = dm
        .get_series("debt_interest")?
        .resample(Frequency::Yearly, Aggregation::Sum);
    let maturity = dm.get_series("avg_maturity_years")?;
    Ok(FinancingDiagnostics {
        gross_financing_need: gross_financing_need(&b, &gdp, &deficit, Some(&maturity)),
        interest_to_gdp: interest_to_gdp(&interest, &gdp),
    })
}

/// One stressed projection.
#[derive(Debug, Clone)]
pub struct StressRun {
    pub scenario: ShockScenario,
    pub path: TimeSeries,
    /// Debt-ratio difference vs the baseline at the final projection year.
    pub end_delta: f64,
}

/// Rerun the recursion under each scenario against the baseline assumptions.
pub fn stress_runs(
    assumptions: &BaselineAssumptions,
    baseline: &TimeSeries,
    scenarios: &[ShockScenario],
) -> Vec<StressRun> {
    let baseline_end = baseline.points().last().map(|&(_, v)| v);
    scenarios
        .iter()
        .map(|scenario| {
            let path = debt_stress_response(
                assumptions.b0,
                &assumptions.r,
                &assumptions.g,
                &assumptions.pb,
                Some(&assumptions.sfa),
                scenario,
            );
            let end_delta = match (path.points().last(), baseline_end) {
                (Some(&(_, stressed)), Some(base)) => stressed - base,
                _ => f64::NAN,
            };
            StressRun {
                scenario: scenario.clone(),
                path,
                end_delta,
            }
        })
        .collect()
}

/// Monte Carlo outcome, including enough metadata to label an export.
#[derive(Debug, Clone)]
pub struct MonteCarloRun {
    /// Rows in the cleaned calibration panel.
    pub calibration_size: usize,
    pub n_paths: usize,
    pub seed: u64,
    /// `None` when the panel is too short to calibrate.
    pub params: Option<VarParameters>,
    /// `None` when calibration or the simulation itself was unavailable.
    pub fan: Option<FanChart>,
}

/// Calibrate the VAR on the historical `(nominal_g, effective_r, pb_ratio)`
/// panel and simulate the debt fan over the projection dates. The historical
/// stock-flow adjustment is reindexed onto the projection dates, zero where
/// absent.
pub fn monte_carlo_fan(
    kit: &RatioKit,
    assumptions: &BaselineAssumptions,
    n_paths: usize,
    seed: u64,
) -> MonteCarloRun {
    let mut store = SeriesStore::new();
    store.insert("nominal_g", kit.nominal_g.clone(), Unit::Ratio);
    store.insert("effective_r", kit.effective_r.clone(), Unit::Ratio);
    store.insert("pb_ratio", kit.pb_ratio.clone(), Unit::Ratio);
    let panel = store
        .align(
            &["nominal_g", "effective_r", "pb_ratio"],
            Frequency::Yearly,
            Aggregation::Mean,
            AlignMode::Intersection,
        )
        .drop_nan_rows();
    let calibration_size = panel.n_rows();
    debug!(calibration_size, "calibration panel assembled");

    let params = calibrate_var(&panel);
    let fan = params.as_ref().and_then(|p| {
        let dates = assumptions.periods();
        let sfa_hist = kit.sfa_ratio.drop_nan();
        let sfa: Vec<f64> = dates
            .iter()
            .map(|&d| sfa_hist.get(d).unwrap_or(0.0))
            .collect();
        mc_distribution(assumptions.b0, &dates, p, Some(&sfa), n_paths, seed)
    });

    MonteCarloRun {
        calibration_size,
        n_paths,
        seed,
        params,
        fan,
    }
}

/// One tidy reference observation, as ingested from a comparison file.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRow {
    pub metric_id: String,
    pub year: i32,
    pub value: f64,
}

/// Distinct metric ids present in the reference rows, sorted.
pub fn reference_metric_ids(rows: &[ReferenceRow]) -> Vec<String> {
    let mut ids: Vec<String> = rows.iter().map(|r| r.metric_id.clone()).collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Reference rows for one metric as a yearly series.
pub fn reference_series(rows: &[ReferenceRow], metric_id: &str) -> TimeSeries {
    TimeSeries::from_points(
        Frequency::Yearly,
        rows.iter()
            .filter(|r| r.metric_id == metric_id)
            .map(|r| (Period::Year(r.year), r.value))
            .collect(),
    )
}

/// Reference and engine values on their shared years.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub period: Period,
    pub reference: f64,
    pub engine: f64,
    /// `engine - reference`.
    pub difference: f64,
}

/// Align a reference path with an engine path on years both cover. No
/// overlap is an empty comparison, not an error.
pub fn compare_reference(
    rows: &[ReferenceRow],
    metric_id: &str,
    engine_path: &TimeSeries,
) -> Vec<ComparisonRow> {
    reference_series(rows, metric_id)
        .points()
        .iter()
        .filter_map(|&(period, reference)| {
            engine_path.get(period).map(|engine| ComparisonRow {
                period,
                reference,
                engine,
                difference: engine - reference,
            })
        })
        .collect()
}

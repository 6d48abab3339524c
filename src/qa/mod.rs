//! Data quality checks: gaps, outliers, bound violations, and the
//! stock-flow reconciliation residual.
//!
//! The check functions are pure and per-series; `run_qa` sweeps the whole
//! catalogue and assembles the report the CLI prints. Findings are reported
//! as periods, not row numbers, so they stay meaningful next to the data.

use crate::domain::{Aggregation, Frequency};
use crate::error::EngineError;
use crate::math::{nan_mean, nan_std};
use crate::timeseries::{DataManager, Period, TimeSeries};

/// Outlier threshold applied by the report sweep.
pub const DEFAULT_Z_THRESHOLD: f64 = 4.0;

/// Periods whose value is NaN.
pub fn missing_positions(series: &TimeSeries) -> Vec<Period> {
    series
        .points()
        .iter()
        .filter(|(_, v)| v.is_nan())
        .map(|&(p, _)| p)
        .collect()
}

/// Periods whose z-score against the NaN-aware mean and population standard
/// deviation exceeds `threshold` in absolute value. A degenerate spread
/// (zero or NaN) yields no findings.
pub fn zscore_outliers(series: &TimeSeries, threshold: f64) -> Vec<Period> {
    if series.is_empty() {
        return Vec::new();
    }
    let values: Vec<f64> = series.values().collect();
    let mu = nan_mean(&values);
    let sd = nan_std(&values);
    if sd == 0.0 || sd.is_nan() {
        return Vec::new();
    }
    series
        .points()
        .iter()
        .filter(|(_, v)| ((v - mu) / sd).abs() > threshold)
        .map(|&(p, _)| p)
        .collect()
}

/// Periods violating the per-metric sanity ranges: ten-year yields must sit
/// in [-5, 30] and the four core level metrics must be non-negative.
pub fn plausible_bounds(series: &TimeSeries, metric_id: &str) -> Vec<Period> {
    let mut bad = Vec::new();
    if metric_id == "yield_10y" {
        bad.extend(
            series
                .points()
                .iter()
                .filter(|(_, v)| *v < -5.0 || *v > 30.0)
                .map(|&(p, _)| p),
        );
    }
    if matches!(
        metric_id,
        "gdp_nominal" | "psnd_ex" | "psnb_ex" | "debt_interest"
    ) {
        bad.extend(
            series
                .points()
                .iter()
                .filter(|(_, v)| *v < 0.0)
                .map(|&(p, _)| p),
        );
    }
    bad
}

/// Stock-flow reconciliation residual in levels: `Δpsnd - psnb` on the
/// years both series cover. The first debt difference is NaN.
pub fn sfa_level_residual(psnd: &TimeSeries, psnb: &TimeSeries) -> TimeSeries {
    let d_debt = psnd.diff();
    let points = d_debt
        .points()
        .iter()
        .filter_map(|&(p, delta)| psnb.get(p).map(|b| (p, delta - b)))
        .collect();
    TimeSeries::from_points(psnd.frequency(), points)
}

/// Findings for one non-empty series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesFindings {
    pub metric_id: String,
    pub name: String,
    pub observations: usize,
    pub coverage: (Period, Period),
    pub missing: Vec<Period>,
    pub outliers: Vec<Period>,
    pub out_of_bounds: Vec<Period>,
}

impl SeriesFindings {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.outliers.is_empty() && self.out_of_bounds.is_empty()
    }
}

/// Everything the `qa` command reports.
#[derive(Debug, Clone)]
pub struct QaReport {
    pub missing_required: Vec<String>,
    /// Intersection of the required metrics' observed year ranges.
    pub core_coverage: Option<(i32, i32)>,
    pub series: Vec<SeriesFindings>,
    /// Empty when debt or borrowing data is absent.
    pub sfa_residual: TimeSeries,
}

/// Sweep every catalogue metric with data and assemble the QA report.
pub fn run_qa(dm: &mut DataManager) -> Result<QaReport, EngineError> {
    let missing_required = dm.missing_required();
    let required_ids: Vec<&str> = dm.registry().required().map(|m| m.id).collect();
    let core_coverage = dm.coverage_years(&required_ids);

    let metrics: Vec<(String, String)> = dm
        .registry()
        .iter()
        .map(|m| (m.id.to_string(), m.name.to_string()))
        .collect();
    let mut series = Vec::new();
    for (id, name) in metrics {
        let s = dm.get_series(&id)?;
        let (Some(first), Some(last)) = (s.first_period(), s.last_period()) else {
            continue;
        };
        series.push(SeriesFindings {
            missing: missing_positions(&s),
            outliers: zscore_outliers(&s, DEFAULT_Z_THRESHOLD),
            out_of_bounds: plausible_bounds(&s, &id),
            observations: s.len(),
            coverage: (first, last),
            metric_id: id,
            name,
        });
    }

    let psnd = dm.get_series("psnd_ex")?;
    let psnb = dm.get_series("psnb_ex")?;
    let sfa_residual = if psnd.is_empty() || psnb.is_empty() {
        TimeSeries::new(Frequency::Yearly)
    } else {
        sfa_level_residual(
            &psnd.resample(Frequency::Yearly, Aggregation::Mean),
            &psnb.resample(Frequency::Yearly, Aggregation::Sum),
        )
    };

    Ok(QaReport {
        missing_required,
        core_coverage,
        series,
        sfa_residual,
    })
}

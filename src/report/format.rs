//! Formatted terminal output for every command.
//!
//! We keep formatting code in one place so:
//! - the engine and QA code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::engine::{
    BaselineAssumptions, BaselineReport, ComparisonRow, FAN_PERCENTILES, FinancingDiagnostics,
    MonteCarloRun, StressRun,
};
use crate::io::ObservationIngest;
use crate::qa::QaReport;
use crate::timeseries::{Period, TimeSeries};

/// Format the ingest summary (per-metric adds + row errors).
pub fn format_ingest_summary(ingest: &ObservationIngest) -> String {
    let mut out = String::new();

    out.push_str("=== Data ingest ===\n");
    out.push_str(&format!(
        "Rows: read={} used={}\n",
        ingest.rows_read, ingest.rows_used
    ));

    for metric in &ingest.per_metric {
        let s = &metric.summary;
        out.push_str(&format!(
            "  {:<20} parsed={:<4} degraded={}",
            truncate(&metric.metric_id, 20),
            s.parsed,
            s.degraded
        ));
        if let Some(stage) = s.worst {
            out.push_str(&format!(" (worst: {})", stage.label()));
        }
        if !s.failed.is_empty() {
            out.push_str(&format!(" failed={:?}", s.failed));
        }
        out.push('\n');
    }

    if !ingest.row_errors.is_empty() {
        out.push_str("Row errors:\n");
        for err in &ingest.row_errors {
            match &err.id {
                Some(id) => {
                    out.push_str(&format!("  line {} [{}] {}\n", err.line, id, err.message))
                }
                None => out.push_str(&format!("  line {} {}\n", err.line, err.message)),
            }
        }
    }

    out
}

/// Format the QA report: coverage table, findings, and the SFA residual.
pub fn format_qa_report(qa: &QaReport) -> String {
    let mut out = String::new();

    out.push_str("=== Data QA ===\n");
    if qa.missing_required.is_empty() {
        out.push_str("Missing required: none\n");
    } else {
        out.push_str(&format!(
            "Missing required: {}\n",
            qa.missing_required.join(", ")
        ));
    }
    match qa.core_coverage {
        Some((first, last)) => out.push_str(&format!("Core coverage: {first}..{last}\n")),
        None => out.push_str("Core coverage: n/a\n"),
    }
    out.push('\n');

    out.push_str(&format!(
        "{:<24} {:>5} {:<14} {:>5} {:>5} {:>5}\n",
        "metric", "n", "coverage", "miss", "outl", "bnds"
    ));
    out.push_str(&format!(
        "{:-<24} {:-<5} {:-<14} {:-<5} {:-<5} {:-<5}\n",
        "", "", "", "", "", ""
    ));
    for findings in &qa.series {
        out.push_str(&format!(
            "{:<24} {:>5} {:<14} {:>5} {:>5} {:>5}\n",
            truncate(&findings.metric_id, 24),
            findings.observations,
            format!("{}..{}", findings.coverage.0, findings.coverage.1),
            findings.missing.len(),
            findings.outliers.len(),
            findings.out_of_bounds.len(),
        ));
    }

    let mut detail = String::new();
    for findings in &qa.series {
        if findings.is_clean() {
            continue;
        }
        if !findings.missing.is_empty() {
            detail.push_str(&format!(
                "  {} missing: {}\n",
                findings.metric_id,
                period_list(&findings.missing)
            ));
        }
        if !findings.outliers.is_empty() {
            detail.push_str(&format!(
                "  {} outliers: {}\n",
                findings.metric_id,
                period_list(&findings.outliers)
            ));
        }
        if !findings.out_of_bounds.is_empty() {
            detail.push_str(&format!(
                "  {} out of bounds: {}\n",
                findings.metric_id,
                period_list(&findings.out_of_bounds)
            ));
        }
    }
    if detail.is_empty() {
        out.push_str("\nNo findings.\n");
    } else {
        out.push_str("\nFindings:\n");
        out.push_str(&detail);
    }

    let worst = qa
        .sfa_residual
        .points()
        .iter()
        .filter(|(_, v)| v.is_finite())
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()));
    match worst {
        Some((period, value)) => out.push_str(&format!(
            "SFA residual (levels): worst {value:.4} at {period} over {} obs\n",
            qa.sfa_residual.len()
        )),
        None => out.push_str("SFA residual (levels): n/a, needs debt and borrowing levels\n"),
    }

    out
}

/// Format the baseline projection: assumptions, path table, headline metrics.
pub fn format_baseline_report(
    assumptions: &BaselineAssumptions,
    report: &BaselineReport,
    diagnostics: &FinancingDiagnostics,
) -> String {
    let mut out = String::new();

    out.push_str("=== Baseline projection ===\n");
    out.push_str(&format!(
        "Anchor: debt ratio {} at {}\n",
        fmt_pct(assumptions.b0),
        assumptions.last_history_year
    ));
    out.push_str(&format!(
        "Horizon: {}..{}\n",
        assumptions.last_history_year + 1,
        assumptions.horizon_end
    ));
    out.push_str(&format!(
        "Held assumptions: r={} g={} pb={}\n",
        fmt_pct(held_value(&assumptions.r)),
        fmt_pct(held_value(&assumptions.g)),
        fmt_pct(held_value(&assumptions.pb)),
    ));
    let sfa_years = assumptions
        .sfa
        .points()
        .iter()
        .filter(|(_, v)| v.is_finite() && *v != 0.0)
        .count();
    if sfa_years > 0 {
        out.push_str(&format!(
            "Stock-flow adjustment: nonzero in {sfa_years} projection years\n"
        ));
    }
    out.push('\n');

    out.push_str(&format!(
        "{:<6} {:>10} {:>10}\n",
        "year", "debt", "pb_star"
    ));
    out.push_str(&format!("{:-<6} {:-<10} {:-<10}\n", "", "", ""));
    for (period, value) in report.path.projection.points() {
        let pb_star = report
            .pb_star_projection
            .get(*period)
            .unwrap_or(f64::NAN);
        out.push_str(&format!(
            "{:<6} {:>10} {:>10}\n",
            period.to_string(),
            fmt_val(*value),
            fmt_val(pb_star),
        ));
    }
    out.push('\n');

    out.push_str(&format!(
        "Latest fiscal gap: {} of GDP\n",
        fmt_pct(report.latest_fiscal_gap)
    ));
    out.push_str(&format!(
        "PV of primary surpluses (50y): {}\n",
        fmt_val(report.pv_surpluses)
    ));

    let gfn = diagnostics.gross_financing_need.last_finite();
    let interest = diagnostics.interest_to_gdp.last_finite();
    match (gfn, interest) {
        (Some((gp, gv)), Some((ip, iv))) => out.push_str(&format!(
            "Financing: GFN {} of GDP ({gp}) | interest {} of GDP ({ip})\n",
            fmt_pct(gv),
            fmt_pct(iv)
        )),
        (Some((gp, gv)), None) => {
            out.push_str(&format!("Financing: GFN {} of GDP ({gp})\n", fmt_pct(gv)))
        }
        (None, Some((ip, iv))) => out.push_str(&format!(
            "Financing: interest {} of GDP ({ip})\n",
            fmt_pct(iv)
        )),
        (None, None) => {}
    }

    out
}

/// Format the stress scenario table: end level and delta vs the baseline.
pub fn format_stress_table(baseline_end: f64, runs: &[StressRun]) -> String {
    let mut out = String::new();

    out.push_str("=== Stress scenarios ===\n");
    out.push_str(&format!(
        "Baseline end level: {}\n\n",
        fmt_pct(baseline_end)
    ));
    out.push_str(&format!(
        "{:<34} {:>10} {:>10}\n",
        "scenario", "end", "delta"
    ));
    out.push_str(&format!("{:-<34} {:-<10} {:-<10}\n", "", "", ""));
    for run in runs {
        let end = run
            .path
            .points()
            .last()
            .map(|(_, v)| *v)
            .unwrap_or(f64::NAN);
        out.push_str(&format!(
            "{:<34} {:>10} {:>10}\n",
            truncate(&run.scenario.name, 34),
            fmt_val(end),
            fmt_delta(run.end_delta),
        ));
    }

    out
}

/// Format the Monte Carlo run: calibration summary plus the percentile fan.
pub fn format_monte_carlo(run: &MonteCarloRun) -> String {
    let mut out = String::new();

    out.push_str("=== Monte Carlo fan ===\n");
    out.push_str(&format!(
        "Calibration sample: {} rows | paths={} | seed={}\n",
        run.calibration_size, run.n_paths, run.seed
    ));

    let Some(params) = &run.params else {
        out.push_str("Calibration unavailable: the cleaned panel is too short.\n");
        return out;
    };
    out.push_str(&format!(
        "VAR(1): vars=[{}] | transitions={}\n",
        params.columns.join(", "),
        params.n_obs
    ));

    let Some(fan) = &run.fan else {
        out.push_str(
            "Simulation unavailable: the innovation covariance admits no Cholesky factor.\n",
        );
        return out;
    };

    out.push('\n');
    let mut header = format!("{:<6}", "year");
    for p in FAN_PERCENTILES {
        header.push_str(&format!(" {:>8}", format!("p{p}")));
    }
    out.push_str(&header);
    out.push('\n');
    out.push_str(&format!("{:-<6}", ""));
    for _ in FAN_PERCENTILES {
        out.push_str(&format!(" {:-<8}", ""));
    }
    out.push('\n');
    for (t, period) in fan.periods.iter().enumerate() {
        let mut line = format!("{:<6}", period.to_string());
        for band in &fan.bands {
            line.push_str(&format!(" {:>8}", fmt_val(band[t])));
        }
        out.push_str(&line);
        out.push('\n');
    }

    out
}

/// Format the engine-vs-reference comparison table.
pub fn format_comparison(metric_id: &str, source_label: &str, rows: &[ComparisonRow]) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== Reference comparison: {metric_id} ({source_label}) ===\n"
    ));
    if rows.is_empty() {
        out.push_str("No overlapping periods.\n");
        return out;
    }

    out.push_str(&format!(
        "{:<6} {:>10} {:>10} {:>10}\n",
        "year", "reference", "engine", "diff"
    ));
    out.push_str(&format!("{:-<6} {:-<10} {:-<10} {:-<10}\n", "", "", "", ""));
    for row in rows {
        out.push_str(&format!(
            "{:<6} {:>10} {:>10} {:>10}\n",
            row.period.to_string(),
            fmt_val(row.reference),
            fmt_val(row.engine),
            fmt_delta(row.difference),
        ));
    }

    out
}

fn held_value(series: &TimeSeries) -> f64 {
    series.last_finite().map(|(_, v)| v).unwrap_or(f64::NAN)
}

fn fmt_pct(v: f64) -> String {
    if v.is_finite() {
        format!("{:.2}%", v * 100.0)
    } else {
        "n/a".to_string()
    }
}

fn fmt_val(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.4}")
    } else {
        "-".to_string()
    }
}

fn fmt_delta(v: f64) -> String {
    if v.is_finite() {
        format!("{v:+.4}")
    } else {
        "-".to_string()
    }
}

fn period_list(periods: &[Period]) -> String {
    const MAX_SHOWN: usize = 8;
    let shown: Vec<String> = periods
        .iter()
        .take(MAX_SHOWN)
        .map(Period::to_string)
        .collect();
    if periods.len() > MAX_SHOWN {
        format!("{} (+{} more)", shown.join(", "), periods.len() - MAX_SHOWN)
    } else {
        shown.join(", ")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frequency;
    use crate::engine::ShockScenario;
    use crate::qa::SeriesFindings;

    fn year_series(points: &[(i32, f64)]) -> TimeSeries {
        TimeSeries::from_points(
            Frequency::Yearly,
            points
                .iter()
                .map(|&(y, v)| (Period::Year(y), v))
                .collect(),
        )
    }

    #[test]
    fn stress_table_shows_end_levels_and_deltas() {
        let runs = vec![StressRun {
            scenario: ShockScenario {
                name: "Rate +300bps".to_string(),
                description: String::new(),
                r_pp: 0.03,
                g_pp: 0.0,
                pb_pp: 0.0,
                sfa_ratio_pp: 0.0,
            },
            path: year_series(&[(2025, 0.97), (2026, 1.021)]),
            end_delta: 0.079,
        }];

        let text = format_stress_table(0.942, &runs);
        assert!(text.contains("Baseline end level: 94.20%"));
        assert!(text.contains("Rate +300bps"));
        assert!(text.contains("1.0210"));
        assert!(text.contains("+0.0790"));
    }

    #[test]
    fn monte_carlo_reports_unavailable_calibration() {
        let run = MonteCarloRun {
            calibration_size: 4,
            n_paths: 5000,
            seed: 42,
            params: None,
            fan: None,
        };
        let text = format_monte_carlo(&run);
        assert!(text.contains("Calibration sample: 4 rows"));
        assert!(text.contains("Calibration unavailable"));
        assert!(!text.contains("p50"));
    }

    #[test]
    fn comparison_handles_empty_overlap() {
        let text = format_comparison("debt_ratio", "baseline", &[]);
        assert!(text.contains("debt_ratio (baseline)"));
        assert!(text.contains("No overlapping periods."));
    }

    #[test]
    fn comparison_rows_are_aligned() {
        let rows = vec![ComparisonRow {
            period: Period::Year(2025),
            reference: 0.93,
            engine: 0.9416,
            difference: 0.0116,
        }];
        let text = format_comparison("debt_ratio", "median", &rows);
        assert!(text.contains("2025"));
        assert!(text.contains("0.9300"));
        assert!(text.contains("+0.0116"));
    }

    #[test]
    fn qa_report_prints_no_findings_when_clean() {
        let qa = QaReport {
            missing_required: Vec::new(),
            core_coverage: Some((2010, 2024)),
            series: vec![SeriesFindings {
                metric_id: "psnd_ex".to_string(),
                name: "Public sector net debt ex BoE".to_string(),
                observations: 15,
                coverage: (Period::Year(2010), Period::Year(2024)),
                missing: Vec::new(),
                outliers: Vec::new(),
                out_of_bounds: Vec::new(),
            }],
            sfa_residual: year_series(&[(2011, 3.0), (2012, -7.5)]),
        };
        let text = format_qa_report(&qa);
        assert!(text.contains("Missing required: none"));
        assert!(text.contains("Core coverage: 2010..2024"));
        assert!(text.contains("No findings."));
        assert!(text.contains("worst -7.5000 at 2012 over 2 obs"));
    }

    #[test]
    fn qa_report_lists_findings_per_series() {
        let qa = QaReport {
            missing_required: vec!["debt_interest".to_string()],
            core_coverage: None,
            series: vec![SeriesFindings {
                metric_id: "yield_10y".to_string(),
                name: "10y gilt yield".to_string(),
                observations: 3,
                coverage: (Period::Year(2020), Period::Year(2022)),
                missing: vec![Period::Year(2021)],
                outliers: Vec::new(),
                out_of_bounds: vec![Period::Year(2022)],
            }],
            sfa_residual: year_series(&[]),
        };
        let text = format_qa_report(&qa);
        assert!(text.contains("Missing required: debt_interest"));
        assert!(text.contains("Core coverage: n/a"));
        assert!(text.contains("yield_10y missing: 2021"));
        assert!(text.contains("yield_10y out of bounds: 2022"));
        assert!(text.contains("SFA residual (levels): n/a"));
    }
}

//! Command-line parsing for the debt sustainability engine.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the projection/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::PathSource;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dsa", version, about = "Sovereign debt sustainability engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run data QA: coverage, outliers, plausibility bounds, SFA residual.
    Qa(QaArgs),
    /// Project the baseline debt ratio and print fiscal-gap diagnostics.
    Project(ProjectArgs),
    /// Rerun the projection under deterministic shock scenarios.
    Stress(StressArgs),
    /// Simulate the debt-ratio fan from a VAR(1) calibrated on history.
    Simulate(SimulateArgs),
    /// Compare an engine path against reference rows from a tidy CSV.
    Compare(CompareArgs),
}

/// Options for the QA sweep.
#[derive(Debug, Parser, Clone)]
pub struct QaArgs {
    /// Tidy observations CSV (`metric_id, period, value`).
    #[arg(short = 'd', long, value_name = "CSV")]
    pub data: PathBuf,
}

/// Options for the baseline projection.
#[derive(Debug, Parser, Clone)]
pub struct ProjectArgs {
    /// Tidy observations CSV (`metric_id, period, value`).
    #[arg(short = 'd', long, value_name = "CSV")]
    pub data: PathBuf,

    /// Final projection year. Defaults to ten years past the last observed
    /// debt ratio.
    #[arg(long, value_name = "YEAR")]
    pub horizon: Option<i32>,

    /// Export the combined history + projection path to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

/// Options for the stress command.
#[derive(Debug, Parser, Clone)]
pub struct StressArgs {
    /// Tidy observations CSV (`metric_id, period, value`).
    #[arg(short = 'd', long, value_name = "CSV")]
    pub data: PathBuf,

    /// Final projection year. Defaults to ten years past the last observed
    /// debt ratio.
    #[arg(long, value_name = "YEAR")]
    pub horizon: Option<i32>,

    /// TOML scenario catalogue; entries with catalogue names replace the
    /// built-ins, the rest are appended.
    #[arg(long, value_name = "TOML")]
    pub scenarios: Option<PathBuf>,

    /// Export the baseline and stressed paths side by side to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,
}

/// Options for the Monte Carlo fan.
#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Tidy observations CSV (`metric_id, period, value`).
    #[arg(short = 'd', long, value_name = "CSV")]
    pub data: PathBuf,

    /// Final projection year. Defaults to ten years past the last observed
    /// debt ratio.
    #[arg(long, value_name = "YEAR")]
    pub horizon: Option<i32>,

    /// Number of simulated paths.
    #[arg(long, default_value_t = 5000)]
    pub paths: usize,

    /// Random seed; fixes the fan bit-for-bit across runs.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Export the percentile bands to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the fan plus run metadata to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

/// Options for the reference comparison.
#[derive(Debug, Parser, Clone)]
pub struct CompareArgs {
    /// Tidy observations CSV (`metric_id, period, value`).
    #[arg(short = 'd', long, value_name = "CSV")]
    pub data: PathBuf,

    /// Tidy reference CSV (`metric_id, year, value`).
    #[arg(short = 'r', long, value_name = "CSV")]
    pub reference: PathBuf,

    /// Reference metric id holding the debt-ratio rows. Forecast files often
    /// label the series differently.
    #[arg(short = 'm', long, default_value = "debt_ratio")]
    pub metric: String,

    /// Engine path to compare against the reference rows.
    #[arg(long, value_enum, default_value_t = PathSource::Baseline)]
    pub source: PathSource,

    /// Final projection year. Defaults to ten years past the last observed
    /// debt ratio.
    #[arg(long, value_name = "YEAR")]
    pub horizon: Option<i32>,

    /// Number of simulated paths (median source only).
    #[arg(long, default_value_t = 5000)]
    pub paths: usize,

    /// Random seed (median source only).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simulate_defaults() {
        let cli = Cli::try_parse_from(["dsa", "simulate", "--data", "obs.csv"]).unwrap();
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.paths, 5000);
        assert_eq!(args.seed, 42);
        assert_eq!(args.horizon, None);
        assert!(args.export.is_none());
    }

    #[test]
    fn parses_compare_source() {
        let cli = Cli::try_parse_from([
            "dsa", "compare", "-d", "obs.csv", "-r", "ref.csv", "--source", "median",
        ])
        .unwrap();
        let Command::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.source, PathSource::Median);
        assert_eq!(args.metric, "debt_ratio");
    }

    #[test]
    fn missing_data_flag_is_rejected() {
        assert!(Cli::try_parse_from(["dsa", "qa"]).is_err());
    }
}

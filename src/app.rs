//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads the observations CSV into a data manager
//! - runs the requested command (QA, projection, stress, simulation, comparison)
//! - prints reports
//! - writes optional exports

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Cli, Command, CompareArgs, ProjectArgs, QaArgs, SimulateArgs, StressArgs};
use crate::domain::PathSource;
use crate::engine::{compare_reference, monte_carlo_fan, reference_metric_ids, stress_runs};
use crate::error::EngineError;

pub mod pipeline;

/// Entry point for the `dsa` binary.
pub fn run() -> Result<(), EngineError> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Qa(args) => handle_qa(args),
        Command::Project(args) => handle_project(args),
        Command::Stress(args) => handle_stress(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Compare(args) => handle_compare(args),
    }
}

fn init_tracing() {
    // Logs go to stderr so piped table output stays clean. `RUST_LOG`
    // controls verbosity.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

fn handle_qa(args: QaArgs) -> Result<(), EngineError> {
    let mut session = pipeline::load_session(&args.data)?;
    println!("{}", crate::report::format_ingest_summary(&session.ingest));

    let qa = crate::qa::run_qa(&mut session.manager)?;
    println!("{}", crate::report::format_qa_report(&qa));
    Ok(())
}

fn handle_project(args: ProjectArgs) -> Result<(), EngineError> {
    let mut session = pipeline::load_session(&args.data)?;
    let out = pipeline::run_projection(&mut session.manager, args.horizon)?;

    println!(
        "{}",
        crate::report::format_baseline_report(&out.assumptions, &out.baseline, &out.diagnostics)
    );

    if let Some(path) = &args.export {
        crate::io::write_path_csv(path, &out.baseline.path.combined(), "debt_ratio")?;
    }
    Ok(())
}

fn handle_stress(args: StressArgs) -> Result<(), EngineError> {
    let mut session = pipeline::load_session(&args.data)?;
    let out = pipeline::run_projection(&mut session.manager, args.horizon)?;
    let scenarios = pipeline::resolve_scenarios(args.scenarios.as_deref())?;

    let baseline_path = &out.baseline.path.projection;
    let runs = stress_runs(&out.assumptions, baseline_path, &scenarios);
    let baseline_end = baseline_path
        .points()
        .last()
        .map(|&(_, v)| v)
        .unwrap_or(f64::NAN);
    println!("{}", crate::report::format_stress_table(baseline_end, &runs));

    if let Some(path) = &args.export {
        crate::io::write_stress_csv(path, baseline_path, &runs)?;
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), EngineError> {
    let mut session = pipeline::load_session(&args.data)?;
    let out = pipeline::run_projection(&mut session.manager, args.horizon)?;

    let run = monte_carlo_fan(&out.kit, &out.assumptions, args.paths, args.seed);
    println!("{}", crate::report::format_monte_carlo(&run));

    if let Some(path) = &args.export {
        let fan = run.fan.as_ref().ok_or_else(|| {
            EngineError::config("no simulated fan to export; see the run summary above")
        })?;
        crate::io::write_fan_csv(path, fan)?;
    }
    if let Some(path) = &args.export_json {
        crate::io::write_fan_json(path, &run)?;
    }
    Ok(())
}

fn handle_compare(args: CompareArgs) -> Result<(), EngineError> {
    let mut session = pipeline::load_session(&args.data)?;
    let reference = crate::io::load_reference_rows(&args.reference)?;
    if !reference.row_errors.is_empty() {
        tracing::warn!(
            count = reference.row_errors.len(),
            "reference rows skipped during load"
        );
    }

    let available = reference_metric_ids(&reference.rows);
    if !available.contains(&args.metric) {
        return Err(EngineError::config(format!(
            "reference file has no '{}' rows; available: {}",
            args.metric,
            available.join(", ")
        )));
    }

    let out = pipeline::run_projection(&mut session.manager, args.horizon)?;
    let engine_path = match args.source {
        PathSource::Baseline => out.baseline.path.combined(),
        PathSource::Median => {
            let run = monte_carlo_fan(&out.kit, &out.assumptions, args.paths, args.seed);
            run.fan.and_then(|fan| fan.band_series(50)).ok_or_else(|| {
                EngineError::config(
                    "median path unavailable; the calibration panel was too short or simulation failed",
                )
            })?
        }
    };

    let rows = compare_reference(&reference.rows, &args.metric, &engine_path);
    println!(
        "{}",
        crate::report::format_comparison(&args.metric, args.source.label(), &rows)
    );
    Ok(())
}

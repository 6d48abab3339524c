//! Export projection results to CSV and JSON.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts: one tidy CSV per artefact, plus a self-describing JSON document
//! for the simulated fan.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::engine::{FAN_PERCENTILES, FanChart, MonteCarloRun, StressRun};
use crate::error::EngineError;
use crate::timeseries::{Period, TimeSeries};

/// Write a single projection path as `period,<header>` rows.
pub fn write_path_csv(
    path: &Path,
    series: &TimeSeries,
    value_header: &str,
) -> Result<(), EngineError> {
    let mut file = create_export(path)?;
    let werr = write_error(path);

    writeln!(file, "period,{}", csv_field(value_header)).map_err(&werr)?;
    for (period, value) in series.points() {
        writeln!(file, "{period},{}", fmt_cell(*value)).map_err(&werr)?;
    }
    Ok(())
}

/// Write the baseline path and every stressed path side by side, one column
/// per scenario.
pub fn write_stress_csv(
    path: &Path,
    baseline: &TimeSeries,
    runs: &[StressRun],
) -> Result<(), EngineError> {
    let mut file = create_export(path)?;
    let werr = write_error(path);

    let mut header = String::from("period,baseline");
    for run in runs {
        header.push(',');
        header.push_str(&csv_field(&run.scenario.name));
    }
    writeln!(file, "{header}").map_err(&werr)?;

    for (period, value) in baseline.points() {
        let mut line = format!("{period},{}", fmt_cell(*value));
        for run in runs {
            line.push(',');
            line.push_str(&fmt_cell(run.path.get(*period).unwrap_or(f64::NAN)));
        }
        writeln!(file, "{line}").map_err(&werr)?;
    }
    Ok(())
}

/// Write the fan-chart percentile bands as one column per percentile.
pub fn write_fan_csv(path: &Path, fan: &FanChart) -> Result<(), EngineError> {
    let mut file = create_export(path)?;
    let werr = write_error(path);

    let mut header = String::from("period");
    for p in FAN_PERCENTILES {
        header.push_str(&format!(",p{p}"));
    }
    writeln!(file, "{header}").map_err(&werr)?;

    for (t, period) in fan.periods.iter().enumerate() {
        let mut line = period.to_string();
        for band in &fan.bands {
            line.push(',');
            line.push_str(&fmt_cell(band[t]));
        }
        writeln!(file, "{line}").map_err(&werr)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct FanDocument<'a> {
    n_paths: usize,
    seed: u64,
    calibration_size: usize,
    percentiles: [u8; 7],
    periods: &'a [Period],
    /// `bands[i]` holds percentile `percentiles[i]` over `periods`.
    bands: &'a [Vec<f64>],
}

/// Write the simulated fan plus its run metadata as a JSON document.
///
/// Non-finite band values serialize as `null`.
pub fn write_fan_json(path: &Path, run: &MonteCarloRun) -> Result<(), EngineError> {
    let Some(fan) = &run.fan else {
        return Err(EngineError::config(
            "no simulated fan to export; the calibration panel was too short or simulation failed",
        ));
    };

    let doc = FanDocument {
        n_paths: run.n_paths,
        seed: run.seed,
        calibration_size: run.calibration_size,
        percentiles: FAN_PERCENTILES,
        periods: &fan.periods,
        bands: &fan.bands,
    };

    let mut file = File::create(path).map_err(|e| EngineError::Io {
        context: "failed to create export JSON",
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::to_writer_pretty(&mut file, &doc).map_err(|e| EngineError::Io {
        context: "failed to write export JSON",
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
    })?;
    writeln!(file).map_err(&write_error(path))?;
    Ok(())
}

fn create_export(path: &Path) -> Result<File, EngineError> {
    File::create(path).map_err(|e| EngineError::Io {
        context: "failed to create export CSV",
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_error(path: &Path) -> impl Fn(std::io::Error) -> EngineError + '_ {
    move |e| EngineError::Io {
        context: "failed to write export file",
        path: path.to_path_buf(),
        source: e,
    }
}

fn fmt_cell(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.6}")
    } else {
        String::new()
    }
}

fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

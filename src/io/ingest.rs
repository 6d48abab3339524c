//! CSV and pasted-text ingest.
//!
//! Turns tidy `metric_id, period, value` files into stored observations via
//! the data manager, with row-level validation: bad rows are collected and
//! reported, not silently dropped, and one stray line never fails an
//! otherwise good file. Also hosts the paste parsers for label/value and
//! value-only column input.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::engine::ReferenceRow;
use crate::error::EngineError;
use crate::timeseries::{DataManager, ParseSummary};

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Outcome of adding one metric's grouped rows.
#[derive(Debug, Clone)]
pub struct MetricIngest {
    pub metric_id: String,
    pub summary: ParseSummary,
}

/// Ingest output: per-metric add summaries plus row errors.
#[derive(Debug, Clone)]
pub struct ObservationIngest {
    pub per_metric: Vec<MetricIngest>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load a tidy observations CSV and store every valid row.
///
/// Unknown or computed metric ids and unparsable values become row errors;
/// an empty value cell is stored as a gap. A metric whose period labels all
/// fail the parser chain surfaces as the manager's unparsable-label error.
pub fn load_observations(
    dm: &mut DataManager,
    path: &Path,
) -> Result<ObservationIngest, EngineError> {
    let mut reader = open_csv(path)?;
    let header_map = read_header_map(&mut reader, path)?;
    let metric_col = required_column(&header_map, "metric_id")?;
    let period_col = required_column(&header_map, "period")?;
    let value_col = required_column(&header_map, "value")?;

    let mut grouped: BTreeMap<String, Vec<(String, f64)>> = BTreeMap::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2 because:
        // - records() starts at line 1 after headers
        // - CSV is 1-based line numbers
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let Some(metric_id) = field(&record, metric_col) else {
            row_errors.push(RowError {
                line,
                id: None,
                message: "missing metric id".to_string(),
            });
            continue;
        };
        match dm.registry().get(metric_id) {
            None => {
                row_errors.push(RowError {
                    line,
                    id: Some(metric_id.to_string()),
                    message: format!("unknown metric id '{metric_id}'"),
                });
                continue;
            }
            Some(metric) if metric.is_derived() => {
                row_errors.push(RowError {
                    line,
                    id: Some(metric_id.to_string()),
                    message: format!("metric '{metric_id}' is computed, not ingested"),
                });
                continue;
            }
            Some(_) => {}
        }

        let Some(period) = field(&record, period_col) else {
            row_errors.push(RowError {
                line,
                id: Some(metric_id.to_string()),
                message: "missing period label".to_string(),
            });
            continue;
        };

        let value = match field(&record, value_col) {
            None => f64::NAN,
            Some(raw) => match raw.parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    row_errors.push(RowError {
                        line,
                        id: Some(metric_id.to_string()),
                        message: format!("invalid value '{raw}'"),
                    });
                    continue;
                }
            },
        };

        grouped
            .entry(metric_id.to_string())
            .or_default()
            .push((period.to_string(), value));
    }

    if grouped.is_empty() {
        return Err(EngineError::config(format!(
            "no usable observation rows in '{}'",
            path.display()
        )));
    }

    let mut per_metric = Vec::with_capacity(grouped.len());
    let mut rows_used = 0usize;
    for (metric_id, rows) in grouped {
        let summary = dm.add_observations(&metric_id, &rows)?;
        rows_used += summary.parsed;
        per_metric.push(MetricIngest { metric_id, summary });
    }

    Ok(ObservationIngest {
        per_metric,
        row_errors,
        rows_read,
        rows_used,
    })
}

/// Reference rows read from a comparison CSV.
#[derive(Debug, Clone)]
pub struct ReferenceIngest {
    pub rows: Vec<ReferenceRow>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a tidy `metric_id, year, value` reference CSV.
pub fn load_reference_rows(path: &Path) -> Result<ReferenceIngest, EngineError> {
    let mut reader = open_csv(path)?;
    let header_map = read_header_map(&mut reader, path)?;
    let metric_col = required_column(&header_map, "metric_id")?;
    let year_col = required_column(&header_map, "year")?;
    let value_col = required_column(&header_map, "value")?;

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        let Some(metric_id) = field(&record, metric_col).map(str::to_string) else {
            row_errors.push(RowError {
                line,
                id: None,
                message: "missing metric id".to_string(),
            });
            continue;
        };
        let year = match field(&record, year_col).map(str::parse::<i32>) {
            Some(Ok(y)) => y,
            _ => {
                row_errors.push(RowError {
                    line,
                    id: Some(metric_id),
                    message: "missing or non-integer year".to_string(),
                });
                continue;
            }
        };
        let value = match field(&record, value_col).map(str::parse::<f64>) {
            Some(Ok(v)) => v,
            _ => {
                row_errors.push(RowError {
                    line,
                    id: Some(metric_id),
                    message: "missing or invalid value".to_string(),
                });
                continue;
            }
        };
        rows.push(ReferenceRow {
            metric_id,
            year,
            value,
        });
    }

    Ok(ReferenceIngest {
        rows,
        row_errors,
        rows_read,
    })
}

/// Parse pasted two-column text: one `label value` pair per line, split on
/// commas, tabs, or runs of spaces. Lines without both a label and a parsable
/// value are skipped, including bare single-value lines; paste those through
/// [`parse_one_column_values`] instead.
pub fn parse_pasted_two_column(text: &str) -> Vec<(String, f64)> {
    let mut out = Vec::new();
    for line in text.lines() {
        let cleaned = line.replace(',', " ");
        let parts: Vec<&str> = cleaned.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }
        // Prefer the second token; spreadsheet pastes sometimes carry extra
        // columns, in which case the last token wins.
        let value = parts[1]
            .parse::<f64>()
            .or_else(|_| parts[parts.len() - 1].parse::<f64>());
        if let Ok(v) = value {
            out.push((parts[0].to_string(), v));
        }
    }
    out
}

/// Parse a pasted column of numbers that must match a known index length.
pub fn parse_one_column_values(text: &str, expected: usize) -> Result<Vec<f64>, EngineError> {
    let mut values = Vec::new();
    for line in text.lines() {
        let cleaned = line.replace(',', " ");
        for token in cleaned.split_whitespace() {
            if let Ok(v) = token.parse::<f64>() {
                values.push(v);
            }
        }
    }
    if values.len() != expected {
        return Err(EngineError::InputShape {
            expected,
            got: values.len(),
        });
    }
    Ok(values)
}

fn open_csv(path: &Path) -> Result<csv::Reader<File>, EngineError> {
    let file = File::open(path).map_err(|e| EngineError::Io {
        context: "failed to open CSV",
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn read_header_map(
    reader: &mut csv::Reader<File>,
    path: &Path,
) -> Result<HashMap<String, usize>, EngineError> {
    let headers = reader
        .headers()
        .map_err(|e| EngineError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?
        .clone();
    Ok(headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect())
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header (e.g. "﻿metric_id"). If we don't strip it, schema
    // validation will incorrectly report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn required_column(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, EngineError> {
    header_map
        .get(name)
        .copied()
        .ok_or_else(|| EngineError::config(format!("missing required column `{name}`")))
}

fn field<'a>(record: &'a StringRecord, idx: usize) -> Option<&'a str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can
//! be:
//!
//! - used in-memory while resolving and projecting series
//! - exported to JSON/CSV
//! - round-tripped through CLI flags

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Observation frequency of a time series.
///
/// Variant order is the granularity order: `Monthly` is finer than
/// `Quarterly`, which is finer than `Yearly`. The derived `Ord` therefore
/// ranks finer frequencies greater, which is what frequency-dependency
/// upgrades compare against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Yearly,
    Quarterly,
    Monthly,
}

impl Frequency {
    /// Human-readable label used across reports and exports.
    pub fn label(self) -> &'static str {
        match self {
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        }
    }

    pub fn periods_per_year(self) -> usize {
        match self {
            Frequency::Monthly => 12,
            Frequency::Quarterly => 4,
            Frequency::Yearly => 1,
        }
    }

    /// Parse a frequency label as it appears in CSV columns or config files.
    pub fn parse_label(s: &str) -> Option<Frequency> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" | "m" => Some(Frequency::Monthly),
            "quarterly" | "q" => Some(Frequency::Quarterly),
            "yearly" | "annual" | "y" | "a" => Some(Frequency::Yearly),
            _ => None,
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How to combine sub-period observations when downsampling.
///
/// Flows (borrowing, interest paid) are summed into the coarser period;
/// stocks and levels (debt, index values, rates) are averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Mean,
    Sum,
}

/// How to combine period indexes when aligning several series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignMode {
    /// Keep only periods present in every series.
    Intersection,
    /// Keep periods present in any series; gaps become NaN.
    Union,
}

/// Display unit of a metric. Used for labels only; values are never rescaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Currency billions (nominal).
    CurrencyBn,
    /// Percentage points.
    Pct,
    /// Dimensionless ratio.
    Ratio,
    /// Index level (base period = 100).
    Index,
    Years,
}

impl Unit {
    pub fn label(self) -> &'static str {
        match self {
            Unit::CurrencyBn => "bn",
            Unit::Pct => "%",
            Unit::Ratio => "ratio",
            Unit::Index => "index",
            Unit::Years => "years",
        }
    }
}

/// Which stage of the period parser chain produced a canonical period.
///
/// The chain runs in a fixed order. `YearAnchor` means a bare year was
/// anchored to the last sub-period of the target frequency, which preserves
/// ordering but discards intra-year placement; callers may want to surface
/// that as a degraded parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStage {
    /// Parsed directly as a canonical period string at the target frequency.
    Canonical,
    /// Parsed as a calendar date, then truncated to the target frequency.
    Date,
    /// Parsed as a bare year and anchored to Q4/December.
    YearAnchor,
}

impl ParseStage {
    pub fn label(self) -> &'static str {
        match self {
            ParseStage::Canonical => "canonical",
            ParseStage::Date => "date",
            ParseStage::YearAnchor => "year-anchor",
        }
    }
}

/// Which engine path a reference table is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PathSource {
    /// Deterministic baseline projection.
    Baseline,
    /// Median of the Monte Carlo fan.
    Median,
}

impl PathSource {
    pub fn label(self) -> &'static str {
        match self {
            PathSource::Baseline => "baseline",
            PathSource::Median => "median",
        }
    }
}

//! Canonical calendar periods.
//!
//! A [`Period`] is a year, a quarter, or a month. Periods order by start date,
//! can be coarsened (`truncate`) or enumerated into finer sub-periods
//! (`subperiods`), and are printed in the canonical label formats used in
//! every export: `2024`, `2024Q3`, `2024-07`.
//!
//! Raw data rarely arrives in canonical form, so [`Period::parse_chain`] runs
//! a fixed sequence of fallbacks per label: canonical label first, then a
//! calendar date truncated to the target frequency, then a bare year anchored
//! to the last sub-period of the year. The stage that succeeded is reported
//! alongside the period so callers can log degraded parses.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::domain::{Frequency, ParseStage};

/// Date layouts attempted by the second parser stage, most specific first.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// One calendar period at a fixed frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Year(i32),
    Quarter { year: i32, quarter: u8 },
    Month { year: i32, month: u8 },
}

impl Period {
    pub fn frequency(self) -> Frequency {
        match self {
            Period::Year(_) => Frequency::Yearly,
            Period::Quarter { .. } => Frequency::Quarterly,
            Period::Month { .. } => Frequency::Monthly,
        }
    }

    pub fn year(self) -> i32 {
        match self {
            Period::Year(y) => y,
            Period::Quarter { year, .. } => year,
            Period::Month { year, .. } => year,
        }
    }

    /// First calendar month covered by this period, 1-based.
    pub fn start_month(self) -> u8 {
        match self {
            Period::Year(_) => 1,
            Period::Quarter { quarter, .. } => (quarter - 1) * 3 + 1,
            Period::Month { month, .. } => month,
        }
    }

    /// Successor period at the same frequency.
    pub fn next(self) -> Period {
        match self {
            Period::Year(y) => Period::Year(y + 1),
            Period::Quarter { year, quarter: 4 } => Period::Quarter {
                year: year + 1,
                quarter: 1,
            },
            Period::Quarter { year, quarter } => Period::Quarter {
                year,
                quarter: quarter + 1,
            },
            Period::Month { year, month: 12 } => Period::Month {
                year: year + 1,
                month: 1,
            },
            Period::Month { year, month } => Period::Month {
                year,
                month: month + 1,
            },
        }
    }

    /// Last sub-period of `year` at `freq`: the year itself, Q4, or December.
    pub fn year_end(year: i32, freq: Frequency) -> Period {
        match freq {
            Frequency::Yearly => Period::Year(year),
            Frequency::Quarterly => Period::Quarter { year, quarter: 4 },
            Frequency::Monthly => Period::Month { year, month: 12 },
        }
    }

    /// Period containing `date` at `freq`.
    pub fn from_date(date: NaiveDate, freq: Frequency) -> Period {
        use chrono::Datelike;
        let year = date.year();
        let month = date.month() as u8;
        match freq {
            Frequency::Yearly => Period::Year(year),
            Frequency::Quarterly => Period::Quarter {
                year,
                quarter: (month - 1) / 3 + 1,
            },
            Frequency::Monthly => Period::Month { year, month },
        }
    }

    /// Coarsen to `freq`. Returns `None` when `freq` is finer than this
    /// period, since a coarse period does not pick out a unique fine one.
    pub fn truncate(self, freq: Frequency) -> Option<Period> {
        if freq > self.frequency() {
            return None;
        }
        let year = self.year();
        Some(match freq {
            Frequency::Yearly => Period::Year(year),
            Frequency::Quarterly => Period::Quarter {
                year,
                quarter: (self.start_month() - 1) / 3 + 1,
            },
            Frequency::Monthly => self,
        })
    }

    /// Enumerate the sub-periods of this period at `freq`, in order.
    ///
    /// Returns just `self` when `freq` equals this period's frequency, and
    /// nothing when `freq` is coarser.
    pub fn subperiods(self, freq: Frequency) -> Vec<Period> {
        match freq.cmp(&self.frequency()) {
            Ordering::Less => Vec::new(),
            Ordering::Equal => vec![self],
            Ordering::Greater => {
                let year = self.year();
                match (self, freq) {
                    (Period::Year(_), Frequency::Quarterly) => (1..=4)
                        .map(|quarter| Period::Quarter { year, quarter })
                        .collect(),
                    (Period::Year(_), Frequency::Monthly) => (1..=12)
                        .map(|month| Period::Month { year, month })
                        .collect(),
                    (Period::Quarter { quarter, .. }, Frequency::Monthly) => {
                        let first = (quarter - 1) * 3 + 1;
                        (first..first + 3)
                            .map(|month| Period::Month { year, month })
                            .collect()
                    }
                    _ => Vec::new(),
                }
            }
        }
    }

    /// Parse a canonical label at exactly `freq`: `2024`, `2024Q3` (or
    /// `2024-Q3`), `2024-07`.
    pub fn parse_canonical(label: &str, freq: Frequency) -> Option<Period> {
        let label = label.trim();
        match freq {
            Frequency::Yearly => parse_year(label).map(Period::Year),
            Frequency::Quarterly => {
                let split = label.find(['Q', 'q'])?;
                let year = parse_year(label[..split].trim().trim_end_matches('-'))?;
                let quarter: u8 = label[split + 1..].trim().parse().ok()?;
                (1..=4).contains(&quarter).then_some(Period::Quarter { year, quarter })
            }
            Frequency::Monthly => {
                let (y, m) = label.split_once('-')?;
                let year = parse_year(y.trim())?;
                let month: u8 = m.trim().parse().ok()?;
                (1..=12).contains(&month).then_some(Period::Month { year, month })
            }
        }
    }

    /// Run the full parser chain for `label` at `freq`.
    ///
    /// Stages run in order: canonical label, calendar date truncated to
    /// `freq`, bare year anchored to [`Period::year_end`]. The first stage
    /// that produces a period wins; `None` means every stage failed.
    pub fn parse_chain(label: &str, freq: Frequency) -> Option<(Period, ParseStage)> {
        let label = label.trim();
        if let Some(period) = Period::parse_canonical(label, freq) {
            return Some((period, ParseStage::Canonical));
        }
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(label, format) {
                return Some((Period::from_date(date, freq), ParseStage::Date));
            }
        }
        if let Some(year) = parse_year(label) {
            return Some((Period::year_end(year, freq), ParseStage::YearAnchor));
        }
        None
    }
}

/// Accept only 4-digit years so stray numeric values are not mistaken for
/// period labels.
fn parse_year(s: &str) -> Option<i32> {
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        // Start date first; coarser frequency first on ties so a year sorts
        // ahead of its own Q1 and January.
        (self.year(), self.start_month(), self.frequency()).cmp(&(
            other.year(),
            other.start_month(),
            other.frequency(),
        ))
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Year(y) => write!(f, "{y}"),
            Period::Quarter { year, quarter } => write!(f, "{year}Q{quarter}"),
            Period::Month { year, month } => write!(f, "{year}-{month:02}"),
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

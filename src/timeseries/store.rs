//! Named series storage, label canonicalization, and panel alignment.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{Aggregation, AlignMode, Frequency, ParseStage, Unit};
use crate::timeseries::{Period, TimeSeries};

/// A stored series plus its display metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSeries {
    pub series: TimeSeries,
    pub unit: Unit,
}

/// Outcome of canonicalizing one batch of raw labels.
///
/// `worst` is the most degraded parser stage that was needed; `failed` lists
/// labels no stage could handle. Callers decide what to do with a degraded or
/// partially failed batch; the store itself keeps whatever parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseSummary {
    pub parsed: usize,
    pub degraded: usize,
    pub worst: Option<ParseStage>,
    pub failed: Vec<String>,
}

impl ParseSummary {
    pub fn all_failed(&self) -> bool {
        self.parsed == 0 && !self.failed.is_empty()
    }
}

/// Series keyed by metric id.
#[derive(Debug, Default, Clone)]
pub struct SeriesStore {
    entries: BTreeMap<String, StoredSeries>,
}

impl SeriesStore {
    pub fn new() -> SeriesStore {
        SeriesStore::default()
    }

    /// Canonicalize raw `(label, value)` observations at `freq` and store the
    /// surviving points under `id`, replacing any previous series.
    pub fn add(
        &mut self,
        id: &str,
        freq: Frequency,
        unit: Unit,
        observations: &[(String, f64)],
    ) -> ParseSummary {
        let mut points = Vec::with_capacity(observations.len());
        let mut summary = ParseSummary {
            parsed: 0,
            degraded: 0,
            worst: None,
            failed: Vec::new(),
        };
        for (label, value) in observations {
            match Period::parse_chain(label, freq) {
                Some((period, stage)) => {
                    points.push((period, *value));
                    summary.parsed += 1;
                    if stage != ParseStage::Canonical {
                        summary.degraded += 1;
                    }
                    summary.worst = Some(summary.worst.map_or(stage, |w| w.max(stage)));
                }
                None => summary.failed.push(label.clone()),
            }
        }
        self.insert(id, TimeSeries::from_points(freq, points), unit);
        summary
    }

    /// Store an already canonical series under `id`.
    pub fn insert(&mut self, id: &str, series: TimeSeries, unit: Unit) {
        self.entries
            .insert(id.to_string(), StoredSeries { series, unit });
    }

    pub fn remove(&mut self, id: &str) -> Option<StoredSeries> {
        self.entries.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&StoredSeries> {
        self.entries.get(id)
    }

    pub fn series(&self, id: &str) -> Option<&TimeSeries> {
        self.entries.get(id).map(|e| &e.series)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resampled copy of `id`, or an empty series when the id is unknown.
    pub fn resample(&self, id: &str, target: Frequency, agg: Aggregation) -> TimeSeries {
        self.series(id)
            .map_or_else(|| TimeSeries::new(target), |s| s.resample(target, agg))
    }

    /// Resample every requested id to `target` and join their indices.
    ///
    /// Intersection keeps periods present in all series; union keeps periods
    /// present in any, padding the rest with NaN. Column order follows `ids`.
    pub fn align(
        &self,
        ids: &[&str],
        target: Frequency,
        agg: Aggregation,
        mode: AlignMode,
    ) -> AlignedPanel {
        let resampled: Vec<TimeSeries> = ids
            .iter()
            .map(|id| self.resample(id, target, agg))
            .collect();
        let mut periods: Option<BTreeSet<Period>> = None;
        for series in &resampled {
            let index: BTreeSet<Period> = series.periods().collect();
            periods = Some(match (periods, mode) {
                (None, _) => index,
                (Some(acc), AlignMode::Intersection) => acc.intersection(&index).copied().collect(),
                (Some(acc), AlignMode::Union) => acc.union(&index).copied().collect(),
            });
        }
        let periods: Vec<Period> = periods.unwrap_or_default().into_iter().collect();
        let columns = resampled
            .iter()
            .map(|series| {
                periods
                    .iter()
                    .map(|&p| series.get(p).unwrap_or(f64::NAN))
                    .collect()
            })
            .collect();
        AlignedPanel {
            periods,
            ids: ids.iter().map(|id| id.to_string()).collect(),
            columns,
        }
    }
}

/// Several series on one shared period index, column-major.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPanel {
    pub periods: Vec<Period>,
    pub ids: Vec<String>,
    /// One column per id, each the same length as `periods`.
    pub columns: Vec<Vec<f64>>,
}

impl AlignedPanel {
    pub fn n_rows(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn column(&self, id: &str) -> Option<&[f64]> {
        let i = self.ids.iter().position(|c| c == id)?;
        Some(&self.columns[i])
    }

    /// Rows where every column has a usable value, in the original order.
    pub fn drop_nan_rows(&self) -> AlignedPanel {
        let keep: Vec<usize> = (0..self.periods.len())
            .filter(|&row| self.columns.iter().all(|col| !col[row].is_nan()))
            .collect();
        AlignedPanel {
            periods: keep.iter().map(|&row| self.periods[row]).collect(),
            ids: self.ids.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| keep.iter().map(|&row| col[row]).collect())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|&(l, v)| (l.to_string(), v)).collect()
    }

    #[test]
    fn add_reports_stages_and_failures() {
        let mut store = SeriesStore::new();
        let summary = store.add(
            "gdp_nominal",
            Frequency::Quarterly,
            Unit::CurrencyBn,
            &obs(&[
                ("2023Q4", 640.0),
                ("2024-02-14", 650.0),
                ("2024", 660.0),
                ("??", 1.0),
            ]),
        );
        assert_eq!(summary.parsed, 3);
        assert_eq!(summary.degraded, 2);
        assert_eq!(summary.worst, Some(ParseStage::YearAnchor));
        assert_eq!(summary.failed, vec!["??".to_string()]);
        let series = store.series("gdp_nominal").unwrap();
        assert_eq!(series.len(), 3);
        // "2024-02-14" lands in Q1, "2024" anchors to Q4.
        assert_eq!(
            series.get(Period::Quarter {
                year: 2024,
                quarter: 1
            }),
            Some(650.0)
        );
        assert_eq!(
            series.get(Period::Quarter {
                year: 2024,
                quarter: 4
            }),
            Some(660.0)
        );
    }

    #[test]
    fn add_with_nothing_parsable_reports_total_failure() {
        let mut store = SeriesStore::new();
        let summary = store.add(
            "psnd_ex",
            Frequency::Yearly,
            Unit::CurrencyBn,
            &obs(&[("first", 1.0), ("second", 2.0)]),
        );
        assert!(summary.all_failed());
        assert!(store.series("psnd_ex").unwrap().is_empty());
    }

    #[test]
    fn resample_unknown_id_is_empty() {
        let store = SeriesStore::new();
        let s = store.resample("nope", Frequency::Yearly, Aggregation::Mean);
        assert!(s.is_empty());
        assert_eq!(s.frequency(), Frequency::Yearly);
    }

    #[test]
    fn align_intersection_and_union() {
        let mut store = SeriesStore::new();
        store.add(
            "a",
            Frequency::Yearly,
            Unit::Ratio,
            &obs(&[("2020", 1.0), ("2021", 2.0), ("2022", 3.0)]),
        );
        store.add(
            "b",
            Frequency::Yearly,
            Unit::Ratio,
            &obs(&[("2021", 20.0), ("2022", 30.0), ("2023", 40.0)]),
        );

        let inner = store.align(
            &["a", "b"],
            Frequency::Yearly,
            Aggregation::Mean,
            AlignMode::Intersection,
        );
        assert_eq!(inner.periods, vec![Period::Year(2021), Period::Year(2022)]);
        assert_eq!(inner.column("a").unwrap(), &[2.0, 3.0]);
        assert_eq!(inner.column("b").unwrap(), &[20.0, 30.0]);

        let outer = store.align(
            &["a", "b"],
            Frequency::Yearly,
            Aggregation::Mean,
            AlignMode::Union,
        );
        assert_eq!(outer.n_rows(), 4);
        assert!(outer.column("b").unwrap()[0].is_nan());
        assert!(outer.column("a").unwrap()[3].is_nan());

        let trimmed = outer.drop_nan_rows();
        assert_eq!(trimmed.periods, inner.periods);
        assert_eq!(trimmed.column("a").unwrap(), inner.column("a").unwrap());
    }

    #[test]
    fn align_preserves_requested_column_order() {
        let mut store = SeriesStore::new();
        store.add("x", Frequency::Yearly, Unit::Pct, &obs(&[("2020", 1.0)]));
        store.add("y", Frequency::Yearly, Unit::Pct, &obs(&[("2020", 2.0)]));
        let panel = store.align(
            &["y", "x"],
            Frequency::Yearly,
            Aggregation::Mean,
            AlignMode::Intersection,
        );
        assert_eq!(panel.ids, vec!["y".to_string(), "x".to_string()]);
        assert_eq!(panel.columns[0], vec![2.0]);
    }
}

//! A single sorted time series at a fixed frequency.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{Aggregation, Frequency};
use crate::timeseries::Period;

/// Periods and values, sorted ascending with unique periods.
///
/// Values may be NaN; a NaN observation keeps its slot in the index and is
/// skipped by aggregations, mirroring how gaps behave everywhere else in the
/// engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    freq: Frequency,
    points: Vec<(Period, f64)>,
}

impl TimeSeries {
    pub fn new(freq: Frequency) -> TimeSeries {
        TimeSeries {
            freq,
            points: Vec::new(),
        }
    }

    /// Build a series from unordered points. Points are sorted, duplicate
    /// periods keep the last value given, and points at a different frequency
    /// than `freq` are discarded.
    pub fn from_points(freq: Frequency, mut points: Vec<(Period, f64)>) -> TimeSeries {
        points.retain(|(p, _)| p.frequency() == freq);
        points.sort_by_key(|(p, _)| *p);
        let mut out: Vec<(Period, f64)> = Vec::with_capacity(points.len());
        for (period, value) in points {
            match out.last_mut() {
                Some(last) if last.0 == period => last.1 = value,
                _ => out.push((period, value)),
            }
        }
        TimeSeries { freq, points: out }
    }

    pub fn frequency(&self) -> Frequency {
        self.freq
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(Period, f64)] {
        &self.points
    }

    pub fn periods(&self) -> impl Iterator<Item = Period> + '_ {
        self.points.iter().map(|&(p, _)| p)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|&(_, v)| v)
    }

    pub fn first_period(&self) -> Option<Period> {
        self.points.first().map(|&(p, _)| p)
    }

    pub fn last_period(&self) -> Option<Period> {
        self.points.last().map(|&(p, _)| p)
    }

    pub fn get(&self, period: Period) -> Option<f64> {
        self.points
            .binary_search_by(|(p, _)| p.cmp(&period))
            .ok()
            .map(|i| self.points[i].1)
    }

    /// Last observation whose value is finite, skipping trailing NaN slots.
    pub fn last_finite(&self) -> Option<(Period, f64)> {
        self.points.iter().rev().find(|(_, v)| v.is_finite()).copied()
    }

    pub fn map_values(&self, f: impl FnMut(f64) -> f64) -> TimeSeries {
        let mut f = f;
        TimeSeries {
            freq: self.freq,
            points: self.points.iter().map(|&(p, v)| (p, f(v))).collect(),
        }
    }

    pub fn fill_nan(&self, fill: f64) -> TimeSeries {
        self.map_values(|v| if v.is_nan() { fill } else { v })
    }

    /// Copy without the NaN slots, shrinking the index.
    pub fn drop_nan(&self) -> TimeSeries {
        TimeSeries {
            freq: self.freq,
            points: self
                .points
                .iter()
                .copied()
                .filter(|(_, v)| !v.is_nan())
                .collect(),
        }
    }

    /// Replace each NaN with the most recent non-NaN value. Leading NaN slots
    /// have nothing to carry and stay NaN.
    pub fn forward_fill(&self) -> TimeSeries {
        let mut carried = f64::NAN;
        self.map_values(|v| {
            if !v.is_nan() {
                carried = v;
            }
            carried
        })
    }

    /// Positional first difference: `v[i] - v[i-1]`, NaN at the first slot.
    pub fn diff(&self) -> TimeSeries {
        self.with_previous(|value, prev| value - prev)
    }

    /// Positional growth rate: `v[i] / v[i-1] - 1`, NaN at the first slot.
    pub fn pct_change(&self) -> TimeSeries {
        self.with_previous(|value, prev| value / prev - 1.0)
    }

    fn with_previous(&self, f: impl Fn(f64, f64) -> f64) -> TimeSeries {
        let points = self
            .points
            .iter()
            .enumerate()
            .map(|(i, &(p, v))| {
                let prev = if i == 0 { f64::NAN } else { self.points[i - 1].1 };
                (p, f(v, prev))
            })
            .collect();
        TimeSeries {
            freq: self.freq,
            points,
        }
    }

    /// Convert to `target` frequency.
    ///
    /// Downsampling groups observations into their containing coarse period
    /// and aggregates non-NaN values with `agg`; coarse periods inside the
    /// observed range with no usable observations become NaN. Upsampling
    /// carries the last known coarse value forward across every finer
    /// sub-period and never interpolates. Same-frequency calls are a copy.
    pub fn resample(&self, target: Frequency, agg: Aggregation) -> TimeSeries {
        match target.cmp(&self.freq) {
            Ordering::Equal => self.clone(),
            Ordering::Less => self.downsample(target, agg),
            Ordering::Greater => self.upsample(target),
        }
    }

    fn downsample(&self, target: Frequency, agg: Aggregation) -> TimeSeries {
        let mut buckets: BTreeMap<Period, Vec<f64>> = BTreeMap::new();
        for &(p, v) in &self.points {
            if let Some(bucket) = p.truncate(target) {
                buckets.entry(bucket).or_default().push(v);
            }
        }
        let (Some((&first, _)), Some((&last, _))) =
            (buckets.first_key_value(), buckets.last_key_value())
        else {
            return TimeSeries::new(target);
        };
        let mut points = Vec::new();
        let mut cursor = first;
        loop {
            let value = buckets
                .get(&cursor)
                .map_or(f64::NAN, |values| aggregate(values, agg));
            points.push((cursor, value));
            if cursor == last {
                break;
            }
            cursor = cursor.next();
        }
        TimeSeries {
            freq: target,
            points,
        }
    }

    fn upsample(&self, target: Frequency) -> TimeSeries {
        let (Some(&(first, _)), Some(&(last, _))) = (self.points.first(), self.points.last())
        else {
            return TimeSeries::new(target);
        };
        let mut points = Vec::new();
        let mut carried = f64::NAN;
        let mut cursor = first;
        loop {
            if let Some(v) = self.get(cursor) {
                if !v.is_nan() {
                    carried = v;
                }
            }
            for sub in cursor.subperiods(target) {
                points.push((sub, carried));
            }
            if cursor == last {
                break;
            }
            cursor = cursor.next();
        }
        TimeSeries {
            freq: target,
            points,
        }
    }
}

/// NaN-skipping aggregate; NaN when nothing usable is in the bucket.
fn aggregate(values: &[f64], agg: Aggregation) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        return f64::NAN;
    }
    match agg {
        Aggregation::Sum => sum,
        Aggregation::Mean => sum / count as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn yearly(values: &[(i32, f64)]) -> TimeSeries {
        TimeSeries::from_points(
            Frequency::Yearly,
            values.iter().map(|&(y, v)| (Period::Year(y), v)).collect(),
        )
    }

    fn quarter(year: i32, quarter: u8) -> Period {
        Period::Quarter { year, quarter }
    }

    #[test]
    fn from_points_sorts_and_keeps_last_duplicate() {
        let s = TimeSeries::from_points(
            Frequency::Yearly,
            vec![
                (Period::Year(2022), 2.0),
                (Period::Year(2020), 1.0),
                (Period::Year(2022), 5.0),
            ],
        );
        assert_eq!(
            s.points(),
            &[(Period::Year(2020), 1.0), (Period::Year(2022), 5.0)]
        );
        assert_eq!(s.get(Period::Year(2022)), Some(5.0));
        assert_eq!(s.get(Period::Year(2021)), None);
    }

    #[test]
    fn from_points_discards_foreign_frequencies() {
        let s = TimeSeries::from_points(
            Frequency::Yearly,
            vec![(Period::Year(2020), 1.0), (quarter(2020, 1), 9.0)],
        );
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn downsample_mean_and_sum() {
        let q = TimeSeries::from_points(
            Frequency::Quarterly,
            vec![
                (quarter(2023, 1), 1.0),
                (quarter(2023, 2), 2.0),
                (quarter(2023, 3), 3.0),
                (quarter(2023, 4), 4.0),
            ],
        );
        let mean = q.resample(Frequency::Yearly, Aggregation::Mean);
        assert_eq!(mean.points(), &[(Period::Year(2023), 2.5)]);
        let sum = q.resample(Frequency::Yearly, Aggregation::Sum);
        assert_eq!(sum.points(), &[(Period::Year(2023), 10.0)]);
    }

    #[test]
    fn downsample_skips_nan_and_marks_empty_buckets() {
        let q = TimeSeries::from_points(
            Frequency::Quarterly,
            vec![
                (quarter(2022, 1), 4.0),
                (quarter(2022, 2), f64::NAN),
                // Nothing at all in 2023.
                (quarter(2024, 1), 8.0),
            ],
        );
        let y = q.resample(Frequency::Yearly, Aggregation::Mean);
        assert_eq!(y.len(), 3);
        assert_eq!(y.get(Period::Year(2022)), Some(4.0));
        assert!(y.get(Period::Year(2023)).is_some_and(f64::is_nan));
        assert_eq!(y.get(Period::Year(2024)), Some(8.0));
    }

    #[test]
    fn upsample_forward_fills_across_gaps() {
        let y = yearly(&[(2020, 1.0), (2021, f64::NAN), (2022, 3.0)]);
        let q = y.resample(Frequency::Quarterly, Aggregation::Mean);
        assert_eq!(q.len(), 12);
        assert_eq!(q.get(quarter(2020, 4)), Some(1.0));
        // 2021 has no usable value, so 2020's carries through it.
        assert_eq!(q.get(quarter(2021, 2)), Some(1.0));
        assert_eq!(q.get(quarter(2022, 1)), Some(3.0));
    }

    #[test]
    fn yearly_quarterly_round_trip_preserves_values() {
        let y = yearly(&[(2020, 1.5), (2021, 2.5), (2022, -0.75)]);
        let back = y
            .resample(Frequency::Quarterly, Aggregation::Mean)
            .resample(Frequency::Yearly, Aggregation::Mean);
        assert_eq!(back.len(), y.len());
        for (period, value) in y.points() {
            assert_relative_eq!(back.get(*period).unwrap(), value, max_relative = 1e-12);
        }
    }

    #[test]
    fn upsample_produces_four_quarters_per_year() {
        for n in [1usize, 3, 7] {
            let values: Vec<(i32, f64)> = (0..n).map(|i| (2015 + i as i32, i as f64)).collect();
            let q = yearly(&values).resample(Frequency::Quarterly, Aggregation::Mean);
            assert_eq!(q.len(), 4 * n);
        }
    }

    #[test]
    fn resample_to_own_frequency_is_identity() {
        let y = yearly(&[(2020, 1.0), (2021, 2.0)]);
        assert_eq!(y.resample(Frequency::Yearly, Aggregation::Sum), y);
        assert!(
            TimeSeries::new(Frequency::Quarterly)
                .resample(Frequency::Yearly, Aggregation::Mean)
                .is_empty()
        );
    }

    #[test]
    fn diff_and_pct_change_leave_first_slot_nan() {
        let y = yearly(&[(2020, 100.0), (2021, 110.0), (2022, 99.0)]);
        let d = y.diff();
        assert!(d.get(Period::Year(2020)).is_some_and(f64::is_nan));
        assert_eq!(d.get(Period::Year(2021)), Some(10.0));
        assert_eq!(d.get(Period::Year(2022)), Some(-11.0));
        let g = y.pct_change();
        assert_relative_eq!(g.get(Period::Year(2021)).unwrap(), 0.10, max_relative = 1e-12);
        assert_relative_eq!(g.get(Period::Year(2022)).unwrap(), -0.10, max_relative = 1e-12);
    }

    #[test]
    fn fill_helpers() {
        let y = yearly(&[(2020, f64::NAN), (2021, 2.0), (2022, f64::NAN)]);
        let ff = y.forward_fill();
        assert!(ff.get(Period::Year(2020)).is_some_and(f64::is_nan));
        assert_eq!(ff.get(Period::Year(2022)), Some(2.0));
        let z = y.fill_nan(0.0);
        assert_eq!(z.get(Period::Year(2020)), Some(0.0));
        assert_eq!(z.get(Period::Year(2021)), Some(2.0));
        assert_eq!(y.last_finite(), Some((Period::Year(2021), 2.0)));
        let dropped = y.drop_nan();
        assert_eq!(dropped.points(), &[(Period::Year(2021), 2.0)]);
    }
}

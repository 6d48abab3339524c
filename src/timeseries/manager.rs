//! Session data manager.
//!
//! One `DataManager` owns everything a session knows: the metric catalogue,
//! the stored series, and per-metric frequency choices. Derived metrics are
//! resolved lazily through their compute rules, memoized in the store, and
//! invalidated whenever a series they (transitively) depend on is replaced.
//! Resolution tracks the in-progress chain so a cyclic `depends_on` graph
//! fails with a clear error instead of recursing forever.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{Aggregation, Frequency};
use crate::error::EngineError;
use crate::metrics::{ComputeRule, FrequencyRule, Metric, MetricRegistry};
use crate::timeseries::store::ParseSummary;
use crate::timeseries::{Period, SeriesStore, TimeSeries};

pub struct DataManager {
    registry: MetricRegistry,
    store: SeriesStore,
    user_freqs: BTreeMap<String, Frequency>,
    resolving: Vec<String>,
}

impl DataManager {
    pub fn new(registry: MetricRegistry) -> DataManager {
        DataManager {
            registry,
            store: SeriesStore::new(),
            user_freqs: BTreeMap::new(),
            resolving: Vec::new(),
        }
    }

    /// Manager over the standard catalogue.
    pub fn standard() -> DataManager {
        DataManager::new(MetricRegistry::standard())
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    fn metric(&self, id: &str) -> Result<&Metric, EngineError> {
        self.registry
            .get(id)
            .ok_or_else(|| EngineError::config(format!("unknown metric id '{id}'")))
    }

    fn frequency_of(&self, metric: &Metric) -> Frequency {
        if metric.freq_pinned {
            return metric.default_freq;
        }
        self.user_freqs
            .get(metric.id)
            .copied()
            .unwrap_or(metric.default_freq)
    }

    /// Frequency data for `id` is entered and stored at.
    pub fn chosen_frequency(&self, id: &str) -> Result<Frequency, EngineError> {
        let metric = self.metric(id)?;
        Ok(self.frequency_of(metric))
    }

    /// Record a data-entry frequency for `id`. Pinned metrics accept the call
    /// but keep their default; anything else must be in the allowed set.
    pub fn set_user_freq(&mut self, id: &str, freq: Frequency) -> Result<(), EngineError> {
        let metric = *self.metric(id)?;
        if metric.freq_pinned {
            self.user_freqs
                .insert(metric.id.to_string(), metric.default_freq);
            return Ok(());
        }
        if !metric.allows(freq) {
            return Err(EngineError::config(format!(
                "frequency '{freq}' not allowed for metric '{id}'"
            )));
        }
        self.user_freqs.insert(metric.id.to_string(), freq);
        Ok(())
    }

    /// Canonicalize and store raw observations for `id` at its chosen
    /// frequency, replacing any previous series and dropping every cached
    /// derived series that reads it.
    ///
    /// A batch where no label parses leaves the previous series in place and
    /// fails; a partially parsed batch is stored and described by the summary
    /// so the caller can decide whether the degradation is acceptable.
    pub fn add_observations(
        &mut self,
        id: &str,
        observations: &[(String, f64)],
    ) -> Result<ParseSummary, EngineError> {
        let metric = *self.metric(id)?;
        let freq = self.frequency_of(&metric);
        let previous = self.store.get(id).cloned();
        let summary = self.store.add(id, freq, metric.unit, observations);
        if summary.all_failed() {
            match previous {
                Some(prev) => self.store.insert(id, prev.series, prev.unit),
                None => {
                    self.store.remove(id);
                }
            }
            let label = summary.failed.first().cloned().unwrap_or_default();
            return Err(EngineError::UnparsableLabel {
                metric: id.to_string(),
                label,
            });
        }
        if summary.degraded > 0 {
            debug!(
                metric = id,
                degraded = summary.degraded,
                failed = summary.failed.len(),
                "labels canonicalized through fallback parser stages"
            );
        }
        for dependent in self.registry.dependents_of(id) {
            self.store.remove(dependent);
        }
        Ok(summary)
    }

    /// Stored series for `id`, computing and caching it first when the metric
    /// is derived and nothing usable is stored. Absent raw metrics come back
    /// as an empty series at their chosen frequency.
    pub fn get_series(&mut self, id: &str) -> Result<TimeSeries, EngineError> {
        let metric = *self.metric(id)?;
        if let Some(stored) = self.store.get(id) {
            if !stored.series.is_empty() {
                return Ok(stored.series.clone());
            }
        }
        let Some(derived) = metric.derived else {
            return Ok(TimeSeries::new(self.frequency_of(&metric)));
        };
        if self.resolving.iter().any(|r| r == id) {
            let mut path: Vec<&str> = self.resolving.iter().map(String::as_str).collect();
            path.push(id);
            return Err(EngineError::CyclicDependency {
                path: path.join(" -> "),
            });
        }
        self.resolving.push(id.to_string());
        let result = self.evaluate(derived.rule, derived.depends_on);
        self.resolving.pop();
        let series = result?;
        debug!(metric = id, points = series.len(), "derived metric computed");
        self.store.insert(id, series.clone(), metric.unit);
        Ok(series)
    }

    /// Compute rule bodies. Level inputs that are flows (borrowing, interest,
    /// GDP) are summed into years; stocks are averaged.
    fn evaluate(&mut self, rule: ComputeRule, deps: &[&str]) -> Result<TimeSeries, EngineError> {
        match (rule, deps) {
            (ComputeRule::PrimaryBalance, &[borrowing_id, interest_id, ..]) => {
                let borrowing = self.yearly(borrowing_id, Aggregation::Sum)?;
                let interest = self.yearly(interest_id, Aggregation::Sum)?;
                let points = joined(&borrowing, &interest)
                    .into_iter()
                    .map(|(p, b, i)| (p, -(b - i)))
                    .collect();
                Ok(TimeSeries::from_points(Frequency::Yearly, points))
            }
            (ComputeRule::DebtRatio, &[debt_id, gdp_id, ..]) => {
                let debt = self.yearly(debt_id, Aggregation::Mean)?;
                let gdp = self.yearly(gdp_id, Aggregation::Sum)?;
                let points = joined(&debt, &gdp)
                    .into_iter()
                    .map(|(p, d, g)| (p, d / g))
                    .collect();
                Ok(TimeSeries::from_points(Frequency::Yearly, points))
            }
            (ComputeRule::EffectiveRate, &[debt_id, interest_id, ..]) => {
                let debt = self.yearly(debt_id, Aggregation::Mean)?;
                let interest = self.yearly(interest_id, Aggregation::Sum)?;
                let rows = joined(&debt, &interest);
                let points = rows
                    .iter()
                    .enumerate()
                    .map(|(t, &(p, d, i))| {
                        if t == 0 {
                            (p, f64::NAN)
                        } else {
                            (p, i / ((rows[t - 1].1 + d) / 2.0))
                        }
                    })
                    .collect();
                Ok(TimeSeries::from_points(Frequency::Yearly, points))
            }
            (ComputeRule::NominalGrowth, &[gdp_id, ..]) => {
                Ok(self.yearly(gdp_id, Aggregation::Sum)?.pct_change())
            }
            _ => Err(EngineError::config(
                "compute rule invoked without its dependencies",
            )),
        }
    }

    fn yearly(&mut self, id: &str, agg: Aggregation) -> Result<TimeSeries, EngineError> {
        Ok(self.get_series(id)?.resample(Frequency::Yearly, agg))
    }

    /// Apply the frequency-dependency rule table to the explicit user
    /// choices. Upgrades only (finer frequency), never downgrades, and only
    /// within the dependent metric's allowed set. Returns what changed.
    pub fn enforce_frequency_dependencies(
        &mut self,
        rules: &[FrequencyRule],
    ) -> Vec<(String, Frequency)> {
        let mut changed = Vec::new();
        let explicit: Vec<(String, Frequency)> = self
            .user_freqs
            .iter()
            .map(|(id, &freq)| (id.clone(), freq))
            .collect();
        for (metric_id, chosen) in explicit {
            for rule in rules {
                if rule.trigger_metric != metric_id || rule.trigger_freq != chosen {
                    continue;
                }
                for &(dep_id, min_freq) in rule.upgrades {
                    let Some(dep) = self.registry.get(dep_id).copied() else {
                        continue;
                    };
                    if !dep.allows(min_freq) {
                        continue;
                    }
                    if min_freq > self.frequency_of(&dep) {
                        self.user_freqs.insert(dep_id.to_string(), min_freq);
                        changed.push((dep_id.to_string(), min_freq));
                        debug!(
                            metric = dep_id,
                            freq = %min_freq,
                            trigger = rule.trigger_metric,
                            "frequency upgraded by dependency rule"
                        );
                    }
                }
            }
        }
        changed
    }

    /// Required raw metrics with no stored observations.
    pub fn missing_required(&self) -> Vec<String> {
        self.registry
            .iter()
            .filter(|m| m.required)
            .filter(|m| self.store.series(m.id).map_or(true, TimeSeries::is_empty))
            .map(|m| m.id.to_string())
            .collect()
    }

    /// Pre-flight gate used before any projection work.
    pub fn ensure_required(&self) -> Result<(), EngineError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(EngineError::MissingRequired { ids: missing })
        }
    }

    /// Intersection of the observed year ranges of `ids`. `None` when any of
    /// them has no observations or the ranges do not overlap.
    pub fn coverage_years(&self, ids: &[&str]) -> Option<(i32, i32)> {
        let mut min_year: Option<i32> = None;
        let mut max_year: Option<i32> = None;
        for id in ids {
            let series = self.store.series(id)?;
            let first = series.first_period()?;
            let last = series.last_period()?;
            min_year = Some(min_year.map_or(first.year(), |m| m.max(first.year())));
            max_year = Some(max_year.map_or(last.year(), |m| m.min(last.year())));
        }
        match (min_year, max_year) {
            (Some(lo), Some(hi)) if lo <= hi => Some((lo, hi)),
            _ => None,
        }
    }
}

/// Rows of the period intersection of two series, in ascending order.
fn joined(a: &TimeSeries, b: &TimeSeries) -> Vec<(Period, f64, f64)> {
    a.points()
        .iter()
        .filter_map(|&(p, va)| b.get(p).map(|vb| (p, va, vb)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Unit;
    use crate::metrics::Derived;
    use approx::assert_relative_eq;

    fn obs(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|&(l, v)| (l.to_string(), v)).collect()
    }

    fn loaded_manager() -> DataManager {
        let mut dm = DataManager::standard();
        dm.add_observations("psnd_ex", &obs(&[("2020", 2000.0), ("2021", 2100.0)]))
            .unwrap();
        dm.add_observations("gdp_nominal", &obs(&[("2020", 2500.0), ("2021", 2625.0)]))
            .unwrap();
        dm.add_observations("psnb_ex", &obs(&[("2020", 100.0), ("2021", 90.0)]))
            .unwrap();
        dm.add_observations("debt_interest", &obs(&[("2020", 40.0), ("2021", 42.0)]))
            .unwrap();
        dm
    }

    #[test]
    fn set_user_freq_validates_and_respects_pins() {
        let mut dm = DataManager::standard();
        assert!(dm.set_user_freq("no_such_metric", Frequency::Yearly).is_err());
        assert!(dm.set_user_freq("psnb_ex", Frequency::Monthly).is_err());
        dm.set_user_freq("psnd_ex", Frequency::Monthly).unwrap();
        assert_eq!(dm.chosen_frequency("psnd_ex").unwrap(), Frequency::Monthly);
        // Pinned: the request is accepted but the default sticks.
        dm.set_user_freq("avg_maturity_years", Frequency::Yearly).unwrap();
        assert_eq!(
            dm.chosen_frequency("avg_maturity_years").unwrap(),
            Frequency::Yearly
        );
    }

    #[test]
    fn derived_metrics_compute_lazily() {
        let mut dm = loaded_manager();
        let b = dm.get_series("debt_ratio").unwrap();
        assert_relative_eq!(b.get(Period::Year(2020)).unwrap(), 0.8, max_relative = 1e-12);
        let pb = dm.get_series("primary_balance").unwrap();
        assert_relative_eq!(pb.get(Period::Year(2020)).unwrap(), -60.0, max_relative = 1e-12);
        let g = dm.get_series("nominal_g").unwrap();
        assert_relative_eq!(g.get(Period::Year(2021)).unwrap(), 0.05, max_relative = 1e-12);
        let r = dm.get_series("effective_r").unwrap();
        assert!(r.get(Period::Year(2020)).is_some_and(f64::is_nan));
        assert_relative_eq!(
            r.get(Period::Year(2021)).unwrap(),
            42.0 / 2050.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn quarterly_flows_are_summed_into_years() {
        let mut dm = loaded_manager();
        dm.set_user_freq("psnb_ex", Frequency::Quarterly).unwrap();
        dm.add_observations(
            "psnb_ex",
            &obs(&[
                ("2021Q1", 25.0),
                ("2021Q2", 25.0),
                ("2021Q3", 20.0),
                ("2021Q4", 20.0),
            ]),
        )
        .unwrap();
        let pb = dm.get_series("primary_balance").unwrap();
        // -(90 - 42) with the quarterly borrowing summed back to 90.
        assert_relative_eq!(pb.get(Period::Year(2021)).unwrap(), -48.0, max_relative = 1e-12);
    }

    #[test]
    fn replacing_a_dependency_recomputes_derived_series() {
        let mut dm = loaded_manager();
        let before = dm.get_series("debt_ratio").unwrap();
        assert_relative_eq!(
            before.get(Period::Year(2021)).unwrap(),
            2100.0 / 2625.0,
            max_relative = 1e-12
        );
        dm.add_observations("psnd_ex", &obs(&[("2020", 2000.0), ("2021", 2362.5)]))
            .unwrap();
        let after = dm.get_series("debt_ratio").unwrap();
        assert_relative_eq!(after.get(Period::Year(2021)).unwrap(), 0.9, max_relative = 1e-12);
    }

    #[test]
    fn dash_separated_quarter_labels_ingest_cleanly() {
        let mut dm = loaded_manager();
        dm.set_user_freq("psnb_ex", Frequency::Quarterly).unwrap();
        let summary = dm
            .add_observations("psnb_ex", &obs(&[("2021-Q1", 45.0), ("2021-Q2", 45.0)]))
            .unwrap();
        assert_eq!(summary.parsed, 2);
        assert_eq!(summary.degraded, 0);
        let s = dm.get_series("psnb_ex").unwrap();
        assert_eq!(
            s.get(Period::Quarter {
                year: 2021,
                quarter: 2
            }),
            Some(45.0)
        );
    }

    #[test]
    fn add_observations_keeps_previous_series_on_total_parse_failure() {
        let mut dm = loaded_manager();
        let err = dm
            .add_observations("psnd_ex", &obs(&[("junk", 1.0), ("more junk", 2.0)]))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnparsableLabel { .. }));
        assert_eq!(
            dm.get_series("psnd_ex").unwrap().get(Period::Year(2020)),
            Some(2000.0)
        );
    }

    #[test]
    fn absent_raw_metric_is_an_empty_series() {
        let mut dm = DataManager::standard();
        let s = dm.get_series("yield_10y").unwrap();
        assert!(s.is_empty());
        assert_eq!(s.frequency(), Frequency::Yearly);
        assert!(dm.get_series("no_such_metric").is_err());
    }

    #[test]
    fn cyclic_dependencies_fail_fast() {
        let registry = MetricRegistry::new(vec![
            Metric {
                id: "a",
                name: "a",
                unit: Unit::Ratio,
                allowed_freqs: &[Frequency::Yearly],
                default_freq: Frequency::Yearly,
                required: false,
                freq_pinned: true,
                derived: Some(Derived {
                    depends_on: &["b"],
                    rule: ComputeRule::NominalGrowth,
                }),
            },
            Metric {
                id: "b",
                name: "b",
                unit: Unit::Ratio,
                allowed_freqs: &[Frequency::Yearly],
                default_freq: Frequency::Yearly,
                required: false,
                freq_pinned: true,
                derived: Some(Derived {
                    depends_on: &["a"],
                    rule: ComputeRule::NominalGrowth,
                }),
            },
        ]);
        let mut dm = DataManager::new(registry);
        let err = dm.get_series("a").unwrap_err();
        assert_eq!(err.exit_code(), 4);
        match err {
            EngineError::CyclicDependency { path } => assert_eq!(path, "a -> b -> a"),
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn frequency_rules_upgrade_but_never_downgrade() {
        let registry = MetricRegistry::new(vec![
            Metric {
                id: "trigger",
                name: "trigger",
                unit: Unit::CurrencyBn,
                allowed_freqs: &[Frequency::Quarterly, Frequency::Yearly],
                default_freq: Frequency::Yearly,
                required: false,
                freq_pinned: false,
                derived: None,
            },
            Metric {
                id: "dep",
                name: "dep",
                unit: Unit::CurrencyBn,
                allowed_freqs: &[Frequency::Monthly, Frequency::Quarterly, Frequency::Yearly],
                default_freq: Frequency::Yearly,
                required: false,
                freq_pinned: false,
                derived: None,
            },
        ]);
        let rules = [FrequencyRule {
            trigger_metric: "trigger",
            trigger_freq: Frequency::Quarterly,
            upgrades: &[("dep", Frequency::Quarterly)],
        }];

        // Yearly dependent gets upgraded.
        let mut dm = DataManager::new(registry.clone());
        dm.set_user_freq("trigger", Frequency::Quarterly).unwrap();
        let changed = dm.enforce_frequency_dependencies(&rules);
        assert_eq!(changed, vec![("dep".to_string(), Frequency::Quarterly)]);
        assert_eq!(dm.chosen_frequency("dep").unwrap(), Frequency::Quarterly);

        // Monthly dependent is already finer and stays put.
        let mut dm = DataManager::new(registry);
        dm.set_user_freq("trigger", Frequency::Quarterly).unwrap();
        dm.set_user_freq("dep", Frequency::Monthly).unwrap();
        assert!(dm.enforce_frequency_dependencies(&rules).is_empty());
        assert_eq!(dm.chosen_frequency("dep").unwrap(), Frequency::Monthly);
    }

    #[test]
    fn untriggered_rules_change_nothing() {
        let mut dm = DataManager::standard();
        // Default frequencies only, no explicit choices.
        assert!(
            dm.enforce_frequency_dependencies(crate::metrics::STANDARD_FREQUENCY_RULES)
                .is_empty()
        );
    }

    #[test]
    fn coverage_is_the_intersection_of_year_ranges() {
        let mut dm = DataManager::standard();
        dm.add_observations(
            "psnd_ex",
            &obs(&[("2018", 1.0), ("2019", 1.0), ("2020", 1.0)]),
        )
        .unwrap();
        dm.add_observations("gdp_nominal", &obs(&[("2019", 1.0), ("2021", 1.0)]))
            .unwrap();
        assert_eq!(dm.coverage_years(&["psnd_ex", "gdp_nominal"]), Some((2019, 2020)));
        assert_eq!(dm.coverage_years(&["psnd_ex", "psnb_ex"]), None);
    }

    #[test]
    fn required_gate_reports_every_gap() {
        let mut dm = DataManager::standard();
        dm.add_observations("psnd_ex", &obs(&[("2020", 2000.0)])).unwrap();
        let err = dm.ensure_required().unwrap_err();
        match err {
            EngineError::MissingRequired { ids } => {
                assert_eq!(ids, vec!["gdp_nominal", "psnb_ex", "debt_interest"]);
            }
            other => panic!("expected missing-required, got {other:?}"),
        }
        assert!(loaded_manager().ensure_required().is_ok());
    }
}

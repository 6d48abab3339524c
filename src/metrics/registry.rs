//! Metric definitions and the frequency-dependency rule table.

use crate::domain::{Frequency, Unit};

/// How a derived metric is computed from its dependency list.
///
/// Dependencies are positional: each rule documents what it expects at each
/// slot of `Derived::depends_on`. Keeping the rule a plain tag (rather than a
/// stored closure) makes the dispatch explicit and the catalogue inspectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeRule {
    /// `[net borrowing, debt interest]`, both levels: `-(borrowing - interest)`.
    /// Positive values reduce debt.
    PrimaryBalance,
    /// `[debt level, nominal gdp]`: elementwise ratio on the yearly
    /// intersection of both series.
    DebtRatio,
    /// `[debt level, debt interest]`: interest divided by the average of the
    /// current and prior debt stock, yearly.
    EffectiveRate,
    /// `[nominal gdp]`: yearly percent change.
    NominalGrowth,
}

/// Derivation recipe attached to a derived metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Derived {
    pub depends_on: &'static [&'static str],
    pub rule: ComputeRule,
}

/// One catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metric {
    pub id: &'static str,
    pub name: &'static str,
    pub unit: Unit,
    pub allowed_freqs: &'static [Frequency],
    pub default_freq: Frequency,
    pub required: bool,
    /// Pinned metrics always use `default_freq`; a user frequency choice is
    /// accepted but silently ignored.
    pub freq_pinned: bool,
    pub derived: Option<Derived>,
}

impl Metric {
    pub fn is_derived(&self) -> bool {
        self.derived.is_some()
    }

    pub fn allows(&self, freq: Frequency) -> bool {
        self.allowed_freqs.contains(&freq)
    }
}

/// Binds a (trigger metric, trigger frequency) pair to minimum frequencies
/// for other metrics. Applied by the data manager so that, say, quarterly GDP
/// is never combined with yearly borrowing when building quarterly ratios.
#[derive(Debug, Clone, Copy)]
pub struct FrequencyRule {
    pub trigger_metric: &'static str,
    pub trigger_freq: Frequency,
    pub upgrades: &'static [(&'static str, Frequency)],
}

pub const STANDARD_FREQUENCY_RULES: &[FrequencyRule] = &[
    FrequencyRule {
        trigger_metric: "cpi",
        trigger_freq: Frequency::Monthly,
        upgrades: &[("gdp_deflator", Frequency::Quarterly)],
    },
    FrequencyRule {
        trigger_metric: "gdp_nominal",
        trigger_freq: Frequency::Quarterly,
        upgrades: &[
            ("psnb_ex", Frequency::Quarterly),
            ("debt_interest", Frequency::Quarterly),
        ],
    },
    FrequencyRule {
        trigger_metric: "psnd_ex",
        trigger_freq: Frequency::Monthly,
        upgrades: &[("debt_interest", Frequency::Quarterly)],
    },
];

const QUARTERLY_OR_YEARLY: &[Frequency] = &[Frequency::Quarterly, Frequency::Yearly];
const ANY_FREQ: &[Frequency] = &[Frequency::Monthly, Frequency::Quarterly, Frequency::Yearly];
const YEARLY_ONLY: &[Frequency] = &[Frequency::Yearly];

/// Closed list of metric definitions, raw first, then derived.
#[derive(Debug, Clone)]
pub struct MetricRegistry {
    metrics: Vec<Metric>,
}

impl MetricRegistry {
    pub fn new(metrics: Vec<Metric>) -> MetricRegistry {
        MetricRegistry { metrics }
    }

    /// The full catalogue used by the application.
    pub fn standard() -> MetricRegistry {
        MetricRegistry::new(vec![
            Metric {
                id: "gdp_nominal",
                name: "Nominal GDP",
                unit: Unit::CurrencyBn,
                allowed_freqs: QUARTERLY_OR_YEARLY,
                default_freq: Frequency::Yearly,
                required: true,
                freq_pinned: false,
                derived: None,
            },
            Metric {
                id: "psnd_ex",
                name: "Public sector net debt ex BoE",
                unit: Unit::CurrencyBn,
                allowed_freqs: ANY_FREQ,
                default_freq: Frequency::Yearly,
                required: true,
                freq_pinned: false,
                derived: None,
            },
            Metric {
                id: "psnb_ex",
                name: "Public sector net borrowing ex BoE",
                unit: Unit::CurrencyBn,
                allowed_freqs: QUARTERLY_OR_YEARLY,
                default_freq: Frequency::Yearly,
                required: true,
                freq_pinned: false,
                derived: None,
            },
            Metric {
                id: "debt_interest",
                name: "Net debt interest",
                unit: Unit::CurrencyBn,
                allowed_freqs: QUARTERLY_OR_YEARLY,
                default_freq: Frequency::Yearly,
                required: true,
                freq_pinned: false,
                derived: None,
            },
            Metric {
                id: "gdp_deflator",
                name: "GDP deflator",
                unit: Unit::Index,
                allowed_freqs: QUARTERLY_OR_YEARLY,
                default_freq: Frequency::Yearly,
                required: false,
                freq_pinned: false,
                derived: None,
            },
            Metric {
                id: "cpi",
                name: "CPI",
                unit: Unit::Index,
                allowed_freqs: &[Frequency::Monthly, Frequency::Yearly],
                default_freq: Frequency::Monthly,
                required: false,
                freq_pinned: false,
                derived: None,
            },
            Metric {
                id: "yield_10y",
                name: "10y gilt yield",
                unit: Unit::Pct,
                allowed_freqs: ANY_FREQ,
                default_freq: Frequency::Yearly,
                required: false,
                freq_pinned: false,
                derived: None,
            },
            Metric {
                id: "avg_maturity_years",
                name: "Average debt maturity",
                unit: Unit::Years,
                allowed_freqs: YEARLY_ONLY,
                default_freq: Frequency::Yearly,
                required: false,
                freq_pinned: true,
                derived: None,
            },
            Metric {
                id: "primary_balance",
                name: "Primary balance",
                unit: Unit::CurrencyBn,
                allowed_freqs: QUARTERLY_OR_YEARLY,
                default_freq: Frequency::Yearly,
                required: false,
                freq_pinned: true,
                derived: Some(Derived {
                    depends_on: &["psnb_ex", "debt_interest"],
                    rule: ComputeRule::PrimaryBalance,
                }),
            },
            Metric {
                id: "debt_ratio",
                name: "Debt-to-GDP ratio",
                unit: Unit::Ratio,
                allowed_freqs: YEARLY_ONLY,
                default_freq: Frequency::Yearly,
                required: false,
                freq_pinned: true,
                derived: Some(Derived {
                    depends_on: &["psnd_ex", "gdp_nominal"],
                    rule: ComputeRule::DebtRatio,
                }),
            },
            Metric {
                id: "effective_r",
                name: "Effective interest rate",
                unit: Unit::Ratio,
                allowed_freqs: YEARLY_ONLY,
                default_freq: Frequency::Yearly,
                required: false,
                freq_pinned: true,
                derived: Some(Derived {
                    depends_on: &["psnd_ex", "debt_interest"],
                    rule: ComputeRule::EffectiveRate,
                }),
            },
            Metric {
                id: "nominal_g",
                name: "Nominal GDP growth",
                unit: Unit::Ratio,
                allowed_freqs: YEARLY_ONLY,
                default_freq: Frequency::Yearly,
                required: false,
                freq_pinned: true,
                derived: Some(Derived {
                    depends_on: &["gdp_nominal"],
                    rule: ComputeRule::NominalGrowth,
                }),
            },
        ])
    }

    pub fn get(&self, id: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }

    pub fn required(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter().filter(|m| m.required)
    }

    /// Ids of every metric whose derivation (transitively) reads `id`.
    pub fn dependents_of(&self, id: &str) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        let mut frontier: Vec<&str> = vec![id];
        while let Some(current) = frontier.pop() {
            for metric in &self.metrics {
                let Some(derived) = &metric.derived else {
                    continue;
                };
                if derived.depends_on.iter().any(|dep| *dep == current)
                    && !out.contains(&metric.id)
                {
                    out.push(metric.id);
                    frontier.push(metric.id);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalogue_is_internally_consistent() {
        let registry = MetricRegistry::standard();
        for metric in registry.iter() {
            assert!(
                metric.allows(metric.default_freq),
                "{} default not in allowed set",
                metric.id
            );
            if let Some(derived) = &metric.derived {
                assert!(metric.freq_pinned, "{} derived but user-selectable", metric.id);
                for dep in derived.depends_on {
                    assert!(registry.get(dep).is_some(), "{} depends on unknown {dep}", metric.id);
                }
            }
        }
    }

    #[test]
    fn required_set_is_the_four_core_levels() {
        let registry = MetricRegistry::standard();
        let ids: Vec<&str> = registry.required().map(|m| m.id).collect();
        assert_eq!(ids, vec!["gdp_nominal", "psnd_ex", "psnb_ex", "debt_interest"]);
    }

    #[test]
    fn dependents_are_transitive() {
        let registry = MetricRegistry::standard();
        let mut deps = registry.dependents_of("psnd_ex");
        deps.sort_unstable();
        assert_eq!(deps, vec!["debt_ratio", "effective_r"]);
        assert!(registry.dependents_of("cpi").is_empty());
    }

    #[test]
    fn rule_table_upgrades_stay_within_allowed_frequencies() {
        let registry = MetricRegistry::standard();
        for rule in STANDARD_FREQUENCY_RULES {
            let trigger = registry.get(rule.trigger_metric).unwrap();
            assert!(trigger.allows(rule.trigger_freq));
            for (dep, freq) in rule.upgrades {
                assert!(registry.get(dep).unwrap().allows(*freq));
            }
        }
    }
}

//! Deterministic stress scenarios: permanent additive shocks to the debt
//! recursion inputs.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Additive shock applied on top of the baseline assumptions. All fields are
/// in ratio space, so `0.01` shifts a series by one percentage point of GDP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub r_pp: f64,
    #[serde(default)]
    pub g_pp: f64,
    #[serde(default)]
    pub pb_pp: f64,
    #[serde(default)]
    pub sfa_ratio_pp: f64,
}

impl ShockScenario {
    fn shock(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            r_pp: 0.0,
            g_pp: 0.0,
            pb_pp: 0.0,
            sfa_ratio_pp: 0.0,
        }
    }
}

/// The standard stress catalogue.
pub fn default_scenarios() -> Vec<ShockScenario> {
    vec![
        ShockScenario {
            r_pp: 0.03,
            ..ShockScenario::shock(
                "Rate +300bps",
                "Permanent +3pp shock to effective interest rate",
            )
        },
        ShockScenario {
            g_pp: -0.01,
            ..ShockScenario::shock("Growth -1pp", "Permanent -1pp shock to nominal GDP growth")
        },
        ShockScenario {
            pb_pp: -0.01,
            ..ShockScenario::shock(
                "Primary -1% GDP",
                "Permanent -1% GDP shock to primary balance",
            )
        },
        ShockScenario {
            sfa_ratio_pp: 0.01,
            ..ShockScenario::shock(
                "Inflation surprise (SFA +1% GDP)",
                "Stock-flow adjustment +1% GDP",
            )
        },
        ShockScenario {
            r_pp: 0.02,
            g_pp: -0.01,
            pb_pp: -0.005,
            ..ShockScenario::shock("Combined adverse", "r +2pp, g -1pp, pb -0.5% GDP")
        },
    ]
}

/// Overlay user scenarios on a base catalogue. A name collision replaces the
/// base entry in place (with a warning); new names append in file order.
pub fn merge_scenarios(
    base: Vec<ShockScenario>,
    overrides: Vec<ShockScenario>,
) -> Vec<ShockScenario> {
    let mut merged = base;
    for scenario in overrides {
        match merged.iter_mut().find(|s| s.name == scenario.name) {
            Some(existing) => {
                warn!(name = %scenario.name, "scenario overrides a catalogue entry");
                *existing = scenario;
            }
            None => merged.push(scenario),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_has_the_five_standard_entries() {
        let scenarios = default_scenarios();
        let names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Rate +300bps",
                "Growth -1pp",
                "Primary -1% GDP",
                "Inflation surprise (SFA +1% GDP)",
                "Combined adverse",
            ]
        );
        let combined = &scenarios[4];
        assert_eq!(combined.r_pp, 0.02);
        assert_eq!(combined.g_pp, -0.01);
        assert_eq!(combined.pb_pp, -0.005);
        assert_eq!(combined.sfa_ratio_pp, 0.0);
    }

    #[test]
    fn merge_replaces_in_place_and_appends_new_names() {
        let replacement = ShockScenario {
            r_pp: 0.05,
            ..ShockScenario::shock("Rate +300bps", "steeper variant")
        };
        let custom = ShockScenario {
            g_pp: -0.02,
            ..ShockScenario::shock("Stagnation", "")
        };
        let merged = merge_scenarios(default_scenarios(), vec![replacement, custom]);
        assert_eq!(merged.len(), 6);
        assert_eq!(merged[0].name, "Rate +300bps");
        assert_eq!(merged[0].r_pp, 0.05);
        assert_eq!(merged[5].name, "Stagnation");
    }

    #[test]
    fn omitted_fields_deserialize_to_zero() {
        let parsed: ShockScenario =
            toml::from_str("name = \"Growth only\"\ng_pp = -0.015\n").expect("valid scenario");
        assert_eq!(parsed.g_pp, -0.015);
        assert_eq!(parsed.r_pp, 0.0);
        assert_eq!(parsed.pb_pp, 0.0);
        assert_eq!(parsed.sfa_ratio_pp, 0.0);
        assert!(parsed.description.is_empty());
    }
}

//! Deterministic debt-sustainability arithmetic.
//!
//! Pure functions over time series, all in ratio space unless a name says
//! otherwise. Inputs are first reduced to the intersection of their period
//! indices; each function then applies a fixed gap policy on that aligned
//! frame: rates are carried forward from the prior period, balances and
//! adjustments are treated as zero. A rate gap before any observed value has
//! nothing to carry and poisons the recursion with NaN from that period on.

use crate::engine::scenarios::ShockScenario;
use crate::timeseries::{Period, TimeSeries};

/// Flat amortization assumption when no maturity series is supplied.
const DEFAULT_MATURITY_YEARS: f64 = 10.0;

/// Periods present in every input, ascending.
fn common_periods(series: &[&TimeSeries]) -> Vec<Period> {
    let Some((first, rest)) = series.split_first() else {
        return Vec::new();
    };
    first
        .periods()
        .filter(|&p| rest.iter().all(|s| s.get(p).is_some()))
        .collect()
}

/// Values at `periods` with NaN carried over from the prior period.
fn forward_filled(series: &TimeSeries, periods: &[Period]) -> Vec<f64> {
    let mut carried = f64::NAN;
    periods
        .iter()
        .map(|&p| {
            let v = series.get(p).unwrap_or(f64::NAN);
            if !v.is_nan() {
                carried = v;
            }
            carried
        })
        .collect()
}

/// Values at `periods` with NaN replaced by zero.
fn zero_filled(series: &TimeSeries, periods: &[Period]) -> Vec<f64> {
    periods
        .iter()
        .map(|&p| {
            let v = series.get(p).unwrap_or(f64::NAN);
            if v.is_nan() { 0.0 } else { v }
        })
        .collect()
}

/// Debt ratio recursion from the anchor `b0` (the ratio one period before the
/// first output point):
///
/// ```text
/// b[t] = (1 + r[t]) / (1 + g[t]) * b[t-1] - pb[t] + sfa[t]
/// ```
///
/// `pb` is the primary balance as a ratio of GDP, positive reducing debt;
/// `sfa` is the stock-flow adjustment ratio and defaults to zero when absent.
pub fn debt_dynamics(
    b0: f64,
    r: &TimeSeries,
    g: &TimeSeries,
    pb: &TimeSeries,
    sfa: Option<&TimeSeries>,
) -> TimeSeries {
    let mut inputs = vec![r, g, pb];
    if let Some(s) = sfa {
        inputs.push(s);
    }
    let periods = common_periods(&inputs);
    let rs = forward_filled(r, &periods);
    let gs = forward_filled(g, &periods);
    let pbs = zero_filled(pb, &periods);
    let sfas = match sfa {
        Some(s) => zero_filled(s, &periods),
        None => vec![0.0; periods.len()],
    };

    let mut prev = b0;
    let points = periods
        .iter()
        .enumerate()
        .map(|(t, &p)| {
            prev = (1.0 + rs[t]) / (1.0 + gs[t]) * prev - pbs[t] + sfas[t];
            (p, prev)
        })
        .collect();
    TimeSeries::from_points(r.frequency(), points)
}

/// Debt-stabilizing primary balance, `pb* = (r - g) / (1 + g) * b`,
/// elementwise on the intersection of the three indices.
pub fn stabilize_primary_balance(b: &TimeSeries, r: &TimeSeries, g: &TimeSeries) -> TimeSeries {
    let periods = common_periods(&[b, r, g]);
    let points = periods
        .iter()
        .map(|&p| {
            let bv = b.get(p).unwrap_or(f64::NAN);
            let rv = r.get(p).unwrap_or(f64::NAN);
            let gv = g.get(p).unwrap_or(f64::NAN);
            (p, (rv - gv) / (1.0 + gv) * bv)
        })
        .collect();
    TimeSeries::from_points(b.frequency(), points)
}

/// `pb - pb*`; positive means the realized balance overperforms the
/// stabilization requirement.
pub fn fiscal_gap(pb: &TimeSeries, pb_star: &TimeSeries) -> TimeSeries {
    let periods = common_periods(&[pb, pb_star]);
    let points = periods
        .iter()
        .map(|&p| {
            let a = pb.get(p).unwrap_or(f64::NAN);
            let b = pb_star.get(p).unwrap_or(f64::NAN);
            (p, a - b)
        })
        .collect();
    TimeSeries::from_points(pb.frequency(), points)
}

/// Gross financing need in currency terms: the deficit plus amortization,
/// with amortization approximated by debt stock over average maturity.
///
/// `b` is the debt ratio and `gdp`/`deficit` are levels. A missing maturity
/// series means a flat ten-year assumption; a partial one is carried forward,
/// with the flat assumption filling anything before its first observation.
pub fn gross_financing_need(
    b: &TimeSeries,
    gdp: &TimeSeries,
    deficit: &TimeSeries,
    avg_maturity_years: Option<&TimeSeries>,
) -> TimeSeries {
    let periods = common_periods(&[b, gdp, deficit]);
    let maturities: Vec<f64> = match avg_maturity_years {
        Some(series) if !series.is_empty() => {
            let mut carried = f64::NAN;
            periods
                .iter()
                .map(|&p| {
                    let v = series.get(p).unwrap_or(f64::NAN);
                    if !v.is_nan() {
                        carried = v;
                    }
                    if carried.is_nan() {
                        DEFAULT_MATURITY_YEARS
                    } else {
                        carried
                    }
                })
                .collect()
        }
        _ => vec![DEFAULT_MATURITY_YEARS; periods.len()],
    };
    let points = periods
        .iter()
        .enumerate()
        .map(|(t, &p)| {
            let debt_level = b.get(p).unwrap_or(f64::NAN) * gdp.get(p).unwrap_or(f64::NAN);
            let d = deficit.get(p).unwrap_or(f64::NAN);
            (p, d + debt_level / maturities[t])
        })
        .collect();
    TimeSeries::from_points(b.frequency(), points)
}

/// Interest burden as a share of GDP, both inputs in levels.
pub fn interest_to_gdp(interest: &TimeSeries, gdp: &TimeSeries) -> TimeSeries {
    let periods = common_periods(&[interest, gdp]);
    let points = periods
        .iter()
        .map(|&p| {
            let i = interest.get(p).unwrap_or(f64::NAN);
            let g = gdp.get(p).unwrap_or(f64::NAN);
            (p, i / g)
        })
        .collect();
    TimeSeries::from_points(interest.frequency(), points)
}

/// Stock-flow adjustment ratio: `(Δdebt - deficit) / gdp` on the aligned
/// frame, all inputs in levels. The first aligned period has no prior debt
/// stock to difference against and is NaN.
pub fn stock_flow_adjustment_ratio(
    debt: &TimeSeries,
    deficit: &TimeSeries,
    gdp: &TimeSeries,
) -> TimeSeries {
    let periods = common_periods(&[debt, deficit, gdp]);
    let debt_values: Vec<f64> = periods
        .iter()
        .map(|&p| debt.get(p).unwrap_or(f64::NAN))
        .collect();
    let points = periods
        .iter()
        .enumerate()
        .map(|(t, &p)| {
            if t == 0 {
                return (p, f64::NAN);
            }
            let delta = debt_values[t] - debt_values[t - 1];
            let d = deficit.get(p).unwrap_or(f64::NAN);
            let g = gdp.get(p).unwrap_or(f64::NAN);
            (p, (delta - d) / g)
        })
        .collect();
    TimeSeries::from_points(debt.frequency(), points)
}

/// Present value of future primary surpluses, holding the last observed
/// `(pb, r, g)` constant:
///
/// ```text
/// PV = Σ_{t=1..horizon} pb / Π_{s=1..t} (1 + r) / (1 + g)
/// ```
///
/// NaN when any input series is empty.
pub fn present_value_of_surpluses(
    pb_ratio: &TimeSeries,
    r: &TimeSeries,
    g: &TimeSeries,
    horizon: usize,
) -> f64 {
    let (Some(&(_, pb)), Some(&(_, rr)), Some(&(_, gg))) = (
        pb_ratio.points().last(),
        r.points().last(),
        g.points().last(),
    ) else {
        return f64::NAN;
    };
    let mut pv = 0.0;
    let mut discount = 1.0;
    for _ in 0..horizon {
        discount *= (1.0 + rr) / (1.0 + gg);
        pv += pb / discount;
    }
    pv
}

/// Rerun the debt recursion with permanent additive shocks applied to each
/// input. Shocks are deltas on top of the series, not replacements, and the
/// adjustment shock only applies when an adjustment series is present.
pub fn debt_stress_response(
    b0: f64,
    r: &TimeSeries,
    g: &TimeSeries,
    pb: &TimeSeries,
    sfa: Option<&TimeSeries>,
    shock: &ShockScenario,
) -> TimeSeries {
    let shocked_r = r.map_values(|v| v + shock.r_pp);
    let shocked_g = g.map_values(|v| v + shock.g_pp);
    let shocked_pb = pb.map_values(|v| v + shock.pb_pp);
    let shocked_sfa = sfa.map(|s| s.map_values(|v| v + shock.sfa_ratio_pp));
    debt_dynamics(b0, &shocked_r, &shocked_g, &shocked_pb, shocked_sfa.as_ref())
}

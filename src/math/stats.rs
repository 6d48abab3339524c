//! NaN-aware descriptive statistics.
//!
//! Series values use NaN for gaps, so every statistic here skips NaN rather
//! than poisoning its result. All three functions return NaN when no usable
//! value remains.

/// Mean of the non-NaN values.
pub fn nan_mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 { f64::NAN } else { sum / count as f64 }
}

/// Population standard deviation of the non-NaN values.
pub fn nan_std(values: &[f64]) -> f64 {
    let mean = nan_mean(values);
    if mean.is_nan() {
        return f64::NAN;
    }
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for &v in values {
        if !v.is_nan() {
            let d = v - mean;
            sum_sq += d * d;
            count += 1;
        }
    }
    (sum_sq / count as f64).sqrt()
}

/// Percentile `q` (0..=100) of the non-NaN values, with linear interpolation
/// between order statistics.
pub fn nan_percentile(values: &[f64], q: f64) -> f64 {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.sort_by(f64::total_cmp);
    let h = (finite.len() - 1) as f64 * (q / 100.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        return finite[lo];
    }
    finite[lo] + (h - lo as f64) * (finite[hi] - finite[lo])
}

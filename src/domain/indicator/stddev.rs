//! Standard Deviation.
//!
//! Population standard deviation over n values.
//! STDDEV(n)[i] = sqrt(sum((P[i-j] - SMA(n)[i])^2 for j in 0..n) / n)
//! Warmup: first (n-1) bars are NaN.

use crate::domain::indicator::mean_and_stddev;

pub fn calculate_stddev(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }

    for i in period.saturating_sub(1)..values.len() {
        let (_, sd) = mean_and_stddev(&values[i + 1 - period..=i]);
        out[i] = sd;
    }
    out
}

//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the SMA of the first n values, then
//! EMA[i] = P[i]*k + EMA[i-1]*(1-k).
//! Leading NaNs are skipped: the seed window starts at the first valid value.
//! Warmup: first (n-1) valid bars are NaN.

use crate::domain::indicator::first_valid;

pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }

    let start = first_valid(values);
    let seed_end = match start.checked_add(period) {
        Some(end) if end <= values.len() => end,
        _ => return out,
    };

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[start..seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end - 1] = ema;
    for i in seed_end..values.len() {
        ema = values[i] * k + ema * (1.0 - k);
        out[i] = ema;
    }
    out
}

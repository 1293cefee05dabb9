//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(P[i-n+1..=i]). Running sum, O(n).
//! Warmup: first (n-1) bars are NaN, as is any window holding a NaN.

pub fn calculate_sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }

    let mut sum = 0.0;
    let mut missing = 0usize;
    for (i, &value) in values.iter().enumerate() {
        if value.is_nan() {
            missing += 1;
        } else {
            sum += value;
        }
        if i >= period {
            let old = values[i - period];
            if old.is_nan() {
                missing -= 1;
            } else {
                sum -= old;
            }
        }
        if i + 1 >= period && missing == 0 {
            out[i] = sum / period as f64;
        }
    }
    out
}

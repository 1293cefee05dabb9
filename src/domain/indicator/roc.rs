//! ROC (Rate of Change).
//!
//! ROC(n)[i] = ((P[i] - P[i-n]) / P[i-n]) * 100
//! If P[i-n] == 0: ROC = 0
//! Warmup: first n bars NaN.

pub fn calculate_roc(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }

    for i in period..values.len() {
        let prev = values[i - period];
        out[i] = if prev == 0.0 {
            0.0
        } else {
            ((values[i] - prev) / prev) * 100.0
        };
    }
    out
}

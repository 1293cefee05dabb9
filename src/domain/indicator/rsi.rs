//! RSI (Relative Strength Index).
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are NaN (n price changes are needed).

pub fn calculate_rsi(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() <= period {
        return out;
    }

    let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |c: f64| if c > 0.0 { c } else { 0.0 };
    let loss = |c: f64| if c < 0.0 { -c } else { 0.0 };
    let rsi = |avg_gain: f64, avg_loss: f64| {
        if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        }
    };

    let mut avg_gain = changes[..period].iter().map(|c| gain(*c)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|c| loss(*c)).sum::<f64>() / period as f64;
    out[period] = rsi(avg_gain, avg_loss);

    for (idx, change) in changes.iter().enumerate().skip(period) {
        avg_gain = (avg_gain * (period - 1) as f64 + gain(*change)) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss(*change)) / period as f64;
        out[idx + 1] = rsi(avg_gain, avg_loss);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_and_single() {
        assert!(calculate_rsi(&[], 14).is_empty());
        let rsi = calculate_rsi(&[100.0], 14);
        assert_eq!(rsi.len(), 1);
        assert!(rsi[0].is_nan());
    }

    #[test]
    fn rsi_warmup_period() {
        let prices: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let rsi = calculate_rsi(&prices, 14);
        assert_eq!(rsi.len(), 15);
        for (i, v) in rsi.iter().enumerate().take(14) {
            assert!(v.is_nan(), "Bar {} should be warm-up", i);
        }
        assert!(!rsi[14].is_nan());
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let rsi = calculate_rsi(&prices, 14);
        assert!((rsi[14] - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let rsi = calculate_rsi(&prices, 14);
        assert!(rsi[14].abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_in_range() {
        let prices: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let rsi = calculate_rsi(&prices, 14);
        for v in rsi.iter().skip(14) {
            assert!((0.0..=100.0).contains(v), "RSI {} out of range", v);
        }
    }

    #[test]
    fn rsi_wilder_smoothing_step() {
        // period 2: changes +2, -1, +3
        let rsi = calculate_rsi(&[10.0, 12.0, 11.0, 14.0], 2);
        let (g, l) = (1.0, 0.5);
        assert!((rsi[2] - (100.0 - 100.0 / (1.0 + g / l))).abs() < 1e-12);
        let (g, l) = ((g + 3.0) / 2.0, (l + 0.0) / 2.0);
        assert!((rsi[3] - (100.0 - 100.0 / (1.0 + g / l))).abs() < 1e-12);
    }
}

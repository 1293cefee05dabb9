//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Warmup: the line is NaN for the first max(fast, slow) - 1 bars, the
//! signal for a further signal - 1 bars.

use crate::domain::indicator::calculate_ema;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdLines {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn calculate_macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdLines {
    let ema_fast = calculate_ema(values, fast);
    let ema_slow = calculate_ema(values, slow);

    let line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = calculate_ema(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| l - s)
        .collect();

    MacdLines {
        line,
        signal: signal_line,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.2).collect()
    }

    #[test]
    fn macd_warmup() {
        let macd = calculate_macd(&prices(50), 12, 26, 9);
        assert!(macd.line[24].is_nan());
        assert!(!macd.line[25].is_nan());
        assert!(macd.signal[32].is_nan());
        assert!(!macd.signal[33].is_nan());
        assert!(!macd.histogram[33].is_nan());
    }

    #[test]
    fn macd_line_is_ema_difference() {
        let values = prices(40);
        let macd = calculate_macd(&values, 3, 6, 4);
        let fast = calculate_ema(&values, 3);
        let slow = calculate_ema(&values, 6);
        for i in 5..values.len() {
            assert!((macd.line[i] - (fast[i] - slow[i])).abs() < 1e-12);
        }
    }

    #[test]
    fn macd_constant_prices_are_zero() {
        let macd = calculate_macd(&[50.0; 30], 3, 6, 4);
        for i in 8..30 {
            assert!(macd.line[i].abs() < 1e-12);
            assert!(macd.histogram[i].abs() < 1e-12);
        }
    }

    #[test]
    fn macd_short_input_is_all_nan() {
        let macd = calculate_macd(&[1.0, 2.0], 12, 26, 9);
        assert!(macd.line.iter().all(|v| v.is_nan()));
        assert!(macd.signal.iter().all(|v| v.is_nan()));
    }
}

//! Reference indicator implementations.
//!
//! Every function returns exactly one value per input bar. Bars inside the
//! warm-up window, and bars whose inputs are missing, are `NaN`.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod fib;
pub mod macd;
pub mod obv;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod wma;

pub use atr::calculate_atr;
pub use bollinger::{BollingerBands, calculate_bollinger};
pub use ema::calculate_ema;
pub use fib::calculate_fib_retracement;
pub use macd::{MacdLines, calculate_macd};
pub use obv::calculate_obv;
pub use roc::calculate_roc;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stddev::calculate_stddev;
pub use wma::calculate_wma;

/// Index of the first non-NaN value, or `values.len()`.
pub(crate) fn first_valid(values: &[f64]) -> usize {
    values
        .iter()
        .position(|v| !v.is_nan())
        .unwrap_or(values.len())
}

/// Mean and population standard deviation of a window.
pub(crate) fn mean_and_stddev(window: &[f64]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_valid_skips_leading_nan() {
        assert_eq!(first_valid(&[f64::NAN, f64::NAN, 1.0, f64::NAN]), 2);
        assert_eq!(first_valid(&[f64::NAN]), 1);
        assert_eq!(first_valid(&[]), 0);
    }

    #[test]
    fn population_stddev() {
        let (mean, sd) = mean_and_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < f64::EPSILON);
        assert!((sd - 2.0).abs() < f64::EPSILON);
    }
}

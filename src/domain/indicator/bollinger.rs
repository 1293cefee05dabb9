//! Bollinger Bands.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//! Warmup: first (period-1) bars are NaN.

use crate::domain::indicator::mean_and_stddev;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn calculate_bollinger(values: &[f64], period: usize, multiplier: f64) -> BollingerBands {
    let mut bands = BollingerBands {
        upper: vec![f64::NAN; values.len()],
        middle: vec![f64::NAN; values.len()],
        lower: vec![f64::NAN; values.len()],
    };
    if period == 0 {
        return bands;
    }

    for i in period.saturating_sub(1)..values.len() {
        let (middle, sd) = mean_and_stddev(&values[i + 1 - period..=i]);
        bands.middle[i] = middle;
        bands.upper[i] = middle + multiplier * sd;
        bands.lower[i] = middle - multiplier * sd;
    }
    bands
}

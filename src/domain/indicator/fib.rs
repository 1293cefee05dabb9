//! Fibonacci retracement level over a trailing window.
//!
//! With H = max(high) and L = min(low) over the last n bars,
//! FIB(level, n)[i] = H - (H - L) * ratio(level).
//! Warmup: first (n-1) bars are NaN.

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::FibonacciLevel;

pub fn calculate_fib_retracement(
    bars: &[OhlcvBar],
    level: FibonacciLevel,
    period: usize,
) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    if period == 0 {
        return out;
    }

    let ratio = level.ratio();
    for i in period.saturating_sub(1)..bars.len() {
        let window = &bars[i + 1 - period..=i];
        let high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        out[i] = high - (high - low) * ratio;
    }
    out
}

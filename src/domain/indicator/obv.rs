//! OBV (On-Balance Volume).

use crate::domain::ohlcv::OhlcvBar;

/// OBV[0] = volume[0]
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// If close[i] == close[i-1]: OBV[i] = OBV[i-1]
///
/// No warmup period.
pub fn calculate_obv(bars: &[OhlcvBar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut obv = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        let volume = bar.volume as f64;
        if i == 0 {
            obv = volume;
        } else if bar.close > bars[i - 1].close {
            obv += volume;
        } else if bar.close < bars[i - 1].close {
            obv -= volume;
        }
        out.push(obv);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(date: &str, close: f64, volume: i64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    #[test]
    fn obv_accumulates_by_direction() {
        let bars = vec![
            make_bar("2024-01-01", 10.0, 100),
            make_bar("2024-01-02", 11.0, 200),
            make_bar("2024-01-03", 10.5, 50),
            make_bar("2024-01-04", 10.5, 75),
        ];
        assert_eq!(calculate_obv(&bars), vec![100.0, 300.0, 250.0, 250.0]);
    }

    #[test]
    fn obv_empty() {
        assert!(calculate_obv(&[]).is_empty());
    }
}

//! Reference `SeriesProvider` computing every trading series from bars.
//!
//! Series on the table's own ticker are computed from the table's bars.
//! Other tickers must be registered with [`IndicatorProvider::with_ticker`];
//! their series are computed over their own history and then aligned to the
//! table by date, `NaN` where a date has no bar.

use crate::domain::bar_table::BarTable;
use crate::domain::indicator::{
    calculate_atr, calculate_bollinger, calculate_ema, calculate_fib_retracement, calculate_macd,
    calculate_obv, calculate_roc, calculate_rsi, calculate_sma, calculate_stddev, calculate_wma,
};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::TradingSeries;
use crate::ports::series_port::SeriesProvider;
use std::collections::HashMap;

/// Signal length used for the plain `MACD` line; only `MACD_SIGNAL` takes one.
const DEFAULT_MACD_SIGNAL: usize = 9;

#[derive(Debug, Clone, Default)]
pub struct IndicatorProvider {
    others: HashMap<String, Vec<OhlcvBar>>,
}

impl IndicatorProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>, mut bars: Vec<OhlcvBar>) -> Self {
        bars.sort_by_key(|bar| bar.date);
        self.others.insert(ticker.into(), bars);
        self
    }

    pub fn has_ticker(&self, ticker: &str) -> bool {
        self.others.contains_key(ticker)
    }
}

impl SeriesProvider for IndicatorProvider {
    fn resolve(&self, series: &TradingSeries, table: &BarTable) -> Vec<f64> {
        let ticker = match series.ticker() {
            Some(t) if t != table.ticker => t,
            _ => return compute(series, &table.bars),
        };

        match self.others.get(ticker) {
            Some(bars) => align(bars, &compute(series, bars), table),
            None => {
                log::warn!("no bars registered for '{ticker}'; {series} is NaN");
                vec![f64::NAN; table.len()]
            }
        }
    }
}

fn compute(series: &TradingSeries, bars: &[OhlcvBar]) -> Vec<f64> {
    let closes = || -> Vec<f64> { bars.iter().map(|b| b.close).collect() };
    match series {
        TradingSeries::Price { price_type, .. } => {
            bars.iter().map(|b| b.price(*price_type)).collect()
        }
        TradingSeries::Const(value) => vec![*value as f64; bars.len()],
        TradingSeries::Sma { length, .. } => calculate_sma(&closes(), *length),
        TradingSeries::Ema { length, .. } => calculate_ema(&closes(), *length),
        TradingSeries::Wma { length, .. } => calculate_wma(&closes(), *length),
        TradingSeries::Rsi { length, .. } => calculate_rsi(&closes(), *length),
        TradingSeries::Roc { length, .. } => calculate_roc(&closes(), *length),
        TradingSeries::Stddev { length, .. } => calculate_stddev(&closes(), *length),
        TradingSeries::Atr { length, .. } => calculate_atr(bars, *length),
        TradingSeries::Obv { .. } => calculate_obv(bars),
        TradingSeries::Macd {
            fast_length,
            slow_length,
            ..
        } => calculate_macd(&closes(), *fast_length, *slow_length, DEFAULT_MACD_SIGNAL).line,
        TradingSeries::MacdSignal {
            fast_length,
            slow_length,
            signal_length,
            ..
        } => calculate_macd(&closes(), *fast_length, *slow_length, *signal_length).signal,
        TradingSeries::BollingerUpper {
            length, std_dev, ..
        } => calculate_bollinger(&closes(), *length, *std_dev).upper,
        TradingSeries::BollingerLower {
            length, std_dev, ..
        } => calculate_bollinger(&closes(), *length, *std_dev).lower,
        TradingSeries::FibRetracement { level, length, .. } => {
            calculate_fib_retracement(bars, *level, *length)
        }
    }
}

fn align(bars: &[OhlcvBar], values: &[f64], table: &BarTable) -> Vec<f64> {
    let by_date: HashMap<_, f64> = bars
        .iter()
        .zip(values)
        .map(|(bar, v)| (bar.date, *v))
        .collect();
    table
        .dates()
        .map(|date| by_date.get(&date).copied().unwrap_or(f64::NAN))
        .collect()
}

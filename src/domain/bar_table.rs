//! Bar table: one ticker's bars plus the per-run series cache and the signal
//! columns written by evaluation and reconciliation.

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::reconcile::TradeLabel;
use crate::domain::series::PriceType;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct BarTable {
    pub ticker: String,
    pub bars: Vec<OhlcvBar>,
    pub date_index: HashMap<NaiveDate, usize>,
    cache: HashMap<String, Vec<f64>>,
    pub buy: Vec<bool>,
    pub sell: Vec<bool>,
    pub buy_signals: Vec<Option<String>>,
    pub sell_signals: Vec<Option<String>>,
    pub long: Vec<Option<TradeLabel>>,
    pub short: Vec<Option<TradeLabel>>,
}

impl BarTable {
    /// Bars are sorted by date; a repeated date keeps its last bar.
    pub fn new(ticker: impl Into<String>, mut bars: Vec<OhlcvBar>) -> Self {
        bars.sort_by_key(|bar| bar.date);
        bars.dedup_by(|later, earlier| {
            if later.date == earlier.date {
                *earlier = later.clone();
                true
            } else {
                false
            }
        });
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        let n = bars.len();
        Self {
            ticker: ticker.into(),
            bars,
            date_index,
            cache: HashMap::new(),
            buy: vec![false; n],
            sell: vec![false; n],
            buy_signals: vec![None; n],
            sell_signals: vec![None; n],
            long: vec![None; n],
            short: vec![None; n],
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|bar| bar.date)
    }

    pub fn get_bar_index(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    pub fn prices(&self, price_type: PriceType) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.price(price_type)).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.prices(PriceType::Close)
    }

    pub fn cached_series(&self, key: &str) -> Option<&[f64]> {
        self.cache.get(key).map(Vec::as_slice)
    }

    pub fn cache_series(&mut self, key: String, values: Vec<f64>) {
        self.cache.insert(key, values);
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

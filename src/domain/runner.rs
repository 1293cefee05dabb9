//! Strategy runner: evaluation, exit overlays and reconciliation over one
//! bar table.
//!
//! After `run`, the table's `buy`, `sell`, `buy_signals`, `sell_signals`,
//! `long` and `short` columns hold the reconciled result. A signal label is
//! kept only where its flag survived reconciliation. A flag set by a stop
//! loss or take profit carries the overlay's label; one added by the
//! end-of-data close is labelled [`END_OF_DATA_LABEL`].

use crate::domain::bar_table::BarTable;
use crate::domain::condition_eval::{SignalSeries, evaluate};
use crate::domain::exit_overlay::ExitOverlay;
use crate::domain::reconcile::{Discipline, Reconciliation, reconcile_with_exits};
use crate::domain::strategy::Strategy;
use crate::ports::series_port::SeriesProvider;

pub const END_OF_DATA_LABEL: &str = "EndOfData";

pub fn run(
    strategy: &Strategy,
    table: &mut BarTable,
    provider: &dyn SeriesProvider,
) -> Reconciliation {
    let buy = evaluate(&strategy.buy_condition, table, provider);
    let sell = evaluate(&strategy.sell_condition, table, provider);
    log::debug!(
        "{}: {} raw buy and {} raw sell signals over {} bars",
        table.ticker,
        buy.count(),
        sell.count(),
        table.len()
    );

    let closes = table.closes();
    let mut overlay = ExitOverlay::new(
        &closes,
        strategy.stop_loss.as_ref(),
        strategy.take_profit.as_ref(),
    );
    let discipline = Discipline::from(strategy.position_type);
    let reconciliation = reconcile_with_exits(&buy.flags, &sell.flags, discipline, &mut overlay);

    table.buy_signals = surviving_labels(&buy, &reconciliation.buy, &overlay);
    table.sell_signals = surviving_labels(&sell, &reconciliation.sell, &overlay);
    table.buy = reconciliation.buy.clone();
    table.sell = reconciliation.sell.clone();
    table.long = reconciliation.long.clone();
    table.short = reconciliation.short.clone();

    reconciliation
}

fn surviving_labels(
    raw: &SignalSeries,
    flags: &[bool],
    overlay: &ExitOverlay<'_>,
) -> Vec<Option<String>> {
    flags
        .iter()
        .enumerate()
        .map(|(i, &on)| {
            if !on {
                return None;
            }
            let label = overlay
                .label_at(i)
                .map(str::to_string)
                .or_else(|| raw.labels.get(i).cloned().flatten())
                .unwrap_or_else(|| END_OF_DATA_LABEL.to_string());
            Some(label)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::condition::Condition;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::reconcile::TradeLabel;
    use crate::domain::series::{PriceType, TradingSeries};
    use crate::domain::strategy::{
        Interval, OrderSize, PositionType, StopLoss, StopLossType, TakeProfit,
    };
    use chrono::NaiveDate;

    struct PriceProvider;

    impl SeriesProvider for PriceProvider {
        fn resolve(&self, series: &TradingSeries, table: &BarTable) -> Vec<f64> {
            match series {
                TradingSeries::Price { price_type, .. } => table.prices(*price_type),
                TradingSeries::Const(v) => vec![*v as f64; table.len()],
                _ => vec![f64::NAN; table.len()],
            }
        }
    }

    fn table(closes: &[f64]) -> BarTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: start + chrono::Days::new(i as u64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 100,
            })
            .collect();
        BarTable::new("AAPL", bars)
    }

    fn close() -> TradingSeries {
        TradingSeries::Price {
            ticker: "AAPL".into(),
            price_type: PriceType::Close,
        }
    }

    fn strategy(buy_above: i64, sell_below: i64, position_type: PositionType) -> Strategy {
        Strategy {
            ticker: "AAPL".into(),
            position_type,
            buy_condition: Condition::GreaterThan {
                first: close(),
                second: TradingSeries::Const(buy_above),
            },
            sell_condition: Condition::LessThan {
                first: close(),
                second: TradingSeries::Const(sell_below),
            },
            start_date: None,
            end_date: None,
            stop_loss: None,
            take_profit: None,
            interval: Interval::OneDay,
            period: None,
            initial_capital: 10_000.0,
            order_size: OrderSize::Contracts(1),
            trade_commissions: None,
        }
    }

    #[test]
    fn long_strategy_writes_columns() {
        let mut t = table(&[100.0, 110.0, 115.0, 95.0, 100.0]);
        let r = run(&strategy(105, 98, PositionType::Long), &mut t, &PriceProvider);
        assert_eq!(t.buy, vec![false, true, false, false, false]);
        assert_eq!(t.sell, vec![false, false, false, true, false]);
        assert_eq!(t.long[1], Some(TradeLabel::LongEntry));
        assert_eq!(t.long[3], Some(TradeLabel::LongExit));
        assert_eq!(r.buy, t.buy);
        // bar 2 also matched the buy condition but was discarded
        assert_eq!(t.buy_signals[2], None);
        assert!(t.buy_signals[1].as_deref().unwrap().starts_with("GreaterThanSignal("));
    }

    #[test]
    fn signal_columns_follow_flags() {
        let mut t = table(&[100.0, 110.0, 90.0, 120.0, 80.0, 130.0]);
        run(&strategy(105, 95, PositionType::LongShort), &mut t, &PriceProvider);
        for i in 0..t.len() {
            assert_eq!(t.buy[i], t.buy_signals[i].is_some());
            assert_eq!(t.sell[i], t.sell_signals[i].is_some());
        }
    }

    #[test]
    fn end_of_data_close_is_labelled() {
        let mut t = table(&[100.0, 110.0, 112.0]);
        run(&strategy(105, 50, PositionType::Long), &mut t, &PriceProvider);
        assert!(t.sell[2]);
        assert_eq!(t.sell_signals[2].as_deref(), Some(END_OF_DATA_LABEL));
        assert_eq!(t.long[2], Some(TradeLabel::LongExit));
    }

    #[test]
    fn stop_loss_adds_exit_before_reconciliation() {
        let mut s = strategy(105, 50, PositionType::Long);
        s.stop_loss = Some(StopLoss {
            kind: StopLossType::Normal,
            percent: 5.0,
        });
        let mut t = table(&[100.0, 110.0, 108.0, 100.0, 101.0]);
        run(&s, &mut t, &PriceProvider);
        assert_eq!(t.sell, vec![false, false, false, true, false]);
        assert_eq!(t.sell_signals[3].as_deref(), Some("StopLossNormal(5.0)"));
        assert_eq!(t.long[3], Some(TradeLabel::LongExit));
    }

    #[test]
    fn take_profit_adds_exit() {
        let mut s = strategy(105, 50, PositionType::Long);
        s.buy_condition = Condition::CrossOver {
            first: close(),
            second: TradingSeries::Const(105),
        };
        s.take_profit = Some(TakeProfit { percent: 10.0 });
        let mut t = table(&[100.0, 110.0, 112.0, 125.0, 90.0]);
        run(&s, &mut t, &PriceProvider);
        assert!(t.sell[3]);
        assert_eq!(t.sell_signals[3].as_deref(), Some("TakeProfit(10.0)"));
    }

    #[test]
    fn short_stop_loss_covers_without_new_entry() {
        let mut s = strategy(120, 100, PositionType::Short);
        s.stop_loss = Some(StopLoss {
            kind: StopLossType::Normal,
            percent: 5.0,
        });
        let mut t = table(&[105.0, 95.0, 110.0, 130.0, 110.0, 111.0, 112.0]);
        run(&s, &mut t, &PriceProvider);
        assert_eq!(
            t.short,
            vec![
                None,
                Some(TradeLabel::ShortEntry),
                Some(TradeLabel::ShortExit),
                None,
                None,
                None,
                None,
            ]
        );
        assert_eq!(t.buy_signals[2].as_deref(), Some("StopLossNormal(5.0)"));
        assert!(t.sell_signals.iter().flatten().all(|l| !l.starts_with("StopLoss")));
        assert!(!t.buy[3]);
    }

    #[test]
    fn combined_stop_loss_goes_flat() {
        let mut s = strategy(105, 95, PositionType::LongShort);
        s.stop_loss = Some(StopLoss {
            kind: StopLossType::Normal,
            percent: 5.0,
        });
        let mut t = table(&[100.0, 110.0, 104.0, 103.0, 90.0]);
        run(&s, &mut t, &PriceProvider);
        assert_eq!(t.long[1], Some(TradeLabel::LongEntry));
        assert_eq!(t.long[2], Some(TradeLabel::LongExit));
        assert_eq!(t.sell_signals[2].as_deref(), Some("StopLossNormal(5.0)"));
        assert!(t.short.iter().all(Option::is_none));
        for i in 0..t.len() {
            assert_eq!(t.buy[i], t.buy_signals[i].is_some());
            assert_eq!(t.sell[i], t.sell_signals[i].is_some());
        }
    }

    #[test]
    fn empty_table() {
        let mut t = table(&[]);
        let r = run(&strategy(105, 95, PositionType::Long), &mut t, &PriceProvider);
        assert!(r.is_empty());
        assert!(t.buy.is_empty());
    }
}

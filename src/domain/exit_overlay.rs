//! Stop-loss and take-profit overlays.
//!
//! The overlay is an [`ExitRule`] consulted by the reconciler on every bar a
//! position is held. It tracks the entry close of the open position and,
//! for a trailing stop, the most favourable close since entry. A fresh raw
//! signal for the held side resets the entry to that bar's close, and that
//! bar is not checked.
//!
//! Long thresholds:
//! - normal stop: `close <= entry * (1 - pct/100)`
//! - trailing stop: `close <= peak * (1 - pct/100)`, peak ratchets upward
//! - take profit: `close >= entry * (1 + pct/100)`
//!
//! Short thresholds mirror these around the entry (or the lowest close since
//! entry for a trailing stop). The stop loss is checked before take profit.

use crate::domain::reconcile::{ExitRule, HeldBar, PositionState};
use crate::domain::strategy::{StopLoss, StopLossType, TakeProfit};

#[derive(Debug, Clone, Copy)]
struct Tracked {
    opened_at: usize,
    entry: f64,
    extreme: f64,
}

pub struct ExitOverlay<'a> {
    closes: &'a [f64],
    stop_loss: Option<StopLoss>,
    take_profit: Option<TakeProfit>,
    tracked: Option<Tracked>,
    fired: Vec<(usize, String)>,
}

impl<'a> ExitOverlay<'a> {
    pub fn new(
        closes: &'a [f64],
        stop_loss: Option<&StopLoss>,
        take_profit: Option<&TakeProfit>,
    ) -> Self {
        Self {
            closes,
            stop_loss: stop_loss.copied(),
            take_profit: take_profit.copied(),
            tracked: None,
            fired: Vec::new(),
        }
    }

    /// Bars where an exit fired, with its label.
    pub fn fired(&self) -> &[(usize, String)] {
        &self.fired
    }

    pub fn label_at(&self, bar: usize) -> Option<&str> {
        self.fired
            .iter()
            .find(|(i, _)| *i == bar)
            .map(|(_, label)| label.as_str())
    }

    fn close(&self, bar: usize) -> f64 {
        self.closes.get(bar).copied().unwrap_or(f64::NAN)
    }

    fn triggered(&self, long: bool, t: &Tracked, close: f64) -> Option<String> {
        if let Some(stop) = &self.stop_loss {
            let pct = stop.percent / 100.0;
            let reference = match stop.kind {
                StopLossType::Normal => t.entry,
                StopLossType::Trailing => t.extreme,
            };
            let hit = if long {
                close <= reference * (1.0 - pct)
            } else {
                close >= reference * (1.0 + pct)
            };
            if hit {
                return Some(stop_label(stop));
            }
        }
        if let Some(take_profit) = &self.take_profit {
            let pct = take_profit.percent / 100.0;
            let hit = if long {
                close >= t.entry * (1.0 + pct)
            } else {
                close <= t.entry * (1.0 - pct)
            };
            if hit {
                return Some(format!("TakeProfit({:?})", take_profit.percent));
            }
        }
        None
    }
}

fn stop_label(stop: &StopLoss) -> String {
    match stop.kind {
        StopLossType::Normal => format!("StopLossNormal({:?})", stop.percent),
        StopLossType::Trailing => format!("StopLossTrailing({:?})", stop.percent),
    }
}

impl ExitRule for ExitOverlay<'_> {
    fn should_exit(&mut self, held: HeldBar) -> bool {
        if self.stop_loss.is_none() && self.take_profit.is_none() {
            return false;
        }
        let close = self.close(held.bar);
        if held.fresh_entry {
            self.tracked = Some(Tracked {
                opened_at: held.opened_at,
                entry: close,
                extreme: close,
            });
            return false;
        }

        let mut t = match self.tracked {
            Some(t) if t.opened_at == held.opened_at => t,
            _ => {
                let entry = self.close(held.opened_at);
                Tracked {
                    opened_at: held.opened_at,
                    entry,
                    extreme: entry,
                }
            }
        };
        let long = held.held == PositionState::Long;
        t.extreme = if long {
            t.extreme.max(close)
        } else {
            t.extreme.min(close)
        };

        match self.triggered(long, &t, close) {
            Some(label) => {
                log::debug!("{label} closed {:?} position at bar {}", held.held, held.bar);
                self.fired.push((held.bar, label));
                self.tracked = None;
                true
            }
            None => {
                self.tracked = Some(t);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reconcile::{Discipline, TradeLabel, reconcile_with_exits};

    fn flags(pattern: &[u8]) -> Vec<bool> {
        pattern.iter().map(|&b| b == 1).collect()
    }

    fn normal(percent: f64) -> StopLoss {
        StopLoss {
            kind: StopLossType::Normal,
            percent,
        }
    }

    fn trailing(percent: f64) -> StopLoss {
        StopLoss {
            kind: StopLossType::Trailing,
            percent,
        }
    }

    #[test]
    fn normal_stop_triggers_at_threshold() {
        let closes = [100.0, 97.0, 94.0, 90.0];
        let stop = normal(5.0);
        let mut overlay = ExitOverlay::new(&closes, Some(&stop), None);
        let r = reconcile_with_exits(
            &flags(&[1, 0, 0, 0]),
            &flags(&[0, 0, 0, 0]),
            Discipline::LongOnly,
            &mut overlay,
        );
        assert_eq!(r.sell, flags(&[0, 0, 1, 0]));
        assert_eq!(r.long[2], Some(TradeLabel::LongExit));
        assert_eq!(overlay.label_at(2), Some("StopLossNormal(5.0)"));
        assert_eq!(overlay.fired().len(), 1);
    }

    #[test]
    fn trailing_stop_follows_new_highs() {
        let closes = [100.0, 120.0, 110.0, 107.0];
        let stop = trailing(10.0);
        let mut overlay = ExitOverlay::new(&closes, Some(&stop), None);
        let r = reconcile_with_exits(
            &flags(&[1, 0, 0, 0]),
            &flags(&[0, 0, 0, 0]),
            Discipline::LongOnly,
            &mut overlay,
        );
        // 120 * 0.9 = 108
        assert_eq!(overlay.label_at(3), Some("StopLossTrailing(10.0)"));
        assert_eq!(r.long[3], Some(TradeLabel::LongExit));

        // the same prices never reach a normal 10% stop off the 100 entry
        let stop = normal(10.0);
        let mut overlay = ExitOverlay::new(&closes, Some(&stop), None);
        reconcile_with_exits(
            &flags(&[1, 0, 0, 0]),
            &flags(&[0, 0, 0, 0]),
            Discipline::LongOnly,
            &mut overlay,
        );
        assert!(overlay.fired().is_empty());
    }

    #[test]
    fn take_profit_triggers_at_threshold() {
        let closes = [100.0, 104.0, 106.0, 90.0];
        let take_profit = TakeProfit { percent: 5.0 };
        let mut overlay = ExitOverlay::new(&closes, None, Some(&take_profit));
        let r = reconcile_with_exits(
            &flags(&[1, 0, 0, 0]),
            &flags(&[0, 0, 0, 0]),
            Discipline::LongOnly,
            &mut overlay,
        );
        assert_eq!(r.sell, flags(&[0, 0, 1, 0]));
        assert_eq!(overlay.label_at(2), Some("TakeProfit(5.0)"));
    }

    #[test]
    fn fresh_buy_resets_entry() {
        let closes = [100.0, 80.0, 78.0, 75.0, 70.0];
        let stop = normal(5.0);
        let mut overlay = ExitOverlay::new(&closes, Some(&stop), None);
        let r = reconcile_with_exits(
            &flags(&[1, 1, 0, 0, 0]),
            &flags(&[0, 0, 0, 0, 0]),
            Discipline::LongOnly,
            &mut overlay,
        );
        // entry is 80 from bar 1; 78 is within 5%, 75 is not
        assert_eq!(r.sell, flags(&[0, 0, 0, 1, 0]));
    }

    #[test]
    fn signal_exit_ends_tracking() {
        let closes = [100.0, 101.0, 50.0, 40.0];
        let stop = normal(5.0);
        let mut overlay = ExitOverlay::new(&closes, Some(&stop), None);
        let r = reconcile_with_exits(
            &flags(&[1, 0, 0, 0]),
            &flags(&[0, 1, 0, 0]),
            Discipline::LongOnly,
            &mut overlay,
        );
        assert_eq!(r.sell, flags(&[0, 1, 0, 0]));
        assert!(overlay.fired().is_empty());
    }

    #[test]
    fn nan_close_never_triggers() {
        let closes = [100.0, f64::NAN, 90.0, 91.0];
        let stop = normal(5.0);
        let mut overlay = ExitOverlay::new(&closes, Some(&stop), None);
        let r = reconcile_with_exits(
            &flags(&[1, 0, 0, 0]),
            &flags(&[0, 0, 0, 0]),
            Discipline::LongOnly,
            &mut overlay,
        );
        assert_eq!(r.sell, flags(&[0, 0, 1, 0]));
    }

    #[test]
    fn short_stop_exits_with_buy_and_never_reopens() {
        let closes = [105.0, 95.0, 110.0, 130.0, 110.0, 111.0, 112.0];
        let stop = normal(5.0);
        let mut overlay = ExitOverlay::new(&closes, Some(&stop), None);
        let buy = flags(&[0, 0, 0, 1, 0, 0, 0]);
        let sell = flags(&[0, 1, 0, 0, 0, 0, 0]);
        let r = reconcile_with_exits(&buy, &sell, Discipline::ShortOnly, &mut overlay);
        // short at 95; 110 >= 95 * 1.05
        assert_eq!(r.buy, flags(&[0, 0, 1, 0, 0, 0, 0]));
        assert_eq!(r.sell, flags(&[0, 1, 0, 0, 0, 0, 0]));
        assert_eq!(r.short[2], Some(TradeLabel::ShortExit));
        let entries = r.short.iter().filter(|l| **l == Some(TradeLabel::ShortEntry)).count();
        assert_eq!(entries, 1);
        assert_eq!(overlay.label_at(2), Some("StopLossNormal(5.0)"));
        assert!(r.long.iter().all(Option::is_none));
    }

    #[test]
    fn short_trailing_and_take_profit_mirror_long() {
        let closes = [100.0, 90.0, 80.0, 86.0];
        let stop = trailing(5.0);
        let mut overlay = ExitOverlay::new(&closes, Some(&stop), None);
        let sell = flags(&[1, 0, 0, 0]);
        reconcile_with_exits(&flags(&[0, 0, 0, 0]), &sell, Discipline::ShortOnly, &mut overlay);
        // lowest close 80, 86 >= 84
        assert_eq!(overlay.label_at(3), Some("StopLossTrailing(5.0)"));

        let take_profit = TakeProfit { percent: 15.0 };
        let mut overlay = ExitOverlay::new(&closes, None, Some(&take_profit));
        let r = reconcile_with_exits(&flags(&[0, 0, 0, 0]), &sell, Discipline::ShortOnly, &mut overlay);
        // 80 <= 85
        assert_eq!(overlay.label_at(2), Some("TakeProfit(15.0)"));
        assert!(r.buy[2]);
    }

    #[test]
    fn combined_stop_closes_without_reversing() {
        let closes = [100.0, 101.0, 90.0, 91.0, 92.0];
        let stop = normal(5.0);
        let mut overlay = ExitOverlay::new(&closes, Some(&stop), None);
        let r = reconcile_with_exits(
            &flags(&[1, 0, 0, 0, 0]),
            &flags(&[0, 0, 0, 0, 0]),
            Discipline::Combined,
            &mut overlay,
        );
        assert_eq!(r.sell, flags(&[0, 0, 1, 0, 0]));
        assert_eq!(r.long[2], Some(TradeLabel::LongExit));
        assert!(r.short.iter().all(Option::is_none));
    }

    #[test]
    fn combined_reversal_tracks_new_side() {
        // long at 100, reversed short at 102, stopped out at 108
        let closes = [100.0, 102.0, 104.0, 108.0, 109.0];
        let stop = normal(5.0);
        let mut overlay = ExitOverlay::new(&closes, Some(&stop), None);
        let r = reconcile_with_exits(
            &flags(&[1, 0, 0, 0, 0]),
            &flags(&[0, 1, 0, 0, 0]),
            Discipline::Combined,
            &mut overlay,
        );
        assert_eq!(r.short[1], Some(TradeLabel::ShortEntry));
        assert_eq!(r.short[3], Some(TradeLabel::ShortExit));
        assert!(r.buy[3]);
        assert_eq!(r.long[3], None);
    }

    #[test]
    fn no_rules_never_fire() {
        let closes = [100.0, 10.0, 1.0];
        let mut overlay = ExitOverlay::new(&closes, None, None);
        let r = reconcile_with_exits(
            &flags(&[1, 0, 0]),
            &flags(&[0, 0, 0]),
            Discipline::LongOnly,
            &mut overlay,
        );
        assert!(overlay.fired().is_empty());
        // only the end-of-data close
        assert_eq!(r.sell, flags(&[0, 0, 1]));
    }
}

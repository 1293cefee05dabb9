//! Position-discipline reconciler.
//!
//! Normalizes raw per-bar (buy, sell) flags into a trade sequence that is
//! legal for a discipline, bar by bar over `{Flat, Long, Short}`, and emits
//! the `Long` / `Short` label columns.
//!
//! # Transitions
//!
//! - LongOnly: Flat + buy-only opens Long; Long + sell closes (buy ignored).
//! - ShortOnly: mirror of LongOnly.
//! - Combined: Flat opens on an unambiguous signal; Long + sell-only and
//!   Short + buy-only reverse on the same bar. Simultaneous buy and sell, or
//!   a repeat of the held side, is discarded.
//!
//! Every flag not consumed by a transition is cleared. A position still open
//! after the last bar is force-closed there, unless it was opened on that
//! bar, in which case the entry is cancelled.
//!
//! An [`ExitRule`] is consulted on every bar a position is carried through
//! unchanged. When it fires, the position is closed on that bar without
//! opening the opposite side: a long exit sets `sell`, a short exit `buy`.

use crate::domain::strategy::PositionType;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    LongOnly,
    ShortOnly,
    Combined,
}

impl From<PositionType> for Discipline {
    fn from(position_type: PositionType) -> Self {
        match position_type {
            PositionType::Long => Discipline::LongOnly,
            PositionType::Short => Discipline::ShortOnly,
            PositionType::LongShort => Discipline::Combined,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeLabel {
    LongEntry,
    LongExit,
    ShortEntry,
    ShortExit,
}

impl TradeLabel {
    pub fn is_entry(self) -> bool {
        matches!(self, TradeLabel::LongEntry | TradeLabel::ShortEntry)
    }
}

impl fmt::Display for TradeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeLabel::LongEntry => "LongEntry",
            TradeLabel::LongExit => "LongExit",
            TradeLabel::ShortEntry => "ShortEntry",
            TradeLabel::ShortExit => "ShortExit",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reconciliation {
    pub buy: Vec<bool>,
    pub sell: Vec<bool>,
    pub long: Vec<Option<TradeLabel>>,
    pub short: Vec<Option<TradeLabel>>,
}

impl Reconciliation {
    pub fn len(&self) -> usize {
        self.buy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buy.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeEvent {
    pub kind: TradeLabel,
    pub bar_index: usize,
}

/// A bar on which a position is held with no transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldBar {
    pub bar: usize,
    pub held: PositionState,
    pub opened_at: usize,
    /// The raw signal for the held side fired again on this bar.
    pub fresh_entry: bool,
}

pub trait ExitRule {
    fn should_exit(&mut self, held: HeldBar) -> bool;
}

struct NoExit;

impl ExitRule for NoExit {
    fn should_exit(&mut self, _: HeldBar) -> bool {
        false
    }
}

pub fn reconcile(buy: &[bool], sell: &[bool], discipline: Discipline) -> Reconciliation {
    reconcile_with_exits(buy, sell, discipline, &mut NoExit)
}

pub fn reconcile_with_exits(
    buy: &[bool],
    sell: &[bool],
    discipline: Discipline,
    rule: &mut dyn ExitRule,
) -> Reconciliation {
    let n = buy.len().min(sell.len());
    let mut out = Reconciliation {
        buy: buy[..n].to_vec(),
        sell: sell[..n].to_vec(),
        long: vec![None; n],
        short: vec![None; n],
    };

    let mut state = PositionState::Flat;
    let mut opened_at = 0;

    for i in 0..n {
        let (raw_buy, raw_sell) = (out.buy[i], out.sell[i]);
        let mut next = match discipline {
            Discipline::LongOnly => step_long_only(&mut out, i, state),
            Discipline::ShortOnly => step_short_only(&mut out, i, state),
            Discipline::Combined => step_combined(&mut out, i, state),
        };
        if next != state && next != PositionState::Flat {
            opened_at = i;
        }
        if next == state && state != PositionState::Flat {
            let held = HeldBar {
                bar: i,
                held: state,
                opened_at,
                fresh_entry: if state == PositionState::Long {
                    raw_buy
                } else {
                    raw_sell
                },
            };
            if rule.should_exit(held) {
                exit_now(&mut out, i, state);
                next = PositionState::Flat;
            }
        }
        state = next;
    }

    if n > 0 {
        close_at_end(&mut out, state, opened_at);
    }

    log::debug!(
        "reconciled {n} bars under {discipline:?}: {} long, {} short labels",
        out.long.iter().flatten().count(),
        out.short.iter().flatten().count()
    );
    out
}

fn clear(out: &mut Reconciliation, i: usize) {
    out.buy[i] = false;
    out.sell[i] = false;
}

fn exit_now(out: &mut Reconciliation, i: usize, state: PositionState) {
    clear(out, i);
    match state {
        PositionState::Long => {
            out.sell[i] = true;
            out.long[i] = Some(TradeLabel::LongExit);
        }
        PositionState::Short => {
            out.buy[i] = true;
            out.short[i] = Some(TradeLabel::ShortExit);
        }
        PositionState::Flat => {}
    }
}

fn step_long_only(out: &mut Reconciliation, i: usize, state: PositionState) -> PositionState {
    let (buy, sell) = (out.buy[i], out.sell[i]);
    match state {
        PositionState::Flat if buy && !sell => {
            out.long[i] = Some(TradeLabel::LongEntry);
            PositionState::Long
        }
        PositionState::Long if sell => {
            out.buy[i] = false;
            out.long[i] = Some(TradeLabel::LongExit);
            PositionState::Flat
        }
        _ => {
            clear(out, i);
            state
        }
    }
}

fn step_short_only(out: &mut Reconciliation, i: usize, state: PositionState) -> PositionState {
    let (buy, sell) = (out.buy[i], out.sell[i]);
    match state {
        PositionState::Flat if sell && !buy => {
            out.short[i] = Some(TradeLabel::ShortEntry);
            PositionState::Short
        }
        PositionState::Short if buy => {
            out.sell[i] = false;
            out.short[i] = Some(TradeLabel::ShortExit);
            PositionState::Flat
        }
        _ => {
            clear(out, i);
            state
        }
    }
}

fn step_combined(out: &mut Reconciliation, i: usize, state: PositionState) -> PositionState {
    let (buy, sell) = (out.buy[i], out.sell[i]);
    match (state, buy, sell) {
        (PositionState::Flat, true, false) => {
            out.long[i] = Some(TradeLabel::LongEntry);
            PositionState::Long
        }
        (PositionState::Flat, false, true) => {
            out.short[i] = Some(TradeLabel::ShortEntry);
            PositionState::Short
        }
        (PositionState::Long, false, true) => {
            out.long[i] = Some(TradeLabel::LongExit);
            out.short[i] = Some(TradeLabel::ShortEntry);
            PositionState::Short
        }
        (PositionState::Short, true, false) => {
            out.short[i] = Some(TradeLabel::ShortExit);
            out.long[i] = Some(TradeLabel::LongEntry);
            PositionState::Long
        }
        _ => {
            clear(out, i);
            state
        }
    }
}

fn close_at_end(out: &mut Reconciliation, state: PositionState, opened_at: usize) {
    let last = out.len() - 1;
    match state {
        PositionState::Flat => {}
        PositionState::Long if opened_at == last => {
            out.long[last] = None;
            // a reversal's flag still carries the short exit
            if out.short[last] != Some(TradeLabel::ShortExit) {
                out.buy[last] = false;
            }
        }
        PositionState::Short if opened_at == last => {
            out.short[last] = None;
            if out.long[last] != Some(TradeLabel::LongExit) {
                out.sell[last] = false;
            }
        }
        PositionState::Long => {
            out.sell[last] = true;
            out.long[last] = Some(TradeLabel::LongExit);
        }
        PositionState::Short => {
            out.buy[last] = true;
            out.short[last] = Some(TradeLabel::ShortExit);
        }
    }
}

/// Trade events in bar order; on a bar carrying both, the exit comes first.
pub fn trade_events(reconciliation: &Reconciliation) -> Vec<TradeEvent> {
    let mut events = Vec::new();
    for (i, (long, short)) in reconciliation
        .long
        .iter()
        .zip(&reconciliation.short)
        .enumerate()
    {
        let mut bar: Vec<TradeLabel> = long.iter().chain(short.iter()).copied().collect();
        bar.sort_by_key(|label| label.is_entry());
        events.extend(bar.into_iter().map(|kind| TradeEvent { kind, bar_index: i }));
    }
    events
}

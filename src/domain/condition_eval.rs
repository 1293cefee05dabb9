//! Condition evaluation engine.
//!
//! Evaluates a validated condition tree over a whole bar table at once,
//! producing a boolean flag per bar and a parallel label column. A label is
//! present exactly on the bars whose flag is true.
//!
//! # Evaluation Semantics
//!
//! - Comparisons are strict; any `NaN` operand yields `false`.
//! - `CrossOver` / `CrossUnder` compare bar `i-1` with bar `i`; bar 0 is `false`.
//! - `AND` labels join the children's labels; `OR` keeps the label of the
//!   last child that was true on that bar.
//! - `AfterXDays(inner, n)` shifts the inner flags and labels forward by `n`.
//! - Percent-change conditions compare bar `i-n` with bar `i`, never firing
//!   for a zero threshold or a zero base.
//! - Up/downtrends need every step of the trailing `n+1` bar window to be
//!   non-decreasing / non-increasing.
//!
//! Series are resolved through a [`SeriesProvider`] and memoized on the
//! table, keyed by their canonical text.

use crate::domain::bar_table::BarTable;
use crate::domain::condition::Condition;
use crate::domain::series::TradingSeries;
use crate::ports::series_port::SeriesProvider;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalSeries {
    pub flags: Vec<bool>,
    pub labels: Vec<Option<String>>,
}

impl SignalSeries {
    fn from_flags(flags: Vec<bool>, label: &str) -> Self {
        let labels = flags
            .iter()
            .map(|&on| on.then(|| label.to_string()))
            .collect();
        Self { flags, labels }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Number of bars whose flag is set.
    pub fn count(&self) -> usize {
        self.flags.iter().filter(|&&on| on).count()
    }
}

pub fn evaluate(
    condition: &Condition,
    table: &mut BarTable,
    provider: &dyn SeriesProvider,
) -> SignalSeries {
    match condition {
        Condition::GreaterThan { first, second } => {
            let (a, b) = pair(first, second, table, provider);
            let flags = a.iter().zip(&b).map(|(x, y)| x > y).collect();
            SignalSeries::from_flags(flags, &pair_label(condition, first, second))
        }
        Condition::LessThan { first, second } => {
            let (a, b) = pair(first, second, table, provider);
            let flags = a.iter().zip(&b).map(|(x, y)| x < y).collect();
            SignalSeries::from_flags(flags, &pair_label(condition, first, second))
        }
        Condition::CrossOver { first, second } => {
            let (a, b) = pair(first, second, table, provider);
            let flags = crossings(&a, &b, |prev_a, prev_b, a, b| prev_a < prev_b && a > b);
            SignalSeries::from_flags(flags, &pair_label(condition, first, second))
        }
        Condition::CrossUnder { first, second } => {
            let (a, b) = pair(first, second, table, provider);
            let flags = crossings(&a, &b, |prev_a, prev_b, a, b| prev_a > prev_b && a < b);
            SignalSeries::from_flags(flags, &pair_label(condition, first, second))
        }
        Condition::And(children) => {
            let results: Vec<SignalSeries> = children
                .iter()
                .map(|child| evaluate(child, table, provider))
                .collect();
            combine_and(&results, table.len())
        }
        Condition::Or(children) => {
            let results: Vec<SignalSeries> = children
                .iter()
                .map(|child| evaluate(child, table, provider))
                .collect();
            combine_or(&results, table.len())
        }
        Condition::AfterXDays { condition, days } => {
            let inner = evaluate(condition, table, provider);
            shift(inner, *days)
        }
        Condition::ChangeOfXPercentPerYDays {
            series,
            percent,
            days,
        } => {
            let values = resolve(series, table, provider);
            let label = format!("{}({series}, {percent:?}, {days})", signal_name(condition));
            SignalSeries::from_flags(percent_change(&values, *percent, *days), &label)
        }
        Condition::IntraIntervalChangeOfXPercent { series, percent } => {
            let values = resolve(series, table, provider);
            let label = format!("{}({series}, {percent:?})", signal_name(condition));
            SignalSeries::from_flags(percent_change(&values, *percent, 1), &label)
        }
        Condition::UptrendForXDays { series, days } => {
            let values = resolve(series, table, provider);
            let label = format!("{}({series}, {days})", signal_name(condition));
            SignalSeries::from_flags(trend(&values, *days, |prev, cur| cur >= prev), &label)
        }
        Condition::DowntrendForXDays { series, days } => {
            let values = resolve(series, table, provider);
            let label = format!("{}({series}, {days})", signal_name(condition));
            SignalSeries::from_flags(trend(&values, *days, |prev, cur| cur <= prev), &label)
        }
    }
}

fn resolve(series: &TradingSeries, table: &mut BarTable, provider: &dyn SeriesProvider) -> Vec<f64> {
    let key = series.to_string();
    if let Some(values) = table.cached_series(&key) {
        log::debug!("series cache hit: {key}");
        return values.to_vec();
    }

    let mut values = provider.resolve(series, table);
    values.resize(table.len(), f64::NAN);
    table.cache_series(key, values.clone());
    values
}

fn pair(
    first: &TradingSeries,
    second: &TradingSeries,
    table: &mut BarTable,
    provider: &dyn SeriesProvider,
) -> (Vec<f64>, Vec<f64>) {
    let a = resolve(first, table, provider);
    let b = resolve(second, table, provider);
    (a, b)
}

/// `GreaterThanCondition` -> `GreaterThanSignal`.
fn signal_name(condition: &Condition) -> String {
    format!("{}Signal", condition.name().trim_end_matches("Condition"))
}

fn pair_label(condition: &Condition, first: &TradingSeries, second: &TradingSeries) -> String {
    format!("{}({first}, {second})", signal_name(condition))
}

fn crossings(a: &[f64], b: &[f64], crossed: impl Fn(f64, f64, f64, f64) -> bool) -> Vec<bool> {
    (0..a.len())
        .map(|i| i > 0 && crossed(a[i - 1], b[i - 1], a[i], b[i]))
        .collect()
}

fn combine_and(results: &[SignalSeries], n: usize) -> SignalSeries {
    let mut out = SignalSeries {
        flags: vec![!results.is_empty(); n],
        labels: vec![None; n],
    };
    for i in 0..n {
        out.flags[i] = out.flags[i] && results.iter().all(|r| r.flags[i]);
        if out.flags[i] {
            let parts: Vec<&str> = results.iter().filter_map(|r| r.labels[i].as_deref()).collect();
            out.labels[i] = Some(format!("AND({})", parts.join(", ")));
        }
    }
    out
}

fn combine_or(results: &[SignalSeries], n: usize) -> SignalSeries {
    let mut out = SignalSeries {
        flags: vec![false; n],
        labels: vec![None; n],
    };
    for result in results {
        for i in 0..n {
            if result.flags[i] {
                out.flags[i] = true;
                out.labels[i] = result.labels[i].clone();
            }
        }
    }
    out
}

fn shift(inner: SignalSeries, days: usize) -> SignalSeries {
    let n = inner.len();
    let mut out = SignalSeries {
        flags: vec![false; n],
        labels: vec![None; n],
    };
    for i in days..n {
        out.flags[i] = inner.flags[i - days];
        out.labels[i] = inner.labels[i - days]
            .as_ref()
            .map(|label| format!("AfterXDaysSignal({days}, {label})"));
    }
    out
}

fn percent_change(values: &[f64], percent: f64, days: usize) -> Vec<bool> {
    (0..values.len())
        .map(|i| {
            if i < days || percent == 0.0 {
                return false;
            }
            let base = values[i - days];
            if base == 0.0 || base.is_nan() {
                return false;
            }
            let change = (values[i] - base) / base * 100.0;
            if percent > 0.0 {
                change >= percent
            } else {
                change <= percent
            }
        })
        .collect()
}

fn trend(values: &[f64], days: usize, step_ok: impl Fn(f64, f64) -> bool) -> Vec<bool> {
    (0..values.len())
        .map(|i| i >= days && (i + 1 - days..=i).all(|j| step_ok(values[j - 1], values[j])))
        .collect()
}

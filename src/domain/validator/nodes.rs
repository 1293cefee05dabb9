//! Recursive validation of `Condition` and `TradingSeries` call nodes.
//!
//! A node either rebuilds into its typed form or fails with a message; there
//! is no partial repair. `AND`/`OR` drop failing children. Problems inside a
//! node that do not invalidate it (ignored keywords, repeated bindings, a
//! replaced ticker) are recorded on the changelog under
//! `<side>:<Constructor>.<param>`.

use super::params::{self, NodeCx, Value};
use crate::domain::condition::Condition;
use crate::domain::expr::Node;
use crate::domain::schema::{self, Category, SchemaEntry};
use crate::domain::series::{FibonacciLevel, PriceType, TradingSeries};

fn resolve(name: &str, category: Category) -> Result<&'static SchemaEntry, String> {
    match schema::lookup(name) {
        Some(entry) if entry.category == category => Ok(entry),
        Some(entry) => Err(format!(
            "'{}' is a {} constructor, expected {}",
            name, entry.category, category
        )),
        None => Err(format!("unknown {} constructor '{}'", category, name)),
    }
}

pub fn validate_condition(node: &Node, cx: &mut NodeCx<'_>) -> Result<Condition, String> {
    let Node::Call { name, args, kwargs } = node else {
        return Err(format!("expected a Condition call, got {}", node.describe()));
    };
    let entry = resolve(name, Category::Condition)?;

    if entry.variadic {
        return validate_logical(entry, args, kwargs, cx);
    }

    let values = bind_and_validate(entry, args, kwargs, cx)?;
    build_condition(entry.name, &values)
}

fn validate_logical(
    entry: &'static SchemaEntry,
    args: &[Node],
    kwargs: &[(String, Node)],
    cx: &mut NodeCx<'_>,
) -> Result<Condition, String> {
    for (key, _) in kwargs {
        cx.record(
            entry.name,
            key,
            format!("keyword argument '{}' ignored; {} takes positional conditions", key, entry.name),
        );
    }
    let mut children = Vec::with_capacity(args.len());
    for (i, child) in args.iter().enumerate() {
        match validate_condition(child, cx) {
            Ok(condition) => children.push(condition),
            Err(reason) => cx.record(
                entry.name,
                &format!("conditions[{}]", i),
                format!("dropped: {}", reason),
            ),
        }
    }
    if children.is_empty() {
        return Err(format!("{} has no valid conditions", entry.name));
    }
    Ok(if entry.name == "AND" {
        Condition::And(children)
    } else {
        Condition::Or(children)
    })
}

pub fn validate_series(node: &Node, cx: &mut NodeCx<'_>) -> Result<TradingSeries, String> {
    let Node::Call { name, args, kwargs } = node else {
        return Err(format!("expected a TradingSeries call, got {}", node.describe()));
    };
    let entry = resolve(name, Category::TradingSeries)?;

    if !entry.takes_ticker() {
        let values = bind_and_validate(entry, args, kwargs, cx)?;
        return match values.first() {
            Some((_, Value::Int(v))) => Ok(TradingSeries::Const(*v)),
            _ => Err(format!("{} requires an integer value", entry.name)),
        };
    }

    let (ticker_node, rest) = match args.split_first() {
        Some((first, rest)) => (Some(first), rest),
        None => (None, args.as_slice()),
    };
    let mut ticker_node = ticker_node;
    let mut other_kwargs: Vec<(String, Node)> = Vec::with_capacity(kwargs.len());
    for (key, value) in kwargs {
        if key == "ticker" {
            if ticker_node.is_some() {
                cx.record(entry.name, "ticker", "ticker bound twice; keeping the first value");
            } else {
                ticker_node = Some(value);
            }
        } else {
            other_kwargs.push((key.clone(), value.clone()));
        }
    }

    let ticker = match ticker_node {
        None => cx.global_ticker.to_string(),
        Some(node) => match params::validate_ticker(node) {
            Ok(ticker) => ticker,
            Err(reason) => {
                let fallback = cx.global_ticker.to_string();
                cx.record(
                    entry.name,
                    "ticker",
                    format!("{}; using strategy ticker '{}'", reason, fallback),
                );
                fallback
            }
        },
    };

    let values = bind_and_validate(entry, rest, &other_kwargs, cx)?;
    build_series(entry.name, ticker, &values)
}

/// Bind and validate every argument of a fixed-arity constructor. Invalid
/// parameters are recorded and left unbound; the node fails if any required
/// parameter is still missing afterwards.
fn bind_and_validate(
    entry: &'static SchemaEntry,
    args: &[Node],
    kwargs: &[(String, Node)],
    cx: &mut NodeCx<'_>,
) -> Result<Vec<(&'static str, Value)>, String> {
    let binding = params::bind(entry, args, kwargs);
    for (param, message) in &binding.problems {
        cx.record(entry.name, param, message.clone());
    }

    let mut values = Vec::with_capacity(binding.bound.len());
    for (slot, arg) in &binding.bound {
        match params::validate_param(entry.name, slot, arg, cx) {
            Ok(value) => values.push((slot.name, value)),
            Err(reason) => cx.record(entry.name, slot.name, reason),
        }
    }

    let missing: Vec<&str> = entry
        .params
        .iter()
        .filter(|p| !values.iter().any(|(name, _)| *name == p.name))
        .map(|p| p.name)
        .collect();
    if !missing.is_empty() {
        return Err(format!(
            "{} missing or invalid parameters: {}",
            entry.name,
            missing.join(", ")
        ));
    }
    Ok(values)
}

fn find<'v>(values: &'v [(&str, Value)], name: &str) -> Result<&'v Value, String> {
    values
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v)
        .ok_or_else(|| format!("missing parameter '{}'", name))
}

fn series(values: &[(&str, Value)], name: &str) -> Result<TradingSeries, String> {
    match find(values, name)? {
        Value::Series(s) => Ok(s.clone()),
        other => Err(format!("'{}' is not a series: {:?}", name, other)),
    }
}

fn condition(values: &[(&str, Value)], name: &str) -> Result<Condition, String> {
    match find(values, name)? {
        Value::Condition(c) => Ok(c.clone()),
        other => Err(format!("'{}' is not a condition: {:?}", name, other)),
    }
}

fn length(values: &[(&str, Value)], name: &str) -> Result<usize, String> {
    match find(values, name)? {
        Value::Int(v) => usize::try_from(*v).map_err(|_| format!("'{}' out of range", name)),
        other => Err(format!("'{}' is not an integer: {:?}", name, other)),
    }
}

fn float(values: &[(&str, Value)], name: &str) -> Result<f64, String> {
    match find(values, name)? {
        Value::Float(v) => Ok(*v),
        other => Err(format!("'{}' is not a float: {:?}", name, other)),
    }
}

fn build_condition(name: &str, values: &[(&str, Value)]) -> Result<Condition, String> {
    let pair = || -> Result<(TradingSeries, TradingSeries), String> {
        Ok((series(values, "first_series")?, series(values, "second_series")?))
    };
    Ok(match name {
        "GreaterThanCondition" => {
            let (first, second) = pair()?;
            Condition::GreaterThan { first, second }
        }
        "LessThanCondition" => {
            let (first, second) = pair()?;
            Condition::LessThan { first, second }
        }
        "CrossOverCondition" => {
            let (first, second) = pair()?;
            Condition::CrossOver { first, second }
        }
        "CrossUnderCondition" => {
            let (first, second) = pair()?;
            Condition::CrossUnder { first, second }
        }
        "AfterXDaysCondition" => Condition::AfterXDays {
            condition: Box::new(condition(values, "base_condition")?),
            days: length(values, "days")?,
        },
        "ChangeOfXPercentPerYDaysCondition" => Condition::ChangeOfXPercentPerYDays {
            series: series(values, "series")?,
            percent: float(values, "percent")?,
            days: length(values, "number_of_days")?,
        },
        "IntraIntervalChangeOfXPercentCondition" => Condition::IntraIntervalChangeOfXPercent {
            series: series(values, "series")?,
            percent: float(values, "percent")?,
        },
        "UptrendForXDaysCondition" => Condition::UptrendForXDays {
            series: series(values, "series")?,
            days: length(values, "number_of_days")?,
        },
        "DowntrendForXDaysCondition" => Condition::DowntrendForXDays {
            series: series(values, "series")?,
            days: length(values, "number_of_days")?,
        },
        other => return Err(format!("unsupported condition '{}'", other)),
    })
}

fn build_series(
    name: &str,
    ticker: String,
    values: &[(&str, Value)],
) -> Result<TradingSeries, String> {
    Ok(match name {
        "PRICE" => {
            let price_type = match find(values, "price_type")? {
                Value::Enum(member) => PriceType::from_member(member)
                    .ok_or_else(|| format!("unknown price type '{}'", member))?,
                other => return Err(format!("'price_type' is not an enum: {:?}", other)),
            };
            TradingSeries::Price { ticker, price_type }
        }
        "SMA" => TradingSeries::Sma {
            ticker,
            length: length(values, "length")?,
        },
        "EMA" => TradingSeries::Ema {
            ticker,
            length: length(values, "length")?,
        },
        "WMA" => TradingSeries::Wma {
            ticker,
            length: length(values, "length")?,
        },
        "RSI" => TradingSeries::Rsi {
            ticker,
            length: length(values, "length")?,
        },
        "ROC" => TradingSeries::Roc {
            ticker,
            length: length(values, "length")?,
        },
        "STDDEV" => TradingSeries::Stddev {
            ticker,
            length: length(values, "length")?,
        },
        "ATR" => TradingSeries::Atr {
            ticker,
            length: length(values, "length")?,
        },
        "OBV" => TradingSeries::Obv { ticker },
        "MACD" => TradingSeries::Macd {
            ticker,
            fast_length: length(values, "fast_length")?,
            slow_length: length(values, "slow_length")?,
        },
        "MACD_SIGNAL" => TradingSeries::MacdSignal {
            ticker,
            fast_length: length(values, "fast_length")?,
            slow_length: length(values, "slow_length")?,
            signal_length: length(values, "signal_length")?,
        },
        "BBANDS_UPPER" => TradingSeries::BollingerUpper {
            ticker,
            length: length(values, "length")?,
            std_dev: float(values, "std_dev")?,
        },
        "BBANDS_LOWER" => TradingSeries::BollingerLower {
            ticker,
            length: length(values, "length")?,
            std_dev: float(values, "std_dev")?,
        },
        "FIB_RETRACEMENT" => {
            let level: FibonacciLevel = match find(values, "level")? {
                Value::Fibonacci(level) => *level,
                other => return Err(format!("'level' is not a Fibonacci level: {:?}", other)),
            };
            TradingSeries::FibRetracement {
                ticker,
                level,
                length: length(values, "length")?,
            }
        }
        other => return Err(format!("unsupported series '{}'", other)),
    })
}

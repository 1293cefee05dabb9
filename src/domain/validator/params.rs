//! Parameter validators, one per schema type tag.
//!
//! Primitive validators read a literal or enum reference and return the typed
//! value or a message describing the mismatch. Composite tags (`Condition`,
//! `TradingSeries`) recurse through [`super::nodes`]. The caller records the
//! message and decides on the fallback.

use super::changes::ValidationChanges;
use super::nodes;
use crate::domain::condition::Condition;
use crate::domain::expr::{Literal, Node};
use crate::domain::schema::{self, Category, EnumKind, ParamSpec, SchemaEntry, TypeTag};
use crate::domain::series::{FIBONACCI_KIND, FibonacciLevel, TradingSeries};
use crate::domain::strategy::{OrderSize, StopLoss, StopLossType, TakeProfit, TradeCommission};
use chrono::NaiveDate;

const MAX_TICKER_LEN: usize = 12;

/// A validated parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Ticker(String),
    Date(NaiveDate),
    Enum(&'static str),
    Condition(Condition),
    Series(TradingSeries),
    Fibonacci(FibonacciLevel),
    OrderSize(OrderSize),
    Commission(Option<TradeCommission>),
    StopLoss(Option<StopLoss>),
    TakeProfit(Option<TakeProfit>),
}

/// State threaded through one validation pass.
pub struct NodeCx<'a> {
    /// Top-level keyword being validated (`buy_condition`, `order_size`, ...).
    pub side: &'a str,
    pub global_ticker: &'a str,
    pub today: NaiveDate,
    pub changes: &'a mut ValidationChanges,
}

impl NodeCx<'_> {
    /// Changelog key for a parameter of a nested constructor.
    pub fn key(&self, constructor: &str, param: &str) -> String {
        format!("{}:{}.{}", self.side, constructor, param)
    }

    pub fn record(&mut self, constructor: &str, param: &str, message: impl Into<String>) {
        let key = self.key(constructor, param);
        self.changes.record(key, message);
    }
}

pub fn is_valid_ticker(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    text.len() <= MAX_TICKER_LEN
        && (first.is_ascii_alphanumeric() || first == '^')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
}

pub fn parse_date(text: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|_| format!("malformed date '{}', expected YYYY-MM-DD", text))
}

fn mismatch(tag: &str, node: &Node) -> String {
    format!("expected {}, got {}", tag, node.describe())
}

pub fn validate_int(node: &Node) -> Result<i64, String> {
    match node {
        Node::Literal(Literal::Int(v)) => Ok(*v),
        other => Err(mismatch("Int", other)),
    }
}

pub fn validate_float(node: &Node) -> Result<f64, String> {
    let value = match node {
        Node::Literal(Literal::Float(v)) => *v,
        Node::Literal(Literal::Int(v)) => *v as f64,
        other => return Err(mismatch("Float", other)),
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("expected a finite Float, got {}", value))
    }
}

pub fn validate_bool(node: &Node) -> Result<bool, String> {
    match node {
        Node::Literal(Literal::Bool(v)) => Ok(*v),
        other => Err(mismatch("Bool", other)),
    }
}

pub fn validate_ticker(node: &Node) -> Result<String, String> {
    match node {
        Node::Literal(Literal::Str(s)) if is_valid_ticker(s) => Ok(s.clone()),
        Node::Literal(Literal::Str(s)) => Err(format!("invalid ticker '{}'", s)),
        other => Err(mismatch("Ticker string", other)),
    }
}

pub fn validate_date(node: &Node, today: NaiveDate) -> Result<NaiveDate, String> {
    let text = match node {
        Node::Literal(Literal::Str(s)) => s,
        other => return Err(mismatch("Date string", other)),
    };
    let date = parse_date(text)?;
    if date > today {
        return Err(format!("date {} is in the future", date));
    }
    Ok(date)
}

pub fn validate_enum(node: &Node, kind: EnumKind) -> Result<&'static str, String> {
    match node {
        Node::EnumRef { kind: k, member } if k == kind.name() => kind
            .members()
            .iter()
            .find(|m| **m == member.as_str())
            .copied()
            .ok_or_else(|| format!("'{}' is not a member of {}", member, kind.name())),
        other => Err(mismatch(kind.name(), other)),
    }
}

pub fn validate_fibonacci_level(node: &Node) -> Result<FibonacciLevel, String> {
    match node {
        Node::EnumRef { kind, member } if kind == FIBONACCI_KIND => {
            FibonacciLevel::from_member(member)
                .ok_or_else(|| format!("'{}' is not a member of {}", member, FIBONACCI_KIND))
        }
        Node::Literal(Literal::Float(_)) | Node::Literal(Literal::Int(_)) => {
            let ratio = validate_float(node)?;
            FibonacciLevel::from_ratio(ratio)
                .ok_or_else(|| format!("{} is not a Fibonacci retracement ratio", ratio))
        }
        other => Err(mismatch(FIBONACCI_KIND, other)),
    }
}

/// Result of binding call arguments to schema parameters.
pub struct Binding<'n> {
    pub bound: Vec<(&'static ParamSpec, &'n Node)>,
    /// `(param, message)` pairs for unknown, surplus or repeated arguments.
    pub problems: Vec<(String, String)>,
}

impl Binding<'_> {
    pub fn missing(&self, entry: &'static SchemaEntry) -> Vec<&'static str> {
        entry
            .params
            .iter()
            .filter(|p| !self.bound.iter().any(|(b, _)| b.name == p.name))
            .map(|p| p.name)
            .collect()
    }
}

/// Bind positional arguments in order, then keyword arguments by name.
/// The first binding of a parameter wins.
pub fn bind<'n>(
    entry: &'static SchemaEntry,
    args: &'n [Node],
    kwargs: &'n [(String, Node)],
) -> Binding<'n> {
    let mut bound: Vec<(&'static ParamSpec, &'n Node)> = Vec::new();
    let mut problems = Vec::new();

    for (i, arg) in args.iter().enumerate() {
        match entry.params.get(i) {
            Some(slot) => bound.push((slot, arg)),
            None => problems.push((
                format!("args[{}]", i),
                format!("surplus positional argument {} ignored", arg.describe()),
            )),
        }
    }
    for (key, value) in kwargs {
        match entry.param(key) {
            Some(slot) if bound.iter().any(|(b, _)| b.name == slot.name) => problems.push((
                key.clone(),
                format!("'{}' bound twice; keeping the first value", key),
            )),
            Some(slot) => bound.push((slot, value)),
            None => problems.push((
                key.clone(),
                format!("unknown parameter '{}' for {} ignored", key, entry.name),
            )),
        }
    }
    Binding { bound, problems }
}

fn check_range(constructor: &str, param: &str, value: &Value) -> Result<(), String> {
    match value {
        Value::Int(v) if constructor != schema::CONST && *v < 1 => {
            Err(format!("{} must be >= 1, got {}", param, v))
        }
        Value::Float(v) => {
            let (positive, at_most_100, non_negative) = match (constructor, param) {
                ("StopLoss", "percent") | ("PercentOfPortfolio", "value") => (true, true, false),
                ("TakeProfit", "percent")
                | ("USD", "value")
                | ("Strategy", "initial_capital")
                | ("BBANDS_UPPER", "std_dev")
                | ("BBANDS_LOWER", "std_dev") => (true, false, false),
                ("FixedCommission", "value") | ("PercentCommission", "value") => {
                    (false, false, true)
                }
                _ => (false, false, false),
            };
            if positive && *v <= 0.0 {
                Err(format!("{} must be > 0, got {}", param, v))
            } else if at_most_100 && *v > 100.0 {
                Err(format!("{} must be <= 100, got {}", param, v))
            } else if non_negative && *v < 0.0 {
                Err(format!("{} must be >= 0, got {}", param, v))
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    }
}

/// Validate one parameter of `constructor` against its type tag.
pub fn validate_param(
    constructor: &str,
    slot: &ParamSpec,
    node: &Node,
    cx: &mut NodeCx<'_>,
) -> Result<Value, String> {
    let value = match slot.tag {
        TypeTag::Int => Value::Int(validate_int(node)?),
        TypeTag::Float => Value::Float(validate_float(node)?),
        TypeTag::Bool => Value::Bool(validate_bool(node)?),
        TypeTag::Ticker => Value::Ticker(validate_ticker(node)?),
        TypeTag::Date => Value::Date(validate_date(node, cx.today)?),
        TypeTag::Enum(kind) => Value::Enum(validate_enum(node, kind)?),
        TypeTag::Condition => Value::Condition(nodes::validate_condition(node, cx)?),
        TypeTag::TradingSeries => Value::Series(nodes::validate_series(node, cx)?),
        TypeTag::FibonacciLevel => Value::Fibonacci(validate_fibonacci_level(node)?),
        TypeTag::OrderSize => Value::OrderSize(validate_order_size(node, cx)?),
        TypeTag::TradeCommissions => Value::Commission(validate_trade_commissions(node, cx)?),
        TypeTag::StopLoss => Value::StopLoss(validate_stop_loss(node, cx)?),
        TypeTag::TakeProfit => Value::TakeProfit(validate_take_profit(node, cx)?),
    };
    check_range(constructor, slot.name, &value)?;
    Ok(value)
}

/// Arguments of a flat call (sizing, exits, commissions), keyed by
/// parameter name. Any binding problem or missing parameter fails the call.
fn flat_call(
    node: &Node,
    category: Category,
    cx: &mut NodeCx<'_>,
) -> Result<(&'static SchemaEntry, Vec<(&'static str, Value)>), String> {
    let Node::Call { name, args, kwargs } = node else {
        return Err(mismatch(&category.to_string(), node));
    };
    let entry = schema::lookup_in(name, category)
        .ok_or_else(|| format!("'{}' is not a {} constructor", name, category))?;
    let binding = bind(entry, args, kwargs);
    if let Some((_, message)) = binding.problems.first() {
        return Err(message.clone());
    }
    let missing = binding.missing(entry);
    if !missing.is_empty() {
        return Err(format!("{} missing parameters: {}", entry.name, missing.join(", ")));
    }
    let mut values = Vec::with_capacity(binding.bound.len());
    for (slot, arg) in binding.bound {
        let value = validate_param(entry.name, slot, arg, cx)
            .map_err(|reason| format!("{}.{}: {}", entry.name, slot.name, reason))?;
        values.push((slot.name, value));
    }
    Ok((entry, values))
}

fn float_of(values: &[(&str, Value)], name: &str) -> Result<f64, String> {
    match values.iter().find(|(n, _)| *n == name) {
        Some((_, Value::Float(v))) => Ok(*v),
        _ => Err(format!("missing Float parameter '{}'", name)),
    }
}

pub fn validate_order_size(node: &Node, cx: &mut NodeCx<'_>) -> Result<OrderSize, String> {
    let (entry, values) = flat_call(node, Category::OrderSize, cx)?;
    match entry.name {
        "Contracts" => match values.first() {
            Some((_, Value::Int(n))) => Ok(OrderSize::Contracts(*n)),
            _ => Err("missing Int parameter 'value'".to_string()),
        },
        "USD" => Ok(OrderSize::Usd(float_of(&values, "value")?)),
        "PercentOfPortfolio" => Ok(OrderSize::PercentOfPortfolio(float_of(&values, "value")?)),
        other => Err(format!("unsupported order size '{}'", other)),
    }
}

pub fn validate_trade_commissions(
    node: &Node,
    cx: &mut NodeCx<'_>,
) -> Result<Option<TradeCommission>, String> {
    if matches!(node, Node::Literal(Literal::None)) {
        return Ok(None);
    }
    let (entry, values) = flat_call(node, Category::Commission, cx)?;
    let value = float_of(&values, "value")?;
    match entry.name {
        "FixedCommission" => Ok(Some(TradeCommission::Fixed(value))),
        "PercentCommission" => Ok(Some(TradeCommission::Percent(value))),
        other => Err(format!("unsupported commission '{}'", other)),
    }
}

pub fn validate_stop_loss(node: &Node, cx: &mut NodeCx<'_>) -> Result<Option<StopLoss>, String> {
    if matches!(node, Node::Literal(Literal::None)) {
        return Ok(None);
    }
    let (_, values) = flat_call(node, Category::StopLoss, cx)?;
    let kind = match values.iter().find(|(n, _)| *n == "stop_loss_type") {
        Some((_, Value::Enum(member))) => StopLossType::from_member(member)
            .ok_or_else(|| format!("unknown stop loss type '{}'", member))?,
        _ => return Err("missing parameter 'stop_loss_type'".to_string()),
    };
    Ok(Some(StopLoss {
        kind,
        percent: float_of(&values, "percent")?,
    }))
}

pub fn validate_take_profit(
    node: &Node,
    cx: &mut NodeCx<'_>,
) -> Result<Option<TakeProfit>, String> {
    if matches!(node, Node::Literal(Literal::None)) {
        return Ok(None);
    }
    let (_, values) = flat_call(node, Category::TakeProfit, cx)?;
    Ok(Some(TakeProfit {
        percent: float_of(&values, "percent")?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::expr_parser::parse;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn with_cx<T>(f: impl FnOnce(&mut NodeCx<'_>) -> T) -> (T, ValidationChanges) {
        let mut changes = ValidationChanges::new();
        let out = {
            let mut cx = NodeCx {
                side: "order_size",
                global_ticker: "AAPL",
                today: today(),
                changes: &mut changes,
            };
            f(&mut cx)
        };
        (out, changes)
    }

    #[test]
    fn ticker_rules() {
        assert!(is_valid_ticker("AAPL"));
        assert!(is_valid_ticker("BRK.B"));
        assert!(is_valid_ticker("^GSPC"));
        assert!(is_valid_ticker("EURUSD=X"));
        assert!(!is_valid_ticker(""));
        assert!(!is_valid_ticker("AA PL"));
        assert!(!is_valid_ticker("os.system("));
        assert!(!is_valid_ticker("ABCDEFGHIJKLMN"));
        assert!(validate_ticker(&Node::int(123)).is_err());
    }

    #[test]
    fn int_is_not_float_but_float_accepts_int() {
        assert!(validate_int(&Node::float(2.0)).is_err());
        assert_eq!(validate_float(&Node::int(3)), Ok(3.0));
        assert!(validate_int(&Node::Literal(Literal::Bool(true))).is_err());
        assert!(validate_float(&Node::float(f64::INFINITY)).is_err());
    }

    #[test]
    fn date_rules() {
        let d = validate_date(&Node::string("2020-02-29"), today()).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2020, 2, 29).unwrap());
        assert!(validate_date(&Node::string("2021-02-29"), today()).is_err());
        assert!(validate_date(&Node::string("01/02/2020"), today()).is_err());
        let future = validate_date(&Node::string("2030-01-01"), today()).unwrap_err();
        assert!(future.contains("future"));
    }

    #[test]
    fn enum_member_and_kind_checked() {
        let node = Node::enum_ref("Interval", "ONE_DAY");
        assert_eq!(validate_enum(&node, EnumKind::Interval), Ok("ONE_DAY"));
        assert!(validate_enum(&Node::enum_ref("Interval", "TWO_DAYS"), EnumKind::Interval).is_err());
        assert!(validate_enum(&Node::enum_ref("Period", "MAX"), EnumKind::Interval).is_err());
        assert!(validate_enum(&Node::string("ONE_DAY"), EnumKind::Interval).is_err());
    }

    #[test]
    fn fibonacci_accepts_member_or_ratio() {
        let member = Node::enum_ref("FibonacciLevels", "LEVEL_50");
        assert_eq!(validate_fibonacci_level(&member), Ok(FibonacciLevel::Level50));
        assert_eq!(
            validate_fibonacci_level(&Node::float(0.618)),
            Ok(FibonacciLevel::Level61_8)
        );
        assert_eq!(validate_fibonacci_level(&Node::int(1)), Ok(FibonacciLevel::Level100));
        assert!(validate_fibonacci_level(&Node::float(0.7)).is_err());
    }

    #[test]
    fn order_size_variants() {
        let (r, _) = with_cx(|cx| validate_order_size(&parse("USD(value=250)").unwrap(), cx));
        assert_eq!(r, Ok(OrderSize::Usd(250.0)));
        let (r, _) = with_cx(|cx| validate_order_size(&parse("Contracts(5)").unwrap(), cx));
        assert_eq!(r, Ok(OrderSize::Contracts(5)));
        let (r, _) = with_cx(|cx| validate_order_size(&parse("Contracts(value=0)").unwrap(), cx));
        assert!(r.unwrap_err().contains(">= 1"));
        let (r, _) =
            with_cx(|cx| validate_order_size(&parse("PercentOfPortfolio(value=150.0)").unwrap(), cx));
        assert!(r.unwrap_err().contains("<= 100"));
        let (r, _) = with_cx(|cx| validate_order_size(&parse("SMA('AAPL', length=2)").unwrap(), cx));
        assert!(r.is_err());
    }

    #[test]
    fn exits_and_commissions() {
        let (r, _) = with_cx(|cx| {
            validate_stop_loss(
                &parse("StopLoss(stop_loss_type=StopLossType.TRAILING, percent=5)").unwrap(),
                cx,
            )
        });
        assert_eq!(
            r,
            Ok(Some(StopLoss {
                kind: StopLossType::Trailing,
                percent: 5.0
            }))
        );
        let (r, _) = with_cx(|cx| validate_take_profit(&parse("None").unwrap(), cx));
        assert_eq!(r, Ok(None));
        let (r, _) = with_cx(|cx| validate_take_profit(&parse("TakeProfit(percent=-1.0)").unwrap(), cx));
        assert!(r.is_err());
        let (r, _) = with_cx(|cx| {
            validate_trade_commissions(&parse("FixedCommission(value=0)").unwrap(), cx)
        });
        assert_eq!(r, Ok(Some(TradeCommission::Fixed(0.0))));
        let (r, _) = with_cx(|cx| {
            validate_trade_commissions(&parse("PercentCommission(value=-0.5)").unwrap(), cx)
        });
        assert!(r.is_err());
    }

    #[test]
    fn flat_call_rejects_unknown_keyword() {
        let (r, _) = with_cx(|cx| {
            validate_take_profit(&parse("TakeProfit(percent=5.0, sneaky=1)").unwrap(), cx)
        });
        assert!(r.unwrap_err().contains("sneaky"));
    }

    #[test]
    fn bind_positional_then_keyword() {
        let node = parse("MACD(12, slow_length=26, fast_length=5, extra=1)").unwrap();
        let Node::Call { args, kwargs, .. } = &node else {
            panic!("expected call");
        };
        let entry = schema::lookup("MACD").unwrap();
        let binding = bind(entry, args, kwargs);
        assert_eq!(binding.bound.len(), 2);
        assert_eq!(binding.bound[0].1, &Node::int(12));
        let params: Vec<&str> = binding.problems.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(params, vec!["fast_length", "extra"]);
        assert!(binding.missing(entry).is_empty());
    }
}

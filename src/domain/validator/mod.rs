//! Strategy validator and sanitizer.
//!
//! [`validate`] parses strategy text, rejects disallowed constructs, checks
//! every argument against the schema registry and substitutes defaults for
//! recoverable problems. The result carries the sanitized canonical text, the
//! changelog and the typed [`Strategy`]. Sanitized text always re-validates
//! without changes, and [`instantiate`] is the only way to turn text into a
//! `Strategy` for execution.

pub mod changes;
mod denylist;
pub mod nodes;
pub mod params;

pub use changes::{Change, ValidationChanges};
pub use denylist::DENYLIST;

use crate::domain::condition::Condition;
use crate::domain::config_validation::{self, DEFAULTS_SECTION};
use crate::domain::error::StratsafeError;
use crate::domain::expr::Node;
use crate::domain::expr_parser;
use crate::domain::schema::{self, Category};
use crate::domain::strategy::{
    Interval, OrderSize, Period, PositionType, StopLoss, Strategy, TakeProfit, TradeCommission,
};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use params::{NodeCx, Value};
use serde::Serialize;

/// Fallback values for recoverable top-level problems.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationDefaults {
    pub ticker: String,
    pub position_type: PositionType,
    pub interval: Interval,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub order_size: OrderSize,
}

impl Default for ValidationDefaults {
    fn default() -> Self {
        Self {
            ticker: "AAPL".to_string(),
            position_type: PositionType::Long,
            interval: Interval::OneDay,
            start_date: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or(NaiveDate::MIN),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
            initial_capital: 10_000.0,
            order_size: OrderSize::Contracts(1),
        }
    }
}

impl ValidationDefaults {
    /// Built-in defaults overridden by the `[defaults]` section.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StratsafeError> {
        config_validation::validate_defaults_config(config)?;
        let mut defaults = Self::default();
        if let Some(ticker) = config.get_string(DEFAULTS_SECTION, "ticker") {
            defaults.ticker = ticker.trim().to_string();
        }
        if let Some(interval) = config
            .get_string(DEFAULTS_SECTION, "interval")
            .and_then(|i| Interval::from_member(i.trim()))
        {
            defaults.interval = interval;
        }
        if let Some(start) = config_validation::parse_date(config, "start_date")? {
            defaults.start_date = start;
        }
        if let Some(end) = config_validation::parse_date(config, "end_date")? {
            defaults.end_date = end;
        }
        if defaults.start_date >= defaults.end_date {
            return Err(StratsafeError::ConfigInvalid {
                section: DEFAULTS_SECTION.to_string(),
                key: "start_date".to_string(),
                reason: "start_date must be before end_date".to_string(),
            });
        }
        defaults.initial_capital =
            config.get_double(DEFAULTS_SECTION, "initial_capital", defaults.initial_capital);
        Ok(defaults)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub ok: bool,
    /// Canonical strategy text; empty when `ok` is false.
    pub sanitized: String,
    pub changes: ValidationChanges,
    pub strategy: Option<Strategy>,
}

/// Serializable view of an outcome.
#[derive(Debug, Serialize)]
pub struct ValidationReport<'a> {
    pub ok: bool,
    pub sanitized: &'a str,
    pub changes: &'a ValidationChanges,
}

impl ValidationOutcome {
    pub fn report(&self) -> ValidationReport<'_> {
        ValidationReport {
            ok: self.ok,
            sanitized: &self.sanitized,
            changes: &self.changes,
        }
    }
}

struct Fatal {
    key: String,
    reason: String,
}

impl Fatal {
    fn new(key: &str, reason: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Validate with the built-in defaults against the local date.
pub fn validate(source: &str) -> ValidationOutcome {
    validate_with(
        source,
        &ValidationDefaults::default(),
        chrono::Local::now().date_naive(),
    )
}

pub fn validate_with(
    source: &str,
    defaults: &ValidationDefaults,
    today: NaiveDate,
) -> ValidationOutcome {
    let mut changes = ValidationChanges::new();
    match validate_strategy(source, defaults, today, &mut changes) {
        Ok(strategy) => {
            let sanitized = strategy.to_node().to_string();
            log::debug!(
                "strategy validated with {} change(s): {}",
                changes.len(),
                sanitized
            );
            ValidationOutcome {
                ok: true,
                sanitized,
                changes,
                strategy: Some(strategy),
            }
        }
        Err(fatal) => {
            changes.record(fatal.key, fatal.reason);
            ValidationOutcome {
                ok: false,
                sanitized: String::new(),
                changes,
                strategy: None,
            }
        }
    }
}

/// Build a `Strategy` from text that is already fully sanitized.
pub fn instantiate(sanitized: &str) -> Result<Strategy, StratsafeError> {
    let outcome = validate(sanitized);
    if !outcome.ok {
        let reason = outcome
            .changes
            .iter()
            .map(|c| format!("{}: {}", c.key, c.message))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(StratsafeError::Rejected { reason });
    }
    if !outcome.changes.is_empty() {
        let keys: Vec<&str> = outcome.changes.keys().collect();
        return Err(StratsafeError::Untrusted {
            reason: format!("validation changed: {}", keys.join(", ")),
        });
    }
    outcome.strategy.ok_or_else(|| StratsafeError::Rejected {
        reason: "validation produced no strategy".to_string(),
    })
}

#[derive(Default)]
struct Draft {
    position_type: Option<PositionType>,
    buy_condition: Option<Condition>,
    sell_condition: Option<Condition>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    stop_loss: Option<StopLoss>,
    take_profit: Option<TakeProfit>,
    interval: Option<Interval>,
    period: Option<Period>,
    initial_capital: Option<f64>,
    order_size: Option<OrderSize>,
    trade_commissions: Option<TradeCommission>,
}

impl Draft {
    fn apply(&mut self, key: &str, value: Value) -> Result<(), String> {
        match (key, value) {
            ("position_type", Value::Enum(m)) => {
                self.position_type = Some(
                    PositionType::from_member(m)
                        .ok_or_else(|| format!("unknown position type '{}'", m))?,
                )
            }
            ("buy_condition", Value::Condition(c)) => self.buy_condition = Some(c),
            ("sell_condition", Value::Condition(c)) => self.sell_condition = Some(c),
            ("start_date", Value::Date(d)) => self.start_date = Some(d),
            ("end_date", Value::Date(d)) => self.end_date = Some(d),
            ("stop_loss", Value::StopLoss(sl)) => self.stop_loss = sl,
            ("take_profit", Value::TakeProfit(tp)) => self.take_profit = tp,
            ("interval", Value::Enum(m)) => {
                self.interval = Some(
                    Interval::from_member(m).ok_or_else(|| format!("unknown interval '{}'", m))?,
                )
            }
            ("period", Value::Enum(m)) => {
                self.period =
                    Some(Period::from_member(m).ok_or_else(|| format!("unknown period '{}'", m))?)
            }
            ("initial_capital", Value::Float(v)) => self.initial_capital = Some(v),
            ("order_size", Value::OrderSize(o)) => self.order_size = Some(o),
            ("trade_commissions", Value::Commission(c)) => self.trade_commissions = c,
            (key, value) => return Err(format!("unexpected value for '{}': {:?}", key, value)),
        }
        Ok(())
    }

    /// Substitute the default for `key` and describe it.
    fn fall_back(&mut self, key: &str, defaults: &ValidationDefaults, today: NaiveDate) -> String {
        match key {
            "position_type" => {
                self.position_type = Some(defaults.position_type);
                format!("using default PositionType.{}", defaults.position_type.member())
            }
            "start_date" => {
                self.start_date = usable_date(defaults.start_date, today);
                match self.start_date {
                    Some(d) => format!("using default start date {}", d),
                    None => format!(
                        "default start date {} is in the future; start date removed",
                        defaults.start_date
                    ),
                }
            }
            "end_date" => {
                self.end_date = usable_date(defaults.end_date, today);
                match self.end_date {
                    Some(d) => format!("using default end date {}", d),
                    None => format!(
                        "default end date {} is in the future; end date removed",
                        defaults.end_date
                    ),
                }
            }
            "stop_loss" => {
                self.stop_loss = None;
                "using no stop loss".to_string()
            }
            "take_profit" => {
                self.take_profit = None;
                "using no take profit".to_string()
            }
            "interval" => {
                self.interval = Some(defaults.interval);
                format!("using default Interval.{}", defaults.interval.member())
            }
            "period" => {
                self.period = None;
                "period removed".to_string()
            }
            "initial_capital" => {
                self.initial_capital = Some(defaults.initial_capital);
                format!("using default initial capital {}", defaults.initial_capital)
            }
            "order_size" => {
                self.order_size = Some(defaults.order_size);
                format!("using default {}", defaults.order_size.to_node())
            }
            "trade_commissions" => {
                self.trade_commissions = None;
                "using no trade commissions".to_string()
            }
            _ => "parameter removed".to_string(),
        }
    }
}

/// A default date is only substituted if it would itself validate.
fn usable_date(date: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    (date <= today).then_some(date)
}

fn validate_strategy(
    source: &str,
    defaults: &ValidationDefaults,
    today: NaiveDate,
    changes: &mut ValidationChanges,
) -> Result<Strategy, Fatal> {
    let root = expr_parser::parse(source)
        .map_err(|e| Fatal::new("strategy", format!("could not parse strategy: {}", e)))?;

    if let Some(name) = denylist::find_disallowed(&root) {
        return Err(Fatal::new(
            "strategy",
            format!("disallowed construct '{}'", name),
        ));
    }

    let Node::Call { name, args, kwargs } = &root else {
        return Err(Fatal::new(
            "strategy",
            format!("expected a Strategy(...) call, got {}", root.describe()),
        ));
    };
    if name != "Strategy" {
        return Err(Fatal::new(
            "strategy",
            format!("expected a Strategy(...) call, got {}", root.describe()),
        ));
    }
    let entry = schema::lookup_in(name, Category::Strategy)
        .ok_or_else(|| Fatal::new("strategy", "Strategy is not registered"))?;

    if !args.is_empty() {
        changes.record(
            "positional_arguments",
            format!(
                "dropped {} positional argument(s); Strategy takes keyword arguments only",
                args.len()
            ),
        );
    }

    let ticker = match kwargs.iter().find(|(k, _)| k == "ticker") {
        Some((_, node)) => match params::validate_ticker(node) {
            Ok(ticker) => ticker,
            Err(reason) => {
                changes.record(
                    "ticker",
                    format!("{}; using default '{}'", reason, defaults.ticker),
                );
                defaults.ticker.clone()
            }
        },
        None => {
            changes.record(
                "ticker",
                format!("missing ticker; using default '{}'", defaults.ticker),
            );
            defaults.ticker.clone()
        }
    };

    let mut draft = Draft::default();
    let mut unknown: Vec<&str> = Vec::new();
    for (key, node) in kwargs {
        if key == "ticker" {
            continue;
        }
        let Some(slot) = entry.param(key) else {
            unknown.push(key);
            continue;
        };
        let result = {
            let mut cx = NodeCx {
                side: key,
                global_ticker: &ticker,
                today,
                changes: &mut *changes,
            };
            params::validate_param(entry.name, slot, node, &mut cx)
        };
        let result = result.and_then(|value| draft.apply(key, value));
        match (key.as_str(), result) {
            (_, Ok(())) => {}
            ("buy_condition" | "sell_condition", Err(reason)) => {
                return Err(Fatal::new(key, format!("invalid {}: {}", key, reason)));
            }
            (_, Err(reason)) => {
                let fallback = draft.fall_back(key, defaults, today);
                changes.record(key.as_str(), format!("{}; {}", reason, fallback));
            }
        }
    }

    if !unknown.is_empty() {
        changes.record(
            "unknown_parameters",
            format!("removed unrecognized parameters: {}", unknown.join(", ")),
        );
    }

    let buy_condition = draft
        .buy_condition
        .take()
        .ok_or_else(|| Fatal::new("buy_condition", "missing buy_condition"))?;
    let sell_condition = draft
        .sell_condition
        .take()
        .ok_or_else(|| Fatal::new("sell_condition", "missing sell_condition"))?;

    for key in ["position_type", "interval", "initial_capital", "order_size"] {
        let missing = match key {
            "position_type" => draft.position_type.is_none(),
            "interval" => draft.interval.is_none(),
            "initial_capital" => draft.initial_capital.is_none(),
            _ => draft.order_size.is_none(),
        };
        if missing {
            let fallback = draft.fall_back(key, defaults, today);
            changes.record(key, format!("missing {}; {}", key, fallback));
        }
    }

    if let (Some(start), Some(end)) = (draft.start_date, draft.end_date) {
        if start >= end {
            let fallback = match (
                usable_date(defaults.start_date, today),
                usable_date(defaults.end_date, today),
            ) {
                (Some(s), Some(e)) if s < e => {
                    draft.start_date = Some(s);
                    draft.end_date = Some(e);
                    format!("using defaults {} to {}", s, e)
                }
                _ => {
                    draft.start_date = None;
                    draft.end_date = None;
                    "default dates are unusable; both dates removed".to_string()
                }
            };
            changes.record(
                "start_date",
                format!(
                    "start_date {} is not before end_date {}; {}",
                    start, end, fallback
                ),
            );
        }
    }

    Ok(Strategy {
        ticker,
        position_type: draft.position_type.unwrap_or(defaults.position_type),
        buy_condition,
        sell_condition,
        start_date: draft.start_date,
        end_date: draft.end_date,
        stop_loss: draft.stop_loss,
        take_profit: draft.take_profit,
        interval: draft.interval.unwrap_or(defaults.interval),
        period: draft.period,
        initial_capital: draft.initial_capital.unwrap_or(defaults.initial_capital),
        order_size: draft.order_size.unwrap_or(defaults.order_size),
        trade_commissions: draft.trade_commissions,
    })
}

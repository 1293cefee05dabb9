//! Schema registry: the constructor vocabulary.
//!
//! Every constructor the validator accepts is listed in [`REGISTRY`] with its
//! semantic category and a space-separated `name:TypeTag` parameter list. A
//! leading `*` marks a variadic positional parameter (`AND`, `OR`).

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Strategy,
    Condition,
    TradingSeries,
    OrderSize,
    Commission,
    StopLoss,
    TakeProfit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumKind {
    PositionType,
    Interval,
    Period,
    PriceType,
    StopLossType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int,
    Float,
    Bool,
    Ticker,
    Date,
    Enum(EnumKind),
    Condition,
    TradingSeries,
    FibonacciLevel,
    OrderSize,
    TradeCommissions,
    StopLoss,
    TakeProfit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub tag: TypeTag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaEntry {
    pub name: &'static str,
    pub category: Category,
    pub params: Vec<ParamSpec>,
    pub variadic: bool,
}

impl SchemaEntry {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// TradingSeries constructors other than `CONST` take a leading ticker.
    pub fn takes_ticker(&self) -> bool {
        self.category == Category::TradingSeries && self.name != CONST
    }
}

pub const CONST: &str = "CONST";

pub const REGISTRY: &[(&str, Category, &str)] = &[
    (
        "Strategy",
        Category::Strategy,
        "ticker:Ticker position_type:Enum(PositionType) buy_condition:Condition \
         sell_condition:Condition start_date:Date end_date:Date stop_loss:StopLoss \
         take_profit:TakeProfit interval:Enum(Interval) period:Enum(Period) \
         initial_capital:Float order_size:OrderSize trade_commissions:TradeCommissions",
    ),
    // Conditions
    (
        "GreaterThanCondition",
        Category::Condition,
        "first_series:TradingSeries second_series:TradingSeries",
    ),
    (
        "LessThanCondition",
        Category::Condition,
        "first_series:TradingSeries second_series:TradingSeries",
    ),
    (
        "CrossOverCondition",
        Category::Condition,
        "first_series:TradingSeries second_series:TradingSeries",
    ),
    (
        "CrossUnderCondition",
        Category::Condition,
        "first_series:TradingSeries second_series:TradingSeries",
    ),
    ("AND", Category::Condition, "*conditions:Condition"),
    ("OR", Category::Condition, "*conditions:Condition"),
    (
        "AfterXDaysCondition",
        Category::Condition,
        "base_condition:Condition days:Int",
    ),
    (
        "ChangeOfXPercentPerYDaysCondition",
        Category::Condition,
        "series:TradingSeries percent:Float number_of_days:Int",
    ),
    (
        "IntraIntervalChangeOfXPercentCondition",
        Category::Condition,
        "series:TradingSeries percent:Float",
    ),
    (
        "UptrendForXDaysCondition",
        Category::Condition,
        "series:TradingSeries number_of_days:Int",
    ),
    (
        "DowntrendForXDaysCondition",
        Category::Condition,
        "series:TradingSeries number_of_days:Int",
    ),
    // Trading series
    ("PRICE", Category::TradingSeries, "price_type:Enum(PriceType)"),
    (CONST, Category::TradingSeries, "value:Int"),
    ("SMA", Category::TradingSeries, "length:Int"),
    ("EMA", Category::TradingSeries, "length:Int"),
    ("WMA", Category::TradingSeries, "length:Int"),
    ("RSI", Category::TradingSeries, "length:Int"),
    ("ROC", Category::TradingSeries, "length:Int"),
    ("STDDEV", Category::TradingSeries, "length:Int"),
    ("ATR", Category::TradingSeries, "length:Int"),
    ("OBV", Category::TradingSeries, ""),
    (
        "MACD",
        Category::TradingSeries,
        "fast_length:Int slow_length:Int",
    ),
    (
        "MACD_SIGNAL",
        Category::TradingSeries,
        "fast_length:Int slow_length:Int signal_length:Int",
    ),
    ("BBANDS_UPPER", Category::TradingSeries, "length:Int std_dev:Float"),
    ("BBANDS_LOWER", Category::TradingSeries, "length:Int std_dev:Float"),
    (
        "FIB_RETRACEMENT",
        Category::TradingSeries,
        "level:FibonacciLevel length:Int",
    ),
    // Exits, sizing, commissions
    (
        "StopLoss",
        Category::StopLoss,
        "stop_loss_type:Enum(StopLossType) percent:Float",
    ),
    ("TakeProfit", Category::TakeProfit, "percent:Float"),
    ("Contracts", Category::OrderSize, "value:Int"),
    ("USD", Category::OrderSize, "value:Float"),
    ("PercentOfPortfolio", Category::OrderSize, "value:Float"),
    ("FixedCommission", Category::Commission, "value:Float"),
    ("PercentCommission", Category::Commission, "value:Float"),
];

impl EnumKind {
    pub fn name(self) -> &'static str {
        match self {
            EnumKind::PositionType => "PositionType",
            EnumKind::Interval => "Interval",
            EnumKind::Period => "Period",
            EnumKind::PriceType => "PriceType",
            EnumKind::StopLossType => "StopLossType",
        }
    }

    fn from_name(name: &str) -> Option<EnumKind> {
        match name {
            "PositionType" => Some(EnumKind::PositionType),
            "Interval" => Some(EnumKind::Interval),
            "Period" => Some(EnumKind::Period),
            "PriceType" => Some(EnumKind::PriceType),
            "StopLossType" => Some(EnumKind::StopLossType),
            _ => None,
        }
    }

    pub fn members(self) -> &'static [&'static str] {
        match self {
            EnumKind::PositionType => &["LONG", "SHORT", "LONG_SHORT"],
            EnumKind::Interval => &[
                "ONE_MINUTE",
                "FIVE_MINUTES",
                "FIFTEEN_MINUTES",
                "THIRTY_MINUTES",
                "ONE_HOUR",
                "ONE_DAY",
                "ONE_WEEK",
                "ONE_MONTH",
            ],
            EnumKind::Period => &[
                "ONE_MONTH",
                "THREE_MONTHS",
                "SIX_MONTHS",
                "ONE_YEAR",
                "TWO_YEARS",
                "FIVE_YEARS",
                "TEN_YEARS",
                "MAX",
            ],
            EnumKind::PriceType => &["OPEN", "HIGH", "LOW", "CLOSE", "VOLUME"],
            EnumKind::StopLossType => &["NORMAL", "TRAILING"],
        }
    }
}

impl TypeTag {
    fn parse(text: &str) -> Option<TypeTag> {
        if let Some(inner) = text
            .strip_prefix("Enum(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return EnumKind::from_name(inner).map(TypeTag::Enum);
        }
        Some(match text {
            "Int" => TypeTag::Int,
            "Float" => TypeTag::Float,
            "Bool" => TypeTag::Bool,
            "Ticker" => TypeTag::Ticker,
            "Date" => TypeTag::Date,
            "Condition" => TypeTag::Condition,
            "TradingSeries" => TypeTag::TradingSeries,
            "FibonacciLevel" => TypeTag::FibonacciLevel,
            "OrderSize" => TypeTag::OrderSize,
            "TradeCommissions" => TypeTag::TradeCommissions,
            "StopLoss" => TypeTag::StopLoss,
            "TakeProfit" => TypeTag::TakeProfit,
            _ => return None,
        })
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Int => write!(f, "Int"),
            TypeTag::Float => write!(f, "Float"),
            TypeTag::Bool => write!(f, "Bool"),
            TypeTag::Ticker => write!(f, "Ticker"),
            TypeTag::Date => write!(f, "Date"),
            TypeTag::Enum(kind) => write!(f, "Enum({})", kind.name()),
            TypeTag::Condition => write!(f, "Condition"),
            TypeTag::TradingSeries => write!(f, "TradingSeries"),
            TypeTag::FibonacciLevel => write!(f, "FibonacciLevel"),
            TypeTag::OrderSize => write!(f, "OrderSize"),
            TypeTag::TradeCommissions => write!(f, "TradeCommissions"),
            TypeTag::StopLoss => write!(f, "StopLoss"),
            TypeTag::TakeProfit => write!(f, "TakeProfit"),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Strategy => "Strategy",
            Category::Condition => "Condition",
            Category::TradingSeries => "TradingSeries",
            Category::OrderSize => "OrderSize",
            Category::Commission => "Commission",
            Category::StopLoss => "StopLoss",
            Category::TakeProfit => "TakeProfit",
        };
        write!(f, "{}", name)
    }
}

fn parse_entry(
    name: &'static str,
    category: Category,
    params: &'static str,
) -> Result<SchemaEntry, String> {
    let mut specs = Vec::new();
    let mut variadic = false;
    for item in params.split_whitespace() {
        let (item, star) = match item.strip_prefix('*') {
            Some(rest) => (rest, true),
            None => (item, false),
        };
        variadic |= star;
        let (param, tag) = item
            .split_once(':')
            .ok_or_else(|| format!("{}: malformed parameter '{}'", name, item))?;
        let tag = TypeTag::parse(tag)
            .ok_or_else(|| format!("{}: unknown type tag '{}'", name, tag))?;
        specs.push(ParamSpec { name: param, tag });
    }
    Ok(SchemaEntry {
        name,
        category,
        params: specs,
        variadic,
    })
}

fn registry() -> &'static HashMap<&'static str, SchemaEntry> {
    static ENTRIES: OnceLock<HashMap<&'static str, SchemaEntry>> = OnceLock::new();
    ENTRIES.get_or_init(|| {
        let mut map = HashMap::new();
        for &(name, category, params) in REGISTRY {
            match parse_entry(name, category, params) {
                Ok(entry) => {
                    map.insert(name, entry);
                }
                Err(reason) => log::error!("schema registry: {}", reason),
            }
        }
        map
    })
}

pub fn lookup(name: &str) -> Option<&'static SchemaEntry> {
    registry().get(name)
}

/// Look up a constructor, requiring it to belong to `category`.
pub fn lookup_in(name: &str, category: Category) -> Option<&'static SchemaEntry> {
    lookup(name).filter(|entry| entry.category == category)
}

/// Constructor names of one category, in registry order.
pub fn names_in(category: Category) -> Vec<&'static str> {
    REGISTRY
        .iter()
        .filter(|(_, c, _)| *c == category)
        .map(|(name, _, _)| *name)
        .collect()
}

/// One line per constructor: `Name [Category] param:Tag ...`.
pub fn render_table() -> String {
    let mut out = String::new();
    for &(name, category, _) in REGISTRY {
        if let Some(entry) = lookup(name) {
            let params: Vec<String> = entry
                .params
                .iter()
                .map(|p| {
                    let star = if entry.variadic { "*" } else { "" };
                    format!("{}{}:{}", star, p.name, p.tag)
                })
                .collect();
            out.push_str(&format!("{} [{}] {}\n", name, category, params.join(" ")));
        }
    }
    out
}

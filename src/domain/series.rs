//! Trading series: named, parameterized numeric series derived from a
//! ticker's bars.
//!
//! Each variant mirrors one `TradingSeries` constructor of the schema
//! registry. `Display` gives the canonical text, which is also the cache key
//! used by the evaluation engine.

use crate::domain::expr::Node;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceType {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl PriceType {
    pub fn from_member(member: &str) -> Option<PriceType> {
        match member {
            "OPEN" => Some(PriceType::Open),
            "HIGH" => Some(PriceType::High),
            "LOW" => Some(PriceType::Low),
            "CLOSE" => Some(PriceType::Close),
            "VOLUME" => Some(PriceType::Volume),
            _ => None,
        }
    }

    pub fn member(self) -> &'static str {
        match self {
            PriceType::Open => "OPEN",
            PriceType::High => "HIGH",
            PriceType::Low => "LOW",
            PriceType::Close => "CLOSE",
            PriceType::Volume => "VOLUME",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FibonacciLevel {
    Level0,
    Level23_6,
    Level38_2,
    Level50,
    Level61_8,
    Level78_6,
    Level100,
}

pub const FIBONACCI_KIND: &str = "FibonacciLevels";

impl FibonacciLevel {
    pub const ALL: [FibonacciLevel; 7] = [
        FibonacciLevel::Level0,
        FibonacciLevel::Level23_6,
        FibonacciLevel::Level38_2,
        FibonacciLevel::Level50,
        FibonacciLevel::Level61_8,
        FibonacciLevel::Level78_6,
        FibonacciLevel::Level100,
    ];

    pub fn ratio(self) -> f64 {
        match self {
            FibonacciLevel::Level0 => 0.0,
            FibonacciLevel::Level23_6 => 0.236,
            FibonacciLevel::Level38_2 => 0.382,
            FibonacciLevel::Level50 => 0.5,
            FibonacciLevel::Level61_8 => 0.618,
            FibonacciLevel::Level78_6 => 0.786,
            FibonacciLevel::Level100 => 1.0,
        }
    }

    pub fn member(self) -> &'static str {
        match self {
            FibonacciLevel::Level0 => "LEVEL_0",
            FibonacciLevel::Level23_6 => "LEVEL_23_6",
            FibonacciLevel::Level38_2 => "LEVEL_38_2",
            FibonacciLevel::Level50 => "LEVEL_50",
            FibonacciLevel::Level61_8 => "LEVEL_61_8",
            FibonacciLevel::Level78_6 => "LEVEL_78_6",
            FibonacciLevel::Level100 => "LEVEL_100",
        }
    }

    pub fn from_member(member: &str) -> Option<FibonacciLevel> {
        Self::ALL.into_iter().find(|level| level.member() == member)
    }

    /// Match a ratio literal such as `0.618` to its level.
    pub fn from_ratio(ratio: f64) -> Option<FibonacciLevel> {
        Self::ALL
            .into_iter()
            .find(|level| (level.ratio() - ratio).abs() < 1e-9)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TradingSeries {
    Price {
        ticker: String,
        price_type: PriceType,
    },
    Const(i64),
    Sma {
        ticker: String,
        length: usize,
    },
    Ema {
        ticker: String,
        length: usize,
    },
    Wma {
        ticker: String,
        length: usize,
    },
    Rsi {
        ticker: String,
        length: usize,
    },
    Roc {
        ticker: String,
        length: usize,
    },
    Stddev {
        ticker: String,
        length: usize,
    },
    Atr {
        ticker: String,
        length: usize,
    },
    Obv {
        ticker: String,
    },
    Macd {
        ticker: String,
        fast_length: usize,
        slow_length: usize,
    },
    MacdSignal {
        ticker: String,
        fast_length: usize,
        slow_length: usize,
        signal_length: usize,
    },
    BollingerUpper {
        ticker: String,
        length: usize,
        std_dev: f64,
    },
    BollingerLower {
        ticker: String,
        length: usize,
        std_dev: f64,
    },
    FibRetracement {
        ticker: String,
        level: FibonacciLevel,
        length: usize,
    },
}

impl TradingSeries {
    /// Constructor name as it appears in strategy text.
    pub fn name(&self) -> &'static str {
        match self {
            TradingSeries::Price { .. } => "PRICE",
            TradingSeries::Const(_) => "CONST",
            TradingSeries::Sma { .. } => "SMA",
            TradingSeries::Ema { .. } => "EMA",
            TradingSeries::Wma { .. } => "WMA",
            TradingSeries::Rsi { .. } => "RSI",
            TradingSeries::Roc { .. } => "ROC",
            TradingSeries::Stddev { .. } => "STDDEV",
            TradingSeries::Atr { .. } => "ATR",
            TradingSeries::Obv { .. } => "OBV",
            TradingSeries::Macd { .. } => "MACD",
            TradingSeries::MacdSignal { .. } => "MACD_SIGNAL",
            TradingSeries::BollingerUpper { .. } => "BBANDS_UPPER",
            TradingSeries::BollingerLower { .. } => "BBANDS_LOWER",
            TradingSeries::FibRetracement { .. } => "FIB_RETRACEMENT",
        }
    }

    pub fn ticker(&self) -> Option<&str> {
        match self {
            TradingSeries::Const(_) => None,
            TradingSeries::Price { ticker, .. }
            | TradingSeries::Sma { ticker, .. }
            | TradingSeries::Ema { ticker, .. }
            | TradingSeries::Wma { ticker, .. }
            | TradingSeries::Rsi { ticker, .. }
            | TradingSeries::Roc { ticker, .. }
            | TradingSeries::Stddev { ticker, .. }
            | TradingSeries::Atr { ticker, .. }
            | TradingSeries::Obv { ticker }
            | TradingSeries::Macd { ticker, .. }
            | TradingSeries::MacdSignal { ticker, .. }
            | TradingSeries::BollingerUpper { ticker, .. }
            | TradingSeries::BollingerLower { ticker, .. }
            | TradingSeries::FibRetracement { ticker, .. } => Some(ticker),
        }
    }

    pub fn to_node(&self) -> Node {
        let int = |v: usize| Node::int(v as i64);
        let kwargs: Vec<(&str, Node)> = match self {
            TradingSeries::Const(value) => {
                return Node::Call {
                    name: self.name().to_string(),
                    args: vec![Node::int(*value)],
                    kwargs: Vec::new(),
                };
            }
            TradingSeries::Price { price_type, .. } => {
                vec![("price_type", Node::enum_ref("PriceType", price_type.member()))]
            }
            TradingSeries::Sma { length, .. }
            | TradingSeries::Ema { length, .. }
            | TradingSeries::Wma { length, .. }
            | TradingSeries::Rsi { length, .. }
            | TradingSeries::Roc { length, .. }
            | TradingSeries::Stddev { length, .. }
            | TradingSeries::Atr { length, .. } => vec![("length", int(*length))],
            TradingSeries::Obv { .. } => Vec::new(),
            TradingSeries::Macd {
                fast_length,
                slow_length,
                ..
            } => vec![
                ("fast_length", int(*fast_length)),
                ("slow_length", int(*slow_length)),
            ],
            TradingSeries::MacdSignal {
                fast_length,
                slow_length,
                signal_length,
                ..
            } => vec![
                ("fast_length", int(*fast_length)),
                ("slow_length", int(*slow_length)),
                ("signal_length", int(*signal_length)),
            ],
            TradingSeries::BollingerUpper {
                length, std_dev, ..
            }
            | TradingSeries::BollingerLower {
                length, std_dev, ..
            } => vec![("length", int(*length)), ("std_dev", Node::float(*std_dev))],
            TradingSeries::FibRetracement { level, length, .. } => vec![
                ("level", Node::enum_ref(FIBONACCI_KIND, level.member())),
                ("length", int(*length)),
            ],
        };

        Node::Call {
            name: self.name().to_string(),
            args: self
                .ticker()
                .map(|t| vec![Node::string(t)])
                .unwrap_or_default(),
            kwargs: kwargs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

impl fmt::Display for TradingSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_node())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::EnumKind;

    #[test]
    fn display_sma() {
        let s = TradingSeries::Sma {
            ticker: "AAPL".into(),
            length: 20,
        };
        assert_eq!(s.to_string(), "SMA('AAPL', length=20)");
    }

    #[test]
    fn display_const_has_no_ticker() {
        assert_eq!(TradingSeries::Const(70).to_string(), "CONST(70)");
        assert_eq!(TradingSeries::Const(70).ticker(), None);
    }

    #[test]
    fn display_bollinger_and_fib() {
        let upper = TradingSeries::BollingerUpper {
            ticker: "MSFT".into(),
            length: 20,
            std_dev: 2.0,
        };
        assert_eq!(upper.to_string(), "BBANDS_UPPER('MSFT', length=20, std_dev=2.0)");

        let fib = TradingSeries::FibRetracement {
            ticker: "MSFT".into(),
            level: FibonacciLevel::Level61_8,
            length: 50,
        };
        assert_eq!(
            fib.to_string(),
            "FIB_RETRACEMENT('MSFT', level=FibonacciLevels.LEVEL_61_8, length=50)"
        );
    }

    #[test]
    fn fibonacci_ratio_lookup() {
        assert_eq!(FibonacciLevel::from_ratio(0.618), Some(FibonacciLevel::Level61_8));
        assert_eq!(FibonacciLevel::from_ratio(0.5), Some(FibonacciLevel::Level50));
        assert_eq!(FibonacciLevel::from_ratio(0.6), None);
        assert_eq!(FibonacciLevel::from_member("LEVEL_100"), Some(FibonacciLevel::Level100));
    }

    #[test]
    fn price_type_members_match_schema() {
        for member in EnumKind::PriceType.members() {
            let parsed = PriceType::from_member(member).unwrap();
            assert_eq!(parsed.member(), *member);
        }
    }
}

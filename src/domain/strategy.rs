//! Strategy configuration and composition.
//!
//! `Strategy` is the trusted, fully typed form of a sanitized `Strategy(...)`
//! expression. `to_node` renders it back in canonical keyword order.

use crate::domain::condition::Condition;
use crate::domain::expr::Node;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionType {
    Long,
    Short,
    LongShort,
}

impl PositionType {
    pub fn from_member(member: &str) -> Option<PositionType> {
        match member {
            "LONG" => Some(PositionType::Long),
            "SHORT" => Some(PositionType::Short),
            "LONG_SHORT" => Some(PositionType::LongShort),
            _ => None,
        }
    }

    pub fn member(self) -> &'static str {
        match self {
            PositionType::Long => "LONG",
            PositionType::Short => "SHORT",
            PositionType::LongShort => "LONG_SHORT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    OneDay,
    OneWeek,
    OneMonth,
}

impl Interval {
    const MEMBERS: [(&'static str, Interval); 8] = [
        ("ONE_MINUTE", Interval::OneMinute),
        ("FIVE_MINUTES", Interval::FiveMinutes),
        ("FIFTEEN_MINUTES", Interval::FifteenMinutes),
        ("THIRTY_MINUTES", Interval::ThirtyMinutes),
        ("ONE_HOUR", Interval::OneHour),
        ("ONE_DAY", Interval::OneDay),
        ("ONE_WEEK", Interval::OneWeek),
        ("ONE_MONTH", Interval::OneMonth),
    ];

    pub fn from_member(member: &str) -> Option<Interval> {
        Self::MEMBERS
            .iter()
            .find(|(name, _)| *name == member)
            .map(|(_, v)| *v)
    }

    pub fn member(self) -> &'static str {
        Self::MEMBERS
            .iter()
            .find(|(_, v)| *v == self)
            .map(|(name, _)| *name)
            .unwrap_or("ONE_DAY")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    Max,
}

impl Period {
    const MEMBERS: [(&'static str, Period); 8] = [
        ("ONE_MONTH", Period::OneMonth),
        ("THREE_MONTHS", Period::ThreeMonths),
        ("SIX_MONTHS", Period::SixMonths),
        ("ONE_YEAR", Period::OneYear),
        ("TWO_YEARS", Period::TwoYears),
        ("FIVE_YEARS", Period::FiveYears),
        ("TEN_YEARS", Period::TenYears),
        ("MAX", Period::Max),
    ];

    pub fn from_member(member: &str) -> Option<Period> {
        Self::MEMBERS
            .iter()
            .find(|(name, _)| *name == member)
            .map(|(_, v)| *v)
    }

    pub fn member(self) -> &'static str {
        Self::MEMBERS
            .iter()
            .find(|(_, v)| *v == self)
            .map(|(name, _)| *name)
            .unwrap_or("MAX")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopLossType {
    Normal,
    Trailing,
}

impl StopLossType {
    pub fn from_member(member: &str) -> Option<StopLossType> {
        match member {
            "NORMAL" => Some(StopLossType::Normal),
            "TRAILING" => Some(StopLossType::Trailing),
            _ => None,
        }
    }

    pub fn member(self) -> &'static str {
        match self {
            StopLossType::Normal => "NORMAL",
            StopLossType::Trailing => "TRAILING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopLoss {
    pub kind: StopLossType,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TakeProfit {
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderSize {
    Contracts(i64),
    Usd(f64),
    PercentOfPortfolio(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TradeCommission {
    Fixed(f64),
    Percent(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub ticker: String,
    pub position_type: PositionType,
    pub buy_condition: Condition,
    pub sell_condition: Condition,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub stop_loss: Option<StopLoss>,
    pub take_profit: Option<TakeProfit>,
    pub interval: Interval,
    pub period: Option<Period>,
    pub initial_capital: f64,
    pub order_size: OrderSize,
    pub trade_commissions: Option<TradeCommission>,
}

impl StopLoss {
    pub fn to_node(&self) -> Node {
        Node::call(
            "StopLoss",
            vec![
                (
                    "stop_loss_type",
                    Node::enum_ref("StopLossType", self.kind.member()),
                ),
                ("percent", Node::float(self.percent)),
            ],
        )
    }
}

impl TakeProfit {
    pub fn to_node(&self) -> Node {
        Node::call("TakeProfit", vec![("percent", Node::float(self.percent))])
    }
}

impl OrderSize {
    pub fn to_node(&self) -> Node {
        match self {
            OrderSize::Contracts(n) => Node::call("Contracts", vec![("value", Node::int(*n))]),
            OrderSize::Usd(v) => Node::call("USD", vec![("value", Node::float(*v))]),
            OrderSize::PercentOfPortfolio(v) => {
                Node::call("PercentOfPortfolio", vec![("value", Node::float(*v))])
            }
        }
    }
}

impl TradeCommission {
    pub fn to_node(&self) -> Node {
        match self {
            TradeCommission::Fixed(v) => {
                Node::call("FixedCommission", vec![("value", Node::float(*v))])
            }
            TradeCommission::Percent(v) => {
                Node::call("PercentCommission", vec![("value", Node::float(*v))])
            }
        }
    }
}

impl Strategy {
    /// Render as a keyword-only `Strategy(...)` call in schema order.
    /// Absent optional parameters are omitted.
    pub fn to_node(&self) -> Node {
        let date = |d: NaiveDate| Node::string(d.format("%Y-%m-%d").to_string());
        let mut kwargs: Vec<(&str, Node)> = vec![
            ("ticker", Node::string(self.ticker.clone())),
            (
                "position_type",
                Node::enum_ref("PositionType", self.position_type.member()),
            ),
            ("buy_condition", self.buy_condition.to_node()),
            ("sell_condition", self.sell_condition.to_node()),
        ];
        if let Some(d) = self.start_date {
            kwargs.push(("start_date", date(d)));
        }
        if let Some(d) = self.end_date {
            kwargs.push(("end_date", date(d)));
        }
        if let Some(sl) = &self.stop_loss {
            kwargs.push(("stop_loss", sl.to_node()));
        }
        if let Some(tp) = &self.take_profit {
            kwargs.push(("take_profit", tp.to_node()));
        }
        kwargs.push(("interval", Node::enum_ref("Interval", self.interval.member())));
        if let Some(p) = self.period {
            kwargs.push(("period", Node::enum_ref("Period", p.member())));
        }
        kwargs.push(("initial_capital", Node::float(self.initial_capital)));
        kwargs.push(("order_size", self.order_size.to_node()));
        if let Some(c) = &self.trade_commissions {
            kwargs.push(("trade_commissions", c.to_node()));
        }
        Node::call("Strategy", kwargs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::EnumKind;
    use crate::domain::series::TradingSeries;

    fn sample_strategy() -> Strategy {
        let close = TradingSeries::Price {
            ticker: "AAPL".into(),
            price_type: crate::domain::series::PriceType::Close,
        };
        Strategy {
            ticker: "AAPL".into(),
            position_type: PositionType::Long,
            buy_condition: Condition::GreaterThan {
                first: close.clone(),
                second: TradingSeries::Const(100),
            },
            sell_condition: Condition::LessThan {
                first: close,
                second: TradingSeries::Const(100),
            },
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            end_date: None,
            stop_loss: Some(StopLoss {
                kind: StopLossType::Trailing,
                percent: 5.0,
            }),
            take_profit: None,
            interval: Interval::OneDay,
            period: None,
            initial_capital: 10_000.0,
            order_size: OrderSize::Contracts(1),
            trade_commissions: None,
        }
    }

    #[test]
    fn render_omits_absent_optionals() {
        let text = sample_strategy().to_node().to_string();
        assert!(text.starts_with("Strategy(ticker='AAPL', position_type=PositionType.LONG, "));
        assert!(text.contains("start_date='2020-01-01'"));
        assert!(!text.contains("end_date"));
        assert!(text.contains("stop_loss=StopLoss(stop_loss_type=StopLossType.TRAILING, percent=5.0)"));
        assert!(!text.contains("take_profit"));
        assert!(text.ends_with("interval=Interval.ONE_DAY, initial_capital=10000.0, order_size=Contracts(value=1))"));
    }

    #[test]
    fn enum_members_match_schema() {
        for m in EnumKind::Interval.members() {
            assert_eq!(Interval::from_member(m).unwrap().member(), *m);
        }
        for m in EnumKind::Period.members() {
            assert_eq!(Period::from_member(m).unwrap().member(), *m);
        }
        for m in EnumKind::PositionType.members() {
            assert_eq!(PositionType::from_member(m).unwrap().member(), *m);
        }
        for m in EnumKind::StopLossType.members() {
            assert_eq!(StopLossType::from_member(m).unwrap().member(), *m);
        }
    }

    #[test]
    fn order_size_and_commission_nodes() {
        assert_eq!(OrderSize::Usd(500.0).to_node().to_string(), "USD(value=500.0)");
        assert_eq!(
            TradeCommission::Percent(0.1).to_node().to_string(),
            "PercentCommission(value=0.1)"
        );
    }
}

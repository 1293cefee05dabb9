//! Condition tree: boolean-producing nodes over trading series.
//!
//! This module defines the closed set of condition variants:
//! - comparisons: `GreaterThan`, `LessThan`
//! - crossings: `CrossOver`, `CrossUnder`
//! - composites: `And`, `Or`
//! - temporal: `AfterXDays`, `ChangeOfXPercentPerYDays`,
//!   `IntraIntervalChangeOfXPercent`, `UptrendForXDays`, `DowntrendForXDays`

use crate::domain::expr::Node;
use crate::domain::series::TradingSeries;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    GreaterThan {
        first: TradingSeries,
        second: TradingSeries,
    },
    LessThan {
        first: TradingSeries,
        second: TradingSeries,
    },
    CrossOver {
        first: TradingSeries,
        second: TradingSeries,
    },
    CrossUnder {
        first: TradingSeries,
        second: TradingSeries,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    AfterXDays {
        condition: Box<Condition>,
        days: usize,
    },
    ChangeOfXPercentPerYDays {
        series: TradingSeries,
        percent: f64,
        days: usize,
    },
    IntraIntervalChangeOfXPercent {
        series: TradingSeries,
        percent: f64,
    },
    UptrendForXDays {
        series: TradingSeries,
        days: usize,
    },
    DowntrendForXDays {
        series: TradingSeries,
        days: usize,
    },
}

impl Condition {
    /// Constructor name as it appears in strategy text.
    pub fn name(&self) -> &'static str {
        match self {
            Condition::GreaterThan { .. } => "GreaterThanCondition",
            Condition::LessThan { .. } => "LessThanCondition",
            Condition::CrossOver { .. } => "CrossOverCondition",
            Condition::CrossUnder { .. } => "CrossUnderCondition",
            Condition::And(_) => "AND",
            Condition::Or(_) => "OR",
            Condition::AfterXDays { .. } => "AfterXDaysCondition",
            Condition::ChangeOfXPercentPerYDays { .. } => "ChangeOfXPercentPerYDaysCondition",
            Condition::IntraIntervalChangeOfXPercent { .. } => {
                "IntraIntervalChangeOfXPercentCondition"
            }
            Condition::UptrendForXDays { .. } => "UptrendForXDaysCondition",
            Condition::DowntrendForXDays { .. } => "DowntrendForXDaysCondition",
        }
    }

    /// Every trading series referenced anywhere in the tree, in visit order.
    pub fn series(&self) -> Vec<&TradingSeries> {
        let mut out = Vec::new();
        self.collect_series(&mut out);
        out
    }

    fn collect_series<'a>(&'a self, out: &mut Vec<&'a TradingSeries>) {
        match self {
            Condition::GreaterThan { first, second }
            | Condition::LessThan { first, second }
            | Condition::CrossOver { first, second }
            | Condition::CrossUnder { first, second } => {
                out.push(first);
                out.push(second);
            }
            Condition::And(children) | Condition::Or(children) => {
                for child in children {
                    child.collect_series(out);
                }
            }
            Condition::AfterXDays { condition, .. } => condition.collect_series(out),
            Condition::ChangeOfXPercentPerYDays { series, .. }
            | Condition::IntraIntervalChangeOfXPercent { series, .. }
            | Condition::UptrendForXDays { series, .. }
            | Condition::DowntrendForXDays { series, .. } => out.push(series),
        }
    }

    pub fn to_node(&self) -> Node {
        let pair = |first: &TradingSeries, second: &TradingSeries| {
            vec![
                ("first_series", first.to_node()),
                ("second_series", second.to_node()),
            ]
        };
        let kwargs = match self {
            Condition::GreaterThan { first, second }
            | Condition::LessThan { first, second }
            | Condition::CrossOver { first, second }
            | Condition::CrossUnder { first, second } => pair(first, second),
            Condition::And(children) | Condition::Or(children) => {
                return Node::Call {
                    name: self.name().to_string(),
                    args: children.iter().map(Condition::to_node).collect(),
                    kwargs: Vec::new(),
                };
            }
            Condition::AfterXDays { condition, days } => vec![
                ("base_condition", condition.to_node()),
                ("days", Node::int(*days as i64)),
            ],
            Condition::ChangeOfXPercentPerYDays {
                series,
                percent,
                days,
            } => vec![
                ("series", series.to_node()),
                ("percent", Node::float(*percent)),
                ("number_of_days", Node::int(*days as i64)),
            ],
            Condition::IntraIntervalChangeOfXPercent { series, percent } => vec![
                ("series", series.to_node()),
                ("percent", Node::float(*percent)),
            ],
            Condition::UptrendForXDays { series, days }
            | Condition::DowntrendForXDays { series, days } => vec![
                ("series", series.to_node()),
                ("number_of_days", Node::int(*days as i64)),
            ],
        };
        Node::call(self.name(), kwargs)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_node())
    }
}

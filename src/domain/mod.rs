//! Core domain types and logic.

pub mod bar_table;
pub mod condition;
pub mod condition_eval;
pub mod config_validation;
pub mod error;
pub mod exit_overlay;
pub mod expr;
pub mod expr_parser;
pub mod indicator;
pub mod ohlcv;
pub mod reconcile;
pub mod runner;
pub mod schema;
pub mod series;
pub mod strategy;
pub mod validator;

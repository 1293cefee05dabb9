//! Configuration validation.
//!
//! Checks the `[defaults]` and `[data]` sections before their values replace
//! the built-in validation defaults. Every key is optional.

use crate::domain::error::StratsafeError;
use crate::domain::strategy::Interval;
use crate::domain::validator::params::is_valid_ticker;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULTS_SECTION: &str = "defaults";
pub const DATA_SECTION: &str = "data";

pub fn validate_defaults_config(config: &dyn ConfigPort) -> Result<(), StratsafeError> {
    validate_ticker(config)?;
    validate_interval(config)?;
    validate_dates(config)?;
    validate_initial_capital(config)?;
    validate_data_directory(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StratsafeError {
    StratsafeError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_ticker(config: &dyn ConfigPort) -> Result<(), StratsafeError> {
    match config.get_string(DEFAULTS_SECTION, "ticker") {
        Some(t) if !is_valid_ticker(t.trim()) => Err(invalid(
            DEFAULTS_SECTION,
            "ticker",
            format!("'{}' is not a valid ticker", t),
        )),
        _ => Ok(()),
    }
}

fn validate_interval(config: &dyn ConfigPort) -> Result<(), StratsafeError> {
    match config.get_string(DEFAULTS_SECTION, "interval") {
        Some(i) if Interval::from_member(i.trim()).is_none() => Err(invalid(
            DEFAULTS_SECTION,
            "interval",
            format!("'{}' is not an Interval member", i),
        )),
        _ => Ok(()),
    }
}

/// Parse an optional `YYYY-MM-DD` value.
pub fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, StratsafeError> {
    match config.get_string(DEFAULTS_SECTION, key) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                invalid(
                    DEFAULTS_SECTION,
                    key,
                    format!("invalid {} format, expected YYYY-MM-DD", key),
                )
            }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), StratsafeError> {
    let today = chrono::Local::now().date_naive();
    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;
    for (key, date) in [("start_date", start), ("end_date", end)] {
        if date.is_some_and(|d| d > today) {
            return Err(invalid(
                DEFAULTS_SECTION,
                key,
                format!("{} must not be in the future", key),
            ));
        }
    }
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid(
                DEFAULTS_SECTION,
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

fn parse_initial_capital(config: &dyn ConfigPort) -> Result<Option<f64>, StratsafeError> {
    let Some(raw) = config.get_string(DEFAULTS_SECTION, "initial_capital") else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(Some(v)),
        Ok(_) => Err(invalid(
            DEFAULTS_SECTION,
            "initial_capital",
            "initial_capital must be positive",
        )),
        Err(_) => Err(invalid(
            DEFAULTS_SECTION,
            "initial_capital",
            format!("'{}' is not a number", raw),
        )),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), StratsafeError> {
    parse_initial_capital(config).map(|_| ())
}

fn validate_data_directory(config: &dyn ConfigPort) -> Result<(), StratsafeError> {
    match config.get_string(DATA_SECTION, "directory") {
        Some(d) if d.trim().is_empty() => Err(StratsafeError::ConfigMissing {
            section: DATA_SECTION.to_string(),
            key: "directory".to_string(),
        }),
        _ => Ok(()),
    }
}

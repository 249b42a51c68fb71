//! Configuration validation.
//!
//! Every key is checked before any data is fetched. Missing keys fall back to
//! the defaults below; present but malformed keys are errors.

use chrono::NaiveDate;
use std::str::FromStr;

use crate::domain::backtest::{is_known_timeframe, DataProvider};
use crate::domain::error::OrbError;
use crate::domain::session::LocalTime;
use crate::domain::strategy::{parse_timezone, StopRule};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_SYMBOL: &str = "DIA";
pub const DEFAULT_TIMEFRAME: &str = "5m";
pub const DEFAULT_TIMEZONE: &str = "America/New_York";
pub const DEFAULT_START_DATE: &str = "2025-01-01";
pub const DEFAULT_END_DATE: &str = "2026-02-10";
pub const DEFAULT_CSV_PATH: &str = "data/dj30_m5.csv";
pub const DEFAULT_PROVIDER: &str = "yahoo";
pub const DEFAULT_RANGE_START: &str = "09:30";
pub const DEFAULT_RANGE_END: &str = "10:00";
pub const DEFAULT_SESSION_END: &str = "16:00";
pub const DEFAULT_STOP_RULE: &str = "midpoint";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";
pub const DEFAULT_INITIAL_EQUITY: f64 = 100_000.0;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), OrbError> {
    validate_data(config)?;
    validate_session(config)?;
    validate_indicators(config)?;
    validate_strategy(config)?;
    validate_risk(config)?;
    Ok(())
}

/// A string key with surrounding whitespace removed, or `default`.
pub(crate) fn string_or(config: &dyn ConfigPort, section: &str, key: &str, default: &str) -> String {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn parse_time(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: &str,
) -> Result<LocalTime, OrbError> {
    string_or(config, section, key, default)
        .parse()
        .map_err(|e| OrbError::config_invalid(section, key, format!("{e}")))
}

pub(crate) fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: &str,
) -> Result<NaiveDate, OrbError> {
    let value = string_or(config, section, key, default);
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
        OrbError::config_invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))
    })
}

pub(crate) fn parse_stop_rule(config: &dyn ConfigPort) -> Result<StopRule, OrbError> {
    let name = string_or(config, "strategy", "stop_rule", DEFAULT_STOP_RULE);
    let multiplier = config.get_double("strategy", "atr_buffer_mult", 1.0);
    StopRule::parse(&name, multiplier).ok_or_else(|| {
        OrbError::config_invalid(
            "strategy",
            "stop_rule",
            format!("unknown stop rule {name:?}, expected midpoint or atr"),
        )
    })
}

/// A present key must parse as `T`; the typed getters would silently
/// fall back to their default otherwise.
fn check_parses<T: FromStr>(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), OrbError> {
    match config.get_string(section, key) {
        Some(s) if s.trim().parse::<T>().is_err() => Err(OrbError::config_invalid(
            section,
            key,
            format!("{key} is not a valid number: {s:?}"),
        )),
        _ => Ok(()),
    }
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), OrbError> {
    for key in ["symbol", "csv_path"] {
        if config
            .get_string("data", key)
            .is_some_and(|s| s.trim().is_empty())
        {
            return Err(OrbError::ConfigMissing {
                section: "data".to_string(),
                key: key.to_string(),
            });
        }
    }

    let timeframe = string_or(config, "data", "timeframe", DEFAULT_TIMEFRAME);
    if !is_known_timeframe(&timeframe) {
        return Err(OrbError::config_invalid(
            "data",
            "timeframe",
            format!("unsupported timeframe {timeframe:?}"),
        ));
    }

    let tz = string_or(config, "data", "timezone", DEFAULT_TIMEZONE);
    if parse_timezone(&tz).is_none() {
        return Err(OrbError::config_invalid(
            "data",
            "timezone",
            format!("unknown timezone {tz:?}"),
        ));
    }

    let provider = string_or(config, "data", "provider", DEFAULT_PROVIDER);
    if DataProvider::parse(&provider).is_none() {
        return Err(OrbError::config_invalid(
            "data",
            "provider",
            format!("unknown provider {provider:?}, expected yahoo or csv"),
        ));
    }

    let start_date = parse_date(config, "data", "start_date", DEFAULT_START_DATE)?;
    let end_date = parse_date(config, "data", "end_date", DEFAULT_END_DATE)?;
    if start_date > end_date {
        return Err(OrbError::config_invalid(
            "data",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

fn validate_session(config: &dyn ConfigPort) -> Result<(), OrbError> {
    let range_start = parse_time(config, "session", "range_start", DEFAULT_RANGE_START)?;
    let range_end = parse_time(config, "session", "range_end", DEFAULT_RANGE_END)?;
    let session_end = parse_time(config, "session", "session_end", DEFAULT_SESSION_END)?;

    if range_start >= range_end {
        return Err(OrbError::config_invalid(
            "session",
            "range_start",
            "range_start must be before range_end",
        ));
    }
    if range_end > session_end {
        return Err(OrbError::config_invalid(
            "session",
            "session_end",
            "session_end must not be before range_end",
        ));
    }
    Ok(())
}

fn validate_indicators(config: &dyn ConfigPort) -> Result<(), OrbError> {
    for key in ["ema_period", "vol_sma_period", "atr_period"] {
        check_parses::<i64>(config, "indicators", key)?;
        if config.get_int("indicators", key, 1) < 1 {
            return Err(OrbError::config_invalid(
                "indicators",
                key,
                format!("{key} must be at least 1"),
            ));
        }
    }
    Ok(())
}

fn validate_strategy(config: &dyn ConfigPort) -> Result<(), OrbError> {
    for key in ["volume_factor", "slope_threshold", "fixed_rr", "atr_buffer_mult"] {
        check_parses::<f64>(config, "strategy", key)?;
    }

    for key in ["volume_factor", "slope_threshold"] {
        let value = config.get_double("strategy", key, 0.0);
        if value < 0.0 || !value.is_finite() {
            return Err(OrbError::config_invalid(
                "strategy",
                key,
                format!("{key} must be non-negative"),
            ));
        }
    }

    for key in ["fixed_rr", "atr_buffer_mult"] {
        let value = config.get_double("strategy", key, 1.0);
        if value <= 0.0 || !value.is_finite() {
            return Err(OrbError::config_invalid(
                "strategy",
                key,
                format!("{key} must be positive"),
            ));
        }
    }

    parse_stop_rule(config)?;
    Ok(())
}

fn validate_risk(config: &dyn ConfigPort) -> Result<(), OrbError> {
    check_parses::<f64>(config, "risk", "risk_per_trade_pct")?;
    check_parses::<f64>(config, "risk", "initial_equity")?;

    let risk = config.get_double("risk", "risk_per_trade_pct", 0.0);
    if !(0.0..1.0).contains(&risk) {
        return Err(OrbError::config_invalid(
            "risk",
            "risk_per_trade_pct",
            "risk_per_trade_pct must be in [0, 1)",
        ));
    }

    let equity = config.get_double("risk", "initial_equity", DEFAULT_INITIAL_EQUITY);
    if equity <= 0.0 || !equity.is_finite() {
        return Err(OrbError::config_invalid(
            "risk",
            "initial_equity",
            "initial_equity must be positive",
        ));
    }
    Ok(())
}

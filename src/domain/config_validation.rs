//! Configuration validation.
//!
//! Validates all config fields before any command talks to the backend, and
//! turns them into typed [`DashboardSettings`].

use crate::domain::analysis::AnalysisParams;
use crate::domain::error::StockdashError;
use crate::domain::forecast::MAX_FORECAST_DAYS;
use crate::domain::timeframe::parse_tickers;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_TICKERS: &str = "AAPL,TSLA,AMZN,GOOGL,MSFT,NVDA";
pub const DEFAULT_TIMEOUT_SECS: i64 = 8;
pub const DEFAULT_POLL_INTERVAL_SECS: i64 = 10;
pub const DEFAULT_POOL_SIZE: i64 = 4;
pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
    pub tickers: Vec<String>,
    pub poll_interval_secs: u64,
    pub check_alerts: bool,
    pub analysis: AnalysisParams,
    pub cache_path: Option<String>,
    pub cache_pool_size: u32,
    pub listen: String,
    pub log_filter: String,
}

impl DashboardSettings {
    /// Validates `config` and reads every setting, applying defaults.
    pub fn load(config: &dyn ConfigPort) -> Result<Self, StockdashError> {
        validate_dashboard_config(config)?;

        let base_url = config
            .get_string("backend", "base_url")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .unwrap_or_default();
        let tickers = parse_tickers(
            &config
                .get_string("dashboard", "tickers")
                .unwrap_or_else(|| DEFAULT_TICKERS.to_string()),
        )?;

        Ok(DashboardSettings {
            base_url,
            access_token: config
                .get_string("backend", "access_token")
                .filter(|t| !t.trim().is_empty()),
            timeout_secs: config.get_int("backend", "timeout_secs", DEFAULT_TIMEOUT_SECS) as u64,
            tickers,
            poll_interval_secs: config.get_int(
                "dashboard",
                "poll_interval_secs",
                DEFAULT_POLL_INTERVAL_SECS,
            ) as u64,
            check_alerts: config.get_bool("dashboard", "check_alerts", false),
            analysis: analysis_params(config),
            cache_path: config
                .get_string("cache", "path")
                .filter(|p| !p.trim().is_empty()),
            cache_pool_size: config.get_int("cache", "pool_size", DEFAULT_POOL_SIZE) as u32,
            listen: config
                .get_string("web", "listen")
                .unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
            log_filter: config
                .get_string("log", "filter")
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }
}

fn analysis_params(config: &dyn ConfigPort) -> AnalysisParams {
    let defaults = AnalysisParams::default();
    AnalysisParams {
        risk_free_rate: config.get_double("dashboard", "risk_free_rate", defaults.risk_free_rate),
        var_confidence: config.get_double("dashboard", "var_confidence", defaults.var_confidence),
        forecast_days: config.get_int(
            "dashboard",
            "forecast_days",
            defaults.forecast_days as i64,
        ) as usize,
        forecast_lookback: config.get_int(
            "dashboard",
            "forecast_lookback",
            defaults.forecast_lookback as i64,
        ) as usize,
    }
}

pub fn validate_dashboard_config(config: &dyn ConfigPort) -> Result<(), StockdashError> {
    validate_base_url(config)?;
    validate_positive_int(config, "backend", "timeout_secs", DEFAULT_TIMEOUT_SECS)?;
    validate_tickers(config)?;
    validate_positive_int(
        config,
        "dashboard",
        "poll_interval_secs",
        DEFAULT_POLL_INTERVAL_SECS,
    )?;
    validate_check_alerts(config)?;
    validate_risk_free_rate(config)?;
    validate_var_confidence(config)?;
    validate_forecast(config)?;
    validate_positive_int(config, "cache", "pool_size", DEFAULT_POOL_SIZE)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StockdashError {
    StockdashError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_base_url(config: &dyn ConfigPort) -> Result<(), StockdashError> {
    let Some(url) = config.get_string("backend", "base_url") else {
        return Err(StockdashError::ConfigMissing {
            section: "backend".to_string(),
            key: "base_url".to_string(),
        });
    };
    let url = url.trim();
    let host = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));
    match host {
        Some(rest) if !rest.trim_matches('/').is_empty() => Ok(()),
        Some(_) => Err(invalid("backend", "base_url", "base_url has no host")),
        None => Err(invalid(
            "backend",
            "base_url",
            "base_url must start with http:// or https://",
        )),
    }
}

fn validate_positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<(), StockdashError> {
    if config.get_int(section, key, default) < 1 {
        return Err(invalid(section, key, format!("{key} must be at least 1")));
    }
    Ok(())
}

fn validate_tickers(config: &dyn ConfigPort) -> Result<(), StockdashError> {
    let raw = config
        .get_string("dashboard", "tickers")
        .unwrap_or_else(|| DEFAULT_TICKERS.to_string());
    let tickers = parse_tickers(&raw)
        .map_err(|e| invalid("dashboard", "tickers", e.to_string()))?;
    if tickers.is_empty() {
        return Err(invalid("dashboard", "tickers", "at least one ticker is required"));
    }
    Ok(())
}

/// Alerts live behind the backend's login.
fn validate_check_alerts(config: &dyn ConfigPort) -> Result<(), StockdashError> {
    let has_token = config
        .get_string("backend", "access_token")
        .is_some_and(|t| !t.trim().is_empty());
    if config.get_bool("dashboard", "check_alerts", false) && !has_token {
        return Err(invalid(
            "dashboard",
            "check_alerts",
            "check_alerts requires backend access_token",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), StockdashError> {
    let value = config.get_double("dashboard", "risk_free_rate", 0.02);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "dashboard",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_var_confidence(config: &dyn ConfigPort) -> Result<(), StockdashError> {
    let value = config.get_double("dashboard", "var_confidence", 0.95);
    if value <= 0.5 || value >= 1.0 {
        return Err(invalid(
            "dashboard",
            "var_confidence",
            "var_confidence must be between 0.5 and 1 (exclusive)",
        ));
    }
    Ok(())
}

fn validate_forecast(config: &dyn ConfigPort) -> Result<(), StockdashError> {
    let days = config.get_int("dashboard", "forecast_days", 7);
    if days < 1 || days > MAX_FORECAST_DAYS as i64 {
        return Err(invalid(
            "dashboard",
            "forecast_days",
            format!("forecast_days must be between 1 and {MAX_FORECAST_DAYS}"),
        ));
    }
    let lookback = config.get_int("dashboard", "forecast_lookback", 100);
    if lookback < 2 {
        return Err(invalid(
            "dashboard",
            "forecast_lookback",
            "forecast_lookback must be at least 2",
        ));
    }
    Ok(())
}

//! Configuration validation.
//!
//! Validates config fields before a scan, verification, or lab run starts.

use crate::domain::error::QuantscanError;
use crate::domain::strategy::parse_strategies;
use crate::domain::universe::parse_markets;
use crate::ports::config_port::ConfigPort;

pub const MAX_WORKERS: i64 = 64;

pub fn validate_scan_config(config: &dyn ConfigPort) -> Result<(), QuantscanError> {
    validate_markets(config)?;
    validate_scan_tuning(config)
}

/// Everything in `[scan]` and `[data]` except the market list.
pub fn validate_scan_tuning(config: &dyn ConfigPort) -> Result<(), QuantscanError> {
    validate_strategies(config)?;
    validate_workers(config)?;
    validate_task_timeout(config)?;
    validate_lookback(config)?;
    validate_data_source(config)?;
    Ok(())
}

pub fn validate_lab_config(config: &dyn ConfigPort) -> Result<(), QuantscanError> {
    for key in ["capital", "usd_rate"] {
        let value = config.get_double("lab", key, 1.0);
        if value <= 0.0 {
            return Err(QuantscanError::ConfigInvalid {
                section: "lab".to_string(),
                key: key.to_string(),
                reason: format!("{key} must be positive"),
            });
        }
    }
    Ok(())
}

fn validate_markets(config: &dyn ConfigPort) -> Result<(), QuantscanError> {
    let raw = config
        .get_string("scan", "markets")
        .ok_or_else(|| QuantscanError::ConfigMissing {
            section: "scan".to_string(),
            key: "markets".to_string(),
        })?;
    parse_markets(&raw).map_err(|e| QuantscanError::ConfigInvalid {
        section: "scan".to_string(),
        key: "markets".to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

fn validate_strategies(config: &dyn ConfigPort) -> Result<(), QuantscanError> {
    let raw = config.get_string("scan", "strategies").unwrap_or_default();
    parse_strategies(&raw).map_err(|e| QuantscanError::ConfigInvalid {
        section: "scan".to_string(),
        key: "strategies".to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

fn validate_workers(config: &dyn ConfigPort) -> Result<(), QuantscanError> {
    let value = config.get_int("scan", "workers", 8);
    if !(1..=MAX_WORKERS).contains(&value) {
        return Err(QuantscanError::ConfigInvalid {
            section: "scan".to_string(),
            key: "workers".to_string(),
            reason: format!("workers must be between 1 and {MAX_WORKERS}"),
        });
    }
    Ok(())
}

fn validate_task_timeout(config: &dyn ConfigPort) -> Result<(), QuantscanError> {
    let value = config.get_int("scan", "task_timeout_secs", 15);
    if value < 1 {
        return Err(QuantscanError::ConfigInvalid {
            section: "scan".to_string(),
            key: "task_timeout_secs".to_string(),
            reason: "task_timeout_secs must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), QuantscanError> {
    let value = config.get_int("scan", "lookback_days", 365);
    if value < 200 {
        return Err(QuantscanError::ConfigInvalid {
            section: "scan".to_string(),
            key: "lookback_days".to_string(),
            reason: "lookback_days must cover at least 200 days".to_string(),
        });
    }
    Ok(())
}

fn validate_data_source(config: &dyn ConfigPort) -> Result<(), QuantscanError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "sqlite".to_string());
    match source.as_str() {
        "sqlite" => Ok(()),
        "csv" => match config.get_string("data", "csv_dir") {
            Some(dir) if !dir.trim().is_empty() => Ok(()),
            _ => Err(QuantscanError::ConfigMissing {
                section: "data".to_string(),
                key: "csv_dir".to_string(),
            }),
        },
        other => Err(QuantscanError::ConfigInvalid {
            section: "data".to_string(),
            key: "source".to_string(),
            reason: format!("unknown data source '{other}', expected sqlite or csv"),
        }),
    }
}

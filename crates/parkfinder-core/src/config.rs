use std::time::Duration;

use crate::app_config::{AppConfig, LocationTuning, MapTuning};
use crate::ConfigError;

pub const DEFAULT_PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place/";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(invalid(var, format!("must be a positive number, got {value}")))
        }
    };

    let log_level = or_default("PARKFINDER_LOG_LEVEL", "info");
    let places_api_key = lookup("PARKFINDER_PLACES_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());
    let places_base_url = or_default("PARKFINDER_PLACES_BASE_URL", DEFAULT_PLACES_BASE_URL);

    let http_timeout_secs = parse_u64("PARKFINDER_HTTP_TIMEOUT_SECS", "30")?;
    let http_max_retries = parse_u32("PARKFINDER_HTTP_MAX_RETRIES", "2")?;
    let http_backoff_base_ms = parse_u64("PARKFINDER_HTTP_BACKOFF_BASE_MS", "250")?;

    let location = LocationTuning {
        freshness_window: Duration::from_secs(parse_u64("PARKFINDER_FRESHNESS_WINDOW_SECS", "30")?),
        freshness_retry: Duration::from_secs(parse_u64("PARKFINDER_FRESHNESS_RETRY_SECS", "10")?),
        request_timeout: Duration::from_secs(parse_u64("PARKFINDER_LOCATION_TIMEOUT_SECS", "15")?),
        verification_idle: Duration::from_secs(parse_u64(
            "PARKFINDER_VERIFICATION_IDLE_SECS",
            "5",
        )?),
        ..LocationTuning::default()
    };

    #[allow(clippy::cast_possible_truncation)]
    let map = MapTuning {
        radius_multiplier: parse_positive_f64("PARKFINDER_SEARCH_RADIUS_MULTIPLIER", "1.3")?,
        requery_distance_fraction: parse_positive_f64(
            "PARKFINDER_REQUERY_DISTANCE_FRACTION",
            "0.75",
        )?,
        requery_zoom_delta: parse_positive_f64("PARKFINDER_REQUERY_ZOOM_DELTA", "0.7")? as f32,
        ..MapTuning::default()
    };

    Ok(AppConfig {
        log_level,
        places_api_key,
        places_base_url,
        http_timeout_secs,
        http_max_retries,
        http_backoff_base_ms,
        location,
        map,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

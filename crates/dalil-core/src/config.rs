use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_GEOCODE_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let api_base_url = require("DALIL_API_BASE_URL")?;
    let geocode_base_url = or_default("DALIL_GEOCODE_BASE_URL", DEFAULT_GEOCODE_BASE_URL);

    let env = parse_environment(&or_default("DALIL_ENV", "development"));
    let log_level = or_default("DALIL_LOG_LEVEL", "info");

    let request_timeout_secs = parse_u64("DALIL_REQUEST_TIMEOUT_SECS", "30")?;
    let connect_timeout_secs = parse_u64("DALIL_CONNECT_TIMEOUT_SECS", "10")?;
    let user_agent = or_default("DALIL_USER_AGENT", "dalil/0.1 (business-directory)");
    let max_retries = parse_u32("DALIL_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("DALIL_RETRY_BACKOFF_BASE_MS", "500")?;

    let default_city_name = or_default("DALIL_DEFAULT_CITY", "Riyadh");
    let geolocation_timeout_secs = parse_u64("DALIL_GEOLOCATION_TIMEOUT_SECS", "10")?;

    let suggest_debounce_ms = parse_u64("DALIL_SUGGEST_DEBOUNCE_MS", "300")?;
    let suggest_min_query_len = parse_usize("DALIL_SUGGEST_MIN_QUERY_LEN", "2")?;
    let suggest_group_limit = parse_usize("DALIL_SUGGEST_GROUP_LIMIT", "5")?;

    Ok(AppConfig {
        api_base_url,
        geocode_base_url,
        env,
        log_level,
        request_timeout_secs,
        connect_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        default_city_name,
        geolocation_timeout_secs,
        suggest_debounce_ms,
        suggest_min_query_len,
        suggest_group_limit,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

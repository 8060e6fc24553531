use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

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
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let site_base_url = require("SOCOPS_SITE_BASE_URL")?;
    if !(site_base_url.starts_with("http://") || site_base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "SOCOPS_SITE_BASE_URL".to_string(),
            reason: format!("expected an http(s) origin, got '{site_base_url}'"),
        });
    }

    let env = parse_environment(&or_default("SOCOPS_ENV", "development"))?;
    let log_level = or_default("SOCOPS_LOG_LEVEL", "info");
    let rules_path = PathBuf::from(or_default("SOCOPS_RULES_PATH", "./config/brand_rules.yaml"));
    let calendar_path = lookup("SOCOPS_CALENDAR_PATH").ok().map(PathBuf::from);
    let content_language = or_default("SOCOPS_CONTENT_LANGUAGE", "fr");

    let generator_url = lookup("SOCOPS_GENERATOR_URL").ok();
    let generator_api_key = lookup("SOCOPS_GENERATOR_API_KEY").ok();
    let generator_timeout_secs = parse_num(&lookup, "SOCOPS_GENERATOR_TIMEOUT_SECS", 30)?;
    let generator_max_retries = parse_num(&lookup, "SOCOPS_GENERATOR_MAX_RETRIES", 2)?;
    let generator_backoff_base_ms = parse_num(&lookup, "SOCOPS_GENERATOR_BACKOFF_BASE_MS", 500)?;
    let max_concurrent_generations = parse_num(&lookup, "SOCOPS_MAX_CONCURRENT_GENERATIONS", 10)?;
    if max_concurrent_generations == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SOCOPS_MAX_CONCURRENT_GENERATIONS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let rule_fetch_timeout_secs = parse_num(&lookup, "SOCOPS_RULE_FETCH_TIMEOUT_SECS", 5)?;
    let anti_dup_window_days = parse_num(&lookup, "SOCOPS_ANTI_DUP_WINDOW_DAYS", 28)?;

    let db_max_connections = parse_num(&lookup, "SOCOPS_DB_MAX_CONNECTIONS", 10)?;
    let db_min_connections = parse_num(&lookup, "SOCOPS_DB_MIN_CONNECTIONS", 1)?;
    let db_acquire_timeout_secs = parse_num(&lookup, "SOCOPS_DB_ACQUIRE_TIMEOUT_SECS", 10)?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        site_base_url,
        rules_path,
        calendar_path,
        content_language,
        generator_url,
        generator_api_key,
        generator_timeout_secs,
        generator_max_retries,
        generator_backoff_base_ms,
        max_concurrent_generations,
        rule_fetch_timeout_secs,
        anti_dup_window_days,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Read a numeric variable, falling back to `default` when unset.
fn parse_num<T, F>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    match lookup(var) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SOCOPS_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

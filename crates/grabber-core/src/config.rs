use crate::app_config::AppConfig;
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
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
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

    let database_url = lookup("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());
    let log_level = or_default("GRABBER_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("GRABBER_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("GRABBER_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("GRABBER_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let scraper_request_timeout_secs = parse_u64("GRABBER_SCRAPER_REQUEST_TIMEOUT_SECS", "30")?;
    let scraper_user_agent = or_default("GRABBER_SCRAPER_USER_AGENT", "grabber/0.1 (shop-crawler)");
    let scraper_max_concurrent_requests =
        parse_usize("GRABBER_SCRAPER_MAX_CONCURRENT_REQUESTS", "2")?;
    let default_location = or_default("GRABBER_DEFAULT_LOCATION", "tokyo");

    let geocoding_api_key = lookup("GOOGLE_MAPS_GEOCODING_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty());

    let geocode_rate_per_sec = parse_u32("GRABBER_GEOCODE_RATE_PER_SEC", "10")?;
    if geocode_rate_per_sec == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "GRABBER_GEOCODE_RATE_PER_SEC".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let geocode_timeout_secs = parse_u64("GRABBER_GEOCODE_TIMEOUT_SECS", "10")?;
    let geocode_batch_limit = i64::from(parse_u32("GRABBER_GEOCODE_BATCH_LIMIT", "1000")?);

    Ok(AppConfig {
        database_url,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        scraper_request_timeout_secs,
        scraper_user_agent,
        scraper_max_concurrent_requests,
        default_location,
        geocoding_api_key,
        geocode_rate_per_sec,
        geocode_timeout_secs,
        geocode_batch_limit,
    })
}

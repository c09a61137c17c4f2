use crate::ConfigError;

#[derive(Clone)]
pub struct AppConfig {
    /// Only database-backed commands need this; see
    /// [`AppConfig::require_database_url`].
    pub database_url: Option<String>,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_max_concurrent_requests: usize,
    pub default_location: String,
    /// Only the `geocode` command requires this; crawling works without it.
    pub geocoding_api_key: Option<String>,
    pub geocode_rate_per_sec: u32,
    pub geocode_timeout_secs: u64,
    pub geocode_batch_limit: i64,
}

impl AppConfig {
    /// Returns the database URL, or an error naming `DATABASE_URL` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] if no database URL is configured.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("log_level", &self.log_level)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field(
                "scraper_max_concurrent_requests",
                &self.scraper_max_concurrent_requests,
            )
            .field("default_location", &self.default_location)
            .field(
                "geocoding_api_key",
                &self.geocoding_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("geocode_rate_per_sec", &self.geocode_rate_per_sec)
            .field("geocode_timeout_secs", &self.geocode_timeout_secs)
            .field("geocode_batch_limit", &self.geocode_batch_limit)
            .finish()
    }
}

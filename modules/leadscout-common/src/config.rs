use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::LeadScoutError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Search proxy
    pub serpapi_base_url: String,
    /// Max in-flight WhatsApp presence checks per result page.
    pub presence_concurrency: usize,
    pub settings_cache_ttl: Duration,
    /// Local development only: serve demo places to tenants without a SerpAPI key.
    pub demo_data: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, LeadScoutError> {
        let presence_concurrency: usize = parse_env("PRESENCE_CONCURRENCY", 5)?;
        if presence_concurrency == 0 {
            return Err(LeadScoutError::Config(
                "PRESENCE_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            database_url: required_env("DATABASE_URL")?,
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: parse_env("WEB_PORT", 3000)?,
            serpapi_base_url: env::var("SERPAPI_BASE_URL")
                .unwrap_or_else(|_| "https://serpapi.com".to_string()),
            presence_concurrency,
            settings_cache_ttl: Duration::from_secs(parse_env("SETTINGS_CACHE_TTL_SECS", 60)?),
            demo_data: parse_env("DEMO_DATA", false)?,
        })
    }
}

fn required_env(key: &str) -> Result<String, LeadScoutError> {
    env::var(key).map_err(|_| LeadScoutError::Config(format!("{key} environment variable is required")))
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, LeadScoutError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| LeadScoutError::Config(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}

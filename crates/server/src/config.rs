//! Server configuration

use std::time::Duration;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,
    /// `None` leaves the server running with every generation failing
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub completion_timeout: Duration,
    pub retry_base_delay: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            bind_address: std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".into()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|v| parse_list(&v))
                .unwrap_or_else(|_| vec!["*".to_string()]),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS").unwrap_or(100),
            gemini_api_key: non_empty_var("GEMINI_API_KEY")
                .or_else(|| non_empty_var("GOOGLE_API_KEY")),
            gemini_model: non_empty_var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            gemini_base_url: non_empty_var("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            completion_timeout: Duration::from_secs(
                env_parse("COMPLETION_TIMEOUT_SECS").unwrap_or(30),
            ),
            retry_base_delay: Duration::from_millis(env_parse("RETRY_BASE_DELAY_MS").unwrap_or(2000)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 100,
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            completion_timeout: Duration::from_secs(30),
            retry_base_delay: Duration::from_millis(2000),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = non_empty_var(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key = key, value = %raw, "Ignoring unparsable config value");
            None
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

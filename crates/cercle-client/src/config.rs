use std::time::Duration;

/// Environment variable overriding the API base URL.
pub const ENV_API_BASE_URL: &str = "CERCLE_API_BASE_URL";

/// Environment variable overriding the request timeout, in seconds.
pub const ENV_API_TIMEOUT_SECS: &str = "CERCLE_API_TIMEOUT_SECS";

/// Live backend used when no override is configured.
pub const DEFAULT_API_BASE_URL: &str = "https://7d2majjsda.us-east-1.awsapprunner.com/api";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the autonomy API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Resolve configuration from the environment, falling back to the live
    /// backend defaults.
    pub fn from_env() -> Self {
        let base_url = std::env::var(ENV_API_BASE_URL)
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let timeout_secs = std::env::var(ENV_API_TIMEOUT_SECS)
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            base_url: normalize_base_url(base_url),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

fn normalize_base_url(raw: String) -> String {
    raw.trim_end_matches('/').to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide configuration for the directory client and location core.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the directory REST API, e.g. `https://api.dalil.example/api`.
    pub api_base_url: String,
    /// Base URL of the reverse-geocoding service (Nominatim-compatible).
    pub geocode_base_url: String,
    pub env: Environment,
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    /// Additional attempts after the first failure for transient API errors.
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// Name of the "home" city applied when location resolution fails outright.
    pub default_city_name: String,
    /// Hard bound on waiting for a device position fix.
    pub geolocation_timeout_secs: u64,
    pub suggest_debounce_ms: u64,
    pub suggest_min_query_len: usize,
    /// Per-group cap on unified search results (categories, businesses, ...).
    pub suggest_group_limit: usize,
}

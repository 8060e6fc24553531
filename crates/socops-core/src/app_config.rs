use std::path::PathBuf;

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

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    /// Public storefront origin that campaign links point at.
    pub site_base_url: String,
    pub rules_path: PathBuf,
    /// Optional YAML calendar; the built-in calendar is used when unset.
    pub calendar_path: Option<PathBuf>,
    pub content_language: String,
    pub generator_url: Option<String>,
    pub generator_api_key: Option<String>,
    pub generator_timeout_secs: u64,
    pub generator_max_retries: u32,
    pub generator_backoff_base_ms: u64,
    pub max_concurrent_generations: usize,
    pub rule_fetch_timeout_secs: u64,
    pub anti_dup_window_days: u32,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("site_base_url", &self.site_base_url)
            .field("rules_path", &self.rules_path)
            .field("calendar_path", &self.calendar_path)
            .field("content_language", &self.content_language)
            .field("generator_url", &self.generator_url)
            .field(
                "generator_api_key",
                &self.generator_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("generator_timeout_secs", &self.generator_timeout_secs)
            .field("generator_max_retries", &self.generator_max_retries)
            .field("generator_backoff_base_ms", &self.generator_backoff_base_ms)
            .field(
                "max_concurrent_generations",
                &self.max_concurrent_generations,
            )
            .field("rule_fetch_timeout_secs", &self.rule_fetch_timeout_secs)
            .field("anti_dup_window_days", &self.anti_dup_window_days)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}

//! Environment-sourced application configuration.

use serde::Deserialize;

fn default_port() -> u16 {
    8080
}

fn default_github_base_url() -> String {
    "https://api.github.com/".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_shutdown_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the web server binds on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Redis connection URL. Absent means the in-memory fallback store.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// GitHub personal access token. Unauthenticated requests work but get
    /// a far smaller rate limit.
    #[serde(default)]
    pub github_token: Option<String>,
    /// Override for tests/proxies; trailing slash required for URL joining.
    #[serde(default = "default_github_base_url")]
    pub github_base_url: String,
    /// Base level for the default tracing filter.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Seconds to wait for in-flight requests on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

impl Config {
    /// Extract the config from environment variables.
    pub fn from_env() -> Result<Self, figment::Error> {
        use figment::Figment;
        use figment::providers::Env;
        Figment::new().merge(Env::raw()).extract()
    }
}

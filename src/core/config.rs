

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{CatalogError, Result};
use super::throttle::CoalescePolicy;
use crate::{DEFAULT_BASE_URL, DEFAULT_REFRESH_DELAY_MS, DEFAULT_THROTTLE_WINDOW_MS};


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Root of the catalog UI service; the query endpoint is resolved against it.
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,

    /// Delay before a remote refresh fires, giving the backend index time to settle.
    pub refresh_delay_ms: u64,
    pub throttle_window_ms: u64,
    pub coalesce: CoalescePolicy,
}

impl CatalogConfig {
    
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            request_timeout_secs: 30,
            user_agent: format!("catalog-results/{}", env!("CARGO_PKG_VERSION")),
            refresh_delay_ms: DEFAULT_REFRESH_DELAY_MS,
            throttle_window_ms: DEFAULT_THROTTLE_WINDOW_MS,
            coalesce: CoalescePolicy::KeepLast,
        }
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    pub fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.throttle_window_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reads `CATALOG_*` variables over the defaults. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::new(
            &std::env::var("CATALOG_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        );

        if let Some(timeout) = env_parsed("CATALOG_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = timeout;
        }
        if let Some(delay) = env_parsed("CATALOG_REFRESH_DELAY_MS") {
            config.refresh_delay_ms = delay;
        }
        if let Some(window) = env_parsed("CATALOG_THROTTLE_WINDOW_MS") {
            config.throttle_window_ms = window;
        }
        if let Some(policy) = env_parsed("CATALOG_COALESCE") {
            config.coalesce = policy;
        }
        if let Ok(agent) = std::env::var("CATALOG_USER_AGENT") {
            config.user_agent = agent;
        }

        config
    }

    /// Layers an optional config file and the `CATALOG_*` environment over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("base_url", defaults.base_url.clone())
            .and_then(|b| b.set_default("request_timeout_secs", defaults.request_timeout_secs))
            .and_then(|b| b.set_default("user_agent", defaults.user_agent.clone()))
            .and_then(|b| b.set_default("refresh_delay_ms", defaults.refresh_delay_ms))
            .and_then(|b| b.set_default("throttle_window_ms", defaults.throttle_window_ms))
            .and_then(|b| b.set_default("coalesce", defaults.coalesce.to_string()))
            .map_err(|e| CatalogError::Config(e.to_string()))?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(config::Environment::with_prefix("CATALOG").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize::<CatalogConfig>())
            .map_err(|e| CatalogError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)?;
        if self.request_timeout_secs == 0 {
            return Err(CatalogError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

//! Application configuration module
//!
//! Provides configuration for the sync core: remote API location, paging
//! defaults, cache time-to-live, and the local data directory. Values come
//! from the environment with code defaults, or from the builder.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default remote API root
const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Default page size for list requests
const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default read-cache time-to-live in seconds
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Default prefix for proxied remote static assets
const DEFAULT_ASSET_PROXY_PATH: &str = "/assets";

/// Timeout applied to the authentication probe only
const DEFAULT_AUTH_CHECK_TIMEOUT_MS: u64 = 5_000;

/// Window within which repeated drain triggers collapse into one
const DEFAULT_DRAIN_DEBOUNCE_MS: u64 = 1_000;

/// Sync core configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote API root, without the `/api/` suffix
    pub api_base_url: String,
    /// Default page size for list requests
    pub page_size: u32,
    /// Read-cache time-to-live
    pub cache_ttl: Duration,
    /// Directory holding the outbox database; platform data dir when `None`
    pub data_dir: Option<PathBuf>,
    /// Same-origin prefix that proxied static-asset paths are rewritten to
    pub asset_proxy_path: String,
    /// Timeout for the authentication probe (the only client-enforced timeout)
    pub auth_check_timeout: Duration,
    /// Debounce window for connectivity-restored drain triggers
    pub drain_debounce: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            data_dir: None,
            asset_proxy_path: DEFAULT_ASSET_PROXY_PATH.to_string(),
            auth_check_timeout: Duration::from_millis(DEFAULT_AUTH_CHECK_TIMEOUT_MS),
            drain_debounce: Duration::from_millis(DEFAULT_DRAIN_DEBOUNCE_MS),
        }
    }
}

impl Config {
    /// Create a new ConfigBuilder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Build a configuration from environment variables
    ///
    /// Reads `MARKSYNC_API_URL`, `MARKSYNC_PAGE_SIZE`, `MARKSYNC_CACHE_TTL`
    /// (seconds) and `MARKSYNC_DATA_DIR`, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();
        if let Ok(url) = std::env::var("MARKSYNC_API_URL") {
            builder = builder.api_base_url(url);
        }
        if let Ok(size) = std::env::var("MARKSYNC_PAGE_SIZE") {
            let size = size
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidNumber("MARKSYNC_PAGE_SIZE"))?;
            builder = builder.page_size(size);
        }
        if let Ok(ttl) = std::env::var("MARKSYNC_CACHE_TTL") {
            let secs = ttl
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber("MARKSYNC_CACHE_TTL"))?;
            builder = builder.cache_ttl(Duration::from_secs(secs));
        }
        if let Ok(dir) = std::env::var("MARKSYNC_DATA_DIR") {
            builder = builder.data_dir(PathBuf::from(dir));
        }
        builder.build()
    }

    /// Remote API root with any trailing slash removed
    pub fn api_root(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    api_base_url: Option<String>,
    page_size: Option<u32>,
    cache_ttl: Option<Duration>,
    data_dir: Option<PathBuf>,
    asset_proxy_path: Option<String>,
    auth_check_timeout: Option<Duration>,
    drain_debounce: Option<Duration>,
}

impl ConfigBuilder {
    /// Set the remote API root URL
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Set the default page size
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Set the read-cache time-to-live
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Set the local data directory
    pub fn data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = Some(dir);
        self
    }

    /// Set the proxied asset prefix
    pub fn asset_proxy_path(mut self, path: impl Into<String>) -> Self {
        self.asset_proxy_path = Some(path.into());
        self
    }

    /// Set the authentication probe timeout
    pub fn auth_check_timeout(mut self, timeout: Duration) -> Self {
        self.auth_check_timeout = Some(timeout);
        self
    }

    /// Set the drain debounce window
    pub fn drain_debounce(mut self, window: Duration) -> Self {
        self.drain_debounce = Some(window);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config, ConfigError> {
        let defaults = Config::default();
        let api_base_url = self.api_base_url.unwrap_or(defaults.api_base_url);
        reqwest::Url::parse(&api_base_url)
            .map_err(|_| ConfigError::InvalidUrl(api_base_url.clone()))?;
        let page_size = self.page_size.unwrap_or(defaults.page_size);
        if page_size == 0 {
            return Err(ConfigError::InvalidNumber("page_size"));
        }
        Ok(Config {
            api_base_url,
            page_size,
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            data_dir: self.data_dir,
            asset_proxy_path: self.asset_proxy_path.unwrap_or(defaults.asset_proxy_path),
            auth_check_timeout: self.auth_check_timeout.unwrap_or(defaults.auth_check_timeout),
            drain_debounce: self.drain_debounce.unwrap_or(defaults.drain_debounce),
        })
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid number for {0}")]
    InvalidNumber(&'static str),
}

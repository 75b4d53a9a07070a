//! Application context
//!
//! Holds process-wide state the sync core components share: the validated
//! configuration and the current credential. The context is created once at
//! startup and handed to each component explicitly, so tests can build an
//! isolated context per case instead of touching ambient globals.

use crate::config::Config;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared, injectable application context
#[derive(Debug)]
pub struct AppContext {
    config: Config,
    token: RwLock<Option<String>>,
}

impl AppContext {
    /// Initialize a context from a validated configuration
    pub fn init(config: Config) -> Arc<Self> {
        Arc::new(Self {
            config,
            token: RwLock::new(None),
        })
    }

    /// Access the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Set the API token
    pub async fn set_token(&self, token: impl Into<String>) {
        let mut guard = self.token.write().await;
        *guard = Some(token.into());
    }

    /// Get a copy of the current API token
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Clear the token (logout)
    pub async fn clear_token(&self) {
        let mut guard = self.token.write().await;
        *guard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_lifecycle() {
        tokio_test::block_on(async {
            let ctx = AppContext::init(Config::default());
            assert!(ctx.token().await.is_none());

            ctx.set_token("secret").await;
            assert_eq!(ctx.token().await.as_deref(), Some("secret"));

            ctx.clear_token().await;
            assert!(ctx.token().await.is_none());
        });
    }

    #[test]
    fn test_config_access() {
        let config = Config::builder().page_size(42).build().unwrap();
        let ctx = AppContext::init(config);
        assert_eq!(ctx.config().page_size, 42);
    }
}

//! Client Configuration
//!
//! Wraps [`AppConfig`] with the bearer credential used for both the REST
//! store client and the notifier subscription.

use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};

/// Default platform API URL for local development
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
    token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let app = AppConfig::from_env().unwrap_or_default();
        Self { app, token: None }
    }
}

impl Config {
    /// Create a configuration from the environment
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        let app = builder.build()?;
        Ok(Self { app, token: None })
    }

    /// Set the bearer token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Get the bearer token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Clear the token (logout)
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    pub fn server_url(&self) -> &str {
        self.app.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }
}

//! Adapter configuration.

use crate::catalog::DEFAULT_BASE_URL;
use crate::error::Error;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::time::Duration;

const ENV_API_KEY: &str = "AGENTICA_API_KEY";
const ENV_BASE_URL: &str = "AGENTICA_BASE_URL";
const ENV_MODEL: &str = "AGENTICA_MODEL";
const ENV_TEMPERATURE: &str = "AGENTICA_TEMPERATURE";

/// Connection settings, fixed for the lifetime of an adapter.
#[derive(Debug)]
pub struct AdapterConfig {
    pub base_url: String,
    /// Requested model id. Unset or unknown ids resolve to the catalog default.
    pub model_id: Option<String>,
    /// Sampling temperature override.
    pub temperature: Option<f32>,
    pub api_key: Option<SecretString>,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model_id: None,
            temperature: None,
            api_key: None,
            timeout: Duration::from_secs(120),
        }
    }
}

impl AdapterConfig {
    pub fn builder() -> AdapterConfigBuilder {
        AdapterConfigBuilder::new()
    }

    /// Load configuration from `AGENTICA_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Ok(AdapterConfigBuilder::new().from_env()?.build())
    }

    /// API key if one was supplied and is non-empty.
    pub fn api_key(&self) -> Option<&SecretString> {
        self.api_key
            .as_ref()
            .filter(|key| !key.expose_secret().is_empty())
    }
}

/// Builder for AdapterConfig.
#[derive(Debug, Default)]
pub struct AdapterConfigBuilder {
    config: AdapterConfig,
}

impl AdapterConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the endpoint base URL (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn model(mut self, model_id: impl Into<String>) -> Self {
        self.config.model_id = Some(model_id.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Apply any `AGENTICA_*` environment variables that are set.
    pub fn from_env(mut self) -> Result<Self, Error> {
        if let Ok(key) = env::var(ENV_API_KEY) {
            self = self.api_key(key);
        }
        if let Ok(url) = env::var(ENV_BASE_URL) {
            self = self.base_url(url);
        }
        if let Ok(model) = env::var(ENV_MODEL) {
            self = self.model(model);
        }
        if let Ok(raw) = env::var(ENV_TEMPERATURE) {
            self = self.temperature(parse_temperature(&raw)?);
        }
        Ok(self)
    }

    pub fn build(self) -> AdapterConfig {
        self.config
    }
}

fn parse_temperature(raw: &str) -> Result<f32, Error> {
    raw.trim()
        .parse::<f32>()
        .ok()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .ok_or_else(|| Error::Config(format!("invalid {ENV_TEMPERATURE}: {raw:?}")))
}

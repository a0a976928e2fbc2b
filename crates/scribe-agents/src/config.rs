//! Runtime configuration for the scribe binary.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Environment variables (`SCRIBE_API_KEYS`, `SCRIBE_MODELS`, ...)
//! 2. TOML file passed via `--config` or `SCRIBE_CONFIG`
//! 3. Built-in defaults
//!
//! ```toml
//! request_timeout_secs = 120
//!
//! [provider]
//! models = ["gemini-2.5-flash", "gemini-2.0-flash"]
//! api_keys = ["..."]
//!
//! [retry]
//! max_retries = 3
//!
//! [packing]
//! hard_limit = 2000
//! page_banner = true
//! ```

use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use composition::{PackError, PackOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::provider::gemini::DEFAULT_BASE_URL;
use crate::provider::{Credential, RetryConfig};

pub const ENV_CONFIG: &str = "SCRIBE_CONFIG";
const ENV_API_KEYS: &str = "SCRIBE_API_KEYS";
const ENV_MODELS: &str = "SCRIBE_MODELS";
const ENV_BASE_URL: &str = "SCRIBE_BASE_URL";
const ENV_MAX_RETRIES: &str = "SCRIBE_MAX_RETRIES";
const ENV_HARD_LIMIT: &str = "SCRIBE_HARD_LIMIT";
const ENV_REQUEST_TIMEOUT: &str = "SCRIBE_REQUEST_TIMEOUT_SECS";

/// Primary model first, fallbacks after.
const DEFAULT_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.0-flash", "gemini-2.0-flash-lite"];

/// Upstream model endpoint and credentials.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Fallback chain, tried in order.
    pub models: Vec<String>,
    pub api_keys: Vec<String>,
    pub temperature: f32,
    /// Per-HTTP-call timeout.
    pub call_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            api_keys: Vec::new(),
            temperature: 0.4,
            call_timeout_secs: 90,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .field("api_keys", &format_args!("<{} redacted>", self.api_keys.len()))
            .field("temperature", &self.temperature)
            .field("call_timeout_secs", &self.call_timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScribeConfig {
    pub provider: ProviderConfig,
    pub retry: RetryConfig,
    pub packing: PackOptions,
    /// Whole-request deadline. `None` waits until the pool is exhausted.
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("no API keys configured (set SCRIBE_API_KEYS or provider.api_keys)")]
    NoCredentials,

    #[error("no models configured (set SCRIBE_MODELS or provider.models)")]
    NoModels,

    #[error("invalid packing options: {0}")]
    Packing(#[from] PackError),

    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
}

impl ScribeConfig {
    /// Parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Defaults, then `path` (or `SCRIBE_CONFIG`), then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = env::var(ENV_CONFIG).ok();
        let path = path.or(env_path.as_deref().map(Path::new));
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|var| env::var(var).ok())?;
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(keys) = lookup(ENV_API_KEYS) {
            self.provider.api_keys = split_list(&keys);
        }
        if let Some(models) = lookup(ENV_MODELS) {
            self.provider.models = split_list(&models);
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.provider.base_url = url.trim().to_string();
        }
        if let Some(v) = lookup(ENV_MAX_RETRIES) {
            self.retry.max_retries = parse_env(ENV_MAX_RETRIES, &v)?;
        }
        if let Some(v) = lookup(ENV_HARD_LIMIT) {
            self.packing.hard_limit = parse_env(ENV_HARD_LIMIT, &v)?;
            self.packing.target_size = self.packing.target_size.min(self.packing.hard_limit);
        }
        if let Some(v) = lookup(ENV_REQUEST_TIMEOUT) {
            self.request_timeout_secs = Some(parse_env(ENV_REQUEST_TIMEOUT, &v)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.api_keys.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::NoCredentials);
        }
        if self.provider.models.is_empty() {
            return Err(ConfigError::NoModels);
        }
        self.packing.validate()?;
        Ok(())
    }

    /// Non-empty API keys as labelled credentials (`key-0`, `key-1`, ...).
    pub fn credentials(&self) -> Vec<Credential> {
        self.provider
            .api_keys
            .iter()
            .filter(|k| !k.trim().is_empty())
            .enumerate()
            .map(|(i, k)| Credential::new(format!("key-{i}"), k.trim()))
            .collect()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

//! Client configuration.
//!
//! Everything the transport needs is passed in explicitly at construction time;
//! there are no process-wide defaults. A config can be built in code, read from
//! the environment, or parsed from YAML.

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_UPLOAD_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/upload/v1beta/files";

/// Connection and endpoint settings for a [`GenAiClient`](crate::GenAiClient).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root of the REST API. Relative endpoint paths are joined onto it.
    pub base_url: String,
    /// Endpoint that starts resumable uploads.
    pub upload_base_url: String,
    /// Sent as the `key` query parameter on every request.
    pub api_key: Option<String>,
    #[serde(with = "secs")]
    pub timeout: Duration,
    #[serde(with = "secs")]
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    #[serde(with = "secs")]
    pub pool_idle_timeout: Duration,
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            proxy: None,
            user_agent: concat!("genai-wire/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Defaults overridden by environment variables.
    ///
    /// - `GEMINI_API_KEY` (or `GOOGLE_API_KEY`)
    /// - `GENAI_BASE_URL`, `GENAI_UPLOAD_BASE_URL`
    /// - `GENAI_HTTP_TIMEOUT_SECS`, `GENAI_HTTP_CONNECT_TIMEOUT_SECS`
    /// - `GENAI_HTTP_POOL_MAX_IDLE_PER_HOST`, `GENAI_HTTP_POOL_IDLE_TIMEOUT_SECS`
    /// - `GENAI_PROXY_URL`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("GOOGLE_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());
        if let Ok(url) = env::var("GENAI_BASE_URL") {
            cfg.base_url = url;
        }
        if let Ok(url) = env::var("GENAI_UPLOAD_BASE_URL") {
            cfg.upload_base_url = url;
        }
        if let Some(secs) = env_u64("GENAI_HTTP_TIMEOUT_SECS") {
            cfg.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("GENAI_HTTP_CONNECT_TIMEOUT_SECS") {
            cfg.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = env_u64("GENAI_HTTP_POOL_MAX_IDLE_PER_HOST") {
            cfg.pool_max_idle_per_host = n as usize;
        }
        if let Some(secs) = env_u64("GENAI_HTTP_POOL_IDLE_TIMEOUT_SECS") {
            cfg.pool_idle_timeout = Duration::from_secs(secs);
        }
        cfg.proxy = env::var("GENAI_PROXY_URL").ok();
        cfg
    }

    /// Parse a YAML document. Missing keys fall back to defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::configuration(format!("invalid client config: {}", e)))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_upload_base_url(mut self, url: impl Into<String>) -> Self {
        self.upload_base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that URLs parse and a key is present.
    ///
    /// The base URL always ends with `/` afterwards so that relative paths such
    /// as `models/x:generateContent` join beneath it instead of replacing the
    /// last segment.
    pub fn validate(&mut self) -> Result<()> {
        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }
        Url::parse(&self.base_url)
            .map_err(|e| Error::configuration(format!("base_url {:?}: {}", self.base_url, e)))?;
        Url::parse(&self.upload_base_url).map_err(|e| {
            Error::configuration(format!(
                "upload_base_url {:?}: {}",
                self.upload_base_url, e
            ))
        })?;
        match self.api_key.as_deref() {
            Some(k) if !k.trim().is_empty() => Ok(()),
            _ => Err(Error::configuration(
                "missing API key (set GEMINI_API_KEY or configure api_key)",
            )),
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|s| s.trim().parse::<u64>().ok())
}

mod secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

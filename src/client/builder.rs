use crate::client::core::GenAiClient;
use crate::config::ClientConfig;
use crate::transport::{Api, HttpTransport, Transport};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`GenAiClient`].
///
/// Starts from [`ClientConfig::default`]; every setting can be overridden
/// here or supplied wholesale with [`GenAiClientBuilder::config`].
pub struct GenAiClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl GenAiClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            transport: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Override the REST base URL (primarily for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn upload_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.upload_base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.config.proxy = Some(url.into());
        self
    }

    /// Use a custom transport instead of the pooled HTTP one. The URL and
    /// connection settings are then ignored.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<GenAiClient> {
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(&self.config)?),
        };
        Ok(GenAiClient::from_api(Api::new(transport)))
    }
}

impl Default for GenAiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

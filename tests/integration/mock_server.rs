//! Mock HTTP server setup for integration tests

use genai_wire::{ClientConfig, GenAiClient};
use mockito::{Matcher, Mock, Server, ServerGuard};

pub const TEST_KEY: &str = "test-key";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Config pointing both the REST and upload endpoints at the mock server.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(TEST_KEY)
            .with_base_url(format!("{}/v1beta", self.base_url))
            .with_upload_base_url(format!("{}/upload/v1beta/files", self.base_url))
    }

    pub fn client(&self) -> GenAiClient {
        GenAiClient::new(self.config()).expect("client")
    }

    /// Matcher for a REST path under `/v1beta/`, ignoring the query string.
    pub fn path(rest: &str) -> Matcher {
        Matcher::Regex(format!("^/v1beta/{}", regex_escape(rest)))
    }

    /// A JSON response to `method /v1beta/{rest}` that also checks the API key.
    pub async fn mock_json(&mut self, method: &str, rest: &str, status: usize, body: &str) -> Mock {
        self.server
            .mock(method, Self::path(rest))
            .match_query(Matcher::UrlEncoded("key".into(), TEST_KEY.into()))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }
}

fn regex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

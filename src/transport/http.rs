use super::{classify, HttpRequest, HttpResponse, Method, StreamingResponse, Target, Transport};
use crate::config::ClientConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Proxy;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const REQUEST_ID_HEADER: &str = "x-genai-request-id";

/// [`Transport`] over a pooled `reqwest` client.
///
/// The API key is appended to every request as the `key` query parameter.
/// Non-streaming requests are bounded by the configured timeout; streaming
/// requests are bounded only while connecting.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    upload_url: Url,
    api_key: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut config = config.clone();
        config.validate()?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(config.pool_idle_timeout))
            .user_agent(config.user_agent.clone())
            .http2_adaptive_window(true)
            .http2_keep_alive_interval(Some(Duration::from_secs(30)))
            .http2_keep_alive_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            match Proxy::all(proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => warn!(proxy = proxy_url, error = %e, "ignoring invalid proxy url"),
            }
        }

        let client = builder
            .build()
            .map_err(|e| Error::configuration(format!("could not build HTTP client: {}", e)))?;

        let base_url = parse_url(&config.base_url, "base_url")?;
        let upload_url = parse_url(&config.upload_base_url, "upload_base_url")?;
        let api_key = config.api_key.unwrap_or_default();
        Ok(Self {
            client,
            base_url,
            upload_url,
            api_key,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, target: &Target) -> Result<Url> {
        match target {
            Target::Path(path) => {
                let relative = path.trim_start_matches('/');
                self.base_url
                    .join(&format!("./{}", relative))
                    .map_err(|e| Error::invalid_request(format!("bad endpoint path {:?}: {}", path, e)))
            }
            Target::Url(url) => Url::parse(url)
                .map_err(|e| Error::invalid_request(format!("bad URL {:?}: {}", url, e))),
            Target::UploadBase => Ok(self.upload_url.clone()),
        }
    }

    fn build(&self, request: HttpRequest, bounded: bool) -> Result<reqwest::RequestBuilder> {
        let mut url = self.resolve(&request.target)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &request.query {
                pairs.append_pair(k, v);
            }
            // Upload URLs handed out by the service already carry their own credentials.
            if !matches!(request.target, Target::Url(_)) {
                pairs.append_pair("key", &self.api_key);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut req = self
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, request.request_id.as_str());
        if bounded {
            req = req.timeout(self.timeout);
        }
        for (k, v) in &request.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        if let Some(ct) = &request.content_type {
            req = req.header(reqwest::header::CONTENT_TYPE, ct.as_str());
        }
        if let Some(body) = request.body {
            req = req.body(body);
        }
        Ok(req)
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("upload_url", &self.upload_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn parse_url(raw: &str, field: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::configuration(format!("{} {:?}: {}", field, raw, e)))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let req = self.build(request, true)?;
        let resp = req.send().await.map_err(classify::from_reqwest)?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(classify::from_reqwest)?;
        debug!(http_status = status, body_len = body.len(), "response read");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn send_streaming(&self, request: HttpRequest) -> Result<StreamingResponse> {
        let req = self.build(request, false)?;
        let resp = req.send().await.map_err(classify::from_reqwest)?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.bytes_stream().map_err(classify::from_reqwest);
        Ok(StreamingResponse {
            status,
            headers,
            body: Box::pin(body),
        })
    }
}

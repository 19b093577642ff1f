//! # Transport
//!
//! [`Transport`] is the raw HTTP exchange (implemented by [`HttpTransport`]
//! over a pooled `reqwest` client, and by test doubles). [`Api`] layers the
//! codec, the error mapper and the stream decoder on top of it and exposes the
//! typed `get`/`post`/`put`/`delete`/`post_stream` operations.
//!
//! No operation retries. A failed call returns exactly one mapped error.

pub mod classify;
pub mod http;
#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpTransport;

use crate::codec::{self, JSON_CONTENT_TYPE};
use crate::pipeline::{decode_stream, ControlledStream, JsonFrameCodec, ResponseStream};
use crate::{BoxStream, Error, ErrorContext, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, TryStreamExt};
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Path relative to the configured base URL, e.g. `models/x:generateContent`.
    Path(String),
    /// Absolute URL, e.g. an upload destination handed out by the service.
    Url(String),
    /// The configured upload endpoint.
    UploadBase,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Path(p) => f.write_str(p),
            Target::Url(u) => f.write_str(u.split('?').next().unwrap_or(u)),
            Target::UploadBase => f.write_str("<upload>"),
        }
    }
}

/// One outgoing request: opaque payload plus content type.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub target: Target,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub content_type: Option<String>,
    /// Correlation id sent as `x-genai-request-id`.
    pub request_id: String,
}

impl HttpRequest {
    pub fn new(method: Method, target: Target) -> Self {
        Self {
            method,
            target,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            content_type: None,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, Target::Path(path.into()))
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, Target::Path(path.into()))
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, Target::Path(path.into()))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, Target::Path(path.into()))
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Bytes, content_type: impl Into<String>) -> Self {
        self.body = Some(body);
        self.content_type = Some(content_type.into());
        self
    }

    /// Encode `value` as the JSON body.
    pub fn with_json<B: Serialize + ?Sized>(self, value: &B) -> Result<Self> {
        Ok(self.with_body(codec::encode(value)?, JSON_CONTENT_TYPE))
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// A response whose body is still arriving.
pub struct StreamingResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: BoxStream<'static, Bytes>,
}

impl fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Raw HTTP exchange.
///
/// Implementations return responses of any status; only failures to complete
/// the exchange (connect, timeout, aborted body) are errors, already mapped to
/// [`Error::Connection`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Send and return as soon as the status line and headers are in.
    ///
    /// The default reads the whole body and replays it as a single chunk.
    async fn send_streaming(&self, request: HttpRequest) -> Result<StreamingResponse> {
        let resp = self.send(request).await?;
        Ok(StreamingResponse {
            status: resp.status,
            headers: resp.headers,
            body: Box::pin(stream::once(async move { Ok(resp.body) })),
        })
    }
}

/// Typed operations over a shared [`Transport`].
///
/// Cheap to clone; every clone uses the same connection pool.
#[derive(Clone)]
pub struct Api {
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api").finish_non_exhaustive()
    }
}

impl Api {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Send `request`; non-2xx responses are read fully and mapped, and so is
    /// a 2xx whose body is an error envelope.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let endpoint = request.target.to_string();
        let request_id = request.request_id.clone();
        let method = request.method;
        let start = Instant::now();
        debug!(method = method.as_str(), endpoint = endpoint.as_str(), request_id = request_id.as_str(), "sending request");

        let context = ErrorContext::new()
            .with_endpoint(endpoint.clone())
            .with_request_id(request_id.clone());
        let resp = match self.transport.send(request).await {
            Ok(resp) => resp,
            Err(e) => {
                let e = e.with_context(context);
                log_failure(method, &endpoint, None, start, &e);
                return Err(e);
            }
        };

        if resp.is_success() {
            if let Some(e) = classify::in_band_error(&resp.body) {
                let e = e.with_context(context);
                log_failure(method, &endpoint, Some(resp.status), start, &e);
                return Err(e);
            }
            debug!(
                http_status = resp.status,
                endpoint = endpoint.as_str(),
                duration_ms = start.elapsed().as_millis() as u64,
                "request completed"
            );
            Ok(resp)
        } else {
            let e = classify::from_status(resp.status, &resp.headers, &resp.body)
                .with_context(context);
            log_failure(method, &endpoint, Some(resp.status), start, &e);
            Err(e)
        }
    }

    /// Send `request` and decode the 2xx body into `T`.
    pub async fn call<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let endpoint = request.target.to_string();
        let request_id = request.request_id.clone();
        let resp = self.execute(request).await?;
        codec::decode(&resp.body).map_err(|e| {
            e.with_context(
                ErrorContext::new()
                    .with_status_code(resp.status)
                    .with_endpoint(endpoint)
                    .with_request_id(request_id),
            )
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let mut request = HttpRequest::get(path);
        for (k, v) in query {
            request = request.with_query(*k, *v);
        }
        self.call(request).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(HttpRequest::post(path).with_json(body)?).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(HttpRequest::put(path).with_json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.call(HttpRequest::delete(path)).await
    }

    /// POST `body` and decode the response as a stream of `T` elements.
    ///
    /// Returns once the response headers are in. Both JSON-array and NDJSON
    /// framings are accepted. Dropping or cancelling the returned stream closes
    /// the connection.
    pub async fn post_stream<B, T>(&self, path: &str, body: &B) -> Result<ResponseStream<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Send + 'static,
    {
        self.execute_stream(HttpRequest::post(path).with_json(body)?, JsonFrameCodec::new())
            .await
    }

    /// Streaming counterpart of [`Api::execute`] with an explicit frame codec.
    pub async fn execute_stream<T>(
        &self,
        request: HttpRequest,
        frame_codec: JsonFrameCodec,
    ) -> Result<ResponseStream<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let endpoint = request.target.to_string();
        let request_id = request.request_id.clone();
        let method = request.method;
        let start = Instant::now();
        debug!(method = method.as_str(), endpoint = endpoint.as_str(), request_id = request_id.as_str(), "opening stream");

        let context = ErrorContext::new()
            .with_endpoint(endpoint.clone())
            .with_request_id(request_id.clone());
        let resp = match self.transport.send_streaming(request).await {
            Ok(resp) => resp,
            Err(e) => {
                let e = e.with_context(context);
                log_failure(method, &endpoint, None, start, &e);
                return Err(e);
            }
        };

        if !(200..300).contains(&resp.status) {
            let body: Vec<u8> = resp
                .body
                .try_fold(Vec::new(), |mut acc, chunk| async move {
                    acc.extend_from_slice(&chunk);
                    Ok(acc)
                })
                .await
                .map_err(|e| e.with_context(context.clone()))?;
            let e = classify::from_status(resp.status, &resp.headers, &body).with_context(context);
            log_failure(method, &endpoint, Some(resp.status), start, &e);
            return Err(e);
        }

        debug!(http_status = resp.status, endpoint = endpoint.as_str(), "stream open");
        let decoded = decode_stream::<T>(tag_errors(resp.body, context), frame_codec);
        Ok(ControlledStream::uncontrolled(decoded))
    }
}

/// Attach call context to errors raised while the body streams in.
fn tag_errors(body: BoxStream<'static, Bytes>, context: ErrorContext) -> BoxStream<'static, Bytes> {
    Box::pin(body.map_err(move |e| e.with_context(context.clone())))
}

fn log_failure(method: Method, endpoint: &str, status: Option<u16>, start: Instant, err: &Error) {
    info!(
        method = method.as_str(),
        http_status = status,
        error_kind = err.kind().name(),
        endpoint = endpoint,
        duration_ms = start.elapsed().as_millis() as u64,
        "genai request failed"
    );
}

//! Error mapping: HTTP status, service error bodies, connection failures and
//! safety blocks into the crate's closed error taxonomy.

use crate::types::GenerateContentResponse;
use crate::{Error, ErrorContext};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::time::Duration;

/// `{"error": {"code": 429, "message": "...", "status": "RESOURCE_EXHAUSTED"}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ServiceError,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

fn parse_service_error(body: &[u8]) -> Option<ServiceError> {
    serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error)
}

/// Map a non-success response. The body must already be fully read.
pub fn from_status(status: u16, headers: &HeaderMap, body: &[u8]) -> Error {
    let raw_body = String::from_utf8_lossy(body).into_owned();
    let service = parse_service_error(body);
    let service_status = service.as_ref().and_then(|s| s.status.clone());
    let message = service
        .and_then(|s| s.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback_message(status, &raw_body));

    let mut context = ErrorContext::new().with_status_code(status);
    if let Some(ref s) = service_status {
        context = context.with_service_status(s.clone());
    }

    // The canonical status in the body is more specific than the HTTP code for
    // auth and quota failures (e.g. a 400 carrying PERMISSION_DENIED).
    let class = match service_status.as_deref() {
        Some("UNAUTHENTICATED" | "PERMISSION_DENIED") => Class::Auth,
        Some("RESOURCE_EXHAUSTED") => Class::RateLimit,
        Some("INTERNAL" | "UNAVAILABLE") => Class::Model,
        _ => Class::from_status(status),
    };

    match class {
        Class::Auth => Error::Auth {
            status,
            message,
            raw_body,
            context,
        },
        Class::RateLimit => Error::RateLimit {
            message,
            retry_after: retry_after(headers),
            raw_body,
            context,
        },
        Class::InvalidRequest => Error::InvalidRequest {
            message,
            raw_body: Some(raw_body),
            context,
        },
        Class::Model => Error::Model {
            status,
            message,
            raw_body,
            context,
        },
        Class::Other => Error::Api {
            status,
            message,
            raw_body,
            context,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Auth,
    RateLimit,
    InvalidRequest,
    Model,
    Other,
}

impl Class {
    fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Class::Auth,
            429 => Class::RateLimit,
            400 | 404 | 409 | 413 | 422 => Class::InvalidRequest,
            500..=599 => Class::Model,
            _ => Class::Other,
        }
    }
}

fn fallback_message(status: u16, raw_body: &str) -> String {
    let reason = reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("unexpected status");
    let snippet: String = raw_body.trim().chars().take(200).collect();
    if snippet.is_empty() {
        reason.to_string()
    } else {
        format!("{}: {}", reason, snippet)
    }
}

/// Map an error envelope that arrived with a 2xx status, either as the whole
/// body or as one element of a stream.
///
/// Only an object whose sole key is `error` counts, so a failed long-running
/// operation (`{"name", "done", "error"}`) still decodes. `error.code` stands in
/// for the HTTP status; without a usable code the failure is treated as a 500.
pub fn in_band_error(body: &[u8]) -> Option<Error> {
    if !mentions_error_key(body) {
        return None;
    }
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let object = value.as_object().filter(|o| o.len() == 1)?;
    let service: ServiceError = serde_json::from_value(object.get("error")?.clone()).ok()?;
    let status = service
        .code
        .and_then(|c| u16::try_from(c).ok())
        .filter(|c| (400..600).contains(c))
        .unwrap_or(500);
    Some(from_status(status, &HeaderMap::new(), body).with_context(
        ErrorContext::new()
            .with_source("service")
            .with_details("error envelope in a success response"),
    ))
}

fn mentions_error_key(body: &[u8]) -> bool {
    body.windows(7).any(|w| w == b"\"error\"")
}

/// Parse `Retry-After: <seconds>`. The HTTP-date form is not used by the service.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get("retry-after")?.to_str().ok()?.trim();
    let secs: u64 = raw.parse().ok()?;
    Some(Duration::from_secs(secs))
}

/// Map a `reqwest` failure. Everything that reaches this point happened on the
/// wire (connect, TLS, timeout, aborted body), except request-building errors.
pub fn from_reqwest(err: reqwest::Error) -> Error {
    if err.is_builder() {
        return Error::invalid_request(format!("could not build HTTP request: {}", err))
            .with_context(ErrorContext::new().with_source("transport"));
    }
    let message = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "could not connect"
    } else if err.is_body() || err.is_decode() {
        "connection failed while reading response body"
    } else {
        "HTTP request failed"
    };
    let mut context = ErrorContext::new().with_source("transport");
    if let Some(url) = err.url() {
        context = context.with_endpoint(url.path().to_string());
    }
    Error::Connection {
        message: message.to_string(),
        source: Some(Box::new(err)),
        context,
    }
}

/// Turn a content-filtered 200 into `Error::Safety`.
pub fn check_safety(response: &GenerateContentResponse) -> Result<(), Error> {
    match response.safety_block() {
        Some(reason) => Err(Error::Safety {
            reason,
            raw_body: serde_json::to_string(response).ok(),
            context: ErrorContext::new().with_source("safety"),
        }),
        None => Ok(()),
    }
}

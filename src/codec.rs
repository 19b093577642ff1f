//! JSON codec between typed values and wire bytes.
//!
//! Decoding is lenient about additions: unknown fields are ignored so that new
//! server-side fields never break an older client. It is strict about what the
//! types require: malformed JSON or a missing required field is a
//! [`Error::Decode`] carrying the raw body.

use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Serialize a request value.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value).map(Bytes::from).map_err(|e| {
        // Only non-string map keys or a failing custom Serialize impl get here.
        Error::invalid_request(format!("request body is not representable as JSON: {}", e))
            .with_context(ErrorContext::new().with_source("codec"))
    })
}

/// Deserialize a response body.
///
/// An empty body is decoded as `{}` so that acknowledgement-only endpoints
/// (cancel, delete) can decode into types whose fields are all optional.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let trimmed = trim_ascii(body);
    let input: &[u8] = if trimmed.is_empty() { b"{}" } else { trimmed };
    serde_json::from_slice(input).map_err(|e| {
        Error::decode(String::from_utf8_lossy(body).into_owned(), e)
            .with_context(ErrorContext::new().with_source("codec"))
    })
}

/// Deserialize a value that has already been parsed into a JSON tree.
pub fn decode_value<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    // Render before consuming so the raw body survives for diagnostics.
    let raw = value.to_string();
    serde_json::from_value(value).map_err(|e| {
        Error::decode(raw, e).with_context(ErrorContext::new().with_source("codec"))
    })
}

/// Acknowledgement body for endpoints that return `{}` (or nothing).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct Empty {}

pub(crate) fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

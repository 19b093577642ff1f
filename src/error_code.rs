//! Stable error kinds: one per taxonomy member, with a code string and a retry hint.
//!
//! ## Code Categories
//!
//! | Prefix | Category  | Description                         |
//! |--------|-----------|-------------------------------------|
//! | E1xxx  | client    | The request itself was rejected     |
//! | E2xxx  | rate      | Rate limit and quota errors         |
//! | E3xxx  | server    | Service-side or connection failures |
//! | E4xxx  | protocol  | Response could not be understood    |
//!
//! ## Example
//!
//! ```rust
//! use genai_wire::error_code::ErrorKind;
//!
//! let kind = ErrorKind::RateLimit;
//! assert_eq!(kind.code(), "E2001");
//! assert!(kind.retryable());
//! assert_eq!(kind.category(), "rate");
//! ```

use std::fmt;

/// Kind of an [`Error`](crate::Error), stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// E1001: request rejected as malformed, or operation unsupported by the model
    InvalidRequest,
    /// E1002: invalid, expired, or missing API key
    Auth,
    /// E1003: output withheld by the content filter
    Safety,
    /// E1004: client could not be constructed
    Configuration,
    /// E2001: request rate or quota exceeded
    RateLimit,
    /// E3001: model or service failed while handling a valid request
    Model,
    /// E3002: transport-level failure (timeout, refused, DNS)
    Connection,
    /// E3009: any other non-success HTTP status
    Api,
    /// E4001: success status but the body could not be decoded
    Decode,
    /// E4002: resumable upload handshake failed
    Protocol,
}

impl ErrorKind {
    /// Returns the canonical code string (e.g., `"E1001"`).
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "E1001",
            Self::Auth => "E1002",
            Self::Safety => "E1003",
            Self::Configuration => "E1004",
            Self::RateLimit => "E2001",
            Self::Model => "E3001",
            Self::Connection => "E3002",
            Self::Api => "E3009",
            Self::Decode => "E4001",
            Self::Protocol => "E4002",
        }
    }

    /// Returns the snake_case name (e.g., `"rate_limit"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Auth => "auth",
            Self::Safety => "safety",
            Self::Configuration => "configuration",
            Self::RateLimit => "rate_limit",
            Self::Model => "model",
            Self::Connection => "connection",
            Self::Api => "api",
            Self::Decode => "decode",
            Self::Protocol => "protocol",
        }
    }

    /// Whether a caller retry has a chance of succeeding unchanged.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::Model | Self::Connection)
    }

    /// Returns the category (e.g., `"client"`, `"rate"`).
    pub fn category(&self) -> &'static str {
        match self.code().as_bytes().get(1) {
            Some(b'1') => "client",
            Some(b'2') => "rate",
            Some(b'3') => "server",
            _ => "protocol",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.name())
    }
}

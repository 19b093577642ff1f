use crate::error_code::ErrorKind;
use crate::upload::UploadPhase;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Boxed error used as the `cause` of decode and connection failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Where and how a call failed: status, correlation id, endpoint and service status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// HTTP status of the response that produced the error, if any.
    pub status_code: Option<u16>,
    /// Client-generated correlation id of the failed call.
    pub request_id: Option<String>,
    /// Canonical status string from the service error body (e.g. "RESOURCE_EXHAUSTED").
    pub service_status: Option<String>,
    /// Endpoint path or operation that failed (e.g. "models/x:generateContent").
    pub endpoint: Option<String>,
    /// Free-form note, e.g. which stream element failed.
    pub details: Option<String>,
    /// Component that raised the error (e.g. "transport", "upload").
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_service_status(mut self, status: impl Into<String>) -> Self {
        self.service_status = Some(status.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Fill every unset field of `self` from `other`.
    fn merge(&mut self, other: ErrorContext) {
        self.status_code = self.status_code.or(other.status_code);
        self.request_id = self.request_id.take().or(other.request_id);
        self.service_status = self.service_status.take().or(other.service_status);
        self.endpoint = self.endpoint.take().or(other.endpoint);
        self.details = self.details.take().or(other.details);
        self.source = self.source.take().or(other.source);
    }
}

/// Every failure that can cross the crate boundary.
///
/// The set is closed: HTTP statuses, connection failures, undecodable bodies,
/// safety blocks and upload handshake failures all map onto exactly one variant.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Connection error: {message}{context}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxError>,
        context: ErrorContext,
    },

    #[error("API error: HTTP {status}: {message}{context}")]
    Api {
        status: u16,
        message: String,
        raw_body: String,
        context: ErrorContext,
    },

    #[error("Decode error: {cause}{context}")]
    Decode {
        raw_body: String,
        cause: BoxError,
        context: ErrorContext,
    },

    #[error("Upload protocol error during {phase}: {message}")]
    Protocol {
        phase: UploadPhase,
        message: String,
        #[source]
        cause: Option<Box<Error>>,
    },

    #[error("Rate limited: {message}{context}")]
    RateLimit {
        message: String,
        retry_after: Option<Duration>,
        raw_body: String,
        context: ErrorContext,
    },

    #[error("Authentication failed (HTTP {status}): {message}{context}")]
    Auth {
        status: u16,
        message: String,
        raw_body: String,
        context: ErrorContext,
    },

    #[error("Invalid request: {message}{context}")]
    InvalidRequest {
        message: String,
        raw_body: Option<String>,
        context: ErrorContext,
    },

    #[error("Response blocked by safety filter: {reason}{context}")]
    Safety {
        reason: String,
        raw_body: Option<String>,
        context: ErrorContext,
    },

    #[error("Model error (HTTP {status}): {message}{context}")]
    Model {
        status: u16,
        message: String,
        raw_body: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Renders as ` [models/x:generateContent, request 1b4e.., UNAVAILABLE, via transport, ..]`,
/// or nothing when no field is set. The status code is left out; variants that
/// carry one print it themselves.
impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn sep(f: &mut fmt::Formatter<'_>, open: &mut bool) -> fmt::Result {
            f.write_str(if *open { ", " } else { " [" })?;
            *open = true;
            Ok(())
        }

        let mut open = false;
        if let Some(endpoint) = &self.endpoint {
            sep(f, &mut open)?;
            f.write_str(endpoint)?;
        }
        if let Some(id) = &self.request_id {
            sep(f, &mut open)?;
            write!(f, "request {}", id)?;
        }
        if let Some(status) = &self.service_status {
            sep(f, &mut open)?;
            f.write_str(status)?;
        }
        if let Some(source) = &self.source {
            sep(f, &mut open)?;
            write!(f, "via {}", source)?;
        }
        if let Some(details) = &self.details {
            sep(f, &mut open)?;
            f.write_str(details)?;
        }
        if open {
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl Error {
    /// A connection-level failure (timeout, refused, DNS, aborted body).
    pub fn connection(msg: impl Into<String>, source: Option<BoxError>) -> Self {
        Error::Connection {
            message: msg.into(),
            source,
            context: ErrorContext::new(),
        }
    }

    /// A 2xx body that could not be understood.
    pub fn decode(raw_body: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Error::Decode {
            raw_body: raw_body.into(),
            cause: cause.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn protocol(phase: UploadPhase, msg: impl Into<String>) -> Self {
        Error::Protocol {
            phase,
            message: msg.into(),
            cause: None,
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Error::InvalidRequest {
            message: msg.into(),
            raw_body: None,
            context: ErrorContext::new(),
        }
    }

    pub fn safety(reason: impl Into<String>) -> Self {
        Error::Safety {
            reason: reason.into(),
            raw_body: None,
            context: ErrorContext::new(),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration {
            message: msg.into(),
        }
    }

    /// Wrap this error as the cause of a failed upload phase.
    ///
    /// Protocol errors pass through unchanged so the innermost phase wins.
    pub fn in_phase(self, phase: UploadPhase, msg: impl Into<String>) -> Self {
        match self {
            err @ Error::Protocol { .. } => err,
            other => Error::Protocol {
                phase,
                message: msg.into(),
                cause: Some(Box::new(other)),
            },
        }
    }

    /// Attach structured context; fields already set on the error are kept.
    pub fn with_context(mut self, extra: ErrorContext) -> Self {
        if let Some(ctx) = self.context_mut() {
            ctx.merge(extra);
        }
        self
    }

    fn context_mut(&mut self) -> Option<&mut ErrorContext> {
        match self {
            Error::Connection { context, .. }
            | Error::Api { context, .. }
            | Error::Decode { context, .. }
            | Error::RateLimit { context, .. }
            | Error::Auth { context, .. }
            | Error::InvalidRequest { context, .. }
            | Error::Safety { context, .. }
            | Error::Model { context, .. } => Some(context),
            Error::Protocol { .. } | Error::Configuration { .. } => None,
        }
    }

    /// Call context; for protocol errors, the context of the wrapped cause.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Connection { context, .. }
            | Error::Api { context, .. }
            | Error::Decode { context, .. }
            | Error::RateLimit { context, .. }
            | Error::Auth { context, .. }
            | Error::InvalidRequest { context, .. }
            | Error::Safety { context, .. }
            | Error::Model { context, .. } => Some(context),
            Error::Protocol { cause, .. } => cause.as_deref().and_then(Error::context),
            Error::Configuration { .. } => None,
        }
    }

    /// The taxonomy member of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection { .. } => ErrorKind::Connection,
            Error::Api { .. } => ErrorKind::Api,
            Error::Decode { .. } => ErrorKind::Decode,
            Error::Protocol { .. } => ErrorKind::Protocol,
            Error::RateLimit { .. } => ErrorKind::RateLimit,
            Error::Auth { .. } => ErrorKind::Auth,
            Error::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Error::Safety { .. } => ErrorKind::Safety,
            Error::Model { .. } => ErrorKind::Model,
            Error::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// HTTP status that produced this error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } | Error::Auth { status, .. } | Error::Model { status, .. } => {
                Some(*status)
            }
            other => other.context().and_then(|c| c.status_code),
        }
    }

    /// Raw response body kept for diagnostics.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Error::Api { raw_body, .. }
            | Error::Decode { raw_body, .. }
            | Error::RateLimit { raw_body, .. }
            | Error::Auth { raw_body, .. }
            | Error::Model { raw_body, .. } => Some(raw_body.as_str()),
            Error::InvalidRequest { raw_body, .. } | Error::Safety { raw_body, .. } => {
                raw_body.as_deref()
            }
            Error::Protocol { cause, .. } => cause.as_deref().and_then(Error::raw_body),
            Error::Connection { .. } | Error::Configuration { .. } => None,
        }
    }

    /// Upload phase for protocol errors.
    pub fn phase(&self) -> Option<UploadPhase> {
        match self {
            Error::Protocol { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Server-suggested wait before trying again (429 only).
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Whether a caller-side retry policy may reasonably try again.
    ///
    /// This is a fact about the failure class; the crate itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Protocol { cause, .. } => cause.as_deref().map_or(false, Error::is_retryable),
            other => other.kind().retryable(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Connection {
            message: err.to_string(),
            source: Some(Box::new(err)),
            context: ErrorContext::new().with_source("io"),
        }
    }
}

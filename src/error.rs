//! Error type for fetchkit.
//!
//! Provides [`Error`] with classification queries:
//! [`is_builder()`](Error::is_builder), [`is_middleware()`](Error::is_middleware),
//! [`is_request()`](Error::is_request), [`is_abort()`](Error::is_abort),
//! [`is_status()`](Error::is_status), [`is_body()`](Error::is_body),
//! [`is_decode()`](Error::is_decode) and
//! [`is_unsupported_content_type()`](Error::is_unsupported_content_type),
//! plus the two lifecycle flags [`is_create_request()`](Error::is_create_request)
//! and [`is_send_request()`](Error::is_send_request).

use crate::request::Request;
use crate::response::ResponseHead;
use http::StatusCode;
use std::fmt;

/// A boxed, thread-safe error, as produced by a [`Fetch`](crate::Fetch)
/// implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type for fetchkit operations.
///
/// Every failure is scoped to the one `send()` call that produced it. Errors
/// carry a `kind` classification, the original cause (reachable through
/// [`std::error::Error::source`]), and whatever request/response context was
/// available when the failure happened.
///
/// The two lifecycle flags separate configuration bugs from
/// network/server failures without inspecting messages:
///
/// | Failure                              | `is_create_request` | `is_send_request` |
/// |--------------------------------------|---------------------|-------------------|
/// | Invalid config (body + GET, bad URL) | `false`             | `false`           |
/// | Pre-send middleware failed           | `true`              | `false`           |
/// | Fetch primitive failed / aborted     | `true`              | `true`            |
/// | Response middleware failed           | `true`              | `true`            |
pub struct Error {
    pub(crate) kind: ErrorKind,
    pub(crate) message: String,
    pub(crate) source: Option<BoxError>,
    pub(crate) request: Option<Box<Request>>,
    pub(crate) response: Option<Box<ResponseHead>>,
    pub(crate) sent: bool,
}

/// Classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// Invalid request construction (e.g. a body on a GET request).
    Builder,
    /// A middleware stage failed.
    Middleware,
    /// The fetch primitive failed (network unreachable, DNS, TLS, ...).
    Request,
    /// The request's abort signal fired.
    Abort,
    /// Non-2xx status, produced only by opt-in response middleware.
    Status,
    /// Reading the response body failed.
    Body,
    /// Decoding the response body failed, or there was no body to decode.
    Decode,
    /// `ResponseWrapper::auto()` met a content type it cannot dispatch.
    ContentType,
}

impl Error {
    /// Returns `true` if the request could not be constructed from its
    /// configuration.
    pub fn is_builder(&self) -> bool {
        matches!(self.kind, ErrorKind::Builder)
    }

    /// Returns `true` if a middleware stage reported the failure.
    pub fn is_middleware(&self) -> bool {
        matches!(self.kind, ErrorKind::Middleware)
    }

    /// Returns `true` if the fetch primitive itself failed.
    pub fn is_request(&self) -> bool {
        matches!(self.kind, ErrorKind::Request)
    }

    /// Returns `true` if the request was cancelled through its
    /// [`AbortSignal`](crate::AbortSignal).
    pub fn is_abort(&self) -> bool {
        matches!(self.kind, ErrorKind::Abort)
    }

    /// Returns `true` if this error was produced by
    /// [`middleware::error_for_status`](crate::middleware::error_for_status).
    pub fn is_status(&self) -> bool {
        matches!(self.kind, ErrorKind::Status)
    }

    /// Returns `true` if reading the response body failed.
    pub fn is_body(&self) -> bool {
        matches!(self.kind, ErrorKind::Body)
    }

    /// Returns `true` if the response body could not be decoded, or there
    /// was no body left to decode.
    pub fn is_decode(&self) -> bool {
        matches!(self.kind, ErrorKind::Decode)
    }

    /// Returns `true` if [`ResponseWrapper::auto`](crate::ResponseWrapper::auto)
    /// did not recognise the response content type.
    pub fn is_unsupported_content_type(&self) -> bool {
        matches!(self.kind, ErrorKind::ContentType)
    }

    /// Returns `true` if a request object was constructed before the
    /// failure.
    pub fn is_create_request(&self) -> bool {
        self.request.is_some()
    }

    /// Returns `true` if the fetch primitive was invoked before the
    /// failure.
    pub fn is_send_request(&self) -> bool {
        self.sent
    }

    /// Returns the request that was being processed, if one was built.
    pub fn request(&self) -> Option<&Request> {
        self.request.as_deref()
    }

    /// Returns the head of the response that was received, if any.
    ///
    /// Transport failures never carry a response.
    pub fn response(&self) -> Option<&ResponseHead> {
        self.response.as_deref()
    }

    /// Returns the HTTP status of the attached response, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(|head| head.status)
    }

    /// Returns the URL associated with this error, if known.
    ///
    /// Prefers the request URL; falls back to the response URL.
    pub fn url(&self) -> Option<&str> {
        self.request
            .as_ref()
            .map(|req| req.url())
            .or_else(|| self.response.as_ref().map(|head| head.url.as_str()))
    }

    /// Returns the human-readable detail message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create an error to report a failed middleware stage.
    ///
    /// Middleware stages return this (optionally with
    /// [`with_source`](Self::with_source)) to abort the pipeline.
    pub fn middleware(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Middleware, msg)
    }

    /// Attach a source error (builder pattern).
    ///
    /// Stores the underlying cause so that [`std::error::Error::source`]
    /// returns it.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    // -- Internal constructors --

    /// Shared constructor for simple error kinds.
    fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            source: None,
            request: None,
            response: None,
            sent: false,
        }
    }

    /// Create a construction error.
    pub(crate) fn builder(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Builder, msg)
    }

    /// Create a transport error.
    pub(crate) fn request_failed(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Request, msg)
    }

    /// Create an abort error.
    pub(crate) fn aborted() -> Self {
        Self::with_kind(ErrorKind::Abort, "the request was aborted")
    }

    /// Create a body-reading error.
    pub(crate) fn body(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Body, msg)
    }

    /// Create a decode error.
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Decode, msg)
    }

    /// Create an unsupported-content-type error.
    ///
    /// `content_type` is the offending header value (empty if absent).
    pub(crate) fn unsupported_content_type(content_type: &str) -> Self {
        let shown = if content_type.is_empty() {
            "<none>"
        } else {
            content_type
        };
        Self::with_kind(ErrorKind::ContentType, shown)
    }

    /// Create a status error for a non-2xx response.
    ///
    /// `detail` is the server-provided explanation, if one was found.
    pub(crate) fn status_error(head: ResponseHead, detail: Option<&str>) -> Self {
        let code = head.status;
        let prefix = if code.is_client_error() {
            "HTTP status client error"
        } else if code.is_server_error() {
            "HTTP status server error"
        } else {
            "HTTP status not ok"
        };
        let reason = code.canonical_reason().unwrap_or("<unknown status code>");
        let mut message = format!("{prefix} ({} {reason})", code.as_str());
        if let Some(detail) = detail.map(str::trim).filter(|d| !d.is_empty()) {
            message.push_str(": ");
            message.push_str(detail);
        }
        let mut err = Self::with_kind(ErrorKind::Status, message);
        err.response = Some(Box::new(head));
        err
    }

    /// Classify an error returned by the fetch primitive.
    ///
    /// A fetch implementation that already returned a fetchkit [`Error`]
    /// (e.g. an abort) keeps its classification; anything else becomes a
    /// transport error with the original cause as its source.
    pub(crate) fn from_fetch(err: BoxError) -> Self {
        match err.downcast::<Error>() {
            Ok(inner) => *inner,
            Err(other) => Self::request_failed(other.to_string()).with_source(other),
        }
    }

    /// Attach the request being processed, unless one is already attached.
    #[must_use]
    pub(crate) fn with_request(mut self, request: Request) -> Self {
        if self.request.is_none() {
            self.request = Some(Box::new(request));
        }
        self
    }

    /// Attach the received response head, unless one is already attached.
    #[must_use]
    pub(crate) fn with_response(mut self, head: ResponseHead) -> Self {
        if self.response.is_none() {
            self.response = Some(Box::new(head));
        }
        self
    }

    /// Split into the message and the original cause.
    pub(crate) fn into_message_and_source(self) -> (String, Option<BoxError>) {
        (self.message, self.source)
    }

    /// Record that the fetch primitive was invoked.
    #[must_use]
    pub(crate) fn mark_sent(mut self) -> Self {
        self.sent = true;
        self
    }
}

impl fmt::Display for Error {
    /// A kind-based prefix, then ` for url (...)` when the URL is known.
    /// The source error detail is available via
    /// [`std::error::Error::source`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Builder => write!(f, "builder error: {}", self.message)?,
            ErrorKind::Middleware => write!(f, "middleware error: {}", self.message)?,
            ErrorKind::Request => f.write_str("error sending request")?,
            ErrorKind::Abort => f.write_str("request aborted")?,
            ErrorKind::Status => f.write_str(&self.message)?,
            ErrorKind::Body => f.write_str("response body error")?,
            ErrorKind::Decode => f.write_str("error decoding response body")?,
            ErrorKind::ContentType => write!(f, "unsupported content type ({})", self.message)?,
        }
        if let Some(url) = self.url() {
            write!(f, " for url ({url})")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("url", &self.url())
            .field("status", &self.status())
            .field("sent", &self.sent)
            .field("source", &self.source)
            .finish()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| &**e as &(dyn std::error::Error + 'static))
    }
}

// Error crosses await points and task boundaries.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
};

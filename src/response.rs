//! HTTP response.
//!
//! [`Response`] is what a [`Fetch`](crate::Fetch) primitive hands back: a
//! status line, headers, and a body that is either already buffered or still
//! arriving as a stream. The body can be read once, via
//! [`chunk()`](Response::chunk), [`bytes()`](Response::bytes),
//! [`text()`](Response::text) or [`json()`](Response::json).
//!
//! [`ResponseHead`] is the body-less part, cheap to clone and safe to attach
//! to an [`Error`].

use crate::error::{BoxError, Error};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use http::{StatusCode, Version};
use std::pin::Pin;

/// Boxed stream type used for streaming response bodies.
pub type BoxStream = Pin<Box<dyn futures_core::Stream<Item = Result<Bytes, BoxError>> + Send>>;

enum ResponseBody {
    Buffered(Bytes),
    Stream(BoxStream),
}

// ---------------------------------------------------------------------------
// ResponseHead
// ---------------------------------------------------------------------------

/// Status line and headers of a response, without its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// Status code.
    pub status: StatusCode,
    /// HTTP version.
    pub version: Version,
    /// Final URL, after any redirects the fetch primitive followed.
    pub url: String,
    /// Response headers.
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Returns `true` for a 2xx status.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// An HTTP response produced by the fetch primitive.
///
/// # Example
///
/// ```rust
/// use fetchkit::Response;
/// use http::StatusCode;
///
/// # async fn demo() -> fetchkit::Result<()> {
/// let mut resp = Response::new(StatusCode::OK, "hello")
///     .with_url("https://example.com/");
/// assert!(resp.ok());
/// assert_eq!(resp.text().await?, "hello");
/// assert!(resp.text().await.unwrap_err().is_decode());
/// # Ok(())
/// # }
/// ```
pub struct Response {
    status: StatusCode,
    version: Version,
    url: String,
    headers: HeaderMap,
    /// `None` once the body has been consumed.
    body: Option<ResponseBody>,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl Response {
    /// Create a response with a buffered body.
    ///
    /// Version defaults to HTTP/1.1; URL and headers start empty.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            version: Version::HTTP_11,
            url: String::new(),
            headers: HeaderMap::new(),
            body: Some(ResponseBody::Buffered(body.into())),
        }
    }

    /// Create a response whose body arrives as a stream.
    pub fn from_stream<S, O, E>(status: StatusCode, stream: S) -> Self
    where
        S: futures_core::Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<BoxError> + 'static,
    {
        let mapped = stream.map(|result| result.map(Into::into).map_err(Into::into));
        Self {
            status,
            version: Version::HTTP_11,
            url: String::new(),
            headers: HeaderMap::new(),
            body: Some(ResponseBody::Stream(Box::pin(mapped))),
        }
    }

    /// Set the final URL (builder pattern).
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the HTTP version (builder pattern).
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Replace the headers (builder pattern).
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns `true` for a 2xx status.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Get the HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get the final URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to the response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The `Content-Type` header, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE)?.to_str().ok()
    }

    /// The `Content-Length` header, parsed.
    pub fn content_length(&self) -> Option<u64> {
        self.headers.get(CONTENT_LENGTH)?.to_str().ok()?.parse().ok()
    }

    /// Returns `true` once the body has been read to completion or taken.
    pub fn is_consumed(&self) -> bool {
        self.body.is_none()
    }

    /// Snapshot of the status line and headers.
    pub fn head(&self) -> ResponseHead {
        ResponseHead {
            status: self.status,
            version: self.version,
            url: self.url.clone(),
            headers: self.headers.clone(),
        }
    }

    /// Read the next chunk of the body.
    ///
    /// Returns `Ok(None)` at EOF, after which the body counts as consumed.
    ///
    /// # Errors
    ///
    /// A decode error if the body was already consumed; a body error if the
    /// underlying stream failed.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self.body.take() {
            None => Err(self.consumed_error()),
            Some(ResponseBody::Buffered(bytes)) => {
                // EOF
                if bytes.is_empty() {
                    return Ok(None);
                }
                self.body = Some(ResponseBody::Buffered(Bytes::new()));
                Ok(Some(bytes))
            }
            Some(ResponseBody::Stream(mut stream)) => match stream.next().await {
                Some(Ok(bytes)) => {
                    self.body = Some(ResponseBody::Stream(stream));
                    Ok(Some(bytes))
                }
                Some(Err(e)) => Err(Error::body("response body stream failed")
                    .with_source(e)
                    .with_response(self.head())),
                None => Ok(None),
            },
        }
    }

    /// Read the entire body as raw bytes.
    ///
    /// # Errors
    ///
    /// A decode error if the body was already consumed; a body error if the
    /// underlying stream failed.
    pub async fn bytes(&mut self) -> Result<Bytes, Error> {
        match self.body.take() {
            None => Err(self.consumed_error()),
            Some(ResponseBody::Buffered(bytes)) => Ok(bytes),
            Some(ResponseBody::Stream(mut stream)) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(|e| {
                        Error::body("response body stream failed")
                            .with_source(e)
                            .with_response(self.head())
                    })?;
                    buf.extend_from_slice(&chunk);
                }
                trace!(len = buf.len(), "response body collected");
                Ok(buf.freeze())
            }
        }
    }

    /// Read the entire body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// As [`bytes()`](Self::bytes), plus a decode error for invalid UTF-8.
    pub async fn text(&mut self) -> Result<String, Error> {
        let data = self.bytes().await?;
        String::from_utf8(data.to_vec()).map_err(|e| {
            Error::decode("response body is not valid UTF-8")
                .with_source(e)
                .with_response(self.head())
        })
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// As [`bytes()`](Self::bytes), plus a decode error for invalid JSON.
    pub async fn json<T: serde::de::DeserializeOwned>(&mut self) -> Result<T, Error> {
        let data = self.bytes().await?;
        serde_json::from_slice(&data).map_err(|e| {
            Error::decode("JSON deserialization failed")
                .with_source(e)
                .with_response(self.head())
        })
    }

    fn consumed_error(&self) -> Error {
        Error::decode("response body already consumed").with_response(self.head())
    }
}

impl<B: Into<Bytes>> From<http::Response<B>> for Response {
    fn from(resp: http::Response<B>) -> Self {
        let (parts, body) = resp.into_parts();
        Response::new(parts.status, body)
            .with_version(parts.version)
            .with_headers(parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[tokio::test]
    async fn buffered_body_reads_once() {
        let mut resp = Response::new(StatusCode::OK, "payload");
        assert!(!resp.is_consumed());
        assert_eq!(resp.bytes().await.unwrap(), Bytes::from_static(b"payload"));
        assert!(resp.is_consumed());
        let err = resp.text().await.unwrap_err();
        assert!(err.is_decode());
        assert_eq!(err.status(), Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn stream_body_collects_chunks() {
        let chunks = vec![Ok::<_, std::io::Error>("hel"), Ok("lo")];
        let mut resp = Response::from_stream(StatusCode::OK, stream::iter(chunks));
        assert_eq!(resp.text().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn stream_error_is_body_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("reset")),
        ];
        let mut resp = Response::from_stream(StatusCode::OK, stream::iter(chunks))
            .with_url("https://example.com/s");
        let err = resp.bytes().await.unwrap_err();
        assert!(err.is_body());
        assert_eq!(err.url(), Some("https://example.com/s"));
    }

    #[tokio::test]
    async fn chunk_then_eof() {
        let mut resp = Response::from_stream(
            StatusCode::OK,
            stream::iter(vec![Ok::<_, std::io::Error>("a"), Ok("b")]),
        );
        assert_eq!(resp.chunk().await.unwrap(), Some(Bytes::from_static(b"a")));
        assert_eq!(resp.chunk().await.unwrap(), Some(Bytes::from_static(b"b")));
        assert_eq!(resp.chunk().await.unwrap(), None);
        assert!(resp.is_consumed());
        assert!(resp.chunk().await.unwrap_err().is_decode());

        let mut buffered = Response::new(StatusCode::OK, "x");
        assert_eq!(buffered.chunk().await.unwrap(), Some(Bytes::from_static(b"x")));
        assert_eq!(buffered.chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn decode_failures() {
        // (body, label)
        let cases: &[(&[u8], &str)] = &[(b"\xff\xfe", "invalid utf-8"), (b"{not json", "invalid json")];
        for &(body, label) in cases {
            let mut resp = Response::new(StatusCode::OK, body);
            let err = resp.json::<serde_json::Value>().await.unwrap_err();
            assert!(err.is_decode(), "{label}");
        }
        let mut resp = Response::new(StatusCode::OK, &b"\xff"[..]);
        assert!(resp.text().await.unwrap_err().is_decode());
    }

    #[test]
    fn from_http_response() {
        let http_resp = http::Response::builder()
            .status(StatusCode::CREATED)
            .version(Version::HTTP_2)
            .header("content-type", "application/json")
            .header("content-length", "2")
            .body("{}")
            .unwrap();
        let resp = Response::from(http_resp);
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.version(), Version::HTTP_2);
        assert_eq!(resp.content_type(), Some("application/json"));
        assert_eq!(resp.content_length(), Some(2));
        assert!(resp.head().ok());
    }

    #[test]
    fn ok_covers_2xx_only() {
        // (status, ok)
        let cases = [
            (StatusCode::OK, true),
            (StatusCode::NO_CONTENT, true),
            (StatusCode::MOVED_PERMANENTLY, false),
            (StatusCode::NOT_FOUND, false),
            (StatusCode::INTERNAL_SERVER_ERROR, false),
        ];
        for (status, ok) in cases {
            assert_eq!(Response::new(status, Bytes::new()).ok(), ok, "{status}");
        }
    }
}

//! Send result.
//!
//! [`ResponseWrapper`] pairs the request that was finally sent with the
//! response the fetch primitive returned. It is created fresh by every send.

use crate::config::RequestConfig;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use http::{HeaderMap, StatusCode};

/// The successful outcome of [`RequestBuilder::send`](crate::RequestBuilder::send).
///
/// A non-2xx status still produces a wrapper; check [`ok()`](Self::ok) or
/// install [`middleware::error_for_status`](crate::middleware::error_for_status).
#[derive(Debug)]
pub struct ResponseWrapper {
    request: Request,
    response: Option<Response>,
}

impl ResponseWrapper {
    pub(crate) fn new(request: Request, response: Option<Response>) -> Self {
        Self { request, response }
    }

    /// The request as it was handed to the fetch primitive, after pre-send
    /// middleware.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The raw response, if one was received.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Mutable access to the raw response.
    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_mut()
    }

    /// Take the raw response out of the wrapper.
    pub fn into_response(self) -> Option<Response> {
        self.response
    }

    /// The configuration of the sent request, after pre-send middleware.
    pub fn config(&self) -> &RequestConfig {
        self.request.config()
    }

    /// Returns `true` if a response was received and its status is 2xx.
    pub fn ok(&self) -> bool {
        self.response.as_ref().is_some_and(Response::ok)
    }

    /// The response status, if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(Response::status)
    }

    /// The response headers, if a response was received.
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.response.as_ref().map(Response::headers)
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// A decode error if there is no response, the body was already read,
    /// or it is not valid JSON for `T`.
    pub async fn json<T: serde::de::DeserializeOwned>(&mut self) -> Result<T, Error> {
        let resp = self.readable()?;
        let result = resp.json().await;
        result.map_err(|e| self.context(e))
    }

    /// Read the body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// A decode error if there is no response, the body was already read,
    /// or it is not valid UTF-8.
    pub async fn text(&mut self) -> Result<String, Error> {
        let resp = self.readable()?;
        let result = resp.text().await;
        result.map_err(|e| self.context(e))
    }

    /// Read the body as raw bytes.
    ///
    /// # Errors
    ///
    /// A decode error if there is no response or the body was already read.
    pub async fn bytes(&mut self) -> Result<bytes::Bytes, Error> {
        let resp = self.readable()?;
        let result = resp.bytes().await;
        result.map_err(|e| self.context(e))
    }

    /// Parse the body according to its `Content-Type`.
    ///
    /// `application/json` and any `+json` type are parsed as JSON. Every
    /// other type, or a missing header, fails with
    /// [`Error::is_unsupported_content_type`] and leaves the body unread.
    ///
    /// # Errors
    ///
    /// An unsupported-content-type error as above, or any error from
    /// [`json()`](Self::json).
    pub async fn auto(&mut self) -> Result<serde_json::Value, Error> {
        let resp = self.readable()?;
        let content_type = resp.content_type().unwrap_or_default();
        if !is_json(content_type) {
            debug!(content_type = content_type, "auto() cannot dispatch content type");
            let err = Error::unsupported_content_type(content_type).with_response(resp.head());
            return Err(self.context(err));
        }
        self.json().await
    }

    fn readable(&mut self) -> Result<&mut Response, Error> {
        match self.response.as_mut() {
            Some(resp) => Ok(resp),
            None => Err(Error::decode("no response to read").with_request(self.request.clone())),
        }
    }

    /// Attach the request to an error raised after the fetch.
    fn context(&self, err: Error) -> Error {
        err.with_request(self.request.clone()).mark_sent()
    }
}

/// `application/json`, or any `type/subtype+json`, parameters ignored.
fn is_json(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.contains('/') && essence.ends_with("+json"))
}

//! Request and request builder.
//!
//! [`RequestBuilder`] is an immutable description of a request: one
//! [`RequestUrl`], one [`RequestConfig`] and four middleware chains. Every
//! setter returns a new builder and leaves the receiver untouched, so a
//! builder can serve as a template for any number of derived requests.
//!
//! [`Request`] is the concrete value a builder produces: a serialized URL
//! plus the merged configuration. It is what pre-send middleware transforms
//! and what the [`Fetch`](crate::Fetch) primitive receives.

use crate::body::{APPLICATION_JSON, Body};
use crate::client::Client;
use crate::config::{RequestConfig, RequestOverride, normalize_method};
use crate::error::Error;
use crate::middleware::{Middleware, Pipeline, Pipelines};
use crate::record::{HeaderMerge, HeadersInit, ParamsInit, QueryInit};
use crate::signal::AbortSignal;
use crate::url::{RequestUrl, UrlParts};
use crate::wrapper::ResponseWrapper;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use http::Method;
use std::sync::Arc;

// The future returned by `RequestBuilder::send()` must be Send so callers can
// use it in multi-threaded executors (e.g., tokio).
fn _assert_send_future(rb: RequestBuilder) {
    fn require_send<T: Send>(_t: &T) {}
    let fut = rb.send();
    require_send(&fut);
    let fut = rb.dispatch();
    require_send(&fut);
}

// ---------------------------------------------------------------------------
// Request -- a fully-built request
// ---------------------------------------------------------------------------

/// A fully-built request.
///
/// Created via [`RequestBuilder::build()`]. Its configuration always
/// satisfies the body rule: the setters here reject a body on `GET`/`HEAD`
/// just like the builder does.
#[derive(Debug, Clone)]
pub struct Request {
    url: String,
    config: RequestConfig,
}

impl Request {
    /// Create a request from a URL and a configuration.
    pub fn new(url: String, config: RequestConfig) -> Self {
        Self { url, config }
    }

    /// Returns the serialized URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replace the URL.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        self.config.method()
    }

    /// Change the method.
    ///
    /// # Errors
    ///
    /// Fails with a builder error when switching to `GET`/`HEAD` while a
    /// body is set.
    pub fn set_method(&mut self, method: Method) -> Result<(), Error> {
        self.config.set_method(method)
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        self.config.headers()
    }

    /// Returns a mutable reference to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.config.headers_mut()
    }

    /// Returns the request body.
    pub fn body(&self) -> &Body {
        self.config.body()
    }

    /// Replace the body.
    ///
    /// # Errors
    ///
    /// Fails with a builder error on a `GET`/`HEAD` request.
    pub fn set_body(&mut self, body: impl Into<Body>) -> Result<(), Error> {
        self.config.set_body(body.into())
    }

    /// Returns the abort signal, if any.
    pub fn signal(&self) -> Option<&AbortSignal> {
        self.config.signal()
    }

    /// Returns the full configuration.
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Split into URL and configuration.
    pub fn into_parts(self) -> (String, RequestConfig) {
        (self.url, self.config)
    }
}

// ---------------------------------------------------------------------------
// RequestBuilder
// ---------------------------------------------------------------------------

/// A copy-on-write request builder.
///
/// Created via [`Client::get()`](crate::Client::get) and friends, or
/// [`Client::from_request()`](crate::Client::from_request). Each setter
/// takes `&self` and returns a fresh builder; the receiver never changes.
///
/// # Example
///
/// ```rust
/// use fetchkit::{fetch_fn, Client, Response};
/// use http::StatusCode;
///
/// let client = Client::new(fetch_fn(|_req| async { Ok(Response::new(StatusCode::OK, "")) }));
/// let users = client.get("https://api.example.com/users/:id");
/// let alice = users.set_params([("id", "alice")]);
/// let bob = users.set_params([("id", "bob")]).append_query([("expand", "teams")]);
///
/// assert_eq!(users.url().to_string(), "https://api.example.com/users/:id");
/// assert_eq!(alice.url().to_string(), "https://api.example.com/users/alice");
/// assert_eq!(bob.url().to_string(), "https://api.example.com/users/bob?expand=teams");
/// ```
#[derive(Clone)]
pub struct RequestBuilder {
    client: Client,
    url: RequestUrl,
    config: RequestConfig,
    pipelines: Pipelines,
    /// First invalid header input, reported by `build`/`send`.
    deferred: Option<DeferredError>,
}

/// A header failure held until the builder is built. The cause is shared so
/// that every build reports it as its source.
#[derive(Clone)]
struct DeferredError {
    message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl DeferredError {
    fn new(err: Error) -> Self {
        let (message, source) = err.into_message_and_source();
        Self {
            message,
            source: source.map(Arc::from),
        }
    }

    fn to_error(&self) -> Error {
        let err = Error::builder(self.message.clone());
        match &self.source {
            Some(source) => err.with_source(Arc::clone(source)),
            None => err,
        }
    }
}

impl std::fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("method", self.config.method())
            .field("url", &self.url.to_string())
            .field("pipelines", &self.pipelines)
            .finish_non_exhaustive()
    }
}

impl From<&RequestBuilder> for RequestBuilder {
    fn from(builder: &RequestBuilder) -> Self {
        builder.clone()
    }
}

impl RequestBuilder {
    /// Create a builder for `method` and `url`, seeded from the client's
    /// base URL, default headers and middleware.
    pub(crate) fn new(client: Client, method: Method, url: &str) -> Self {
        let mut location = RequestUrl::default();
        if let Some(base) = &client.inner.base_url {
            location = location.set_base_url(base.as_str());
        }
        let url = location.resolve(url);

        let mut config = RequestConfig::for_method(method);
        config
            .headers_mut()
            .extend(client.inner.default_headers.clone());
        let pipelines = client.inner.pipelines.clone();

        Self {
            client,
            url,
            config,
            pipelines,
            deferred: None,
        }
    }

    /// Create a builder from a built [`Request`].
    ///
    /// The URL model is parsed from the request URL; the configuration is
    /// taken over unchanged. The client's middleware is attached as usual.
    pub fn from_request(client: Client, request: Request) -> Self {
        let (url, config) = request.into_parts();
        let pipelines = client.inner.pipelines.clone();
        Self {
            client,
            url: RequestUrl::parse(&url),
            config,
            pipelines,
            deferred: None,
        }
    }

    // -- accessors --

    /// The client this builder sends through.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The URL model.
    pub fn url(&self) -> &RequestUrl {
        &self.url
    }

    /// The request configuration.
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// The four middleware chains.
    pub fn pipelines(&self) -> &Pipelines {
        &self.pipelines
    }

    // -- derivation helpers --

    fn with_url(&self, f: impl FnOnce(RequestUrl) -> RequestUrl) -> Self {
        let mut next = self.clone();
        next.url = f(next.url);
        next
    }

    fn with_pipelines(&self, f: impl FnOnce(&mut Pipelines)) -> Self {
        let mut next = self.clone();
        f(&mut next.pipelines);
        next
    }

    fn with_headers(&self, init: HeadersInit, mode: HeaderMerge) -> Self {
        let mut next = self.clone();
        if let Err(err) = init.merge_into(next.config.headers_mut(), mode) {
            warn!(error = %err, "invalid header deferred to send");
            next.deferred.get_or_insert_with(|| DeferredError::new(err));
        }
        next
    }

    // -- method / headers / body --

    /// Set the method. Names are uppercased (`"post"` becomes `POST`).
    ///
    /// # Errors
    ///
    /// Fails with a builder error for an invalid method name, or when
    /// switching to `GET`/`HEAD` while a body is set.
    pub fn set_method(&self, method: impl AsRef<str>) -> Result<Self, Error> {
        let method = normalize_method(method.as_ref())?;
        let mut next = self.clone();
        next.config.set_method(method)?;
        Ok(next)
    }

    /// Set headers; each incoming name replaces all existing values for
    /// that name.
    ///
    /// Invalid names or values are reported by [`send()`](Self::send).
    #[must_use]
    pub fn set_header(&self, init: impl Into<HeadersInit>) -> Self {
        self.with_headers(init.into(), HeaderMerge::Set)
    }

    /// Add header values, keeping existing values for the same name.
    ///
    /// Invalid names or values are reported by [`send()`](Self::send).
    #[must_use]
    pub fn append_header(&self, init: impl Into<HeadersInit>) -> Self {
        self.with_headers(init.into(), HeaderMerge::Append)
    }

    /// Set the body.
    ///
    /// # Errors
    ///
    /// Fails with a builder error when the method is `GET` or `HEAD`.
    pub fn set_body(&self, body: impl Into<Body>) -> Result<Self, Error> {
        let mut next = self.clone();
        next.config.set_body(body.into())?;
        Ok(next)
    }

    /// Set a JSON body and `Content-Type: application/json`.
    ///
    /// # Errors
    ///
    /// Fails with a builder error when `value` cannot be serialized or the
    /// method is `GET` or `HEAD`.
    pub fn set_json<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<Self, Error> {
        let mut next = self.set_body(Body::json(value)?)?;
        next.config
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        Ok(next)
    }

    // -- URL --

    /// Point the builder at a new URL.
    ///
    /// Relative forms resolve against the current URL; the placeholder
    /// table and query are not carried over.
    #[must_use]
    pub fn set_url(&self, url: &str) -> Self {
        self.with_url(|current| current.resolve(url))
    }

    /// Replace the URL parts that are `Some` in `parts`.
    #[must_use]
    pub fn set_url_parts(&self, parts: UrlParts) -> Self {
        self.with_url(|mut url| {
            if let Some(base_url) = parts.base_url {
                url = url.set_base_url(base_url);
            }
            if let Some(protocol) = parts.protocol {
                url = url.set_protocol(&protocol);
            }
            if let Some(hostname) = parts.hostname {
                url = url.set_hostname(hostname);
            }
            if let Some(port) = parts.port {
                url = url.set_port(port);
            }
            if let Some(pathname) = parts.pathname {
                url = url.set_pathname(pathname);
            }
            if let Some(query) = parts.query {
                url = url.set_query(query);
            }
            url
        })
    }

    /// Append a path segment.
    #[must_use]
    pub fn append_url(&self, segment: &str) -> Self {
        self.with_url(|url| url.append_url(segment))
    }

    /// Replace the placeholder table.
    #[must_use]
    pub fn set_params(&self, init: impl Into<ParamsInit>) -> Self {
        let init = init.into();
        self.with_url(|url| url.set_params(init))
    }

    /// Merge into the placeholder table.
    #[must_use]
    pub fn append_params(&self, init: impl Into<ParamsInit>) -> Self {
        let init = init.into();
        self.with_url(|url| url.append_params(init))
    }

    /// Replace the query.
    #[must_use]
    pub fn set_query(&self, init: impl Into<QueryInit>) -> Self {
        let init = init.into();
        self.with_url(|url| url.set_query(init))
    }

    /// Add query pairs, keeping existing ones.
    #[must_use]
    pub fn append_query(&self, init: impl Into<QueryInit>) -> Self {
        let init = init.into();
        self.with_url(|url| url.append_query(init))
    }

    // -- middleware --

    /// Append a pre-send stage.
    #[must_use]
    pub fn set_middleware(&self, stage: impl Middleware<Request> + 'static) -> Self {
        self.with_pipelines(|p| p.request.push(stage))
    }

    /// Append a response stage (run by [`dispatch()`](Self::dispatch)).
    #[must_use]
    pub fn append_response_middleware(
        &self,
        stage: impl Middleware<ResponseWrapper> + 'static,
    ) -> Self {
        self.with_pipelines(|p| p.response.push(stage))
    }

    /// Append a pre-send error stage (run by [`dispatch()`](Self::dispatch)).
    #[must_use]
    pub fn append_request_error_middleware(&self, stage: impl Middleware<Error> + 'static) -> Self {
        self.with_pipelines(|p| p.request_error.push(stage))
    }

    /// Append a post-send error stage (run by [`dispatch()`](Self::dispatch)).
    #[must_use]
    pub fn append_response_error_middleware(&self, stage: impl Middleware<Error> + 'static) -> Self {
        self.with_pipelines(|p| p.response_error.push(stage))
    }

    // -- configuration --

    /// Apply `ov` permanently to the derived builder.
    ///
    /// # Errors
    ///
    /// Fails with a builder error if the result pairs a body with
    /// `GET`/`HEAD`.
    pub fn set_config(&self, ov: RequestOverride) -> Result<Self, Error> {
        let mut next = self.clone();
        next.config.apply(ov)?;
        Ok(next)
    }

    /// Attach an abort signal.
    #[must_use]
    pub fn set_signal(&self, signal: AbortSignal) -> Self {
        let mut next = self.clone();
        next.config.set_signal(Some(signal));
        next
    }

    /// Apply `f` to this builder and return whatever it returns.
    ///
    /// ```rust
    /// # use fetchkit::{fetch_fn, Client, Response};
    /// # let client = Client::new(fetch_fn(|_req| async { Ok(Response::new(http::StatusCode::OK, "")) }));
    /// let paged = client.get("https://example.com/items").group(|b| {
    ///     b.append_query([("page", "2")]).append_query([("per_page", "50")])
    /// });
    /// assert_eq!(paged.url().query().len(), 2);
    /// ```
    pub fn group<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        f(self)
    }

    // -- build / send --

    /// Assemble the concrete [`Request`].
    ///
    /// # Errors
    ///
    /// Returns a builder error for deferred header failures.
    pub fn build(&self) -> Result<Request, Error> {
        self.build_with(RequestOverride::default())
    }

    /// Assemble the concrete [`Request`] with `ov` merged over the builder's
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns a builder error for deferred header failures or when the
    /// merged configuration pairs a body with `GET`/`HEAD`.
    pub fn build_with(&self, ov: RequestOverride) -> Result<Request, Error> {
        if let Some(deferred) = &self.deferred {
            return Err(deferred.to_error());
        }
        let mut config = self.config.clone();
        config.apply(ov)?;
        let url = self.url.to_string();
        trace!(method = %config.method(), url = url, "request built");
        Ok(Request::new(url, config))
    }

    /// Send the request.
    ///
    /// Runs the pre-send chain, then invokes the fetch primitive exactly
    /// once. Response and error chains are not run; see
    /// [`dispatch()`](Self::dispatch). A non-2xx status is a successful
    /// result: inspect [`ResponseWrapper::ok`].
    ///
    /// # Errors
    ///
    /// * builder error: invalid configuration, no request attached;
    /// * any error from a pre-send stage, with the request attached;
    /// * transport or abort error, with the request attached and
    ///   [`Error::is_send_request`] set.
    pub async fn send(&self) -> Result<ResponseWrapper, Error> {
        self.send_with(RequestOverride::default()).await
    }

    /// [`send()`](Self::send) with a per-call configuration override.
    ///
    /// # Errors
    ///
    /// As [`send()`](Self::send).
    pub async fn send_with(&self, ov: RequestOverride) -> Result<ResponseWrapper, Error> {
        let request = self.prepare(ov).await?;
        let response = self.client.fetch(&request).await?;
        Ok(ResponseWrapper::new(request, Some(response)))
    }

    /// Send the request through all four middleware chains.
    ///
    /// Pre-send chain, fetch, then the response chain. A failure before the
    /// fetch is passed through the pre-send error chain, one at or after it
    /// through the post-send error chain, and the transformed error is
    /// returned. An error chain stage that itself fails replaces the error
    /// being transformed.
    ///
    /// # Errors
    ///
    /// The error produced by the matching error chain.
    pub async fn dispatch(&self) -> Result<ResponseWrapper, Error> {
        self.dispatch_with(RequestOverride::default()).await
    }

    /// [`dispatch()`](Self::dispatch) with a per-call configuration override.
    ///
    /// # Errors
    ///
    /// As [`dispatch()`](Self::dispatch).
    pub async fn dispatch_with(&self, ov: RequestOverride) -> Result<ResponseWrapper, Error> {
        let request = match self.prepare(ov).await {
            Ok(prepared) => prepared,
            Err(err) => return Err(recover(&self.pipelines.request_error, err).await),
        };

        let sent = request.clone();
        let outcome = match self.client.fetch(&request).await {
            Ok(response) => {
                let wrapper = ResponseWrapper::new(request, Some(response));
                self.pipelines
                    .response
                    .run(wrapper)
                    .await
                    .map_err(|err| err.with_request(sent).mark_sent())
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(wrapper) => Ok(wrapper),
            Err(err) => Err(recover(&self.pipelines.response_error, err).await),
        }
    }

    /// Build, then run the pre-send chain.
    async fn prepare(&self, ov: RequestOverride) -> Result<Request, Error> {
        let request = self.build_with(ov)?;
        if self.pipelines.request.is_empty() {
            return Ok(request);
        }
        let snapshot = request.clone();
        self.pipelines
            .request
            .run(request)
            .await
            .map_err(|err| err.with_request(snapshot))
    }
}

/// Run an error chain; a failing stage's error replaces the input.
async fn recover(chain: &Pipeline<Error>, err: Error) -> Error {
    match chain.run(err).await {
        Ok(err) | Err(err) => err,
    }
}

// Builders and requests are moved between tasks and shared by reference.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Request>();
    assert_send_sync::<RequestBuilder>();
};

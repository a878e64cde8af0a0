//! Client and builder.
//!
//! [`Client`] holds what every request it creates shares: the [`Fetch`]
//! primitive, default headers, an optional base URL, and client-wide
//! middleware. Create one via [`Client::builder()`], then derive request
//! builders with [`get()`](Client::get), [`post()`](Client::post) and
//! friends. `Client` is cheap to clone (`Arc` internally).

use crate::error::Error;
use crate::fetch::Fetch;
use crate::middleware::{Middleware, Pipelines};
use crate::request::{Request, RequestBuilder};
use crate::response::Response;
use crate::wrapper::ResponseWrapper;
use futures_util::future::{Either, select};
use http::header::USER_AGENT;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::pin::pin;
use std::sync::Arc;

/// Entry point for building requests over a [`Fetch`] primitive.
///
/// `Client` is cheap to [`Clone`]; clones share the fetch primitive and the
/// client-wide configuration.
///
/// # Example
///
/// ```rust
/// use fetchkit::{fetch_fn, middleware, Client, Response};
/// use http::StatusCode;
///
/// # fn demo() -> fetchkit::Result<()> {
/// let client = Client::builder(fetch_fn(|_req| async {
///     Ok(Response::new(StatusCode::OK, "{}"))
/// }))
/// .base_url("https://api.example.com/v1")
/// .user_agent("demo/1.0")
/// .middleware(middleware::bearer_auth("token"))
/// .build()?;
///
/// let builder = client.get("/users/:id").set_params([("id", "42")]);
/// assert_eq!(builder.url().to_string(), "https://api.example.com/v1/users/42");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("default_headers", &self.inner.default_headers)
            .finish_non_exhaustive()
    }
}

/// Shared state behind `Arc` in [`Client`].
pub(crate) struct ClientInner {
    /// The I/O primitive.
    pub fetch: Arc<dyn Fetch>,
    /// Headers every new request builder starts with.
    pub default_headers: HeaderMap,
    /// Prefix for relative request URLs.
    pub base_url: Option<String>,
    /// Stages every new request builder starts with.
    pub pipelines: Pipelines,
}

/// Builder for configuring and constructing a [`Client`].
///
/// Invalid inputs are recorded and reported by [`build()`](Self::build).
/// Obtain via [`Client::builder()`].
pub struct ClientBuilder {
    fetch: Arc<dyn Fetch>,
    default_headers: HeaderMap,
    base_url: Option<String>,
    pipelines: Pipelines,
    error: Option<Error>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("default_headers", &self.default_headers)
            .field("base_url", &self.base_url)
            .field("pipelines", &self.pipelines)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a `Client` with default settings over `fetch`.
    pub fn new(fetch: impl Fetch + 'static) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                fetch: Arc::new(fetch),
                default_headers: HeaderMap::new(),
                base_url: None,
                pipelines: Pipelines::default(),
            }),
        }
    }

    /// Create a [`ClientBuilder`] over `fetch`.
    pub fn builder(fetch: impl Fetch + 'static) -> ClientBuilder {
        ClientBuilder::new(fetch)
    }

    /// Start a `GET` request.
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Start a `POST` request.
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Start a `PUT` request.
    pub fn put(&self, url: &str) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Start a `PATCH` request.
    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Start a `DELETE` request.
    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Start a `HEAD` request.
    pub fn head(&self, url: &str) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Start a request with the given method.
    ///
    /// Relative URLs resolve against the configured base URL, if any.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), method, url)
    }

    /// Derive a builder from an existing [`Request`].
    ///
    /// The URL model is parsed back out of the request URL, and the
    /// request's configuration is kept as is.
    pub fn from_request(&self, request: Request) -> RequestBuilder {
        RequestBuilder::from_request(self.clone(), request)
    }

    /// Fetch a pre-built [`Request`], without running any middleware.
    ///
    /// This is the lower-level counterpart of
    /// [`RequestBuilder::send()`](crate::RequestBuilder::send).
    ///
    /// # Errors
    ///
    /// Fails if the request's abort signal fires or the fetch primitive
    /// fails. A non-2xx response is not an error.
    pub async fn execute(&self, request: Request) -> Result<ResponseWrapper, Error> {
        let response = self.fetch(&request).await?;
        Ok(ResponseWrapper::new(request, Some(response)))
    }

    /// Invoke the fetch primitive once, racing it against the abort signal.
    ///
    /// Errors carry `request`; those raised after the primitive was invoked
    /// are marked as sent.
    pub(crate) async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if let Some(signal) = request.signal()
            && signal.is_aborted()
        {
            debug!(url = request.url(), "request aborted before fetch");
            return Err(Error::aborted().with_request(request.clone()));
        }

        debug!(method = %request.method(), url = request.url(), "fetching");
        let fetch = self.inner.fetch.fetch(request);
        let result = match request.signal() {
            Some(signal) => {
                let cancelled = pin!(signal.cancelled());
                match select(fetch, cancelled).await {
                    Either::Left((result, _)) => result.map_err(Error::from_fetch),
                    Either::Right(((), _)) => Err(Error::aborted()),
                }
            }
            None => fetch.await.map_err(Error::from_fetch),
        };

        match result {
            Ok(response) => {
                trace!(status = %response.status(), url = request.url(), "response received");
                Ok(response)
            }
            Err(err) => {
                debug!(error = %err, url = request.url(), "fetch failed");
                Err(err.with_request(request.clone()).mark_sent())
            }
        }
    }
}

impl ClientBuilder {
    /// Create a builder over `fetch`.
    pub fn new(fetch: impl Fetch + 'static) -> Self {
        Self {
            fetch: Arc::new(fetch),
            default_headers: HeaderMap::new(),
            base_url: None,
            pipelines: Pipelines::default(),
            error: None,
        }
    }

    /// Replace the default headers every request starts with.
    ///
    /// Headers set on individual requests override these per name.
    #[must_use]
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    /// Add one default header.
    ///
    /// Invalid names or values are reported by [`build()`](Self::build).
    #[must_use]
    pub fn default_header<K, V>(mut self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let name = match HeaderName::try_from(key) {
            Ok(n) => n,
            Err(e) => {
                let e: http::Error = e.into();
                self.error = Some(Error::builder("invalid default header name").with_source(e));
                return self;
            }
        };
        match HeaderValue::try_from(value) {
            Ok(v) => {
                self.default_headers.append(name, v);
            }
            Err(e) => {
                let e: http::Error = e.into();
                self.error = Some(Error::builder("invalid default header value").with_source(e));
            }
        }
        self
    }

    /// Set the `User-Agent` default header.
    #[must_use]
    pub fn user_agent<V>(mut self, value: V) -> Self
    where
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        match HeaderValue::try_from(value) {
            Ok(v) => {
                self.default_headers.insert(USER_AGENT, v);
            }
            Err(e) => {
                let e: http::Error = e.into();
                self.error = Some(Error::builder("invalid user-agent").with_source(e));
            }
        }
        self
    }

    /// Prefix relative request URLs with `base_url`.
    ///
    /// Must be absolute (`scheme://...`).
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        if base_url.contains("://") {
            self.base_url = Some(base_url);
        } else {
            self.error = Some(Error::builder(format!(
                "base URL must be absolute, got {base_url:?}"
            )));
        }
        self
    }

    /// Append a client-wide pre-send stage.
    #[must_use]
    pub fn middleware(mut self, stage: impl Middleware<Request> + 'static) -> Self {
        self.pipelines.request.push(stage);
        self
    }

    /// Append a client-wide response stage (run by `dispatch`).
    #[must_use]
    pub fn response_middleware(mut self, stage: impl Middleware<ResponseWrapper> + 'static) -> Self {
        self.pipelines.response.push(stage);
        self
    }

    /// Append a client-wide pre-send error stage (run by `dispatch`).
    #[must_use]
    pub fn request_error_middleware(mut self, stage: impl Middleware<Error> + 'static) -> Self {
        self.pipelines.request_error.push(stage);
        self
    }

    /// Append a client-wide post-send error stage (run by `dispatch`).
    #[must_use]
    pub fn response_error_middleware(mut self, stage: impl Middleware<Error> + 'static) -> Self {
        self.pipelines.response_error.push(stage);
        self
    }

    /// Build the [`Client`].
    ///
    /// # Errors
    ///
    /// Returns the first invalid input recorded by a setter.
    pub fn build(self) -> Result<Client, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }

        debug!(
            base_url = ?self.base_url,
            default_headers = self.default_headers.len(),
            request_stages = self.pipelines.request.len(),
            response_stages = self.pipelines.response.len(),
            "client built",
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                fetch: self.fetch,
                default_headers: self.default_headers,
                base_url: self.base_url,
                pipelines: self.pipelines,
            }),
        })
    }
}

// Clients are shared across tasks.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Client>();
};

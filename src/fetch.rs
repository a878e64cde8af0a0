//! The fetch primitive.
//!
//! [`Fetch`] is the single I/O capability the crate consumes: it takes a
//! fully-formed [`Request`] and yields a [`Response`] or a transport failure.
//! Everything else (URL assembly, middleware, classification) happens on
//! either side of it.
//!
//! With the `reqwest` feature, [`ReqwestFetch`] bridges the primitive to a
//! `reqwest::Client`.

use crate::error::BoxError;
use crate::request::Request;
use crate::response::Response;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// An asynchronous request-in, response-out transport.
///
/// Implementations should not interpret the status code: a 404 is a
/// successful fetch. Return `Err` only when no response was obtained.
pub trait Fetch: Send + Sync {
    /// Perform `request`.
    fn fetch<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, BoxError>>;
}

impl<T: Fetch + ?Sized> Fetch for Arc<T> {
    fn fetch<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, BoxError>> {
        (**self).fetch(request)
    }
}

/// A [`Fetch`] backed by a closure. Created by [`fetch_fn`].
#[derive(Clone)]
pub struct FetchFn<F> {
    f: F,
}

impl<F> std::fmt::Debug for FetchFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FetchFn(..)")
    }
}

/// Adapt a closure into a [`Fetch`].
///
/// The closure receives its own clone of the request.
///
/// ```rust
/// use fetchkit::{fetch_fn, Response};
/// use http::StatusCode;
///
/// let fetch = fetch_fn(|req: fetchkit::Request| async move {
///     Ok(Response::new(StatusCode::OK, req.url().to_owned()))
/// });
/// let client = fetchkit::Client::new(fetch);
/// ```
pub fn fetch_fn<F, Fut>(f: F) -> FetchFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    FetchFn { f }
}

impl<F, Fut> Fetch for FetchFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    fn fetch<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, BoxError>> {
        Box::pin((self.f)(request.clone()))
    }
}

// ---------------------------------------------------------------------------
// reqwest adapter
// ---------------------------------------------------------------------------

#[cfg(feature = "reqwest")]
pub use self::reqwest_fetch::ReqwestFetch;

#[cfg(feature = "reqwest")]
mod reqwest_fetch {
    use super::{BoxError, BoxFuture, Fetch};
    use crate::body::{Body, FormData, FormPart};
    use crate::request::Request;
    use crate::response::Response;
    use http::header::CONTENT_TYPE;

    /// A [`Fetch`] that sends requests with a `reqwest::Client`.
    ///
    /// Per-request redirect policy, cache mode and credentials mode have no
    /// `reqwest` equivalent and are ignored; configure the wrapped client
    /// instead. The response body is streamed.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestFetch {
        client: reqwest::Client,
    }

    impl ReqwestFetch {
        /// Use a default `reqwest::Client`.
        pub fn new() -> Self {
            Self::default()
        }

        /// Use the given client.
        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    fn multipart(form: &FormData) -> Result<reqwest::multipart::Form, reqwest::Error> {
        let mut out = reqwest::multipart::Form::new();
        for (name, part) in form.iter() {
            out = match part {
                FormPart::Text(value) => out.text(name.to_owned(), value.clone()),
                FormPart::File {
                    data,
                    filename,
                    content_type,
                } => {
                    let mut p = reqwest::multipart::Part::bytes(data.to_vec());
                    if let Some(filename) = filename {
                        p = p.file_name(filename.clone());
                    }
                    if let Some(content_type) = content_type {
                        p = p.mime_str(content_type)?;
                    }
                    out.part(name.to_owned(), p)
                }
            };
        }
        Ok(out)
    }

    impl Fetch for ReqwestFetch {
        fn fetch<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, BoxError>> {
            Box::pin(async move {
                let mut builder = self
                    .client
                    .request(request.method().clone(), request.url())
                    .headers(request.headers().clone());

                match request.body() {
                    Body::Empty => {}
                    Body::Form(form) => builder = builder.multipart(multipart(form)?),
                    body => {
                        if let Some(content_type) = body.content_type()
                            && !request.headers().contains_key(CONTENT_TYPE)
                        {
                            builder = builder.header(CONTENT_TYPE, content_type);
                        }
                        builder = builder.body(body.to_bytes().unwrap_or_default());
                    }
                }

                let resp = builder.send().await?;
                let status = resp.status();
                let version = resp.version();
                let url = resp.url().to_string();
                let headers = resp.headers().clone();
                trace!(status = %status, url = url, "reqwest response");
                Ok(Response::from_stream(status, resp.bytes_stream())
                    .with_version(version)
                    .with_url(url)
                    .with_headers(headers))
            })
        }
    }
}

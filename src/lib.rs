#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

#[macro_use]
mod tracing;

mod body;
mod client;
mod config;
mod error;
mod fetch;
/// Middleware pipelines and stock stages.
pub mod middleware;
mod record;
mod request;
mod response;
mod signal;
mod url;
mod wrapper;

pub use body::{Body, FormData, FormPart};
pub use client::{Client, ClientBuilder};
pub use config::{
    RequestCache, RequestConfig, RequestCredentials, RequestMode, RequestOverride, RequestRedirect,
};
pub use error::{BoxError, Error};
#[cfg(feature = "reqwest")]
pub use fetch::ReqwestFetch;
pub use fetch::{Fetch, FetchFn, fetch_fn};
pub use middleware::{Middleware, Pipeline, Pipelines};
pub use record::{HeadersInit, Params, ParamsInit, QueryInit};
pub use request::{Request, RequestBuilder};
pub use response::{BoxStream, Response, ResponseHead};
pub use signal::{AbortController, AbortSignal};
pub use url::{Query, RequestUrl, UrlParts};
pub use wrapper::ResponseWrapper;

pub use http::Method;
pub use http::StatusCode;
pub use http::Version;
/// Re-export the `http::header` module for header name constants.
pub use http::header;
pub use http::header::HeaderMap;

pub use bytes::Bytes;

/// A `Result` alias where the `Err` case is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

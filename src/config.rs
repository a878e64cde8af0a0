//! Request configuration.
//!
//! [`RequestConfig`] is the snapshot of everything about a request except its
//! URL: method, headers, body, and the platform-level options a fetch
//! primitive understands (cache mode, credentials, CORS mode, redirect
//! policy, referrer, integrity, keepalive, abort signal).
//!
//! [`RequestOverride`] is a sparse set of replacements applied at send time.

use crate::body::Body;
use crate::error::Error;
use crate::signal::AbortSignal;
use http::header::HeaderMap;
use http::Method;
use std::fmt;

// ---------------------------------------------------------------------------
// Platform option enums
// ---------------------------------------------------------------------------

macro_rules! option_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal,)+ }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// The token a fetch primitive expects for this option.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

option_enum! {
    /// How the request interacts with an HTTP cache.
    RequestCache {
        #[default]
        /// Use the cache normally.
        Default => "default",
        /// Bypass the cache and do not update it.
        NoStore => "no-store",
        /// Bypass the cache, then update it.
        Reload => "reload",
        /// Always revalidate.
        NoCache => "no-cache",
        /// Use any cached response, stale or not.
        ForceCache => "force-cache",
        /// Use only a cached response.
        OnlyIfCached => "only-if-cached",
    }
}

option_enum! {
    /// Whether credentials (cookies, auth) are sent.
    RequestCredentials {
        /// Never send credentials.
        Omit => "omit",
        #[default]
        /// Send credentials to the same origin only.
        SameOrigin => "same-origin",
        /// Always send credentials.
        Include => "include",
    }
}

option_enum! {
    /// Cross-origin mode.
    RequestMode {
        #[default]
        /// Cross-origin requests use CORS.
        Cors => "cors",
        /// Opaque cross-origin requests.
        NoCors => "no-cors",
        /// Cross-origin requests are refused.
        SameOrigin => "same-origin",
        /// Document navigation.
        Navigate => "navigate",
    }
}

option_enum! {
    /// What to do when the server answers with a redirect.
    RequestRedirect {
        #[default]
        /// Follow redirects.
        Follow => "follow",
        /// Treat a redirect as a failure.
        Error => "error",
        /// Hand the redirect response to the caller.
        Manual => "manual",
    }
}

const DEFAULT_REFERRER: &str = "about:client";

/// Parse a method name, uppercasing it first.
pub(crate) fn normalize_method(method: &str) -> Result<Method, Error> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|e| Error::builder(format!("invalid HTTP method {method:?}")).with_source(e))
}

fn forbids_body(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

// ---------------------------------------------------------------------------
// RequestConfig
// ---------------------------------------------------------------------------

/// Everything about a request except its URL.
///
/// A body is never combined with `GET` or `HEAD`; every path that could
/// produce that combination fails with a builder error instead.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    method: Method,
    headers: HeaderMap,
    body: Body,
    cache: RequestCache,
    credentials: RequestCredentials,
    mode: RequestMode,
    redirect: RequestRedirect,
    referrer: String,
    referrer_policy: String,
    integrity: String,
    keepalive: bool,
    signal: Option<AbortSignal>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: Body::Empty,
            cache: RequestCache::default(),
            credentials: RequestCredentials::default(),
            mode: RequestMode::default(),
            redirect: RequestRedirect::default(),
            referrer: DEFAULT_REFERRER.to_owned(),
            referrer_policy: String::new(),
            integrity: String::new(),
            keepalive: false,
            signal: None,
        }
    }
}

impl RequestConfig {
    /// Defaults with the given method. Always valid: there is no body yet.
    pub(crate) fn for_method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The request body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Cache mode.
    pub fn cache(&self) -> RequestCache {
        self.cache
    }

    /// Credentials mode.
    pub fn credentials(&self) -> RequestCredentials {
        self.credentials
    }

    /// CORS mode.
    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    /// Redirect policy.
    pub fn redirect(&self) -> RequestRedirect {
        self.redirect
    }

    /// Referrer URL, `about:client` by default.
    pub fn referrer(&self) -> &str {
        &self.referrer
    }

    /// Referrer policy, empty by default.
    pub fn referrer_policy(&self) -> &str {
        &self.referrer_policy
    }

    /// Subresource integrity metadata, empty by default.
    pub fn integrity(&self) -> &str {
        &self.integrity
    }

    /// Whether the request may outlive the page that started it.
    pub fn keepalive(&self) -> bool {
        self.keepalive
    }

    /// The abort signal, if any.
    pub fn signal(&self) -> Option<&AbortSignal> {
        self.signal.as_ref()
    }

    // -- crate-internal mutation; callers clone first --

    pub(crate) fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Change the method, keeping the body invariant.
    pub(crate) fn set_method(&mut self, method: Method) -> Result<(), Error> {
        if forbids_body(&method) && !self.body.is_empty() {
            return Err(Error::builder(format!(
                "cannot switch to {method}: the request already has a body"
            )));
        }
        self.method = method;
        Ok(())
    }

    /// Change the body, keeping the body invariant.
    pub(crate) fn set_body(&mut self, body: Body) -> Result<(), Error> {
        if forbids_body(&self.method) && !body.is_empty() {
            return Err(Error::builder(format!(
                "request with {} method cannot have a body",
                self.method
            )));
        }
        self.body = body;
        Ok(())
    }

    pub(crate) fn set_signal(&mut self, signal: Option<AbortSignal>) {
        self.signal = signal;
    }

    /// Apply every field present in `ov`, then re-check the body invariant.
    ///
    /// Override headers replace existing values per name.
    pub(crate) fn apply(&mut self, ov: RequestOverride) -> Result<(), Error> {
        if let Some(method) = ov.method {
            self.method = method;
        }
        if let Some(headers) = ov.headers {
            for name in headers.keys() {
                self.headers.remove(name);
            }
            for (name, value) in &headers {
                self.headers.append(name.clone(), value.clone());
            }
        }
        if let Some(body) = ov.body {
            self.body = body;
        }
        if let Some(cache) = ov.cache {
            self.cache = cache;
        }
        if let Some(credentials) = ov.credentials {
            self.credentials = credentials;
        }
        if let Some(mode) = ov.mode {
            self.mode = mode;
        }
        if let Some(redirect) = ov.redirect {
            self.redirect = redirect;
        }
        if let Some(referrer) = ov.referrer {
            self.referrer = referrer;
        }
        if let Some(policy) = ov.referrer_policy {
            self.referrer_policy = policy;
        }
        if let Some(integrity) = ov.integrity {
            self.integrity = integrity;
        }
        if let Some(keepalive) = ov.keepalive {
            self.keepalive = keepalive;
        }
        if let Some(signal) = ov.signal {
            self.signal = Some(signal);
        }
        self.validate()
    }

    /// Check the body invariant.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if forbids_body(&self.method) && !self.body.is_empty() {
            return Err(Error::builder(format!(
                "request with {} method cannot have a body",
                self.method
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RequestOverride
// ---------------------------------------------------------------------------

/// Per-send replacements for a builder's [`RequestConfig`].
///
/// Every `Some` field replaces the builder's value for that one send;
/// `headers` replace per name. The merged result is validated again, so an
/// override cannot smuggle a body onto a `GET`.
///
/// ```rust
/// use fetchkit::{RequestCache, RequestOverride};
///
/// let ov = RequestOverride {
///     cache: Some(RequestCache::NoStore),
///     ..RequestOverride::default()
/// };
/// assert!(ov.method.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOverride {
    /// Replacement method.
    pub method: Option<Method>,
    /// Headers set over the builder's headers.
    pub headers: Option<HeaderMap>,
    /// Replacement body.
    pub body: Option<Body>,
    /// Replacement cache mode.
    pub cache: Option<RequestCache>,
    /// Replacement credentials mode.
    pub credentials: Option<RequestCredentials>,
    /// Replacement CORS mode.
    pub mode: Option<RequestMode>,
    /// Replacement redirect policy.
    pub redirect: Option<RequestRedirect>,
    /// Replacement referrer.
    pub referrer: Option<String>,
    /// Replacement referrer policy.
    pub referrer_policy: Option<String>,
    /// Replacement integrity metadata.
    pub integrity: Option<String>,
    /// Replacement keepalive flag.
    pub keepalive: Option<bool>,
    /// Replacement abort signal.
    pub signal: Option<AbortSignal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn defaults() {
        let config = RequestConfig::default();
        assert_eq!(config.method(), &Method::GET);
        assert!(config.headers().is_empty());
        assert!(config.body().is_empty());
        assert_eq!(config.cache().as_str(), "default");
        assert_eq!(config.credentials().as_str(), "same-origin");
        assert_eq!(config.mode().as_str(), "cors");
        assert_eq!(config.redirect().as_str(), "follow");
        assert_eq!(config.referrer(), "about:client");
        assert_eq!(config.referrer_policy(), "");
        assert_eq!(config.integrity(), "");
        assert!(!config.keepalive());
        assert!(config.signal().is_none());
    }

    #[test]
    fn normalize_method_table() {
        // (input, expected, label)
        let cases: &[(&str, Option<Method>, &str)] = &[
            ("get", Some(Method::GET), "lowercase"),
            ("Post", Some(Method::POST), "mixed case"),
            (" delete ", Some(Method::DELETE), "whitespace"),
            ("purge", Some(Method::from_bytes(b"PURGE").unwrap()), "extension"),
            ("BAD METHOD", None, "space inside"),
            ("", None, "empty"),
        ];
        for (input, expected, label) in cases {
            assert_eq!(normalize_method(input).ok(), *expected, "{label}");
        }
    }

    #[test]
    fn body_forbidden_with_get_and_head() {
        // (method, body allowed, label)
        let cases: &[(Method, bool, &str)] = &[
            (Method::GET, false, "GET"),
            (Method::HEAD, false, "HEAD"),
            (Method::POST, true, "POST"),
            (Method::PUT, true, "PUT"),
            (Method::DELETE, true, "DELETE"),
        ];
        for (method, allowed, label) in cases {
            let mut config = RequestConfig::default();
            config.method = method.clone();
            let result = config.set_body(Body::from("payload"));
            assert_eq!(result.is_ok(), *allowed, "{label}");
            if let Err(err) = result {
                assert!(err.is_builder(), "{label}: builder error");
            }
        }
    }

    #[test]
    fn empty_body_is_allowed_with_get() {
        let mut config = RequestConfig::default();
        assert!(config.set_body(Body::Empty).is_ok());
    }

    #[test]
    fn method_switch_to_get_with_body_rejected() {
        let mut config = RequestConfig::default();
        config.set_method(Method::POST).unwrap();
        config.set_body(Body::from("x")).unwrap();
        let err = config.set_method(Method::GET).unwrap_err();
        assert!(err.is_builder());
        assert_eq!(config.method(), &Method::POST);
    }

    #[test]
    fn override_merges_and_revalidates() {
        let mut config = RequestConfig::default();
        config.headers_mut().insert("accept", HeaderValue::from_static("text/html"));
        config.headers_mut().insert("x-keep", HeaderValue::from_static("1"));

        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("application/json"));
        config
            .apply(RequestOverride {
                headers: Some(headers),
                cache: Some(RequestCache::NoStore),
                keepalive: Some(true),
                ..RequestOverride::default()
            })
            .unwrap();
        assert_eq!(config.headers()["accept"], "application/json");
        assert_eq!(config.headers()["x-keep"], "1");
        assert_eq!(config.cache(), RequestCache::NoStore);
        assert!(config.keepalive());

        let err = config
            .apply(RequestOverride {
                body: Some(Body::from("smuggled")),
                ..RequestOverride::default()
            })
            .unwrap_err();
        assert!(err.is_builder());
    }

    #[test]
    fn option_display_matches_tokens() {
        assert_eq!(RequestCache::OnlyIfCached.to_string(), "only-if-cached");
        assert_eq!(RequestCredentials::Include.to_string(), "include");
        assert_eq!(RequestMode::NoCors.to_string(), "no-cors");
        assert_eq!(RequestRedirect::Manual.to_string(), "manual");
    }
}

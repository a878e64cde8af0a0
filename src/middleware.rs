//! Middleware pipelines.
//!
//! A [`Middleware<T>`] is one asynchronous stage `T -> Result<T>`. Any
//! `Fn(T) -> impl Future<Output = Result<T>>` closure qualifies, so most
//! stages are plain closures:
//!
//! ```rust
//! use fetchkit::middleware::Pipeline;
//! use fetchkit::Request;
//!
//! let pipeline: Pipeline<Request> = Pipeline::new().with(|mut req: Request| async move {
//!     req.headers_mut().insert("x-trace", http::HeaderValue::from_static("1"));
//!     Ok(req)
//! });
//! assert_eq!(pipeline.len(), 1);
//! ```
//!
//! A [`Pipeline<T>`] runs its stages strictly in insertion order. Each stage
//! finishes before the next one starts; the first failure ends the run and
//! no later stage is invoked.
//!
//! [`Pipelines`] bundles the four chains a builder owns. The stock stages
//! [`error_for_status`], [`bearer_auth`], [`basic_auth`] and
//! [`default_header`] cover the common cases.

use crate::error::Error;
use crate::request::Request;
use crate::wrapper::ResponseWrapper;
use base64::Engine as _;
use futures_util::future::BoxFuture;
use http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use std::future::Future;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Middleware trait
// ---------------------------------------------------------------------------

/// One asynchronous transform stage.
///
/// Return `Err` to abort the pipeline. Use [`Error::middleware`] for
/// failures that originate in the stage itself.
pub trait Middleware<T>: Send + Sync {
    /// Transform `value`.
    fn call(&self, value: T) -> BoxFuture<'static, Result<T, Error>>;
}

impl<T, F, Fut> Middleware<T> for F
where
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, Error>> + Send + 'static,
{
    fn call(&self, value: T) -> BoxFuture<'static, Result<T, Error>> {
        Box::pin(self(value))
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// An ordered, append-only list of [`Middleware`] stages.
///
/// Cloning is cheap: stages are shared behind `Arc` and are never mutated.
pub struct Pipeline<T> {
    stages: Vec<Arc<dyn Middleware<T>>>,
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
        }
    }
}

impl<T> Default for Pipeline<T> {
    fn default() -> Self {
        Self { stages: Vec::new() }
    }
}

impl<T> std::fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}

impl<T: Send + 'static> Pipeline<T> {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a pipeline with `stage` appended.
    #[must_use]
    pub fn with(mut self, stage: impl Middleware<T> + 'static) -> Self {
        self.push(stage);
        self
    }

    /// Append `stage`.
    pub fn push(&mut self, stage: impl Middleware<T> + 'static) {
        self.stages.push(Arc::new(stage));
    }

    /// Append every stage of `other`, after the existing ones.
    pub fn extend(&mut self, other: &Pipeline<T>) {
        self.stages.extend(other.stages.iter().cloned());
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Feed `value` through every stage in order.
    ///
    /// # Errors
    ///
    /// Returns the first error a stage produces, unchanged.
    pub async fn run(&self, mut value: T) -> Result<T, Error> {
        for (index, stage) in self.stages.iter().enumerate() {
            trace!(stage = index, total = self.stages.len(), "running middleware stage");
            value = stage.call(value).await.inspect_err(|_e| {
                debug!(stage = index, error = %_e, "middleware stage failed");
            })?;
        }
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------------

/// The four chains owned by a builder.
///
/// | Chain            | Runs on                                | Used by          |
/// |------------------|----------------------------------------|------------------|
/// | `request`        | the built request, before fetch        | `send`, `dispatch` |
/// | `response`       | the wrapped response, after fetch      | `dispatch`       |
/// | `request_error`  | failures before the fetch was invoked  | `dispatch`       |
/// | `response_error` | failures at or after the fetch         | `dispatch`       |
#[derive(Debug, Clone, Default)]
pub struct Pipelines {
    pub(crate) request: Pipeline<Request>,
    pub(crate) response: Pipeline<ResponseWrapper>,
    pub(crate) request_error: Pipeline<Error>,
    pub(crate) response_error: Pipeline<Error>,
}

impl Pipelines {
    /// The pre-send chain.
    pub fn request(&self) -> &Pipeline<Request> {
        &self.request
    }

    /// The post-send success chain.
    pub fn response(&self) -> &Pipeline<ResponseWrapper> {
        &self.response
    }

    /// The pre-send error chain.
    pub fn request_error(&self) -> &Pipeline<Error> {
        &self.request_error
    }

    /// The post-send error chain.
    pub fn response_error(&self) -> &Pipeline<Error> {
        &self.response_error
    }
}

// ---------------------------------------------------------------------------
// Stock stages
// ---------------------------------------------------------------------------

/// Turn a non-2xx response into an [`Error::is_status`] error.
///
/// The error message carries the server's explanation: the `message` field
/// of a JSON body when there is one, otherwise the body text. Install it in
/// the response chain to opt in to status-based failures.
pub fn error_for_status() -> impl Middleware<ResponseWrapper> {
    |mut wrapper: ResponseWrapper| async move {
        let Some(resp) = wrapper.response_mut() else {
            return Ok(wrapper);
        };
        if resp.ok() {
            return Ok(wrapper);
        }
        let head = resp.head();
        let detail = resp.bytes().await.ok().and_then(|body| extract_message(&body));
        debug!(status = %head.status, "response status treated as error");
        Err(Error::status_error(head, detail.as_deref())
            .with_request(wrapper.request().clone())
            .mark_sent())
    }
}

/// Pull a human-readable explanation out of an error body.
fn extract_message(body: &[u8]) -> Option<String> {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(body)
        && let Some(serde_json::Value::String(message)) = map.get("message")
    {
        return Some(message.clone());
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

fn sensitive(value: &str) -> Option<HeaderValue> {
    let mut value = HeaderValue::from_str(value).ok()?;
    value.set_sensitive(true);
    Some(value)
}

fn authorization_stage(value: Option<HeaderValue>, scheme: &'static str) -> impl Middleware<Request> {
    move |mut req: Request| {
        let value = value.clone();
        async move {
            let value = value
                .ok_or_else(|| Error::middleware(format!("invalid {scheme} credentials")))?;
            req.headers_mut().insert(AUTHORIZATION, value);
            Ok(req)
        }
    }
}

/// Set `Authorization: Bearer <token>` on every request.
///
/// A token that is not a valid header value fails the stage.
pub fn bearer_auth(token: &str) -> impl Middleware<Request> + use<> {
    authorization_stage(sensitive(&format!("Bearer {token}")), "bearer")
}

/// Set `Authorization: Basic <base64(user:password)>` on every request.
pub fn basic_auth(username: &str, password: Option<&str>) -> impl Middleware<Request> + use<> {
    let raw = match password {
        Some(password) => format!("{username}:{password}"),
        None => format!("{username}:"),
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(raw);
    authorization_stage(sensitive(&format!("Basic {encoded}")), "basic")
}

/// Insert `name: value` unless the request already carries `name`.
pub fn default_header(name: HeaderName, value: HeaderValue) -> impl Middleware<Request> {
    move |mut req: Request| {
        let (name, value) = (name.clone(), value.clone());
        async move {
            req.headers_mut().entry(name).or_insert(value);
            Ok(req)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RequestConfig;
    use crate::response::Response;
    use http::StatusCode;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<usize>>>;

    /// A stage that records its index and fails when `index == fail_at`.
    fn recording_stage(log: &Log, index: usize, fail_at: Option<usize>) -> impl Middleware<u32> + use<> {
        let log = Arc::clone(log);
        move |value: u32| {
            log.lock().unwrap().push(index);
            let fail = fail_at == Some(index);
            async move {
                if fail {
                    Err(Error::middleware(format!("stage {index} failed")))
                } else {
                    Ok(value + 1)
                }
            }
        }
    }

    #[tokio::test]
    async fn pipeline_failure_at_stage_k() {
        const N: usize = 5;
        for k in 1..=N {
            let log: Log = Arc::default();
            let mut pipeline = Pipeline::new();
            for i in 1..=N {
                pipeline.push(recording_stage(&log, i, Some(k)));
            }
            let err = pipeline.run(0).await.unwrap_err();
            assert!(err.is_middleware(), "k={k}");
            assert_eq!(err.message(), format!("stage {k} failed"));
            let expected: Vec<usize> = (1..=k).collect();
            assert_eq!(*log.lock().unwrap(), expected, "k={k}: stages 1..=k ran once, in order");
        }
    }

    #[tokio::test]
    async fn pipeline_runs_in_order_and_threads_value() {
        let log: Log = Arc::default();
        let pipeline = Pipeline::new()
            .with(recording_stage(&log, 1, None))
            .with(recording_stage(&log, 2, None))
            .with(|v: u32| async move { Ok(v * 10) });
        assert_eq!(pipeline.run(0).await.unwrap(), 20);
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn empty_pipeline_is_identity() {
        let pipeline: Pipeline<u32> = Pipeline::new();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.run(7).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn stage_sees_previous_effects_after_await() {
        let pipeline = Pipeline::new()
            .with(|v: Vec<u8>| async move {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                let mut v = v;
                v.push(1);
                Ok(v)
            })
            .with(|v: Vec<u8>| async move {
                assert_eq!(v, vec![1]);
                let mut v = v;
                v.push(2);
                Ok(v)
            });
        assert_eq!(pipeline.run(Vec::new()).await.unwrap(), vec![1, 2]);
    }

    #[test]
    fn clone_is_independent_append_only() {
        let base: Pipeline<u32> = Pipeline::new().with(|v: u32| async move { Ok(v) });
        let derived = base.clone().with(|v: u32| async move { Ok(v) });
        assert_eq!(base.len(), 1);
        assert_eq!(derived.len(), 2);
    }

    #[tokio::test]
    async fn extend_appends_after_existing_stages() {
        let log: Log = Arc::default();
        let mut head = Pipeline::new().with(recording_stage(&log, 1, None));
        let tail = Pipeline::new()
            .with(recording_stage(&log, 2, None))
            .with(recording_stage(&log, 3, None));
        head.extend(&tail);
        assert_eq!(head.len(), 3);
        assert_eq!(tail.len(), 2, "source pipeline unchanged");
        assert_eq!(head.run(0).await.unwrap(), 3);
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn extract_message_table() {
        // (body, expected, label)
        let cases: &[(&str, Option<&str>, &str)] = &[
            (r#"{"message":"token expired"}"#, Some("token expired"), "json message"),
            (r#"{"error":"nope"}"#, Some(r#"{"error":"nope"}"#), "json without message"),
            ("plain failure", Some("plain failure"), "text"),
            ("   ", None, "blank"),
            ("", None, "empty"),
        ];
        for &(body, expected, label) in cases {
            assert_eq!(extract_message(body.as_bytes()).as_deref(), expected, "{label}");
        }
    }

    fn wrapper_with(status: StatusCode, body: &'static str) -> ResponseWrapper {
        let request = Request::new("https://example.com/items".to_owned(), RequestConfig::default());
        let response = Response::new(status, body).with_url("https://example.com/items");
        ResponseWrapper::new(request, Some(response))
    }

    #[tokio::test]
    async fn error_for_status_table() {
        // (status, body, expected message, label)
        let cases: &[(StatusCode, &str, Option<&str>, &str)] = &[
            (StatusCode::OK, "fine", None, "2xx passes"),
            (StatusCode::NO_CONTENT, "", None, "204 passes"),
            (
                StatusCode::UNAUTHORIZED,
                r#"{"message":"token expired"}"#,
                Some("HTTP status client error (401 Unauthorized): token expired"),
                "json message",
            ),
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "maintenance",
                Some("HTTP status server error (503 Service Unavailable): maintenance"),
                "text body",
            ),
            (
                StatusCode::NOT_FOUND,
                "",
                Some("HTTP status client error (404 Not Found)"),
                "empty body",
            ),
        ];
        let stage = error_for_status();
        for &(status, body, expected, label) in cases {
            let result = stage.call(wrapper_with(status, body)).await;
            match expected {
                None => assert!(result.is_ok(), "{label}"),
                Some(message) => {
                    let err = result.unwrap_err();
                    assert!(err.is_status(), "{label}");
                    assert_eq!(err.message(), message, "{label}");
                    assert_eq!(err.status(), Some(status), "{label}");
                    assert!(err.is_create_request() && err.is_send_request(), "{label}");
                }
            }
        }
    }

    #[tokio::test]
    async fn error_for_status_without_response_passes() {
        let request = Request::new("https://example.com/".to_owned(), RequestConfig::default());
        let wrapper = ResponseWrapper::new(request, None);
        assert!(error_for_status().call(wrapper).await.is_ok());
    }

    #[tokio::test]
    async fn auth_stages() {
        let req = || Request::new("https://example.com/".to_owned(), RequestConfig::default());

        let out = bearer_auth("abc123").call(req()).await.unwrap();
        assert_eq!(out.headers()[AUTHORIZATION], "Bearer abc123");
        assert!(out.headers()[AUTHORIZATION].is_sensitive());

        // (username, password, expected, label)
        let cases: &[(&str, Option<&str>, &str, &str)] = &[
            ("Aladdin", Some("open sesame"), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==", "with password"),
            ("user", None, "Basic dXNlcjo=", "without password"),
        ];
        for &(user, pass, expected, label) in cases {
            let out = basic_auth(user, pass).call(req()).await.unwrap();
            assert_eq!(out.headers()[AUTHORIZATION], expected, "{label}");
        }

        let err = bearer_auth("bad\ntoken").call(req()).await.unwrap_err();
        assert!(err.is_middleware());
    }

    #[tokio::test]
    async fn default_header_keeps_existing() {
        let stage = default_header(
            HeaderName::from_static("accept"),
            HeaderValue::from_static("application/json"),
        );

        let req = Request::new("https://example.com/".to_owned(), RequestConfig::default());
        let out = stage.call(req).await.unwrap();
        assert_eq!(out.headers()["accept"], "application/json");

        let mut req = Request::new("https://example.com/".to_owned(), RequestConfig::default());
        req.headers_mut().insert("accept", HeaderValue::from_static("text/csv"));
        let out = stage.call(req).await.unwrap();
        assert_eq!(out.headers()["accept"], "text/csv");
    }
}

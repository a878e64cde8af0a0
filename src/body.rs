//! Request body type.
//!
//! [`Body`] is the tagged set of payloads a request may carry: nothing,
//! text, raw bytes, structured form data, or a urlencoded form. Bodies are
//! always in memory so a [`Request`](crate::Request) can be cloned, replayed
//! through middleware, and attached to an [`Error`](crate::Error).

use crate::error::Error;
use crate::url::Query;
use bytes::Bytes;

/// `Content-Type` used for [`Body::Text`].
pub const TEXT_PLAIN: &str = "text/plain;charset=UTF-8";
/// `Content-Type` used for [`Body::UrlEncoded`].
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded;charset=UTF-8";
/// `Content-Type` used for JSON bodies.
pub const APPLICATION_JSON: &str = "application/json";

/// A request body.
///
/// # Example
///
/// ```rust
/// use fetchkit::{Body, FormData};
///
/// let body: Body = "hello".into();
/// assert_eq!(body.as_bytes(), Some(&b"hello"[..]));
///
/// let form = FormData::new().text("name", "fetchkit");
/// let body: Body = form.into();
/// assert!(body.as_bytes().is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// UTF-8 text.
    Text(String),
    /// A binary buffer.
    Bytes(Bytes),
    /// Structured `multipart/form-data`. The fetch primitive chooses the
    /// boundary, so no content type is implied here.
    Form(FormData),
    /// An `application/x-www-form-urlencoded` form.
    UrlEncoded(Query),
}

impl Body {
    /// Serialize `value` as a JSON body.
    ///
    /// # Errors
    ///
    /// Returns a builder error if `value` cannot be serialized.
    pub fn json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Body, Error> {
        serde_json::to_vec(value)
            .map(|v| Body::Bytes(Bytes::from(v)))
            .map_err(|e| Error::builder("failed to serialize JSON body").with_source(e))
    }

    /// Returns `true` for [`Body::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// View text and binary bodies as bytes.
    ///
    /// Returns `None` for the empty body and for forms, whose wire form is
    /// decided by the fetch primitive (or by [`to_bytes`](Self::to_bytes)
    /// for urlencoded forms).
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Text(s) => Some(s.as_bytes()),
            Body::Bytes(b) => Some(b),
            Body::Empty | Body::Form(_) | Body::UrlEncoded(_) => None,
        }
    }

    /// Encode the body for transmission.
    ///
    /// Returns `None` for [`Body::Form`], which needs a multipart encoder.
    pub fn to_bytes(&self) -> Option<Bytes> {
        match self {
            Body::Empty => Some(Bytes::new()),
            Body::Text(s) => Some(Bytes::copy_from_slice(s.as_bytes())),
            Body::Bytes(b) => Some(b.clone()),
            Body::UrlEncoded(q) => Some(Bytes::from(q.to_string())),
            Body::Form(_) => None,
        }
    }

    /// The `Content-Type` implied by the body variant, if any.
    ///
    /// Binary bodies and multipart forms imply none.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Body::Text(_) => Some(TEXT_PLAIN),
            Body::UrlEncoded(_) => Some(FORM_URLENCODED),
            Body::Empty | Body::Bytes(_) | Body::Form(_) => None,
        }
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Text(s)
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Text(s.to_owned())
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(v))
    }
}

impl From<&'static [u8]> for Body {
    fn from(s: &'static [u8]) -> Self {
        Body::Bytes(Bytes::from_static(s))
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Bytes(b)
    }
}

impl From<FormData> for Body {
    fn from(form: FormData) -> Self {
        Body::Form(form)
    }
}

impl From<Query> for Body {
    fn from(query: Query) -> Self {
        Body::UrlEncoded(query)
    }
}

// ---------------------------------------------------------------------------
// FormData
// ---------------------------------------------------------------------------

/// One field of a [`FormData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    /// A plain text field.
    Text(String),
    /// A file field.
    File {
        /// File contents.
        data: Bytes,
        /// File name sent in `Content-Disposition`.
        filename: Option<String>,
        /// MIME type of the part.
        content_type: Option<String>,
    },
}

/// Ordered `multipart/form-data` fields. Names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    parts: Vec<(String, FormPart)>,
}

impl FormData {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormPart::Text(value.into())));
        self
    }

    /// Add a file field.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        data: impl Into<Bytes>,
        filename: Option<String>,
        content_type: Option<String>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormPart::File {
                data: data.into(),
                filename,
                content_type,
            },
        ));
        self
    }

    /// Iterate over `(name, part)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormPart)> {
        self.parts.iter().map(|(name, part)| (name.as_str(), part))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns `true` if the form has no fields.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_from_conversions() {
        // (body, expected bytes, label)
        let cases: Vec<(Body, Option<&[u8]>, &str)> = vec![
            (Body::from("hello"), Some(b"hello"), "&str"),
            (Body::from(String::from("owned")), Some(b"owned"), "String"),
            (Body::from(vec![1u8, 2, 3]), Some(&[1, 2, 3]), "Vec<u8>"),
            (Body::from(&b"static"[..]), Some(b"static"), "&[u8]"),
            (Body::from(Bytes::from_static(b"bytes")), Some(b"bytes"), "Bytes"),
            (Body::default(), None, "default"),
            (Body::from(FormData::new().text("a", "1")), None, "form"),
        ];
        for (body, expected, label) in &cases {
            assert_eq!(body.as_bytes(), *expected, "{label}");
        }
    }

    #[test]
    fn content_type_per_variant() {
        // (body, expected content type, label)
        let cases: Vec<(Body, Option<&str>, &str)> = vec![
            (Body::Empty, None, "empty"),
            (Body::from("t"), Some(TEXT_PLAIN), "text"),
            (Body::from(vec![0u8]), None, "bytes"),
            (Body::from(FormData::new()), None, "multipart"),
            (Body::from(Query::parse("a=1")), Some(FORM_URLENCODED), "urlencoded"),
        ];
        for (body, expected, label) in &cases {
            assert_eq!(body.content_type(), *expected, "{label}");
        }
    }

    #[test]
    fn urlencoded_to_bytes() {
        let mut query = Query::new();
        query.append("q", "a b");
        query.append("q", "&");
        let body = Body::from(query);
        assert_eq!(body.to_bytes().unwrap(), Bytes::from_static(b"q=a+b&q=%26"));
        assert!(Body::from(FormData::new()).to_bytes().is_none());
    }

    #[test]
    fn json_body_serializes() {
        let body = Body::json(&serde_json::json!({"id": 42})).unwrap();
        assert_eq!(body.as_bytes(), Some(&br#"{"id":42}"#[..]));
    }

    #[test]
    fn form_keeps_order_and_duplicates() {
        let form = FormData::new()
            .text("tag", "a")
            .file("upload", &b"data"[..], Some("a.txt".into()), Some("text/plain".into()))
            .text("tag", "b");
        let names: Vec<&str> = form.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["tag", "upload", "tag"]);
        assert_eq!(form.len(), 3);
        assert!(!form.is_empty());
    }
}

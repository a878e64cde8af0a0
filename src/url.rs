//! Request URL model.
//!
//! [`RequestUrl`] keeps a URL as its semantic parts (protocol, host, port,
//! a pathname template, a placeholder table, an ordered query multi-map and
//! a hash) and only serializes them when a request is built.
//!
//! Parsing is done with plain string splitting rather than a WHATWG parser,
//! so it behaves the same everywhere and never fails: malformed input yields
//! best-effort fields.
//!
//! # Placeholders
//!
//! Path templates use the `:name` syntax. A placeholder starts at the
//! beginning of a path segment and runs over `[A-Za-z0-9_]`:
//!
//! | Template              | Params        | Output              |
//! |-----------------------|---------------|---------------------|
//! | `/users/:id`          | `id = 42`     | `/users/42`         |
//! | `/users/:id/posts`    | `id = a b`    | `/users/a%20b/posts`|
//! | `/users/:id`          | (none)        | `/users/:id`        |
//! | `/at/12:30`           | `30 = x`      | `/at/12:30`         |
//!
//! Values are percent-encoded as path segments; unresolved placeholders are
//! left as written.

use crate::record::{Params, ParamsInit, QueryInit};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::fmt;

/// Characters escaped when a placeholder value is spliced into a path.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const DEFAULT_PROTOCOL: &str = "http";
const DEFAULT_HOSTNAME: &str = "localhost";

// ---------------------------------------------------------------------------
// Query -- ordered multi-map
// ---------------------------------------------------------------------------

/// An ordered query multi-map.
///
/// Insertion order is preserved and keys may repeat, so
/// `a=1&a=2` survives a parse/serialize cycle unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` string.
    ///
    /// A single leading `?` is ignored.
    pub fn parse(input: &str) -> Self {
        let input = input.strip_prefix('?').unwrap_or(input);
        Self {
            pairs: form_urlencoded::parse(input.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        }
    }

    /// Build a query from decoded pairs.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Add a pair after all existing ones.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Add every pair of `other`, in order.
    pub fn extend(&mut self, other: Query) {
        self.pairs.extend(other.pairs);
    }

    /// Returns the first value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value stored under `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of pairs (not distinct keys).
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Consume the query and return its pairs.
    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }
}

impl fmt::Display for Query {
    /// Serializes as `application/x-www-form-urlencoded`, without a leading `?`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.pairs {
            ser.append_pair(k, v);
        }
        f.write_str(&ser.finish())
    }
}

// ---------------------------------------------------------------------------
// UrlParts -- structured constructor input
// ---------------------------------------------------------------------------

/// Structured input for [`RequestUrl::from_parts`].
///
/// Fields left as `None` keep the default location
/// (`http://localhost/`).
#[derive(Debug, Clone, Default)]
pub struct UrlParts {
    /// Prefix that replaces protocol/host/port assembly entirely.
    pub base_url: Option<String>,
    /// Scheme without `://` (a trailing `:` is tolerated).
    pub protocol: Option<String>,
    /// Host name.
    pub hostname: Option<String>,
    /// Port; `0`, empty or non-numeric values are omitted from the output.
    pub port: Option<String>,
    /// Path template, may contain `:name` placeholders.
    pub pathname: Option<String>,
    /// Initial query.
    pub query: Option<QueryInit>,
}

// ---------------------------------------------------------------------------
// RequestUrl
// ---------------------------------------------------------------------------

/// A request URL kept as semantic parts.
///
/// All mutators consume `self` and return the derived value, so a
/// `RequestUrl` held by a builder is never changed behind its back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUrl {
    base_url: String,
    protocol: String,
    hostname: String,
    /// Decimal digits without leading zeros, as written.
    port: Option<String>,
    pathname: String,
    params: Params,
    query: Query,
    hash: String,
}

impl Default for RequestUrl {
    /// The default location, `http://localhost/`.
    fn default() -> Self {
        Self {
            base_url: String::new(),
            protocol: DEFAULT_PROTOCOL.to_owned(),
            hostname: DEFAULT_HOSTNAME.to_owned(),
            port: None,
            pathname: "/".to_owned(),
            params: Params::new(),
            query: Query::new(),
            hash: String::new(),
        }
    }
}

impl RequestUrl {
    /// Parse a URL string against the default location
    /// (`http://localhost/`).
    ///
    /// Accepts absolute (`scheme://host[:port]/path?query#hash`),
    /// absolute-path (`/path`) and relative (`./path`, `../path`, `path`)
    /// forms. Never fails.
    pub fn parse(input: &str) -> Self {
        RequestUrl::default().resolve(input)
    }

    /// Parse a URL string using `self` as the current location.
    ///
    /// Relative forms are resolved against `self`'s pathname, which is
    /// treated as a directory: `./b` against `/a` gives `/a/b`, and
    /// `../b` against `/a/x` gives `/a/b`. Absolute URLs drop any
    /// configured base URL; other forms keep it. Params, query and hash are
    /// never inherited.
    pub fn resolve(&self, input: &str) -> Self {
        let input = input.trim();
        let (rest, hash) = match input.split_once('#') {
            Some((before, frag)) => (before, frag.to_owned()),
            None => (input, String::new()),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((before, q)) => (before, Query::parse(q)),
            None => (rest, Query::new()),
        };

        let mut url = RequestUrl {
            base_url: self.base_url.clone(),
            protocol: self.protocol.clone(),
            hostname: self.hostname.clone(),
            port: self.port.clone(),
            pathname: self.pathname.clone(),
            params: Params::new(),
            query,
            hash,
        };

        if let Some((scheme, after)) = split_scheme(rest) {
            let (authority, path) = match after.find('/') {
                Some(i) => after.split_at(i),
                None => (after, ""),
            };
            let (hostname, port) = split_authority(authority);
            url.base_url = String::new();
            url.protocol = scheme.to_ascii_lowercase();
            url.hostname = hostname.to_owned();
            url.port = parse_port(port);
            url.pathname = if path.is_empty() { "/".to_owned() } else { path.to_owned() };
        } else if rest.starts_with('/') {
            url.pathname = rest.to_owned();
        } else if !rest.is_empty() {
            url.pathname = join_relative(&self.pathname, rest);
        }

        trace!(input = input, pathname = %url.pathname, "parsed request url");
        url
    }

    /// Build a URL from structured parts over the default location.
    pub fn from_parts(parts: UrlParts) -> Self {
        let mut url = RequestUrl::default();
        if let Some(base_url) = parts.base_url {
            url.base_url = base_url;
        }
        if let Some(protocol) = parts.protocol {
            url.protocol = protocol.trim_end_matches(':').to_ascii_lowercase();
        }
        if let Some(hostname) = parts.hostname {
            url.hostname = hostname;
        }
        if let Some(port) = parts.port {
            url.port = parse_port(&port);
        }
        if let Some(pathname) = parts.pathname {
            url.pathname = pathname;
        }
        if let Some(query) = parts.query {
            url.query = query.into_query();
        }
        url
    }

    // -- accessors --

    /// The base URL prefix, empty when not configured.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The scheme, lowercased, without `://`.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// The host name.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The explicit port, if one is set, non-zero and within `u16` range.
    pub fn port(&self) -> Option<u16> {
        self.port.as_deref().and_then(|p| p.parse().ok())
    }

    /// The explicit port as it will be serialized.
    ///
    /// Unlike [`port()`](Self::port) this keeps out-of-range values such as
    /// `70000`, which are passed on for the fetch primitive to reject.
    pub fn port_str(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// The raw pathname template, placeholders unresolved.
    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// The placeholder table.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The query multi-map.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// The fragment, without `#`.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    // -- derived values --

    /// Replace the placeholder table with `init` merged into an empty one.
    #[must_use]
    pub fn set_params(mut self, init: impl Into<ParamsInit>) -> Self {
        let mut params = Params::new();
        init.into().merge_into(&mut params);
        self.params = params;
        self
    }

    /// Merge `init` into the existing placeholder table.
    #[must_use]
    pub fn append_params(mut self, init: impl Into<ParamsInit>) -> Self {
        init.into().merge_into(&mut self.params);
        self
    }

    /// Replace the whole query.
    #[must_use]
    pub fn set_query(mut self, init: impl Into<QueryInit>) -> Self {
        self.query = init.into().into_query();
        self
    }

    /// Add pairs after the existing query; nothing is removed.
    #[must_use]
    pub fn append_query(mut self, init: impl Into<QueryInit>) -> Self {
        self.query.extend(init.into().into_query());
        self
    }

    /// Append a path segment (or several, separated by `/`).
    #[must_use]
    pub fn append_url(mut self, segment: &str) -> Self {
        self.pathname.push('/');
        self.pathname.push_str(segment);
        self
    }

    /// Set the base URL prefix. An empty string turns base-URL mode off.
    #[must_use]
    pub fn set_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the scheme.
    #[must_use]
    pub fn set_protocol(mut self, protocol: &str) -> Self {
        self.protocol = protocol.trim_end_matches(':').to_ascii_lowercase();
        self
    }

    /// Set the host name.
    #[must_use]
    pub fn set_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set the port from a number or a string.
    ///
    /// `0`, an empty string and non-numeric input clear the port.
    #[must_use]
    pub fn set_port(mut self, port: impl ToString) -> Self {
        self.port = parse_port(&port.to_string());
        self
    }

    /// Replace the pathname template.
    #[must_use]
    pub fn set_pathname(mut self, pathname: impl Into<String>) -> Self {
        self.pathname = pathname.into();
        self
    }

    /// Set the fragment (a leading `#` is stripped).
    #[must_use]
    pub fn set_hash(mut self, hash: &str) -> Self {
        self.hash = hash.strip_prefix('#').unwrap_or(hash).to_owned();
        self
    }

    /// The pathname with placeholders resolved, a single leading `/`, and
    /// repeated slashes collapsed.
    pub fn resolved_pathname(&self) -> String {
        collapse_slashes(&substitute_placeholders(&self.pathname, &self.params))
    }
}

impl fmt::Display for RequestUrl {
    /// Serializes to a normalized absolute URL.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.resolved_pathname();
        if self.base_url.is_empty() {
            write!(f, "{}://{}", self.protocol, self.hostname)?;
            if let Some(port) = &self.port {
                write!(f, ":{port}")?;
            }
        } else {
            f.write_str(self.base_url.trim_end_matches('/'))?;
        }
        f.write_str(&path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        if !self.hash.is_empty() {
            write!(f, "#{}", self.hash)?;
        }
        Ok(())
    }
}

impl From<&str> for RequestUrl {
    fn from(input: &str) -> Self {
        RequestUrl::parse(input)
    }
}

impl From<UrlParts> for RequestUrl {
    fn from(parts: UrlParts) -> Self {
        RequestUrl::from_parts(parts)
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Split `scheme://rest`, requiring an RFC 3986 scheme
/// (`ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`).
fn split_scheme(input: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = input.split_once("://")?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some((scheme, rest))
}

/// Split an authority into `(hostname, port)`, dropping any userinfo.
///
/// Bracketed IPv6 hosts keep their brackets.
fn split_authority(authority: &str) -> (&str, &str) {
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    if host_port.starts_with('[') {
        return match host_port.find(']') {
            Some(end) => {
                let (host, tail) = host_port.split_at(end + 1);
                (host, tail.strip_prefix(':').unwrap_or(""))
            }
            None => (host_port, ""),
        };
    }
    match host_port.rsplit_once(':') {
        Some((host, port)) => (host, port),
        None => (host_port, ""),
    }
}

/// `0`, empty and non-numeric ports mean "no explicit port". Out-of-range
/// numbers are kept as written.
fn parse_port(port: &str) -> Option<String> {
    let port = port.trim();
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = port.trim_start_matches('0');
    if digits.is_empty() {
        return None;
    }
    if digits.parse::<u16>().is_err() {
        warn!(port = digits, "port out of range, kept as written");
    }
    Some(digits.to_owned())
}

/// Resolve a relative path against `current`, treated as a directory.
fn join_relative(current: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = current.split('/').filter(|s| !s.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    let mut joined = format!("/{}", segments.join("/"));
    if relative.ends_with('/') && !joined.ends_with('/') {
        joined.push('/');
    }
    joined
}

/// Replace `:name` tokens at the start of a path segment.
fn substitute_placeholders(template: &str, params: &Params) -> String {
    if params.is_empty() {
        return template.to_owned();
    }
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut at_segment_start = true;
    while let Some(c) = rest.chars().next() {
        if c == ':' && at_segment_start {
            let name_len = rest[1..]
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
                .unwrap_or(rest.len() - 1);
            let name = &rest[1..=name_len];
            if let Some(value) = params.get(name).filter(|_| !name.is_empty()) {
                out.extend(utf8_percent_encode(value, PATH_SEGMENT));
                rest = &rest[1 + name_len..];
                at_segment_start = false;
                continue;
            }
        }
        out.push(c);
        at_segment_start = c == '/';
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Collapse runs of `/` and guarantee exactly one leading `/`.
fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    out.push('/');
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- parse (data-driven) --

    /// Each entry: (input, protocol, hostname, port, pathname, query, hash).
    const PARSE_CASES: &[(&str, &str, &str, Option<u16>, &str, &str, &str)] = &[
        ("https://api.example.com/users/:id", "https", "api.example.com", None, "/users/:id", "", ""),
        ("http://localhost:8080/test", "http", "localhost", Some(8080), "/test", "", ""),
        ("https://example.com", "https", "example.com", None, "/", "", ""),
        ("HTTPS://Example.com/a?x=1&y=2#top", "https", "Example.com", None, "/a", "x=1&y=2", "top"),
        ("http://user:pw@host.test:9000/p", "http", "host.test", Some(9000), "/p", "", ""),
        ("http://[::1]:3000/v6", "http", "[::1]", Some(3000), "/v6", "", ""),
        ("http://example.com:0/zero", "http", "example.com", None, "/zero", "", ""),
        ("http://example.com:/empty", "http", "example.com", None, "/empty", "", ""),
        ("/absolute/path?q=1", "http", "localhost", None, "/absolute/path", "q=1", ""),
        ("./child", "http", "localhost", None, "/child", "", ""),
        ("relative/path", "http", "localhost", None, "/relative/path", "", ""),
    ];

    #[test]
    fn parse_table() {
        for &(input, protocol, hostname, port, pathname, query, hash) in PARSE_CASES {
            let url = RequestUrl::parse(input);
            assert_eq!(url.protocol(), protocol, "{input}: protocol");
            assert_eq!(url.hostname(), hostname, "{input}: hostname");
            assert_eq!(url.port(), port, "{input}: port");
            assert_eq!(url.pathname(), pathname, "{input}: pathname");
            assert_eq!(url.query().to_string(), query, "{input}: query");
            assert_eq!(url.hash(), hash, "{input}: hash");
        }
    }

    #[test]
    fn parse_malformed_is_best_effort() {
        // (input, expected serialization, label)
        let cases: &[(&str, &str, &str)] = &[
            ("", "http://localhost/", "empty"),
            ("1http://x/y", "http://localhost/1http:/x/y", "invalid scheme is a relative path"),
            ("http://", "http:///", "no host"),
            ("http://host:notaport/x", "http://host/x", "non-numeric port"),
            ("?only=query", "http://localhost/?only=query", "query only"),
        ];
        for &(input, expected, label) in cases {
            assert_eq!(RequestUrl::parse(input).to_string(), expected, "{label}");
        }
    }

    #[test]
    fn absolute_round_trip_normalizes() {
        // (input, expected, label)
        let cases: &[(&str, &str, &str)] = &[
            ("https://example.com/a/b?x=1&y=2#h", "https://example.com/a/b?x=1&y=2#h", "identity"),
            ("https://example.com//a///b", "https://example.com/a/b", "slashes collapsed"),
            ("http://example.com:8080/p?a=1&a=2&b=3", "http://example.com:8080/p?a=1&a=2&b=3", "repeated keys keep order"),
            ("https://example.com/dir/", "https://example.com/dir/", "trailing slash kept"),
            ("https://example.com/s?q=a+b", "https://example.com/s?q=a+b", "plus-encoded space"),
        ];
        for &(input, expected, label) in cases {
            let url = RequestUrl::parse(input);
            assert_eq!(url.to_string(), expected, "{label}");
            // Serializing the output again is stable.
            assert_eq!(RequestUrl::parse(&url.to_string()).to_string(), expected, "{label}: stable");
        }
    }

    #[test]
    fn resolve_against_current_location() {
        let current = RequestUrl::parse("https://example.com:8443/api/v1");
        // (input, expected, label)
        let cases: &[(&str, &str, &str)] = &[
            ("./users", "https://example.com:8443/api/v1/users", "dot slash"),
            ("../v2/users", "https://example.com:8443/api/v2/users", "dot dot"),
            ("../../../../root", "https://example.com:8443/root", "dot dot past root"),
            ("/health", "https://example.com:8443/health", "absolute path"),
            ("http://other.test/x", "http://other.test/x", "absolute url"),
            ("items/", "https://example.com:8443/api/v1/items/", "bare relative with slash"),
        ];
        for &(input, expected, label) in cases {
            assert_eq!(current.resolve(input).to_string(), expected, "{label}");
        }
    }

    // -- placeholders --

    #[test]
    fn placeholder_table() {
        // (template, params, expected path, label)
        let cases: &[(&str, &[(&str, &str)], &str, &str)] = &[
            ("/users/:id", &[("id", "42")], "/users/42", "single"),
            ("/orgs/:org/users/:id", &[("org", "acme"), ("id", "7")], "/orgs/acme/users/7", "two"),
            ("/users/:id/posts", &[("id", "a b/c")], "/users/a%20b%2Fc/posts", "encoded"),
            ("/users/:id", &[], "/users/:id", "unresolved"),
            ("/users/:id", &[("other", "x")], "/users/:id", "unknown key"),
            ("/at/12:30", &[("30", "x")], "/at/12:30", "mid-segment colon"),
            ("/a/:", &[("", "x")], "/a/:", "empty name"),
            ("/files/:name.json", &[("name", "report")], "/files/report.json", "suffix kept"),
        ];
        for &(template, params, expected, label) in cases {
            let url = RequestUrl::parse("https://example.com")
                .set_pathname(template)
                .set_params(params.to_vec());
            assert_eq!(url.resolved_pathname(), expected, "{label}");
        }
    }

    #[test]
    fn params_set_replaces_append_merges() {
        let url = RequestUrl::parse("https://example.com/:a/:b")
            .set_params([("a", "1"), ("b", "2")])
            .append_params([("b", "3")]);
        assert_eq!(url.to_string(), "https://example.com/1/3");

        let url = url.set_params([("a", "9")]);
        assert_eq!(url.to_string(), "https://example.com/9/:b");
    }

    // -- query --

    #[test]
    fn query_multimap_semantics() {
        let url = RequestUrl::parse("https://example.com/q")
            .append_query([("a", "1")])
            .append_query([("a", "2")]);
        assert_eq!(url.query().get_all("a"), vec!["1", "2"]);
        assert_eq!(url.to_string(), "https://example.com/q?a=1&a=2");

        let url = url.set_query([("a", "2")]);
        assert_eq!(url.query().get_all("a"), vec!["2"]);
        assert_eq!(url.to_string(), "https://example.com/q?a=2");
    }

    #[test]
    fn empty_query_omits_question_mark() {
        let url = RequestUrl::parse("https://example.com/q?a=1").set_query("");
        assert_eq!(url.to_string(), "https://example.com/q");
    }

    // -- ports --

    #[test]
    fn port_omission_table() {
        // (port input, expected serialization, label)
        let cases: &[(&str, &str, &str)] = &[
            ("0", "http://h/", "zero"),
            ("", "http://h/", "empty"),
            ("abc", "http://h/", "non-numeric"),
            ("8080", "http://h:8080/", "numeric"),
            ("0443", "http://h:443/", "leading zero"),
            ("70000", "http://h:70000/", "out of range kept"),
        ];
        for &(port, expected, label) in cases {
            let url = RequestUrl::parse("http://h").set_port(port);
            assert_eq!(url.to_string(), expected, "{label}");
        }
        assert_eq!(RequestUrl::parse("http://h").set_port(9000u16).port(), Some(9000));

        let wide = RequestUrl::parse("http://h:70000/x");
        assert_eq!(wide.to_string(), "http://h:70000/x");
        assert_eq!(wide.port(), None);
        assert_eq!(wide.port_str(), Some("70000"));
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn out_of_range_port_warns() {
        let (recorder, _guard) = crate::tracing::LevelRecorder::install();
        let _ = RequestUrl::parse("http://h:8080/x");
        assert_eq!(recorder.count(::tracing::Level::WARN), 0, "in range");
        let _ = RequestUrl::parse("http://h:70000/x");
        assert_eq!(recorder.count(::tracing::Level::WARN), 1, "out of range");
    }

    // -- base url / parts --

    #[test]
    fn base_url_bypasses_host_assembly() {
        let url = RequestUrl::from_parts(UrlParts {
            base_url: Some("https://gateway.test/api/".to_owned()),
            protocol: Some("ftp".to_owned()),
            hostname: Some("ignored".to_owned()),
            pathname: Some("//users/:id".to_owned()),
            query: Some(QueryInit::from("page=2")),
            ..UrlParts::default()
        })
        .set_params([("id", "5")]);
        assert_eq!(url.to_string(), "https://gateway.test/api/users/5?page=2");
    }

    #[test]
    fn relative_resolve_keeps_base_url() {
        let base = RequestUrl::default().set_base_url("https://gateway.test/v1");
        assert_eq!(base.resolve("/users").to_string(), "https://gateway.test/v1/users");
        assert_eq!(base.resolve("https://direct.test/x").to_string(), "https://direct.test/x");
    }

    #[test]
    fn append_url_joins_with_single_slash() {
        let url = RequestUrl::parse("https://example.com/api/")
            .append_url("/users")
            .append_url("42");
        assert_eq!(url.to_string(), "https://example.com/api/users/42");
    }

    #[test]
    fn from_parts_defaults() {
        let url = RequestUrl::from_parts(UrlParts {
            protocol: Some("https:".to_owned()),
            hostname: Some("example.com".to_owned()),
            port: Some("443".to_owned()),
            ..UrlParts::default()
        });
        assert_eq!(url.to_string(), "https://example.com:443/");
    }
}

//! Boundary conversions for params, query and header inputs.
//!
//! Callers hand the builder a mapping, a list of pairs, or a transform
//! function. Each input type is an explicit variant here; it is evaluated
//! once, at the call, and folded straight into the canonical representation
//! (`BTreeMap` for params, [`Query`] for query strings, [`HeaderMap`] for
//! headers).

use crate::error::Error;
use crate::url::Query;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::{BTreeMap, HashMap};

/// Placeholder-name to value table.
pub type Params = BTreeMap<String, String>;

type ParamsFn = Box<dyn FnOnce(&mut Params)>;
type HeadersFn = Box<dyn FnOnce(&mut HeaderMap)>;

// ---------------------------------------------------------------------------
// ParamsInit
// ---------------------------------------------------------------------------

/// Input accepted by `set_params` / `append_params`.
pub enum ParamsInit {
    /// Key/value pairs; later pairs overwrite earlier ones with the same key.
    Pairs(Vec<(String, String)>),
    /// A function that edits the table in place.
    Transform(ParamsFn),
}

impl ParamsInit {
    /// Wrap a transform function.
    pub fn transform(f: impl FnOnce(&mut Params) + 'static) -> Self {
        ParamsInit::Transform(Box::new(f))
    }

    /// Fold this input into `target`.
    pub(crate) fn merge_into(self, target: &mut Params) {
        match self {
            ParamsInit::Pairs(pairs) => {
                for (key, value) in pairs {
                    target.insert(key, value);
                }
            }
            ParamsInit::Transform(f) => f(target),
        }
    }
}

impl std::fmt::Debug for ParamsInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamsInit::Pairs(pairs) => f.debug_tuple("Pairs").field(pairs).finish(),
            ParamsInit::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

fn owned_pairs<K, V>(iter: impl IntoIterator<Item = (K, V)>) -> Vec<(String, String)>
where
    K: Into<String>,
    V: Into<String>,
{
    iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for ParamsInit {
    fn from(pairs: Vec<(K, V)>) -> Self {
        ParamsInit::Pairs(owned_pairs(pairs))
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for ParamsInit {
    fn from(pairs: [(K, V); N]) -> Self {
        ParamsInit::Pairs(owned_pairs(pairs))
    }
}

impl<K: Into<String>, V: Into<String>> From<HashMap<K, V>> for ParamsInit {
    fn from(map: HashMap<K, V>) -> Self {
        ParamsInit::Pairs(owned_pairs(map))
    }
}

impl<K: Into<String>, V: Into<String>> From<BTreeMap<K, V>> for ParamsInit {
    fn from(map: BTreeMap<K, V>) -> Self {
        ParamsInit::Pairs(owned_pairs(map))
    }
}

// ---------------------------------------------------------------------------
// QueryInit
// ---------------------------------------------------------------------------

/// Input accepted by `set_query` / `append_query`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryInit {
    /// An `application/x-www-form-urlencoded` string, with or without a
    /// leading `?`.
    Encoded(String),
    /// Decoded key/value pairs, kept in order. Keys may repeat.
    Pairs(Vec<(String, String)>),
}

impl QueryInit {
    /// Convert into the canonical multi-map.
    pub(crate) fn into_query(self) -> Query {
        match self {
            QueryInit::Encoded(s) => Query::parse(&s),
            QueryInit::Pairs(pairs) => Query::from_pairs(pairs),
        }
    }
}

impl From<&str> for QueryInit {
    fn from(s: &str) -> Self {
        QueryInit::Encoded(s.to_owned())
    }
}

impl From<String> for QueryInit {
    fn from(s: String) -> Self {
        QueryInit::Encoded(s)
    }
}

impl From<Query> for QueryInit {
    fn from(query: Query) -> Self {
        QueryInit::Pairs(query.into_pairs())
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for QueryInit {
    fn from(pairs: Vec<(K, V)>) -> Self {
        QueryInit::Pairs(owned_pairs(pairs))
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for QueryInit {
    fn from(pairs: [(K, V); N]) -> Self {
        QueryInit::Pairs(owned_pairs(pairs))
    }
}

impl<K: Into<String>, V: Into<String>> From<BTreeMap<K, V>> for QueryInit {
    fn from(map: BTreeMap<K, V>) -> Self {
        QueryInit::Pairs(owned_pairs(map))
    }
}

// ---------------------------------------------------------------------------
// HeadersInit
// ---------------------------------------------------------------------------

/// Input accepted by `set_header` / `append_header`.
pub enum HeadersInit {
    /// An already-validated header map.
    Map(HeaderMap),
    /// Raw name/value pairs, validated when merged.
    Pairs(Vec<(String, String)>),
    /// A function that edits the header map in place.
    Transform(HeadersFn),
}

/// How [`HeadersInit::merge_into`] treats names already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderMerge {
    /// Last write wins per name.
    Set,
    /// Add another value under the same name.
    Append,
}

impl HeadersInit {
    /// Wrap a transform function.
    pub fn transform(f: impl FnOnce(&mut HeaderMap) + 'static) -> Self {
        HeadersInit::Transform(Box::new(f))
    }

    /// Fold this input into `target`.
    ///
    /// With [`HeaderMerge::Set`], every name in the input replaces all
    /// existing values for that name; values repeated *within* the input
    /// are all kept. Transform functions always see (and edit) the live map.
    pub(crate) fn merge_into(self, target: &mut HeaderMap, mode: HeaderMerge) -> Result<(), Error> {
        let incoming = match self {
            HeadersInit::Transform(f) => {
                f(target);
                return Ok(());
            }
            HeadersInit::Map(map) => map,
            HeadersInit::Pairs(pairs) => {
                let mut map = HeaderMap::with_capacity(pairs.len());
                for (name, value) in pairs {
                    let name = HeaderName::from_bytes(name.as_bytes())
                        .map_err(|e| Error::builder("invalid header name").with_source(e))?;
                    let value = HeaderValue::from_str(&value)
                        .map_err(|e| Error::builder("invalid header value").with_source(e))?;
                    map.append(name, value);
                }
                map
            }
        };

        if mode == HeaderMerge::Set {
            for name in incoming.keys() {
                target.remove(name);
            }
        }
        for (name, value) in &incoming {
            target.append(name.clone(), value.clone());
        }
        Ok(())
    }
}

impl std::fmt::Debug for HeadersInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeadersInit::Map(map) => f.debug_tuple("Map").field(map).finish(),
            HeadersInit::Pairs(pairs) => f.debug_tuple("Pairs").field(pairs).finish(),
            HeadersInit::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

impl From<HeaderMap> for HeadersInit {
    fn from(map: HeaderMap) -> Self {
        HeadersInit::Map(map)
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for HeadersInit {
    fn from(pairs: Vec<(K, V)>) -> Self {
        HeadersInit::Pairs(owned_pairs(pairs))
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for HeadersInit {
    fn from(pairs: [(K, V); N]) -> Self {
        HeadersInit::Pairs(owned_pairs(pairs))
    }
}

impl<K: Into<String>, V: Into<String>> From<HashMap<K, V>> for HeadersInit {
    fn from(map: HashMap<K, V>) -> Self {
        HeadersInit::Pairs(owned_pairs(map))
    }
}

impl<K: Into<String>, V: Into<String>> From<BTreeMap<K, V>> for HeadersInit {
    fn from(map: BTreeMap<K, V>) -> Self {
        HeadersInit::Pairs(owned_pairs(map))
    }
}

//! Response header bag and its CloudFront serialization.

use crate::edge::event::{CfHeader, CfHeaders};
use std::collections::BTreeMap;

/// Response headers the platform reserves; never emitted from the generic
/// header bag.
pub const RESERVED_RESPONSE_HEADERS: [&str; 17] = [
    "age",
    "authorization",
    "content-length",
    "content-type",
    "etag",
    "expires",
    "from",
    "host",
    "if-modified-since",
    "if-unmodified-since",
    "last-modified",
    "location",
    "max-forwards",
    "proxy-authorization",
    "referer",
    "retry-after",
    "user-agent",
];

/// Headers CloudFront rejects when set by a function.
pub const READ_ONLY_HEADERS: [&str; 8] = [
    "accept-encoding",
    "content-length",
    "if-modified-since",
    "if-none-match",
    "if-range",
    "if-unmodified-since",
    "transfer-encoding",
    "via",
];

/// Whether a lower-case header name must be dropped on serialization.
pub fn is_denied(name: &str) -> bool {
    RESERVED_RESPONSE_HEADERS.contains(&name) || READ_ONLY_HEADERS.contains(&name)
}

/// A single or multi-valued header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    One(String),
    Many(Vec<String>),
}

impl HeaderValue {
    /// All values in order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            HeaderValue::One(v) => std::slice::from_ref(v),
            HeaderValue::Many(vs) => vs,
        };
        values.iter().map(String::as_str)
    }

    /// First value, if any.
    pub fn first(&self) -> Option<&str> {
        self.values().next()
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::One(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::One(value)
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        HeaderValue::Many(values)
    }
}

impl From<Vec<&str>> for HeaderValue {
    fn from(values: Vec<&str>) -> Self {
        HeaderValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

impl From<u64> for HeaderValue {
    fn from(value: u64) -> Self {
        HeaderValue::One(value.to_string())
    }
}

/// Case-insensitive header map; names are stored lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    inner: BTreeMap<String, HeaderValue>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<HeaderValue>) {
        self.inner.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        self.inner.remove(&name.to_ascii_lowercase())
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.inner.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Serialize into CloudFront's `name -> [{key, value}]` form, dropping
    /// denied headers.
    pub fn to_cloudfront(&self) -> CfHeaders {
        self.inner
            .iter()
            .filter(|(name, _)| !is_denied(name))
            .map(|(name, value)| {
                let entries = value.values().map(|v| CfHeader::new(name.as_str(), v)).collect();
                (name.clone(), entries)
            })
            .collect()
    }

    /// Serialize platform headers: one entry per name, read-only headers
    /// dropped.
    pub fn to_cloudfront_single(&self) -> CfHeaders {
        self.inner
            .iter()
            .filter(|(name, _)| !READ_ONLY_HEADERS.contains(&name.as_str()))
            .filter_map(|(name, value)| {
                let value = value.first()?;
                Some((name.clone(), vec![CfHeader::new(name.as_str(), value)]))
            })
            .collect()
    }
}

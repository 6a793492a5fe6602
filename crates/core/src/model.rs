//! Request, response and namespace types shared by the store and the router.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::hash::compute_cache_key;

/// A version-tagged generation of cached entries.
///
/// Exactly one namespace is current at a time. Activating a new version
/// deletes every other namespace from the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Build the namespace for a given cache version, e.g. `offcache-v2`.
    pub fn versioned(prefix: &str, version: u32) -> Self {
        Self(format!("{prefix}-v{version}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The version number, if this namespace was built by `versioned(prefix, _)`.
    pub fn version_for(&self, prefix: &str) -> Option<u32> {
        self.0.strip_prefix(prefix)?.strip_prefix("-v")?.parse().ok()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse classification of a requested resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Image,
    Document,
    Script,
    Style,
    Font,
    Data,
    Other,
}

impl ResourceKind {
    /// Static assets are versioned together with the cache namespace.
    pub fn is_static(self) -> bool {
        matches!(self, ResourceKind::Document | ResourceKind::Script | ResourceKind::Style | ResourceKind::Font)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Document => "document",
            ResourceKind::Script => "script",
            ResourceKind::Style => "style",
            ResourceKind::Font => "font",
            ResourceKind::Data => "data",
            ResourceKind::Other => "other",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An intercepted request: method plus canonical URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: String,
    url: Url,
}

impl RequestDescriptor {
    /// The method is upper-cased and the URL fragment dropped, so that
    /// equivalent requests share one cache key.
    pub fn new(method: &str, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method: method.trim().to_ascii_uppercase(), url }
    }

    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Only GET requests are safe to cache.
    pub fn is_safe(&self) -> bool {
        self.method == "GET"
    }

    /// Cache key for this request, or `None` when it must never touch the cache.
    pub fn cache_key(&self) -> Option<String> {
        self.is_safe()
            .then(|| compute_cache_key(&self.method, self.url.as_str()))
    }
}

/// A response captured from the network or read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl CapturedResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, content_type: None, headers: Vec::new(), body: body.into() }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// A stored response and the request identity it was captured for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub method: String,
    pub url: String,
    pub response: CapturedResponse,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Capture a response for storage. Returns `None` for requests without a cache key.
    pub fn capture(request: &RequestDescriptor, response: CapturedResponse) -> Option<Self> {
        let key = request.cache_key()?;
        Some(Self {
            key,
            method: request.method().to_string(),
            url: request.url().to_string(),
            response,
            stored_at: Utc::now(),
        })
    }
}

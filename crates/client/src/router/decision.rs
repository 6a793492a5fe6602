//! Strategy selection.
//!
//! A pure function of the request classification and connectivity. Nothing
//! here touches the store or the network.

use offcache_core::ResourceKind;
use serde::{Deserialize, Serialize};

/// Host-provided connectivity signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Online,
    Offline,
}

impl From<bool> for Connectivity {
    /// `true` means online.
    fn from(online: bool) -> Self {
        if online { Connectivity::Online } else { Connectivity::Offline }
    }
}

/// The four request-handling policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheOnly,
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::CacheOnly => "cache_only",
            Strategy::CacheFirst => "cache_first",
            Strategy::NetworkFirst => "network_first",
            Strategy::StaleWhileRevalidate => "stale_while_revalidate",
        }
    }
}

/// Classification of one request, computed before any I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestClass {
    /// Method is GET.
    pub is_safe: bool,
    /// Origin differs from the page origin.
    pub is_remote: bool,
    pub kind: ResourceKind,
}

/// Pick the strategy for a classified request.
///
/// | connectivity | remote | kind | strategy |
/// |---|---|---|---|
/// | offline | any | any | CacheOnly |
/// | online | any | any (non-GET) | NetworkFirst |
/// | online | any | Data | NetworkFirst |
/// | online | yes | Image | StaleWhileRevalidate |
/// | online | yes | Other | NetworkFirst |
/// | online | yes | Document/Script/Style/Font | CacheFirst |
/// | online | no | anything else | CacheFirst |
///
/// Unsafe requests never have a cache key, so their NetworkFirst run never
/// reads or writes the store.
pub fn select_strategy(class: &RequestClass, connectivity: Connectivity) -> Strategy {
    if connectivity == Connectivity::Offline {
        return Strategy::CacheOnly;
    }
    if !class.is_safe {
        return Strategy::NetworkFirst;
    }

    match (class.is_remote, class.kind) {
        (_, ResourceKind::Data) => Strategy::NetworkFirst,
        (true, ResourceKind::Image) => Strategy::StaleWhileRevalidate,
        (true, ResourceKind::Other) => Strategy::NetworkFirst,
        _ => Strategy::CacheFirst,
    }
}

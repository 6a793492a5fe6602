//! Request routing: classify, pick a strategy, execute it.
//!
//! `route` always produces exactly one result per request. Store failures are
//! logged and treated as a miss (reads) or skipped (writes); only the
//! [`Failure`] cases reach the caller.

pub mod decision;
pub mod revalidate;
mod strategy;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use offcache_core::{
    AppConfig, CacheEntry, CacheStore, CapturedResponse, ConfigError, Error, Namespace, RequestDescriptor,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use url::Url;

use crate::classify::Classifier;
use crate::fetch::Network;

pub use decision::{Connectivity, RequestClass, Strategy, select_strategy};
pub use revalidate::{RevalidationEvent, RevalidationOutcome};

/// Why a request could not be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    /// Offline and nothing cached for the request.
    #[error("NOT_FOUND_OFFLINE: no cached response while offline")]
    NotFoundOffline,

    /// The network failed and there was no cached fallback.
    #[error("UNREACHABLE: network unavailable and no cached response")]
    Unreachable,

    /// The network fetch exceeded its time bound and there was no cached fallback.
    #[error("TIMEOUT: network fetch timed out")]
    Timeout,
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Network,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Cache => "cache",
            Source::Network => "network",
        }
    }
}

/// A successfully routed request.
#[derive(Debug, Clone)]
pub struct Served {
    pub response: CapturedResponse,
    pub strategy: Strategy,
    pub source: Source,
    /// Insertion time of the cache entry, for cache-sourced responses.
    pub stored_at: Option<DateTime<Utc>>,
}

impl Served {
    fn from_cache(entry: CacheEntry, strategy: Strategy) -> Self {
        Self { response: entry.response, strategy, source: Source::Cache, stored_at: Some(entry.stored_at) }
    }

    fn from_network(response: CapturedResponse, strategy: Strategy) -> Self {
        Self { response, strategy, source: Source::Network, stored_at: None }
    }
}

/// Router settings.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Page origin; requests elsewhere are remote.
    pub origin: Url,
    /// Upper bound on every network fetch.
    pub fetch_timeout: Duration,
    /// Whether a 2xx network-first response also replaces the cached copy.
    pub refresh_on_network_first: bool,
    pub classifier: Classifier,
}

impl RouterConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            fetch_timeout: Duration::from_secs(10),
            refresh_on_network_first: true,
            classifier: Classifier::default(),
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            origin: config.origin_url()?,
            fetch_timeout: config.timeout(),
            refresh_on_network_first: config.refresh_on_network_first,
            classifier: Classifier::from_config(config),
        })
    }
}

/// Answers requests from the current namespace and the network.
///
/// Obtained from [`crate::Lifecycle::activate`], so stale namespaces are
/// always gone before the first request is routed. Cloning is cheap and
/// clones share the store, network and event channel.
#[derive(Clone)]
pub struct RequestRouter {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    namespace: Namespace,
    config: Arc<RouterConfig>,
    events: broadcast::Sender<RevalidationEvent>,
}

impl RequestRouter {
    pub(crate) fn new(
        store: Arc<dyn CacheStore>, network: Arc<dyn Network>, namespace: Namespace, config: RouterConfig,
    ) -> Self {
        Self { store, network, namespace, config: Arc::new(config), events: revalidate::channel() }
    }

    /// The namespace this router reads and writes.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Receive an event for every background revalidation that finishes after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RevalidationEvent> {
        self.events.subscribe()
    }

    pub fn classify(&self, request: &RequestDescriptor) -> RequestClass {
        RequestClass {
            is_safe: request.is_safe(),
            is_remote: request.url().origin() != self.config.origin.origin(),
            kind: self.config.classifier.classify(request.url()),
        }
    }

    /// The strategy `route` would run, without running it.
    pub fn decide(&self, request: &RequestDescriptor, connectivity: Connectivity) -> Strategy {
        select_strategy(&self.classify(request), connectivity)
    }

    /// Answer one request.
    pub async fn route(&self, request: &RequestDescriptor, connectivity: Connectivity) -> Result<Served, Failure> {
        let class = self.classify(request);
        let strategy = select_strategy(&class, connectivity);

        tracing::debug!(
            method = request.method(),
            url = %request.url(),
            kind = %class.kind,
            remote = class.is_remote,
            strategy = strategy.as_str(),
            "routing request"
        );

        let result = match strategy {
            Strategy::CacheOnly => self.cache_only(request).await,
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        };

        if let Err(failure) = &result {
            tracing::info!(url = %request.url(), %failure, "request could not be answered");
        }

        result
    }

    /// Read the current namespace without touching the network.
    ///
    /// Unlike routing, store errors are returned to the caller.
    pub async fn cached(&self, request: &RequestDescriptor) -> Result<Option<CacheEntry>, Error> {
        match request.cache_key() {
            Some(key) => self.store.match_entry(&self.namespace, &key).await,
            None => Ok(None),
        }
    }

    async fn lookup(&self, request: &RequestDescriptor) -> Option<CacheEntry> {
        let key = request.cache_key()?;
        match self.store.match_entry(&self.namespace, &key).await {
            Ok(entry) => {
                tracing::debug!(url = %request.url(), hit = entry.is_some(), "cache lookup");
                entry
            }
            Err(e) => {
                tracing::warn!(url = %request.url(), error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store a copy of a 2xx response. Other responses and store errors are skipped.
    async fn remember(&self, request: &RequestDescriptor, response: &CapturedResponse) {
        if !response.is_success() {
            return;
        }
        let Some(entry) = CacheEntry::capture(request, response.clone()) else {
            return;
        };
        if let Err(e) = self.store.put(&self.namespace, &entry).await {
            tracing::warn!(url = %request.url(), error = %e, "cache write failed, skipping");
        }
    }

    async fn fetch(&self, request: &RequestDescriptor) -> Result<CapturedResponse, Failure> {
        fetch_bounded(self.network.as_ref(), request, self.config.fetch_timeout).await
    }
}

/// Fetch with an upper time bound, folding network errors into [`Failure`].
pub(crate) async fn fetch_bounded(
    network: &dyn Network, request: &RequestDescriptor, timeout: Duration,
) -> Result<CapturedResponse, Failure> {
    match tokio::time::timeout(timeout, network.fetch(request)).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(Error::FetchTimeout(msg))) => {
            tracing::warn!(url = %request.url(), %msg, "network fetch timed out");
            Err(Failure::Timeout)
        }
        Ok(Err(e)) => {
            tracing::warn!(url = %request.url(), error = %e, "network fetch failed");
            Err(Failure::Unreachable)
        }
        Err(_) => {
            tracing::warn!(url = %request.url(), ?timeout, "network fetch exceeded time bound");
            Err(Failure::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubNetwork, UnavailableStore};
    use offcache_core::CacheDb;

    const ORIGIN: &str = "https://example.com";

    fn request(url: &str) -> RequestDescriptor {
        RequestDescriptor::get(Url::parse(url).unwrap())
    }

    fn config() -> RouterConfig {
        RouterConfig {
            fetch_timeout: Duration::from_millis(200),
            classifier: Classifier::default().with_image_host("picsum.photos"),
            ..RouterConfig::new(Url::parse(ORIGIN).unwrap())
        }
    }

    async fn setup() -> (RequestRouter, Arc<CacheDb>, Arc<StubNetwork>) {
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let network = Arc::new(StubNetwork::default());
        let namespace = Namespace::versioned("offcache", 1);
        store.open(&namespace).await.unwrap();
        let router = RequestRouter::new(store.clone(), network.clone(), namespace, config());
        (router, store, network)
    }

    async fn seed(router: &RequestRouter, store: &CacheDb, url: &str, body: &str) {
        let entry = CacheEntry::capture(&request(url), CapturedResponse::new(200, body.to_string())).unwrap();
        store.put(router.namespace(), &entry).await.unwrap();
    }

    #[tokio::test]
    async fn test_offline_never_fetches() {
        let (router, store, network) = setup().await;
        seed(&router, &store, "https://example.com/app.js", "cached").await;
        network.respond("https://example.com/app.js", 200, "fresh");

        let urls = [
            "https://example.com/app.js",
            "https://example.com/missing.css",
            "https://example.com/api/items.json",
            "https://picsum.photos/200/300",
            "https://other.example.org/page",
        ];
        for url in urls {
            let _ = router.route(&request(url), Connectivity::Offline).await;
        }
        let post = RequestDescriptor::new("POST", Url::parse("https://example.com/api").unwrap());
        let _ = router.route(&post, Connectivity::Offline).await;

        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_offline_hit_and_miss() {
        let (router, store, _network) = setup().await;
        seed(&router, &store, "https://example.com/app.js", "cached").await;

        let served = router.route(&request("https://example.com/app.js"), Connectivity::Offline).await.unwrap();
        assert_eq!(served.response.text(), "cached");
        assert_eq!(served.strategy, Strategy::CacheOnly);
        assert_eq!(served.source, Source::Cache);
        assert!(served.stored_at.is_some());

        let missing = router.route(&request("https://example.com/missing.js"), Connectivity::Offline).await;
        assert_eq!(missing.unwrap_err(), Failure::NotFoundOffline);
    }

    #[tokio::test]
    async fn test_cache_first_hit_is_idempotent_without_fetching() {
        let (router, store, network) = setup().await;
        seed(&router, &store, "https://example.com/css/main.css", "body{}").await;
        network.respond("https://example.com/css/main.css", 200, "changed");

        for _ in 0..5 {
            let served =
                router.route(&request("https://example.com/css/main.css"), Connectivity::Online).await.unwrap();
            assert_eq!(served.strategy, Strategy::CacheFirst);
            assert_eq!(served.source, Source::Cache);
            assert_eq!(served.response.text(), "body{}");
        }
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_miss_fetches_and_stores() {
        let (router, _store, network) = setup().await;
        network.respond("https://example.com/js/app.js", 200, "let a;");

        let first = router.route(&request("https://example.com/js/app.js"), Connectivity::Online).await.unwrap();
        assert_eq!(first.source, Source::Network);

        let second = router.route(&request("https://example.com/js/app.js"), Connectivity::Online).await.unwrap();
        assert_eq!(second.source, Source::Cache);
        assert_eq!(second.response.text(), "let a;");
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_first_does_not_store_errors() {
        let (router, _store, network) = setup().await;
        network.respond("https://example.com/gone.html", 404, "not found");

        let served = router.route(&request("https://example.com/gone.html"), Connectivity::Online).await.unwrap();
        assert_eq!(served.response.status, 404);
        assert!(router.cached(&request("https://example.com/gone.html")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_first_unreachable() {
        let (router, _store, network) = setup().await;
        network.fail("https://example.com/index.html");

        let result = router.route(&request("https://example.com/index.html"), Connectivity::Online).await;
        assert_eq!(result.unwrap_err(), Failure::Unreachable);
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_serves_new_value_next_time() {
        let (router, store, network) = setup().await;
        let url = "https://picsum.photos/200/300";
        seed(&router, &store, url, "old").await;
        network.respond(url, 200, "new");
        let mut events = router.subscribe();

        let first = router.route(&request(url), Connectivity::Online).await.unwrap();
        assert_eq!(first.strategy, Strategy::StaleWhileRevalidate);
        assert_eq!(first.source, Source::Cache);
        assert_eq!(first.response.text(), "old");

        let event = events.recv().await.unwrap();
        assert_eq!(event.url, url);
        assert_eq!(event.outcome, RevalidationOutcome::Refreshed);

        let second = router.route(&request(url), Connectivity::Online).await.unwrap();
        assert_eq!(second.source, Source::Cache);
        assert_eq!(second.response.text(), "new");
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_hit_does_not_wait_for_network() {
        let (router, store, network) = setup().await;
        let url = "https://picsum.photos/id/3/100";
        seed(&router, &store, url, "old").await;
        network.hang(url);
        let mut events = router.subscribe();

        let served = tokio::time::timeout(Duration::from_millis(50), router.route(&request(url), Connectivity::Online))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response.text(), "old");

        let event = events.recv().await.unwrap();
        assert!(matches!(event.outcome, RevalidationOutcome::Failed { reason } if reason.starts_with("TIMEOUT")));
        assert_eq!(router.cached(&request(url)).await.unwrap().unwrap().response.text(), "old");
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_failure_is_contained() {
        let (router, store, network) = setup().await;
        let url = "https://picsum.photos/id/7/100";
        seed(&router, &store, url, "old").await;
        network.fail(url);
        let mut events = router.subscribe();

        let served = router.route(&request(url), Connectivity::Online).await.unwrap();
        assert_eq!(served.response.text(), "old");

        let event = events.recv().await.unwrap();
        assert!(matches!(event.outcome, RevalidationOutcome::Failed { .. }));

        let again = router.cached(&request(url)).await.unwrap().unwrap();
        assert_eq!(again.response.text(), "old");
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_keeps_entry_on_error_status() {
        let (router, store, network) = setup().await;
        let url = "https://picsum.photos/id/9/100";
        seed(&router, &store, url, "old").await;
        network.respond(url, 503, "busy");
        let mut events = router.subscribe();

        router.route(&request(url), Connectivity::Online).await.unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.outcome, RevalidationOutcome::Rejected { status: 503 });
        assert_eq!(router.cached(&request(url)).await.unwrap().unwrap().response.text(), "old");
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_miss_fetches_inline() {
        let (router, _store, network) = setup().await;
        let url = "https://picsum.photos/400";
        network.respond(url, 200, "pixels");

        let served = router.route(&request(url), Connectivity::Online).await.unwrap();
        assert_eq!(served.source, Source::Network);
        assert_eq!(served.response.text(), "pixels");
        assert!(router.cached(&request(url)).await.unwrap().is_some());

        network.fail("https://picsum.photos/401");
        let failed = router.route(&request("https://picsum.photos/401"), Connectivity::Online).await;
        assert_eq!(failed.unwrap_err(), Failure::Unreachable);
    }

    #[tokio::test]
    async fn test_network_first_server_error_falls_back_to_cache() {
        let (router, store, network) = setup().await;
        let url = "https://example.com/api/posts.json";
        seed(&router, &store, url, "[1]").await;
        network.respond(url, 500, "oops");

        let served = router.route(&request(url), Connectivity::Online).await.unwrap();
        assert_eq!(served.strategy, Strategy::NetworkFirst);
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response.text(), "[1]");
    }

    #[tokio::test]
    async fn test_network_first_server_error_without_cache_is_unreachable() {
        let (router, _store, network) = setup().await;
        let url = "https://example.com/api/posts.json";
        network.respond(url, 500, "oops");

        let result = router.route(&request(url), Connectivity::Online).await;
        assert_eq!(result.unwrap_err(), Failure::Unreachable);
    }

    #[tokio::test]
    async fn test_network_first_success_refreshes_cache() {
        let (router, store, network) = setup().await;
        let url = "https://example.com/api/posts.json";
        seed(&router, &store, url, "[1]").await;
        network.respond(url, 200, "[1,2]");

        let served = router.route(&request(url), Connectivity::Online).await.unwrap();
        assert_eq!(served.source, Source::Network);
        assert_eq!(router.cached(&request(url)).await.unwrap().unwrap().response.text(), "[1,2]");
    }

    #[tokio::test]
    async fn test_network_first_without_refresh() {
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let network = Arc::new(StubNetwork::default());
        let config = RouterConfig { refresh_on_network_first: false, ..config() };
        let router = RequestRouter::new(store, network.clone(), Namespace::versioned("offcache", 1), config);
        let url = "https://example.com/api/posts.json";
        network.respond(url, 200, "[1]");

        router.route(&request(url), Connectivity::Online).await.unwrap();
        assert!(router.cached(&request(url)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_network_timeout_surfaces_as_timeout() {
        let (router, _store, network) = setup().await;
        let url = "https://example.com/api/slow.json";
        network.hang(url);

        let result = router.route(&request(url), Connectivity::Online).await;
        assert_eq!(result.unwrap_err(), Failure::Timeout);
    }

    #[tokio::test]
    async fn test_network_timeout_falls_back_to_cache() {
        let (router, store, network) = setup().await;
        let url = "https://example.com/api/slow.json";
        seed(&router, &store, url, "{}").await;
        network.hang(url);

        let served = router.route(&request(url), Connectivity::Online).await.unwrap();
        assert_eq!(served.source, Source::Cache);
    }

    #[tokio::test]
    async fn test_unsafe_requests_bypass_cache() {
        let (router, _store, network) = setup().await;
        let url = "https://example.com/api/items";
        network.respond(url, 201, "created");
        let post = RequestDescriptor::new("POST", Url::parse(url).unwrap());

        let served = router.route(&post, Connectivity::Online).await.unwrap();
        assert_eq!(served.strategy, Strategy::NetworkFirst);
        assert_eq!(served.response.status, 201);
        assert!(router.cached(&request(url)).await.unwrap().is_none());

        assert_eq!(router.route(&post, Connectivity::Offline).await.unwrap_err(), Failure::NotFoundOffline);
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades_to_network() {
        let network = Arc::new(StubNetwork::default());
        let router = RequestRouter::new(
            Arc::new(UnavailableStore),
            network.clone(),
            Namespace::versioned("offcache", 1),
            config(),
        );
        network.respond("https://example.com/app.js", 200, "fresh");

        let served = router.route(&request("https://example.com/app.js"), Connectivity::Online).await.unwrap();
        assert_eq!(served.source, Source::Network);
        assert_eq!(served.response.text(), "fresh");

        let offline = router.route(&request("https://example.com/app.js"), Connectivity::Offline).await;
        assert_eq!(offline.unwrap_err(), Failure::NotFoundOffline);
        assert!(router.cached(&request("https://example.com/app.js")).await.is_err());
    }

    #[tokio::test]
    async fn test_decide_is_pure() {
        let (router, _store, network) = setup().await;
        let req = request("https://picsum.photos/10");
        assert_eq!(router.decide(&req, Connectivity::Online), Strategy::StaleWhileRevalidate);
        assert_eq!(router.decide(&req, Connectivity::Offline), Strategy::CacheOnly);
        assert_eq!(network.calls(), 0);
    }

    #[test]
    fn test_router_config_from_app_config() {
        let app = AppConfig { origin: "https://example.com".into(), timeout_ms: 750, ..Default::default() };
        let config = RouterConfig::from_app_config(&app).unwrap();
        assert_eq!(config.origin.as_str(), "https://example.com/");
        assert_eq!(config.fetch_timeout, Duration::from_millis(750));
        assert!(config.refresh_on_network_first);
    }

    #[test]
    fn test_failure_display() {
        assert!(Failure::NotFoundOffline.to_string().starts_with("NOT_FOUND_OFFLINE"));
        assert!(Failure::Timeout.to_string().starts_with("TIMEOUT"));
    }
}

//! Server state and the boot sequence.
//!
//! Opens the store, installs the configured cache version if it is not in the
//! store yet, and activates it. When the install fails, the newest older
//! version already in the store is activated instead.

use std::sync::Arc;

use offcache_client::{FetchClient, FetchConfig, Lifecycle, Manifest, Network, RequestRouter, RouterConfig};
use offcache_core::{AppConfig, CacheDb, CacheStore, Error, Namespace};
use url::Url;

/// Everything the tools need at request time.
pub struct AppState {
    pub router: RequestRouter,
    pub store: Arc<dyn CacheStore>,
    pub origin: Url,
    /// Connectivity assumed when a tool call does not say.
    pub offline: bool,
}

impl AppState {
    /// Open the configured database and bring up the router over the real network.
    pub async fn open(config: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn CacheStore> = Arc::new(CacheDb::open(&config.db_path).await?);
        let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(config))?);
        let router_config = RouterConfig::from_app_config(config)?;

        let router = start(store.clone(), network, config, router_config).await?;
        Ok(Self::new(router, store, config.offline))
    }

    pub fn new(router: RequestRouter, store: Arc<dyn CacheStore>, offline: bool) -> Self {
        let origin = router.config().origin.clone();
        Self { router, store, origin, offline }
    }
}

/// Install and activate the configured version, falling back to the newest
/// installed version below it when the install fails.
///
/// # Errors
///
/// The install error when there is nothing to fall back to, or any store error
/// raised during activation.
pub async fn start(
    store: Arc<dyn CacheStore>, network: Arc<dyn Network>, config: &AppConfig, router_config: RouterConfig,
) -> Result<RequestRouter, Error> {
    let current = config.namespace();
    let installed = store.list_namespaces().await?;

    if installed.contains(&current) {
        tracing::info!(namespace = %current, "cache version already installed");
        return Lifecycle::new(store, network, current, router_config).activate().await;
    }

    let manifest = Manifest::new(config.manifest.clone());
    let lifecycle = Lifecycle::new(store.clone(), network.clone(), current, router_config.clone());
    let result = lifecycle.install(&manifest).await;
    match result {
        Ok(report) => {
            tracing::info!(namespace = %report.namespace, assets = report.cached.len(), "installed cache version");
            lifecycle.activate().await
        }
        Err(e) => {
            let Some(previous) = previous_version(&installed, &config.cache_prefix, config.version) else {
                return Err(e);
            };
            tracing::warn!(
                failed = %lifecycle.namespace(),
                serving = %previous,
                error = %e,
                "install failed, keeping previous cache version"
            );
            Lifecycle::new(store, network, previous, router_config).activate().await
        }
    }
}

fn previous_version(installed: &[Namespace], prefix: &str, current: u32) -> Option<Namespace> {
    installed
        .iter()
        .filter_map(|ns| ns.version_for(prefix).map(|v| (v, ns)))
        .filter(|(v, _)| *v < current)
        .max_by_key(|(v, _)| *v)
        .map(|(_, ns)| ns.clone())
}

//! Install and activate steps for one cache version.
//!
//! `install` pre-caches the static manifest into the version's namespace,
//! all or nothing. `activate` deletes every other namespace and only then
//! hands out the [`RequestRouter`], so no request is ever answered from a
//! namespace that is about to disappear.

use std::sync::Arc;

use offcache_core::{CacheEntry, CacheStore, Error, Namespace, RequestDescriptor};
use tokio::task::JoinSet;
use url::Url;

use crate::fetch::{Network, resolve};
use crate::router::{RequestRouter, RouterConfig, fetch_bounded};

/// Ordered list of static asset URLs, absolute or relative to the origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<String>,
}

impl Manifest {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { entries: entries.into_iter().map(Into::into).collect() }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve every entry against `origin`, keeping order and dropping duplicates.
    pub fn resolve(&self, origin: &Url) -> Result<Vec<Url>, Error> {
        let mut urls: Vec<Url> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let url = resolve(origin, entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}")))?;
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        Ok(urls)
    }
}

/// What a successful install wrote.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub namespace: Namespace,
    pub cached: Vec<Url>,
}

/// Drives one cache version through install and activation.
pub struct Lifecycle {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    namespace: Namespace,
    config: RouterConfig,
}

impl Lifecycle {
    pub fn new(
        store: Arc<dyn CacheStore>, network: Arc<dyn Network>, namespace: Namespace, config: RouterConfig,
    ) -> Self {
        Self { store, network, namespace, config }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Fetch every manifest URL and store them together.
    ///
    /// All fetches run concurrently. The first one that fails, times out or
    /// answers with a non-2xx status cancels the rest; nothing is written and
    /// the previous version keeps serving.
    ///
    /// # Errors
    ///
    /// `Error::Manifest` naming the failing URL, `Error::InvalidUrl` for an
    /// unresolvable entry, or the store error if the batch write fails.
    pub async fn install(&self, manifest: &Manifest) -> Result<InstallReport, Error> {
        let urls = manifest.resolve(&self.config.origin)?;
        tracing::info!(namespace = %self.namespace, assets = urls.len(), "installing cache version");

        let mut join_set = JoinSet::new();
        for url in &urls {
            let network = self.network.clone();
            let request = RequestDescriptor::get(url.clone());
            let timeout = self.config.fetch_timeout;

            join_set.spawn(async move {
                let result = fetch_bounded(network.as_ref(), &request, timeout).await;
                (request, result)
            });
        }

        let mut entries = Vec::with_capacity(urls.len());
        while let Some(joined) = join_set.join_next().await {
            let (request, result) = joined.map_err(|e| Error::HttpError(format!("install task failed: {e}")))?;

            let reason = match result {
                Ok(response) if response.is_success() => {
                    entries.extend(CacheEntry::capture(&request, response));
                    continue;
                }
                Ok(response) => format!("status {}", response.status),
                Err(failure) => failure.to_string(),
            };

            join_set.shutdown().await;
            return Err(Error::Manifest { url: request.url().to_string(), reason });
        }

        self.store.put_all(&self.namespace, &entries).await?;

        tracing::info!(namespace = %self.namespace, cached = entries.len(), "install complete");
        Ok(InstallReport { namespace: self.namespace.clone(), cached: urls })
    }

    /// Delete every namespace except the current one. Returns the deleted namespaces.
    pub async fn collect_garbage(&self) -> Result<Vec<Namespace>, Error> {
        self.store.open(&self.namespace).await?;

        let mut removed = Vec::new();
        for namespace in self.store.list_namespaces().await? {
            if namespace == self.namespace {
                continue;
            }
            if self.store.delete_namespace(&namespace).await? {
                tracing::info!(%namespace, "deleted superseded cache namespace");
                removed.push(namespace);
            }
        }
        Ok(removed)
    }

    /// Finish garbage collection, then start routing requests.
    pub async fn activate(self) -> Result<RequestRouter, Error> {
        let removed = self.collect_garbage().await?;
        tracing::info!(namespace = %self.namespace, removed = removed.len(), "cache version active");
        Ok(RequestRouter::new(self.store, self.network, self.namespace, self.config))
    }
}

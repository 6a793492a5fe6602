//! The four caching strategies.

use offcache_core::{CacheEntry, CacheStore, RequestDescriptor};

use super::revalidate::{self, RevalidationEvent, RevalidationOutcome};
use super::{Failure, RequestRouter, Served, Strategy};

impl RequestRouter {
    pub(super) async fn cache_only(&self, request: &RequestDescriptor) -> Result<Served, Failure> {
        self.lookup(request)
            .await
            .map(|entry| Served::from_cache(entry, Strategy::CacheOnly))
            .ok_or(Failure::NotFoundOffline)
    }

    pub(super) async fn cache_first(&self, request: &RequestDescriptor) -> Result<Served, Failure> {
        if let Some(entry) = self.lookup(request).await {
            return Ok(Served::from_cache(entry, Strategy::CacheFirst));
        }

        let response = self.fetch(request).await?;
        self.remember(request, &response).await;
        Ok(Served::from_network(response, Strategy::CacheFirst))
    }

    pub(super) async fn network_first(&self, request: &RequestDescriptor) -> Result<Served, Failure> {
        let failure = match self.fetch(request).await {
            Ok(response) if response.is_success() => {
                if self.config.refresh_on_network_first {
                    self.remember(request, &response).await;
                }
                return Ok(Served::from_network(response, Strategy::NetworkFirst));
            }
            Ok(response) => {
                tracing::debug!(url = %request.url(), status = response.status, "network-first got non-success status");
                Failure::Unreachable
            }
            Err(failure) => failure,
        };

        self.lookup(request)
            .await
            .map(|entry| Served::from_cache(entry, Strategy::NetworkFirst))
            .ok_or(failure)
    }

    pub(super) async fn stale_while_revalidate(&self, request: &RequestDescriptor) -> Result<Served, Failure> {
        if let Some(entry) = self.lookup(request).await {
            self.spawn_revalidation(request.clone());
            return Ok(Served::from_cache(entry, Strategy::StaleWhileRevalidate));
        }

        let response = self.fetch(request).await?;
        self.remember(request, &response).await;
        Ok(Served::from_network(response, Strategy::StaleWhileRevalidate))
    }

    /// Refresh the entry on a detached task; the response path never awaits it.
    fn spawn_revalidation(&self, request: RequestDescriptor) {
        let router = self.clone();
        tokio::spawn(async move {
            let outcome = router.revalidate(&request).await;
            revalidate::publish(&router.events, RevalidationEvent { url: request.url().to_string(), outcome });
        });
    }

    async fn revalidate(&self, request: &RequestDescriptor) -> RevalidationOutcome {
        let response = match self.fetch(request).await {
            Ok(response) => response,
            Err(failure) => return RevalidationOutcome::Failed { reason: failure.to_string() },
        };

        if !response.is_success() {
            return RevalidationOutcome::Rejected { status: response.status };
        }

        let Some(entry) = CacheEntry::capture(request, response) else {
            return RevalidationOutcome::Failed { reason: format!("{} requests are not cached", request.method()) };
        };

        match self.store.put(&self.namespace, &entry).await {
            Ok(()) => RevalidationOutcome::Refreshed,
            Err(e) => RevalidationOutcome::Failed { reason: e.to_string() },
        }
    }
}

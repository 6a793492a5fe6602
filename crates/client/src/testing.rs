//! Test doubles for the network and the store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use offcache_core::{CacheEntry, CacheStore, CapturedResponse, Error, Namespace, RequestDescriptor};

use crate::fetch::Network;

#[derive(Clone)]
enum Reply {
    Respond(CapturedResponse),
    Fail,
    Hang,
}

/// Scripted network keyed by absolute URL. Unknown URLs fail like a refused connection.
#[derive(Default)]
pub(crate) struct StubNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    calls: AtomicUsize,
}

impl StubNetwork {
    pub(crate) fn respond(&self, url: &str, status: u16, body: &str) {
        self.set(url, Reply::Respond(CapturedResponse::new(status, body.to_string())));
    }

    pub(crate) fn fail(&self, url: &str) {
        self.set(url, Reply::Fail);
    }

    pub(crate) fn hang(&self, url: &str) {
        self.set(url, Reply::Hang);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set(&self, url: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }
}

#[async_trait::async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<CapturedResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().unwrap().get(request.url().as_str()).cloned();
        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(Error::FetchTimeout(request.url().to_string()))
            }
            Some(Reply::Fail) | None => Err(Error::HttpError(format!("connection refused: {}", request.url()))),
        }
    }
}

/// A store whose every operation fails.
pub(crate) struct UnavailableStore;

#[async_trait::async_trait]
impl CacheStore for UnavailableStore {
    async fn open(&self, _namespace: &Namespace) -> Result<(), Error> {
        Err(Error::StoreUnavailable("offline store".into()))
    }

    async fn match_entry(&self, _namespace: &Namespace, _key: &str) -> Result<Option<CacheEntry>, Error> {
        Err(Error::StoreUnavailable("offline store".into()))
    }

    async fn put(&self, _namespace: &Namespace, _entry: &CacheEntry) -> Result<(), Error> {
        Err(Error::StoreUnavailable("offline store".into()))
    }

    async fn delete_namespace(&self, _namespace: &Namespace) -> Result<bool, Error> {
        Err(Error::StoreUnavailable("offline store".into()))
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, Error> {
        Err(Error::StoreUnavailable("offline store".into()))
    }

    async fn keys(&self, _namespace: &Namespace) -> Result<Vec<String>, Error> {
        Err(Error::StoreUnavailable("offline store".into()))
    }
}

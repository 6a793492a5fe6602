//! The cache store interface consumed by the router and the lifecycle driver.
//!
//! Every operation names its namespace explicitly; there is no "current"
//! namespace held by the store itself.

use crate::{CacheEntry, Error, Namespace};

/// Named, persistent key→response store.
///
/// `put` is idempotent (last write wins for a key) and `match_entry` returns
/// the most recent entry for a key. Callers on the request path treat any
/// error as a cache miss (reads) or a no-op (writes).
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the namespace if it does not exist yet.
    async fn open(&self, namespace: &Namespace) -> Result<(), Error>;

    /// Look up the entry stored under `key`.
    async fn match_entry(&self, namespace: &Namespace, key: &str) -> Result<Option<CacheEntry>, Error>;

    /// Insert or replace an entry in an existing namespace.
    ///
    /// Fails with `Error::StoreUnavailable` when the namespace does not exist,
    /// so a late write from a superseded version cannot bring it back.
    async fn put(&self, namespace: &Namespace, entry: &CacheEntry) -> Result<(), Error>;

    /// Insert a batch of entries, all or nothing, creating the namespace.
    ///
    /// The default writes entries one by one; backends with transactions
    /// should override it.
    async fn put_all(&self, namespace: &Namespace, entries: &[CacheEntry]) -> Result<(), Error> {
        self.open(namespace).await?;
        for entry in entries {
            self.put(namespace, entry).await?;
        }
        Ok(())
    }

    /// Delete a namespace and its entries. Returns whether it existed.
    async fn delete_namespace(&self, namespace: &Namespace) -> Result<bool, Error>;

    /// All namespaces, sorted.
    async fn list_namespaces(&self) -> Result<Vec<Namespace>, Error>;

    /// URLs cached in a namespace, sorted.
    async fn keys(&self, namespace: &Namespace) -> Result<Vec<String>, Error>;
}

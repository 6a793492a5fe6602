//! Client code for offcache.
//!
//! This crate provides the HTTP fetch pipeline, resource classification, the
//! caching-strategy router and the install/activate lifecycle driven by the
//! host.

pub mod classify;
pub mod fetch;
pub mod lifecycle;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::Classifier;
pub use fetch::{FetchClient, FetchConfig, FetchResponse, Network};
pub use lifecycle::{InstallReport, Lifecycle, Manifest};
pub use router::{
    Connectivity, Failure, RequestRouter, RevalidationEvent, RevalidationOutcome, RouterConfig, Served, Source,
    Strategy,
};

//! Cache inspection MCP tools.
//!
//! These read the store directly and never touch the network.

pub mod get;
pub mod namespaces;

pub use get::{CacheGetParams, get_impl};
pub use namespaces::{CacheNamespacesParams, namespaces_impl};

//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - The request/response data model and cache namespaces
//! - The `CacheStore` interface with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod store;

pub use cache::CacheDb;
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use model::{CacheEntry, CapturedResponse, Namespace, RequestDescriptor, ResourceKind};
pub use store::CacheStore;

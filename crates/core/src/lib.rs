//! Core types and shared functionality for stash.
//!
//! This crate provides:
//! - Request and response types shared by strategies and the HTTP front
//! - Named response caches with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;
pub mod response;
pub mod url;

pub use cache::{CacheDb, CacheSummary, EntryKey};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use request::{Destination, RequestDescriptor, RequestMode};
pub use response::CachedResponse;

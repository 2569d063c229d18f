//! SQLite-backed named response caches.
//!
//! Every strategy writes into a named cache (`stash-runtime-v1`, ...). Entries
//! are keyed by a SHA-256 of method and canonical URL. It supports:
//!
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Outdated-cache cleanup and an optional entry cap

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use storage::{CacheSummary, EntryKey};

//! # storage-adapters
//!
//! Concrete backends for the persistence, media-storage and cache ports:
//! SQLite via sqlx, the local filesystem, and an in-process moka cache.

pub mod cache_memory;
pub mod media_local;
pub mod sqlite;

pub use cache_memory::MemoryListingCache;
pub use media_local::LocalMediaStorage;
pub use sqlite::SqliteStore;

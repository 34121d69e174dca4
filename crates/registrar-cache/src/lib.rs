//! Caching for Registrar
//!
//! A TTL key/value cache that prefers a remote backend (Redis, behind the
//! `redis-backend` feature) and keeps working on a local in-process store when
//! the remote one is unavailable. Callers never see backend errors: a failing
//! backend degrades to misses and local writes.
//!
//! Expensive computations (transcripts, rosters, grade summaries) are memoized
//! with [`CacheManager::cached`], [`CacheManager::try_cached`] or a reusable
//! [`CachedFn`] from [`CacheManager::wrap`]. Keys are derived from a namespace
//! and the JSON encoding of the call arguments.
//!
//! ## Feature flags
//!
//! - `redis-backend`: [`RedisCache`] over a `deadpool-redis` pool

pub mod backend;
pub mod config;
pub mod entry;
pub mod errors;
pub mod in_memory;
pub mod key;
pub mod manager;
pub mod statistics;

#[cfg(feature = "redis-backend")]
pub mod redis_backend;

pub use backend::CacheBackend;
pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use errors::{CacheError, CacheResult};
pub use in_memory::InMemoryCache;
pub use key::derive_key;
pub use manager::{CacheManager, CachedFn};
pub use statistics::{CacheEntryInfo, CacheStatistics};

#[cfg(feature = "redis-backend")]
pub use redis_backend::RedisCache;

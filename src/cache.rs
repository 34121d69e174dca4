//! Cache module.
//!
//! Key-value caching with an optional remote primary, a local fallback store
//! and function-result memoization.
//!
//! # Examples
//!
//! ```rust,no_run
//! use registrar::cache::{CacheConfig, CacheManager};
//! ```

#[cfg(feature = "cache")]
pub use registrar_cache::*;

//! Cache manager
//!
//! Combines an optional remote backend with the local [`InMemoryCache`]:
//!
//! - reads try the remote backend first and fall back to the local store on a
//!   miss or a backend error
//! - writes go to the remote backend; when it is unavailable or the write
//!   fails, the value is kept locally with the same expiry
//! - backend errors are logged and counted, never returned
//!
//! Whether the remote backend is usable is decided once, by a `ping` at
//! construction. Without a remote backend the local store serves every
//! operation.

use crate::backend::CacheBackend;
use crate::config::CacheConfig;
use crate::errors::{CacheError, CacheResult};
use crate::in_memory::InMemoryCache;
use crate::key::derive_key;
use crate::statistics::{CacheStatistics, Counters};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

struct ManagerInner {
	primary: Option<Arc<dyn CacheBackend>>,
	local: InMemoryCache,
	config: CacheConfig,
	counters: Counters,
}

/// Cache facade with remote-backend-with-local-fallback semantics
///
/// Cloning is cheap; clones share stores and counters.
///
/// # Examples
///
/// ```
/// use registrar_cache::{CacheConfig, CacheManager};
///
/// # async fn example() {
/// let cache = CacheManager::local(CacheConfig::default()).unwrap();
///
/// cache.set("term:current", &"2024-autumn", None).await;
/// let term: Option<String> = cache.get("term:current").await;
/// assert_eq!(term.as_deref(), Some("2024-autumn"));
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
/// ```
#[derive(Clone)]
pub struct CacheManager {
	inner: Arc<ManagerInner>,
}

impl CacheManager {
	/// A manager backed only by the local store
	pub fn local(config: CacheConfig) -> CacheResult<Self> {
		config.validate().map_err(CacheError::Config)?;
		Ok(Self::build(None, config))
	}

	/// A manager in front of `backend`.
	///
	/// The backend is pinged once; if the ping fails the manager runs on the
	/// local store alone for its whole lifetime.
	pub async fn with_backend(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> CacheResult<Self> {
		config.validate().map_err(CacheError::Config)?;

		let primary = match backend.ping().await {
			Ok(()) => {
				tracing::info!(backend = backend.name(), "Cache backend available");
				Some(backend)
			}
			Err(e) => {
				tracing::warn!(
					backend = backend.name(),
					error = %e,
					"Cache backend unavailable, using local store"
				);
				None
			}
		};

		Ok(Self::build(primary, config))
	}

	/// Build a manager from configuration, connecting to `config.url` when set
	pub async fn from_config(config: CacheConfig) -> CacheResult<Self> {
		match config.url.clone() {
			#[cfg(feature = "redis-backend")]
			Some(url) => {
				let backend = crate::redis_backend::RedisCache::new(url)?;
				Self::with_backend(Arc::new(backend), config).await
			}
			#[cfg(not(feature = "redis-backend"))]
			Some(url) => {
				tracing::warn!(
					url = %url,
					"Remote cache configured but the redis-backend feature is disabled, using local store"
				);
				Self::local(config)
			}
			None => Self::local(config),
		}
	}

	fn build(primary: Option<Arc<dyn CacheBackend>>, config: CacheConfig) -> Self {
		Self {
			inner: Arc::new(ManagerInner {
				primary,
				local: InMemoryCache::new(),
				config,
				counters: Counters::default(),
			}),
		}
	}

	/// Whether reads and writes go to a remote backend
	pub fn is_primary_available(&self) -> bool {
		self.inner.primary.is_some()
	}

	pub fn config(&self) -> &CacheConfig {
		&self.inner.config
	}

	/// The local store, for inspection and sweeping
	pub fn local_store(&self) -> &InMemoryCache {
		&self.inner.local
	}

	/// Whether the local store takes part in reads and writes
	fn uses_local(&self) -> bool {
		self.inner.primary.is_none() || self.inner.config.fallback_enabled
	}

	fn backend_error(&self, backend: &dyn CacheBackend, operation: &str, key: &str, e: &CacheError) {
		self.inner.counters.error();
		tracing::warn!(backend = backend.name(), operation, key, error = %e, "Cache backend error");
	}

	async fn fetch(&self, key: &str) -> Option<Vec<u8>> {
		if let Some(primary) = &self.inner.primary {
			match primary.get(key).await {
				Ok(Some(bytes)) => return Some(bytes),
				Ok(None) => {}
				Err(e) => self.backend_error(primary.as_ref(), "get", key, &e),
			}
		}

		if !self.uses_local() {
			return None;
		}
		match self.inner.local.get(key).await {
			Ok(bytes) => bytes,
			Err(e) => {
				self.backend_error(&self.inner.local, "get", key, &e);
				None
			}
		}
	}

	/// Look up `key`; misses, backend errors and undecodable values all yield `None`
	pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		let Some(bytes) = self.fetch(key).await else {
			self.inner.counters.miss();
			return None;
		};

		match serde_json::from_slice(&bytes) {
			Ok(value) => {
				self.inner.counters.hit();
				Some(value)
			}
			Err(e) => {
				self.inner.counters.error();
				self.inner.counters.miss();
				tracing::warn!(key, error = %e, "Discarding undecodable cache value");
				None
			}
		}
	}

	/// Store `value` under `key` for `ttl`, or the configured default TTL.
	///
	/// Never fails; a value that cannot be stored anywhere is dropped with a
	/// warning.
	pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) {
		let bytes = match serde_json::to_vec(value) {
			Ok(bytes) => bytes,
			Err(e) => {
				self.inner.counters.error();
				tracing::warn!(key, error = %e, "Cannot serialize cache value");
				return;
			}
		};
		let ttl = ttl.or(self.inner.config.default_ttl);

		if let Some(primary) = &self.inner.primary {
			match primary.set(key, bytes.clone(), ttl).await {
				Ok(()) => {
					if self.inner.config.fallback_enabled {
						// Drop any copy written while the backend was failing
						let _ = self.inner.local.delete(key).await;
					}
					return;
				}
				Err(e) => self.backend_error(primary.as_ref(), "set", key, &e),
			}
		}

		if !self.uses_local() {
			return;
		}
		match self.inner.local.set(key, bytes, ttl).await {
			Ok(()) => {
				self.inner.counters.fallback_write();
				tracing::debug!(key, "Cache value stored locally");
			}
			Err(e) => self.backend_error(&self.inner.local, "set", key, &e),
		}
	}

	/// Remove `key` from both stores; returns whether anything was removed
	pub async fn delete(&self, key: &str) -> bool {
		let mut removed = false;

		if let Some(primary) = &self.inner.primary {
			match primary.delete(key).await {
				Ok(hit) => removed |= hit,
				Err(e) => self.backend_error(primary.as_ref(), "delete", key, &e),
			}
		}
		if let Ok(hit) = self.inner.local.delete(key).await {
			removed |= hit;
		}

		removed
	}

	/// Check whether `key` holds a live value in either store
	pub async fn has_key(&self, key: &str) -> bool {
		if let Some(primary) = &self.inner.primary {
			match primary.has_key(key).await {
				Ok(true) => return true,
				Ok(false) => {}
				Err(e) => self.backend_error(primary.as_ref(), "has_key", key, &e),
			}
		}
		self.uses_local() && self.inner.local.has_key(key).await.unwrap_or(false)
	}

	/// Remove every key matching a glob pattern from both stores.
	///
	/// Returns the number of distinct keys removed. An invalid pattern removes
	/// nothing.
	pub async fn clear_pattern(&self, pattern: &str) -> usize {
		let mut removed = HashSet::new();

		if let Some(primary) = &self.inner.primary {
			match primary.keys(pattern).await {
				Ok(keys) => {
					for key in keys {
						match primary.delete(&key).await {
							Ok(true) => {
								removed.insert(key);
							}
							Ok(false) => {}
							Err(e) => self.backend_error(primary.as_ref(), "delete", &key, &e),
						}
					}
				}
				Err(e) => self.backend_error(primary.as_ref(), "keys", pattern, &e),
			}
		}

		match self.inner.local.delete_matching(pattern).await {
			Ok(keys) => removed.extend(keys),
			Err(e) => tracing::warn!(pattern, error = %e, "Invalid cache key pattern"),
		}

		tracing::debug!(pattern, removed = removed.len(), "Cleared cache keys");
		removed.len()
	}

	/// Remove every value memoized under `namespace`
	pub async fn clear_namespace(&self, namespace: &str) -> usize {
		let pattern = format!("{}{}:*", self.inner.config.key_prefix, namespace);
		self.clear_pattern(&pattern).await
	}

	/// Sweep expired entries out of the local store
	pub async fn cleanup_expired(&self) -> usize {
		self.inner.local.cleanup_expired().await
	}

	/// Derive the cache key for a call in `namespace` with `args`
	pub fn cache_key<A: Serialize + ?Sized>(&self, namespace: &str, args: &A) -> CacheResult<String> {
		derive_key(&self.inner.config.key_prefix, namespace, args)
	}

	pub fn statistics(&self) -> CacheStatistics {
		self.inner.counters.snapshot()
	}

	fn key_or_log<A: Serialize + ?Sized>(&self, namespace: &str, args: &A) -> Option<String> {
		match self.cache_key(namespace, args) {
			Ok(key) => Some(key),
			Err(e) => {
				self.inner.counters.error();
				tracing::warn!(namespace, error = %e, "Cannot derive cache key, calling through");
				None
			}
		}
	}

	async fn memoize<T, Fut>(&self, key: Option<String>, ttl: Option<Duration>, compute: impl FnOnce() -> Fut) -> T
	where
		T: Serialize + DeserializeOwned,
		Fut: Future<Output = T>,
	{
		let Some(key) = key else {
			return compute().await;
		};
		if let Some(value) = self.get(&key).await {
			return value;
		}
		let value = compute().await;
		self.set(&key, &value, ttl).await;
		value
	}

	async fn try_memoize<T, E, Fut>(
		&self,
		key: Option<String>,
		ttl: Option<Duration>,
		compute: impl FnOnce() -> Fut,
	) -> Result<T, E>
	where
		T: Serialize + DeserializeOwned,
		Fut: Future<Output = Result<T, E>>,
	{
		let Some(key) = key else {
			return compute().await;
		};
		if let Some(value) = self.get(&key).await {
			return Ok(value);
		}
		let value = compute().await?;
		self.set(&key, &value, ttl).await;
		Ok(value)
	}

	/// Return the memoized result for (`namespace`, `args`), computing and
	/// storing it on a miss.
	///
	/// # Examples
	///
	/// ```
	/// use registrar_cache::{CacheConfig, CacheManager};
	///
	/// # async fn example() {
	/// let cache = CacheManager::local(CacheConfig::default()).unwrap();
	///
	/// let gpa: f64 = cache.cached("gpa", &1001, None, || async { 3.7 }).await;
	/// let again: f64 = cache.cached("gpa", &1001, None, || async { 0.0 }).await;
	/// assert_eq!(again, 3.7);
	/// # }
	/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
	/// ```
	pub async fn cached<A, T, F, Fut>(&self, namespace: &str, args: &A, ttl: Option<Duration>, compute: F) -> T
	where
		A: Serialize + ?Sized,
		T: Serialize + DeserializeOwned,
		F: FnOnce() -> Fut,
		Fut: Future<Output = T>,
	{
		let key = self.key_or_log(namespace, args);
		self.memoize(key, ttl, compute).await
	}

	/// Like [`cached`](Self::cached) for fallible computations; errors are
	/// returned and never stored
	pub async fn try_cached<A, T, E, F, Fut>(
		&self,
		namespace: &str,
		args: &A,
		ttl: Option<Duration>,
		compute: F,
	) -> Result<T, E>
	where
		A: Serialize + ?Sized,
		T: Serialize + DeserializeOwned,
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let key = self.key_or_log(namespace, args);
		self.try_memoize(key, ttl, compute).await
	}

	/// Wrap `f` so every call is memoized under `namespace`
	pub fn wrap<F>(&self, namespace: impl Into<String>, ttl: Option<Duration>, f: F) -> CachedFn<F> {
		CachedFn {
			cache: self.clone(),
			namespace: namespace.into(),
			ttl,
			f,
		}
	}
}

/// A function whose results are memoized by argument
///
/// # Examples
///
/// ```
/// use registrar_cache::{CacheConfig, CacheManager};
/// use std::time::Duration;
///
/// # async fn example() {
/// let cache = CacheManager::local(CacheConfig::default()).unwrap();
/// let roster = cache.wrap("roster", Some(Duration::from_secs(60)), |class_id: u32| async move {
///     vec![format!("student-of-{class_id}")]
/// });
///
/// let first: Vec<String> = roster.call(7).await;
/// let second: Vec<String> = roster.call(7).await;
/// assert_eq!(first, second);
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
/// ```
#[derive(Clone)]
pub struct CachedFn<F> {
	cache: CacheManager,
	namespace: String,
	ttl: Option<Duration>,
	f: F,
}

impl<F> CachedFn<F> {
	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	/// Call through the cache
	pub async fn call<A, T, Fut>(&self, args: A) -> T
	where
		F: Fn(A) -> Fut,
		A: Serialize,
		T: Serialize + DeserializeOwned,
		Fut: Future<Output = T>,
	{
		let key = self.cache.key_or_log(&self.namespace, &args);
		self.cache.memoize(key, self.ttl, || (self.f)(args)).await
	}

	/// Call through the cache, storing only successful results
	pub async fn try_call<A, T, E, Fut>(&self, args: A) -> Result<T, E>
	where
		F: Fn(A) -> Fut,
		A: Serialize,
		T: Serialize + DeserializeOwned,
		Fut: Future<Output = Result<T, E>>,
	{
		let key = self.cache.key_or_log(&self.namespace, &args);
		self.cache.try_memoize(key, self.ttl, || (self.f)(args)).await
	}

	/// Drop the memoized result for `args`
	pub async fn invalidate<A: Serialize + ?Sized>(&self, args: &A) -> bool {
		match self.cache.key_or_log(&self.namespace, args) {
			Some(key) => self.cache.delete(&key).await,
			None => false,
		}
	}

	/// Drop every memoized result of this function
	pub async fn clear(&self) -> usize {
		self.cache.clear_namespace(&self.namespace).await
	}
}

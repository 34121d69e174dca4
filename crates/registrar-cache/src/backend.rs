//! Cache backend abstraction

use crate::errors::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// Byte-level key/value store with per-key expiry
///
/// Backends store opaque bytes; (de)serialization belongs to the
/// [`CacheManager`](crate::CacheManager).
#[async_trait]
pub trait CacheBackend: Send + Sync {
	/// Fetch the value for `key`, `None` if absent or expired
	async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

	/// Store `value` under `key`, replacing any previous value
	async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()>;

	/// Remove `key`; returns whether a value was removed
	async fn delete(&self, key: &str) -> CacheResult<bool>;

	/// Reset the expiry of an existing key; returns whether the key existed
	async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

	/// Keys matching a glob pattern (`*`, `?`, `[...]`)
	async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>>;

	/// Liveness probe
	async fn ping(&self) -> CacheResult<()>;

	/// Check whether `key` holds a live value
	async fn has_key(&self, key: &str) -> CacheResult<bool> {
		Ok(self.get(key).await?.is_some())
	}

	/// Short backend name for logs
	fn name(&self) -> &'static str;
}

//! In-memory cache implementation
//!
//! Used as the local fallback store. Expired entries are removed when they
//! are read or by an explicit [`InMemoryCache::cleanup_expired`] sweep; no
//! timer runs in the background.

use crate::backend::CacheBackend;
use crate::entry::{CacheEntry, expiry_after};
use crate::errors::CacheResult;
use crate::statistics::CacheEntryInfo;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

/// In-memory cache backend
#[derive(Clone, Default)]
pub struct InMemoryCache {
	store: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl InMemoryCache {
	/// Create an empty in-memory cache
	///
	/// # Examples
	///
	/// ```
	/// use registrar_cache::{CacheBackend, InMemoryCache};
	///
	/// # async fn example() {
	/// let cache = InMemoryCache::new();
	/// cache.set("term", b"autumn".to_vec(), None).await.unwrap();
	/// assert_eq!(cache.get("term").await.unwrap(), Some(b"autumn".to_vec()));
	/// # }
	/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
	/// ```
	pub fn new() -> Self {
		Self::default()
	}

	/// Remove every expired entry; returns how many were removed
	///
	/// # Examples
	///
	/// ```
	/// use registrar_cache::{CacheBackend, InMemoryCache};
	/// use std::time::Duration;
	///
	/// # async fn example() {
	/// let cache = InMemoryCache::new();
	/// cache.set("key1", b"value".to_vec(), Some(Duration::from_millis(10))).await.unwrap();
	///
	/// tokio::time::sleep(Duration::from_millis(20)).await;
	///
	/// assert_eq!(cache.cleanup_expired().await, 1);
	/// assert!(cache.is_empty().await);
	/// # }
	/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
	/// ```
	pub async fn cleanup_expired(&self) -> usize {
		let now = SystemTime::now();
		let mut store = self.store.write().await;
		let before = store.len();
		store.retain(|_, entry| !entry.expired_at(now));
		before - store.len()
	}

	/// Number of stored entries, including expired entries not yet swept
	pub async fn len(&self) -> usize {
		self.store.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.store.read().await.is_empty()
	}

	/// Inspect a live cache entry
	///
	/// # Examples
	///
	/// ```
	/// use registrar_cache::{CacheBackend, InMemoryCache};
	/// use std::time::Duration;
	///
	/// # async fn example() {
	/// let cache = InMemoryCache::new();
	/// cache.set("key1", b"value1".to_vec(), Some(Duration::from_secs(300))).await.unwrap();
	///
	/// let info = cache.inspect_entry("key1").await.unwrap();
	/// assert_eq!(info.key, "key1");
	/// assert_eq!(info.size, 6);
	/// assert!(info.has_expiry);
	/// assert!(info.ttl_seconds.unwrap() <= 300);
	/// # }
	/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
	/// ```
	pub async fn inspect_entry(&self, key: &str) -> Option<CacheEntryInfo> {
		let store = self.store.read().await;
		let entry = store.get(key).filter(|entry| !entry.is_expired())?;

		Some(CacheEntryInfo {
			key: key.to_string(),
			size: entry.value.len(),
			has_expiry: entry.expires_at.is_some(),
			ttl_seconds: entry.remaining().map(|d| d.as_secs()),
		})
	}

	/// Remove every key matching `pattern` under one write lock.
	///
	/// Returns the live keys removed; matching expired entries are dropped
	/// too but not reported.
	pub async fn delete_matching(&self, pattern: &str) -> CacheResult<Vec<String>> {
		let pattern = glob::Pattern::new(pattern)?;
		let now = SystemTime::now();
		let mut store = self.store.write().await;
		let mut removed = Vec::new();
		store.retain(|key, entry| {
			if !pattern.matches(key) {
				return true;
			}
			if !entry.expired_at(now) {
				removed.push(key.clone());
			}
			false
		});
		Ok(removed)
	}
}

#[async_trait]
impl CacheBackend for InMemoryCache {
	async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
		{
			let store = self.store.read().await;
			match store.get(key) {
				None => return Ok(None),
				Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
				Some(_) => {}
			}
		}

		// Expired: evict on read, re-checking under the write lock
		let mut store = self.store.write().await;
		if store.get(key).is_some_and(CacheEntry::is_expired) {
			store.remove(key);
		}
		Ok(None)
	}

	async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
		let entry = CacheEntry::new(value, ttl);
		self.store.write().await.insert(key.to_string(), entry);
		Ok(())
	}

	async fn delete(&self, key: &str) -> CacheResult<bool> {
		let removed = self.store.write().await.remove(key);
		Ok(removed.is_some_and(|entry| !entry.is_expired()))
	}

	async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
		let mut store = self.store.write().await;
		match store.get_mut(key) {
			Some(entry) if !entry.is_expired() => {
				entry.expires_at = expiry_after(ttl);
				Ok(true)
			}
			Some(_) => {
				store.remove(key);
				Ok(false)
			}
			None => Ok(false),
		}
	}

	async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
		let pattern = glob::Pattern::new(pattern)?;
		let now = SystemTime::now();
		let store = self.store.read().await;
		Ok(store
			.iter()
			.filter(|(key, entry)| !entry.expired_at(now) && pattern.matches(key))
			.map(|(key, _)| key.clone())
			.collect())
	}

	async fn ping(&self) -> CacheResult<()> {
		Ok(())
	}

	fn name(&self) -> &'static str {
		"memory"
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::*;

	#[fixture]
	fn cache() -> InMemoryCache {
		InMemoryCache::new()
	}

	#[rstest]
	#[tokio::test]
	async fn test_set_get_delete(cache: InMemoryCache) {
		// Act
		cache.set("student:1", b"ada".to_vec(), None).await.unwrap();
		let stored = cache.get("student:1").await.unwrap();
		let removed = cache.delete("student:1").await.unwrap();
		let after = cache.get("student:1").await.unwrap();

		// Assert
		assert_eq!(stored, Some(b"ada".to_vec()));
		assert!(removed);
		assert_eq!(after, None);
		assert!(!cache.delete("student:1").await.unwrap());
	}

	#[rstest]
	#[tokio::test]
	async fn test_expired_entry_evicted_on_read(cache: InMemoryCache) {
		// Arrange
		cache
			.set("k", b"v".to_vec(), Some(Duration::from_millis(10)))
			.await
			.unwrap();
		tokio::time::sleep(Duration::from_millis(30)).await;
		assert_eq!(cache.len().await, 1);

		// Act
		let value = cache.get("k").await.unwrap();

		// Assert
		assert_eq!(value, None);
		assert_eq!(cache.len().await, 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_expire_extends_live_key(cache: InMemoryCache) {
		// Arrange
		cache
			.set("k", b"v".to_vec(), Some(Duration::from_millis(20)))
			.await
			.unwrap();

		// Act
		let extended = cache.expire("k", Duration::from_secs(60)).await.unwrap();
		tokio::time::sleep(Duration::from_millis(40)).await;

		// Assert
		assert!(extended);
		assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
		assert!(!cache.expire("missing", Duration::from_secs(1)).await.unwrap());
	}

	#[rstest]
	#[case("grades:*", vec!["grades:1", "grades:2"])]
	#[case("grades:?", vec!["grades:1", "grades:2"])]
	#[case("roster:*", vec!["roster:a"])]
	#[case("*", vec!["grades:1", "grades:2", "roster:a"])]
	#[case("nothing*", vec![])]
	#[tokio::test]
	async fn test_keys_glob(cache: InMemoryCache, #[case] pattern: &str, #[case] expected: Vec<&str>) {
		// Arrange
		for key in ["grades:1", "grades:2", "roster:a"] {
			cache.set(key, b"x".to_vec(), None).await.unwrap();
		}

		// Act
		let mut keys = cache.keys(pattern).await.unwrap();
		keys.sort();

		// Assert
		assert_eq!(keys, expected);
	}

	#[rstest]
	#[tokio::test]
	async fn test_keys_skips_expired(cache: InMemoryCache) {
		// Arrange
		cache.set("a", b"x".to_vec(), Some(Duration::ZERO)).await.unwrap();
		cache.set("b", b"x".to_vec(), None).await.unwrap();

		// Act
		let keys = cache.keys("*").await.unwrap();

		// Assert
		assert_eq!(keys, vec!["b".to_string()]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_invalid_pattern_is_error(cache: InMemoryCache) {
		// Act
		let result = cache.keys("[").await;

		// Assert
		assert!(result.is_err());
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete_matching(cache: InMemoryCache) {
		// Arrange
		for key in ["report:1", "report:2", "student:1"] {
			cache.set(key, b"x".to_vec(), None).await.unwrap();
		}
		cache.set("report:stale", b"x".to_vec(), Some(Duration::ZERO)).await.unwrap();

		// Act
		let mut removed = cache.delete_matching("report:*").await.unwrap();
		removed.sort();

		// Assert
		assert_eq!(removed, vec!["report:1".to_string(), "report:2".to_string()]);
		assert_eq!(cache.len().await, 1);
		assert_eq!(cache.keys("*").await.unwrap(), vec!["student:1".to_string()]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_unrepresentable_ttl_stores_without_expiry(cache: InMemoryCache) {
		// Act
		cache.set("k", b"v".to_vec(), Some(Duration::MAX)).await.unwrap();
		let extended = cache.expire("k", Duration::from_secs(u64::MAX)).await.unwrap();

		// Assert
		assert!(extended);
		assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
		let info = cache.inspect_entry("k").await.unwrap();
		assert!(!info.has_expiry);
	}

	#[rstest]
	#[tokio::test]
	async fn test_inspect_entry_without_expiry(cache: InMemoryCache) {
		// Arrange
		cache.set("k", b"abc".to_vec(), None).await.unwrap();

		// Act
		let info = cache.inspect_entry("k").await.unwrap();

		// Assert
		assert!(!info.has_expiry);
		assert_eq!(info.ttl_seconds, None);
		assert_eq!(info.size, 3);
		assert!(cache.inspect_entry("missing").await.is_none());
	}
}

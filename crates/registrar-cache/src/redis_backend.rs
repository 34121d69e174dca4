//! Redis cache backend
//!
//! Remote store over a `deadpool-redis` connection pool.

use crate::backend::CacheBackend;
use crate::errors::{CacheError, CacheResult};
use async_trait::async_trait;
use deadpool_redis::{Config as RedisPoolConfig, Connection, Pool, Runtime};
use redis::AsyncCommands;
use std::time::Duration;

/// Number of keys to scan per iteration
const SCAN_BATCH_SIZE: usize = 100;

/// Redis cache backend with connection pooling
#[derive(Clone)]
pub struct RedisCache {
	pool: Pool,
}

impl RedisCache {
	/// Create a Redis backend for the given connection URL
	///
	/// No connection is opened until the first command.
	///
	/// # Examples
	///
	/// ```no_run
	/// use registrar_cache::{CacheBackend, RedisCache};
	///
	/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
	/// let cache = RedisCache::new("redis://localhost:6379")?;
	/// cache.ping().await?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn new(connection_url: impl Into<String>) -> CacheResult<Self> {
		let cfg = RedisPoolConfig::from_url(connection_url.into());
		Self::with_pool_config(cfg)
	}

	/// Create a Redis backend with a custom pool configuration
	pub fn with_pool_config(config: RedisPoolConfig) -> CacheResult<Self> {
		let pool = config
			.create_pool(Some(Runtime::Tokio1))
			.map_err(|e| CacheError::Config(format!("Failed to create Redis pool: {}", e)))?;
		Ok(Self { pool })
	}

	/// Get the connection pool
	pub fn pool(&self) -> &Pool {
		&self.pool
	}

	async fn connection(&self) -> CacheResult<Connection> {
		self.pool
			.get()
			.await
			.map_err(|e| CacheError::Backend(format!("Failed to get connection from pool: {}", e)))
	}
}

fn backend_error(action: &str, e: redis::RedisError) -> CacheError {
	CacheError::Backend(format!("Failed to {} in Redis: {}", action, e))
}

/// Upper bound for `PX`/`PEXPIRE`; the server rejects expiries that overflow
/// once added to its own clock
const MAX_TTL_MILLIS: i64 = i64::MAX / 2;

/// Redis rejects a zero `PX`/`PEXPIRE`; clamp to one millisecond
fn ttl_millis(ttl: Duration) -> i64 {
	i64::try_from(ttl.as_millis())
		.unwrap_or(i64::MAX)
		.clamp(1, MAX_TTL_MILLIS)
}

#[async_trait]
impl CacheBackend for RedisCache {
	async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
		let mut conn = self.connection().await?;
		conn.get(key).await.map_err(|e| backend_error("get value", e))
	}

	async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
		let mut conn = self.connection().await?;
		match ttl {
			Some(ttl) => {
				let _: () = redis::cmd("SET")
					.arg(key)
					.arg(value)
					.arg("PX")
					.arg(ttl_millis(ttl))
					.query_async(&mut *conn)
					.await
					.map_err(|e| backend_error("set value", e))?;
			}
			None => {
				let _: () = conn
					.set(key, value)
					.await
					.map_err(|e| backend_error("set value", e))?;
			}
		}
		Ok(())
	}

	async fn delete(&self, key: &str) -> CacheResult<bool> {
		let mut conn = self.connection().await?;
		let removed: u64 = conn
			.del(key)
			.await
			.map_err(|e| backend_error("delete value", e))?;
		Ok(removed > 0)
	}

	async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
		let mut conn = self.connection().await?;
		let updated: bool = conn
			.pexpire(key, ttl_millis(ttl))
			.await
			.map_err(|e| backend_error("set expiry", e))?;
		Ok(updated)
	}

	async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
		let mut conn = self.connection().await?;
		let mut cursor: u64 = 0;
		let mut found = Vec::new();

		// SCAN instead of KEYS so large keyspaces do not block the server
		loop {
			let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
				.arg(cursor)
				.arg("MATCH")
				.arg(pattern)
				.arg("COUNT")
				.arg(SCAN_BATCH_SIZE)
				.query_async(&mut *conn)
				.await
				.map_err(|e| backend_error("scan keys", e))?;

			found.extend(keys);
			cursor = next_cursor;
			if cursor == 0 {
				break;
			}
		}

		Ok(found)
	}

	async fn ping(&self) -> CacheResult<()> {
		let mut conn = self.connection().await?;
		let _: String = redis::cmd("PING")
			.query_async(&mut *conn)
			.await
			.map_err(|e| backend_error("ping", e))?;
		Ok(())
	}

	async fn has_key(&self, key: &str) -> CacheResult<bool> {
		let mut conn = self.connection().await?;
		conn.exists(key)
			.await
			.map_err(|e| backend_error("check key existence", e))
	}

	fn name(&self) -> &'static str {
		"redis"
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Duration::from_secs(5), 5000)]
	#[case(Duration::from_micros(10), 1)]
	#[case(Duration::ZERO, 1)]
	#[case(Duration::from_secs(u64::MAX), MAX_TTL_MILLIS)]
	#[case(Duration::MAX, MAX_TTL_MILLIS)]
	fn test_ttl_millis(#[case] ttl: Duration, #[case] expected: i64) {
		assert_eq!(ttl_millis(ttl), expected);
	}

	#[rstest]
	#[tokio::test]
	async fn test_unreachable_server_reports_backend_error() {
		// Arrange
		let cache = RedisCache::new("redis://127.0.0.1:1").unwrap();

		// Act
		let result = cache.ping().await;

		// Assert
		assert!(matches!(result, Err(CacheError::Backend(_))));
	}
}

//! Cache statistics and entry information

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache entry information for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntryInfo {
	/// The key of the entry
	pub key: String,
	/// Size of the value in bytes
	pub size: usize,
	/// Whether the entry has an expiration time
	pub has_expiry: bool,
	/// Seconds until expiration (if applicable)
	pub ttl_seconds: Option<u64>,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
	/// Number of cache hits
	pub hits: u64,
	/// Number of cache misses
	pub misses: u64,
	/// Total number of lookups
	pub total_requests: u64,
	/// Backend failures absorbed by the manager
	pub errors: u64,
	/// Writes that landed in the local fallback store
	pub fallback_writes: u64,
}

impl CacheStatistics {
	/// Calculate hit rate (0.0 to 1.0)
	///
	/// # Examples
	///
	/// ```
	/// use registrar_cache::CacheStatistics;
	///
	/// let mut stats = CacheStatistics::default();
	/// stats.hits = 75;
	/// stats.misses = 25;
	/// stats.total_requests = 100;
	///
	/// assert_eq!(stats.hit_rate(), 0.75);
	/// ```
	pub fn hit_rate(&self) -> f64 {
		if self.total_requests == 0 {
			0.0
		} else {
			self.hits as f64 / self.total_requests as f64
		}
	}

	/// Calculate miss rate (0.0 to 1.0)
	pub fn miss_rate(&self) -> f64 {
		if self.total_requests == 0 {
			0.0
		} else {
			self.misses as f64 / self.total_requests as f64
		}
	}
}

/// Lock-free counters behind [`CacheStatistics`]
#[derive(Debug, Default)]
pub(crate) struct Counters {
	hits: AtomicU64,
	misses: AtomicU64,
	errors: AtomicU64,
	fallback_writes: AtomicU64,
}

impl Counters {
	pub(crate) fn hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn miss(&self) {
		self.misses.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn error(&self) {
		self.errors.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn fallback_write(&self) {
		self.fallback_writes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn snapshot(&self) -> CacheStatistics {
		let hits = self.hits.load(Ordering::Relaxed);
		let misses = self.misses.load(Ordering::Relaxed);
		CacheStatistics {
			hits,
			misses,
			total_requests: hits + misses,
			errors: self.errors.load(Ordering::Relaxed),
			fallback_writes: self.fallback_writes.load(Ordering::Relaxed),
		}
	}
}

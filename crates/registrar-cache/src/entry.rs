//! Cache entry structure

use std::time::{Duration, SystemTime};

/// A stored value with an optional absolute expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
	pub(crate) value: Vec<u8>,
	pub(crate) expires_at: Option<SystemTime>,
}

/// Absolute expiry `ttl` from now; `None` when it lies beyond what
/// `SystemTime` can represent, so such entries never expire
pub(crate) fn expiry_after(ttl: Duration) -> Option<SystemTime> {
	SystemTime::now().checked_add(ttl)
}

impl CacheEntry {
	pub fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
		let expires_at = ttl.and_then(expiry_after);
		Self { value, expires_at }
	}

	pub fn value(&self) -> &[u8] {
		&self.value
	}

	pub fn expires_at(&self) -> Option<SystemTime> {
		self.expires_at
	}

	/// An entry is expired once the current time is at or past its expiry
	pub fn is_expired(&self) -> bool {
		self.expired_at(SystemTime::now())
	}

	pub(crate) fn expired_at(&self, now: SystemTime) -> bool {
		match self.expires_at {
			Some(expires_at) => now >= expires_at,
			None => false,
		}
	}

	/// Time left before expiry, `None` for entries without one
	pub fn remaining(&self) -> Option<Duration> {
		self.expires_at
			.map(|at| at.duration_since(SystemTime::now()).unwrap_or(Duration::ZERO))
	}
}

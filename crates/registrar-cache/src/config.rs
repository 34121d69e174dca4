//! Cache manager configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache manager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct CacheConfig {
	/// Prefix prepended to derived cache keys
	pub key_prefix: String,
	/// TTL applied when a write does not specify one
	pub default_ttl: Option<Duration>,
	/// Keep a local copy when the remote backend is unavailable
	pub fallback_enabled: bool,
	/// Remote backend URL; `None` runs on the local store alone
	pub url: Option<String>,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			key_prefix: "registrar:".to_string(),
			default_ttl: Some(Duration::from_secs(300)),
			fallback_enabled: true,
			url: None,
		}
	}
}

impl CacheConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.key_prefix = prefix.into();
		self
	}

	pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
		self.default_ttl = ttl;
		self
	}

	pub fn with_fallback(mut self, enabled: bool) -> Self {
		self.fallback_enabled = enabled;
		self
	}

	pub fn with_url(mut self, url: impl Into<String>) -> Self {
		self.url = Some(url.into());
		self
	}

	/// Reject prefixes that would be read as glob syntax by `clear_pattern`
	pub fn validate(&self) -> Result<(), String> {
		if self.key_prefix.contains(['*', '?', '[', ']']) {
			return Err(format!(
				"key_prefix must not contain glob characters: {}",
				self.key_prefix
			));
		}
		if let Some(url) = &self.url
			&& url.trim().is_empty()
		{
			return Err("cache url must not be empty".to_string());
		}
		Ok(())
	}
}

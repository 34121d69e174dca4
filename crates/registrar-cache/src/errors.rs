//! Cache error types

use thiserror::Error;

/// Errors raised by cache backends
///
/// The [`CacheManager`](crate::CacheManager) absorbs these and degrades to a
/// miss or a no-op; they only reach callers that use a backend directly.
#[derive(Debug, Error)]
pub enum CacheError {
	/// The backend could not be reached or rejected the command
	#[error("Cache backend error: {0}")]
	Backend(String),

	/// A value could not be converted to or from its stored form
	#[error("Cache serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// A key pattern was not a valid glob
	#[error("Invalid key pattern: {0}")]
	Pattern(#[from] glob::PatternError),

	/// Invalid cache configuration
	#[error("Cache configuration error: {0}")]
	Config(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

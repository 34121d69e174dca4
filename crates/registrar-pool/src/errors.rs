//! Pool error types

use std::time::Duration;
use thiserror::Error;

/// Errors returned by the connection pool
#[derive(Debug, Error)]
pub enum PoolError {
	/// No connection became available before the acquire deadline.
	///
	/// This is a back-pressure signal, not a connection failure. Callers
	/// are expected to retry or answer with a retryable error.
	#[error("Connection pool exhausted: no connection available within {0:?}")]
	Exhausted(Duration),

	/// A new connection could not be established
	#[error("Connection error: {0}")]
	Connection(String),

	/// Error reported by the database driver
	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	/// Invalid pool configuration
	#[error("Configuration error: {0}")]
	Config(String),

	/// The pool has been closed with `close_all`
	#[error("Connection pool is closed")]
	Closed,
}

impl PoolError {
	/// Whether the caller may retry the operation later
	pub fn is_retryable(&self) -> bool {
		matches!(self, PoolError::Exhausted(_))
	}
}

pub type PoolResult<T> = Result<T, PoolError>;

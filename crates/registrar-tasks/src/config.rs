//! Task queue configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct QueueConfig {
	/// Queue name, used in logs
	pub name: String,
	/// Number of worker tasks started with the queue
	pub workers: usize,
	/// Upper bound on a worker's wait for the next item
	pub poll_interval: Duration,
}

impl QueueConfig {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			workers: 4,
			poll_interval: Duration::from_secs(1),
		}
	}

	pub fn with_workers(mut self, workers: usize) -> Self {
		self.workers = workers;
		self
	}

	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = interval;
		self
	}

	pub fn validate(&self) -> Result<(), String> {
		if self.workers == 0 {
			return Err("workers must be greater than 0".to_string());
		}
		if self.poll_interval.is_zero() {
			return Err("poll_interval must be greater than 0".to_string());
		}
		Ok(())
	}
}

impl Default for QueueConfig {
	fn default() -> Self {
		Self::new("default")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_queue_config_default() {
		let config = QueueConfig::default();
		assert_eq!(config.name, "default");
		assert_eq!(config.workers, 4);
		assert_eq!(config.poll_interval, Duration::from_secs(1));
		assert!(config.validate().is_ok());
	}

	#[rstest]
	fn test_zero_workers_rejected() {
		assert!(QueueConfig::new("reports").with_workers(0).validate().is_err());
	}

	#[rstest]
	fn test_zero_poll_interval_rejected() {
		let config = QueueConfig::default().with_poll_interval(Duration::ZERO);
		assert!(config.validate().is_err());
	}
}

//! Pool configuration

use std::time::Duration;

/// Connection pool configuration
///
/// `min_connections` idle connections are created eagerly and kept alive by the
/// maintenance loop; the pool never holds more than `max_connections` in total.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct PoolConfig {
	pub min_connections: u32,
	pub max_connections: u32,
	/// Idle connections older than this are reclaimed by maintenance
	pub max_idle_time: Duration,
	pub acquire_timeout: Duration,
	pub maintenance_interval: Duration,
	pub test_before_acquire: bool,
	pub test_on_release: bool,
}

impl Default for PoolConfig {
	fn default() -> Self {
		Self {
			min_connections: 2,
			max_connections: 10,
			max_idle_time: Duration::from_secs(300),
			acquire_timeout: Duration::from_secs(30),
			maintenance_interval: Duration::from_secs(60),
			test_before_acquire: true,
			test_on_release: true,
		}
	}
}

impl PoolConfig {
	/// Create a new pool configuration with default values
	///
	/// # Examples
	///
	/// ```rust
	/// use registrar_pool::PoolConfig;
	///
	/// let config = PoolConfig::new();
	/// assert_eq!(config.max_connections, 10);
	/// assert_eq!(config.min_connections, 2);
	/// ```
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_min_connections(mut self, min: u32) -> Self {
		self.min_connections = min;
		self
	}

	pub fn with_max_connections(mut self, max: u32) -> Self {
		self.max_connections = max;
		self
	}

	pub fn with_max_idle_time(mut self, max_idle: Duration) -> Self {
		self.max_idle_time = max_idle;
		self
	}

	pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
		self.acquire_timeout = timeout;
		self
	}

	pub fn with_maintenance_interval(mut self, interval: Duration) -> Self {
		self.maintenance_interval = interval;
		self
	}

	pub fn with_test_before_acquire(mut self, test: bool) -> Self {
		self.test_before_acquire = test;
		self
	}

	pub fn with_test_on_release(mut self, test: bool) -> Self {
		self.test_on_release = test;
		self
	}

	/// Check the configuration for inconsistent bounds
	///
	/// # Examples
	///
	/// ```rust
	/// use registrar_pool::PoolConfig;
	///
	/// let config = PoolConfig::new().with_min_connections(5).with_max_connections(2);
	/// assert!(config.validate().is_err());
	/// ```
	pub fn validate(&self) -> Result<(), String> {
		if self.max_connections == 0 {
			return Err("max_connections must be greater than 0".to_string());
		}
		if self.max_connections < self.min_connections {
			return Err("max_connections must be >= min_connections".to_string());
		}
		if self.maintenance_interval.is_zero() {
			return Err("maintenance_interval must be greater than 0".to_string());
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_default_config_is_valid() {
		// Arrange
		let config = PoolConfig::default();

		// Act
		let result = config.validate();

		// Assert
		assert!(result.is_ok());
		assert!(config.test_before_acquire);
		assert!(config.test_on_release);
	}

	#[rstest]
	#[case(0, 0)]
	#[case(3, 2)]
	fn test_invalid_bounds_rejected(#[case] min: u32, #[case] max: u32) {
		// Arrange
		let config = PoolConfig::new()
			.with_min_connections(min)
			.with_max_connections(max);

		// Act
		let result = config.validate();

		// Assert
		assert!(result.is_err());
	}

	#[rstest]
	fn test_zero_maintenance_interval_rejected() {
		// Arrange
		let config = PoolConfig::new().with_maintenance_interval(Duration::ZERO);

		// Act & Assert
		assert!(config.validate().is_err());
	}
}

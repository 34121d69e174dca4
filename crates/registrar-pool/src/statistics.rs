//! Pool statistics

use serde::Serialize;

/// Snapshot of the pool counters
///
/// `active_connections + idle_connections == total_connections` whenever no
/// acquire or release is in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStatistics {
	pub total_connections: u32,
	pub active_connections: u32,
	pub idle_connections: u32,
	/// Connections successfully opened since start (or since `close_all`)
	pub created_connections: u64,
	pub closed_connections: u64,
	/// Connection attempts that failed
	pub failed_connections: u64,
	/// Highest number of simultaneously active connections
	pub peak_connections: u32,
	pub total_requests: u64,
	/// Acquire calls that ended without a connection
	pub failed_requests: u64,
}

impl PoolStatistics {
	/// Fraction of acquire calls that failed (0.0 to 1.0)
	///
	/// # Examples
	///
	/// ```
	/// use registrar_pool::PoolStatistics;
	///
	/// let mut stats = PoolStatistics::default();
	/// stats.total_requests = 4;
	/// stats.failed_requests = 1;
	///
	/// assert_eq!(stats.failure_rate(), 0.25);
	/// ```
	pub fn failure_rate(&self) -> f64 {
		if self.total_requests == 0 {
			0.0
		} else {
			self.failed_requests as f64 / self.total_requests as f64
		}
	}

	/// Connections that may still be opened before hitting `max`
	pub fn available_slots(&self, max_connections: u32) -> u32 {
		max_connections.saturating_sub(self.total_connections)
	}

	pub(crate) fn record_checkout(&mut self) {
		self.active_connections += 1;
		self.peak_connections = self.peak_connections.max(self.active_connections);
	}
}

//! Queue statistics

use serde::Serialize;

/// Snapshot of the task table and worker pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatistics {
	/// Worker tasks started with the queue
	pub workers: usize,
	/// Workers currently executing a task
	pub busy_workers: usize,
	pub pending: usize,
	pub running: usize,
	pub succeeded: usize,
	pub failed: usize,
}

impl QueueStatistics {
	/// Number of records in the table
	pub fn total(&self) -> usize {
		self.pending + self.running + self.succeeded + self.failed
	}

	/// Share of finished tasks that failed (0.0 to 1.0)
	pub fn failure_rate(&self) -> f64 {
		let finished = self.succeeded + self.failed;
		if finished == 0 {
			0.0
		} else {
			self.failed as f64 / finished as f64
		}
	}
}

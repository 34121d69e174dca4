//! Task queue error types

use crate::task::TaskId;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`TaskQueue`](crate::TaskQueue) operations
///
/// Failures of the task bodies themselves are not errors of the queue; they
/// are recorded on the task as [`TaskStatus::Failure`](crate::TaskStatus::Failure).
#[derive(Debug, Error)]
pub enum TaskError {
	/// The queue was shut down and accepts no more work
	#[error("Task queue is shut down")]
	QueueClosed,

	/// No record exists for the id (never enqueued or already cleaned up)
	#[error("Task not found: {0}")]
	NotFound(TaskId),

	/// The task did not finish within the wait limit
	#[error("Task {0} did not finish within {1:?}")]
	Timeout(TaskId, Duration),

	/// Invalid queue configuration
	#[error("Task queue configuration error: {0}")]
	Config(String),
}

pub type TaskResult<T> = Result<T, TaskError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_timeout_display_names_task() {
		// Arrange
		let id = TaskId::new();

		// Act
		let message = TaskError::Timeout(id, Duration::from_secs(2)).to_string();

		// Assert
		assert!(message.contains(&id.to_string()));
		assert!(message.ends_with("2s"));
	}
}

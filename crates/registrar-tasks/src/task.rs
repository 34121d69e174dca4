//! Task identifiers and states

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a task
///
/// # Example
///
/// ```rust
/// use registrar_tasks::TaskId;
///
/// let id1 = TaskId::new();
/// let id2 = TaskId::new();
/// assert_ne!(id1, id2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub uuid::Uuid);

impl TaskId {
	/// Create a new unique task ID
	pub fn new() -> Self {
		Self(uuid::Uuid::new_v4())
	}
}

impl Default for TaskId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for TaskId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for TaskId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(uuid::Uuid::parse_str(s)?))
	}
}

/// Status of a task
///
/// Tasks move forward only: `Pending -> Running -> Success | Failure`.
///
/// # Example
///
/// ```rust
/// use registrar_tasks::TaskStatus;
///
/// assert!(!TaskStatus::Running.is_terminal());
/// assert!(TaskStatus::Failure.is_terminal());
/// assert_eq!(TaskStatus::Success.to_string(), "success");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
	Pending,
	Running,
	Success,
	Failure,
}

impl TaskStatus {
	/// Whether the task has finished, successfully or not
	pub fn is_terminal(self) -> bool {
		matches!(self, TaskStatus::Success | TaskStatus::Failure)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			TaskStatus::Pending => "pending",
			TaskStatus::Running => "running",
			TaskStatus::Success => "success",
			TaskStatus::Failure => "failure",
		}
	}
}

impl fmt::Display for TaskStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_task_id_round_trips_through_string() {
		// Arrange
		let id = TaskId::new();

		// Act
		let parsed: TaskId = id.to_string().parse().unwrap();

		// Assert
		assert_eq!(parsed, id);
	}

	#[rstest]
	fn test_task_id_rejects_garbage() {
		assert!("not-a-uuid".parse::<TaskId>().is_err());
	}

	#[rstest]
	#[case(TaskStatus::Pending, false)]
	#[case(TaskStatus::Running, false)]
	#[case(TaskStatus::Success, true)]
	#[case(TaskStatus::Failure, true)]
	fn test_terminal_states(#[case] status: TaskStatus, #[case] terminal: bool) {
		assert_eq!(status.is_terminal(), terminal);
	}

	#[rstest]
	fn test_status_serializes_lowercase() {
		// Act
		let json = serde_json::to_string(&TaskStatus::Running).unwrap();

		// Assert
		assert_eq!(json, "\"running\"");
	}
}

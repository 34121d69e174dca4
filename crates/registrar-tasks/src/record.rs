//! Task records
//!
//! One record per enqueued task, kept in the queue's table until removed by
//! [`TaskQueue::cleanup_old_results`](crate::TaskQueue::cleanup_old_results).

use crate::task::{TaskId, TaskStatus};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Lifecycle and outcome of one task
///
/// `result` is set only on [`TaskStatus::Success`], `error` only on
/// [`TaskStatus::Failure`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
	id: TaskId,
	name: String,
	status: TaskStatus,
	created_at: DateTime<Utc>,
	started_at: Option<DateTime<Utc>>,
	completed_at: Option<DateTime<Utc>>,
	result: Option<Value>,
	error: Option<String>,
}

impl TaskRecord {
	pub(crate) fn new(id: TaskId, name: impl Into<String>) -> Self {
		Self {
			id,
			name: name.into(),
			status: TaskStatus::Pending,
			created_at: Utc::now(),
			started_at: None,
			completed_at: None,
			result: None,
			error: None,
		}
	}

	/// `Pending -> Running`; returns `false` for any other starting state
	pub(crate) fn mark_running(&mut self) -> bool {
		if self.status != TaskStatus::Pending {
			return false;
		}
		self.status = TaskStatus::Running;
		self.started_at = Some(Utc::now());
		true
	}

	/// `Running -> Success`
	pub(crate) fn succeed(&mut self, value: Value) -> bool {
		if self.status != TaskStatus::Running {
			return false;
		}
		self.status = TaskStatus::Success;
		self.result = Some(value);
		self.completed_at = Some(Utc::now());
		true
	}

	/// `Running -> Failure`
	pub(crate) fn fail(&mut self, error: impl Into<String>) -> bool {
		if self.status != TaskStatus::Running {
			return false;
		}
		self.status = TaskStatus::Failure;
		self.error = Some(error.into());
		self.completed_at = Some(Utc::now());
		true
	}

	/// Completion time, or creation time for tasks that never completed
	pub(crate) fn age_reference(&self) -> DateTime<Utc> {
		self.completed_at.unwrap_or(self.created_at)
	}

	pub fn id(&self) -> TaskId {
		self.id
	}

	/// Task source name: the explicit name, or the function type name
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn status(&self) -> TaskStatus {
		self.status
	}

	pub fn created_at(&self) -> DateTime<Utc> {
		self.created_at
	}

	pub fn started_at(&self) -> Option<DateTime<Utc>> {
		self.started_at
	}

	pub fn completed_at(&self) -> Option<DateTime<Utc>> {
		self.completed_at
	}

	/// The JSON-encoded return value of a successful task
	pub fn result(&self) -> Option<&Value> {
		self.result.as_ref()
	}

	/// Decode the return value of a successful task
	pub fn result_as<T: DeserializeOwned>(&self) -> Option<T> {
		self.result
			.as_ref()
			.and_then(|value| serde_json::from_value(value.clone()).ok())
	}

	/// Error message of a failed task
	pub fn error(&self) -> Option<&str> {
		self.error.as_deref()
	}

	/// Time spent running, once finished
	pub fn duration(&self) -> Option<TimeDelta> {
		Some(self.completed_at? - self.started_at?)
	}
}

//! Worker loop
//!
//! Workers share one FIFO receiver. Each waits a bounded `poll_interval` for
//! the next message, runs the task, and writes the outcome to the record table.
//! Errors and panics raised by a task body are caught here and recorded as
//! failures; the worker keeps running.

use crate::record::TaskRecord;
use crate::task::TaskId;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify, mpsc};

/// What a task body produced: its JSON value or an error message
pub(crate) type Outcome = Result<Value, String>;

/// A type-erased task body
pub(crate) type Job = Box<dyn FnOnce() -> BoxFuture<'static, Outcome> + Send>;

pub(crate) struct WorkItem {
	pub(crate) id: TaskId,
	pub(crate) job: Job,
}

pub(crate) enum Message {
	Run(WorkItem),
	Stop,
}

enum Poll {
	Message(Message),
	Idle,
	Disconnected,
}

/// State shared between the queue handle and its workers
pub(crate) struct Shared {
	/// Never held across `.await`
	pub(crate) records: RwLock<HashMap<TaskId, TaskRecord>>,
	pub(crate) receiver: Mutex<mpsc::UnboundedReceiver<Message>>,
	/// Signalled whenever a task reaches a terminal state
	pub(crate) completed: Notify,
	pub(crate) busy: AtomicUsize,
	pub(crate) poll_interval: Duration,
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic payload".to_string()
	}
}

impl Shared {
	/// Wait at most `poll_interval` for the next message
	async fn next_message(&self) -> Poll {
		let mut receiver = self.receiver.lock().await;
		match tokio::time::timeout(self.poll_interval, receiver.recv()).await {
			Ok(Some(message)) => Poll::Message(message),
			Ok(None) => Poll::Disconnected,
			Err(_) => Poll::Idle,
		}
	}

	async fn execute(&self, worker_id: usize, item: WorkItem) {
		let WorkItem { id, job } = item;

		let name = {
			let mut records = self.records.write();
			match records.get_mut(&id) {
				Some(record) => {
					record.mark_running();
					record.name().to_string()
				}
				None => String::new(),
			}
		};
		if name.is_empty() {
			tracing::debug!(task_id = %id, "Record removed before execution, running anyway");
		}

		self.busy.fetch_add(1, Ordering::SeqCst);
		let started = Instant::now();
		tracing::debug!(worker_id, task_id = %id, task = %name, "Task started");

		let outcome = match AssertUnwindSafe(job()).catch_unwind().await {
			Ok(outcome) => outcome,
			Err(payload) => Err(format!("task panicked: {}", panic_message(payload.as_ref()))),
		};
		let elapsed = started.elapsed();

		{
			let mut records = self.records.write();
			match (records.get_mut(&id), &outcome) {
				(Some(record), Ok(value)) => {
					record.succeed(value.clone());
				}
				(Some(record), Err(error)) => {
					record.fail(error.as_str());
				}
				(None, _) => {
					tracing::debug!(task_id = %id, "Record removed while running, outcome dropped");
				}
			}
		}
		self.busy.fetch_sub(1, Ordering::SeqCst);

		match &outcome {
			Ok(_) => tracing::info!(worker_id, task_id = %id, task = %name, ?elapsed, "Task succeeded"),
			Err(error) => {
				tracing::warn!(worker_id, task_id = %id, task = %name, ?elapsed, error = %error, "Task failed")
			}
		}
		self.completed.notify_waiters();
	}
}

/// Body of one worker task
pub(crate) async fn run(worker_id: usize, shared: std::sync::Arc<Shared>) {
	tracing::debug!(worker_id, "Task worker started");

	loop {
		match shared.next_message().await {
			Poll::Message(Message::Run(item)) => shared.execute(worker_id, item).await,
			Poll::Message(Message::Stop) | Poll::Disconnected => break,
			Poll::Idle => continue,
		}
	}

	tracing::debug!(worker_id, "Task worker stopped");
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Box::new("static message") as Box<dyn Any + Send>, "static message")]
	#[case(Box::new(String::from("owned message")) as Box<dyn Any + Send>, "owned message")]
	#[case(Box::new(42_u32) as Box<dyn Any + Send>, "unknown panic payload")]
	fn test_panic_message(#[case] payload: Box<dyn Any + Send>, #[case] expected: &str) {
		assert_eq!(panic_message(payload.as_ref()), expected);
	}
}

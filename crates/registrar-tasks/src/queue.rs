//! Task queue management

use crate::config::QueueConfig;
use crate::errors::{TaskError, TaskResult};
use crate::record::TaskRecord;
use crate::statistics::QueueStatistics;
use crate::task::{TaskId, TaskStatus};
use crate::worker::{self, Job, Message, Outcome, Shared, WorkItem, panic_message};
use chrono::{TimeDelta, Utc};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;

struct QueueInner {
	config: QueueConfig,
	shared: Arc<Shared>,
	sender: mpsc::UnboundedSender<Message>,
	/// Held while sending so no item can be queued behind the stop sentinels
	closed: Mutex<bool>,
	workers: Mutex<Vec<JoinHandle<()>>>,
	/// Set once every worker has been joined
	stopped: watch::Sender<bool>,
}

/// In-process background task queue
///
/// A fixed pool of worker tasks drains a shared FIFO. Every task gets a
/// [`TaskRecord`] that callers can poll with [`get_status`](Self::get_status)
/// and [`get_result`](Self::get_result) or await with
/// [`wait_for`](Self::wait_for). Cloning is cheap; clones share workers and
/// records.
///
/// # Examples
///
/// ```
/// use registrar_tasks::{QueueConfig, TaskQueue, TaskStatus};
/// use std::time::Duration;
///
/// # async fn example() {
/// let queue = TaskQueue::new(QueueConfig::default().with_workers(2)).unwrap();
///
/// let id = queue
///     .enqueue_named("answer", || async { Ok::<_, String>(42) })
///     .unwrap();
///
/// let record = queue.wait_for(id, Duration::from_secs(5)).await.unwrap();
/// assert_eq!(record.status(), TaskStatus::Success);
/// assert_eq!(record.result_as::<i32>(), Some(42));
///
/// queue.shutdown().await;
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
/// ```
#[derive(Clone)]
pub struct TaskQueue {
	inner: Arc<QueueInner>,
}

fn encode<T: Serialize>(value: T) -> Outcome {
	serde_json::to_value(value).map_err(|e| format!("task result is not serializable: {}", e))
}

impl TaskQueue {
	/// Create the queue and start `config.workers` workers.
	///
	/// Must be called from within a Tokio runtime.
	pub fn new(config: QueueConfig) -> TaskResult<Self> {
		config.validate().map_err(TaskError::Config)?;

		let (sender, receiver) = mpsc::unbounded_channel();
		let shared = Arc::new(Shared {
			records: RwLock::new(HashMap::new()),
			receiver: tokio::sync::Mutex::new(receiver),
			completed: Notify::new(),
			busy: AtomicUsize::new(0),
			poll_interval: config.poll_interval,
		});

		let workers = (0..config.workers)
			.map(|worker_id| tokio::spawn(worker::run(worker_id, shared.clone())))
			.collect();

		tracing::info!(queue = %config.name, workers = config.workers, "Task queue started");

		Ok(Self {
			inner: Arc::new(QueueInner {
				config,
				shared,
				sender,
				closed: Mutex::new(false),
				workers: Mutex::new(workers),
				stopped: watch::Sender::new(false),
			}),
		})
	}

	pub fn config(&self) -> &QueueConfig {
		&self.inner.config
	}

	/// Submit an async task, named after the function's type.
	///
	/// Returns immediately with the new task's id.
	///
	/// # Errors
	///
	/// [`TaskError::QueueClosed`] after [`shutdown`](Self::shutdown).
	pub fn enqueue<F, Fut, T, E>(&self, f: F) -> TaskResult<TaskId>
	where
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = Result<T, E>> + Send + 'static,
		T: Serialize + Send + 'static,
		E: Display + Send + 'static,
	{
		self.enqueue_named(std::any::type_name::<F>(), f)
	}

	/// Submit an async task under an explicit name
	pub fn enqueue_named<F, Fut, T, E>(&self, name: impl Into<String>, f: F) -> TaskResult<TaskId>
	where
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = Result<T, E>> + Send + 'static,
		T: Serialize + Send + 'static,
		E: Display + Send + 'static,
	{
		let job: Job = Box::new(move || {
			async move {
				match f().await {
					Ok(value) => encode(value),
					Err(e) => Err(e.to_string()),
				}
			}
			.boxed()
		});
		self.submit(name.into(), job)
	}

	/// Submit a synchronous, CPU-bound task; it runs on the blocking thread pool
	pub fn enqueue_blocking<F, T, E>(&self, name: impl Into<String>, f: F) -> TaskResult<TaskId>
	where
		F: FnOnce() -> Result<T, E> + Send + 'static,
		T: Serialize + Send + 'static,
		E: Display + Send + 'static,
	{
		let job: Job = Box::new(move || {
			async move {
				match tokio::task::spawn_blocking(f).await {
					Ok(Ok(value)) => encode(value),
					Ok(Err(e)) => Err(e.to_string()),
					Err(e) if e.is_panic() => {
						let payload = e.into_panic();
						Err(format!("task panicked: {}", panic_message(payload.as_ref())))
					}
					Err(e) => Err(e.to_string()),
				}
			}
			.boxed()
		});
		self.submit(name.into(), job)
	}

	fn submit(&self, name: String, job: Job) -> TaskResult<TaskId> {
		let id = TaskId::new();

		let closed = self.inner.closed.lock();
		if *closed {
			return Err(TaskError::QueueClosed);
		}

		// The record must exist before a worker can pick the item up
		self.inner
			.shared
			.records
			.write()
			.insert(id, TaskRecord::new(id, name.as_str()));

		if self.inner.sender.send(Message::Run(WorkItem { id, job })).is_err() {
			self.inner.shared.records.write().remove(&id);
			return Err(TaskError::QueueClosed);
		}
		drop(closed);

		tracing::debug!(task_id = %id, task = %name, "Task enqueued");
		Ok(id)
	}

	/// Current status of a task, `None` for unknown or cleaned-up ids
	pub fn get_status(&self, id: TaskId) -> Option<TaskStatus> {
		self.inner.shared.records.read().get(&id).map(TaskRecord::status)
	}

	/// Snapshot of a task's record, `None` for unknown or cleaned-up ids
	pub fn get_result(&self, id: TaskId) -> Option<TaskRecord> {
		self.inner.shared.records.read().get(&id).cloned()
	}

	/// Wait until the task reaches a terminal state.
	///
	/// # Errors
	///
	/// - [`TaskError::NotFound`] if no record exists for `id`
	/// - [`TaskError::Timeout`] if the task is still pending or running after `timeout`
	pub async fn wait_for(&self, id: TaskId, timeout: Duration) -> TaskResult<TaskRecord> {
		// `None` when the deadline lies beyond what `Instant` can represent: wait without one
		let deadline = tokio::time::Instant::now().checked_add(timeout);

		loop {
			let notified = self.inner.shared.completed.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();

			match self.get_result(id) {
				None => return Err(TaskError::NotFound(id)),
				Some(record) if record.status().is_terminal() => return Ok(record),
				Some(_) => {}
			}

			match deadline {
				Some(deadline) => {
					if tokio::time::timeout_at(deadline, notified).await.is_err() {
						return Err(TaskError::Timeout(id, timeout));
					}
				}
				None => notified.await,
			}
		}
	}

	/// Delete records that completed (or, if never completed, were created)
	/// at least `max_age` ago; returns the number removed.
	///
	/// `Duration::ZERO` removes every record.
	pub fn cleanup_old_results(&self, max_age: Duration) -> usize {
		let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
		let cutoff = Utc::now().checked_sub_signed(max_age);

		let removed = {
			let mut records = self.inner.shared.records.write();
			let before = records.len();
			if let Some(cutoff) = cutoff {
				records.retain(|_, record| record.age_reference() > cutoff);
			}
			before - records.len()
		};

		if removed > 0 {
			tracing::info!(removed, "Cleaned up old task records");
		}
		removed
	}

	/// Counts per status and worker utilisation
	pub fn statistics(&self) -> QueueStatistics {
		let mut stats = QueueStatistics {
			workers: self.inner.config.workers,
			busy_workers: self.inner.shared.busy.load(std::sync::atomic::Ordering::SeqCst),
			..QueueStatistics::default()
		};

		for record in self.inner.shared.records.read().values() {
			match record.status() {
				TaskStatus::Pending => stats.pending += 1,
				TaskStatus::Running => stats.running += 1,
				TaskStatus::Success => stats.succeeded += 1,
				TaskStatus::Failure => stats.failed += 1,
			}
		}
		stats
	}

	pub fn is_shut_down(&self) -> bool {
		*self.inner.closed.lock()
	}

	/// Stop accepting work and wait for the workers to exit.
	///
	/// Items queued before the call are still executed: one stop sentinel per
	/// worker is queued behind them. Every caller, including concurrent and
	/// repeated ones, returns only after all workers have exited.
	pub async fn shutdown(&self) {
		let mut stopped = self.inner.stopped.subscribe();
		let handles = {
			let mut closed = self.inner.closed.lock();
			if !*closed {
				*closed = true;
				for _ in 0..self.inner.config.workers {
					let _ = self.inner.sender.send(Message::Stop);
				}
			}
			std::mem::take(&mut *self.inner.workers.lock())
		};

		if handles.is_empty() {
			// Another caller owns the joins
			let _ = stopped.wait_for(|done| *done).await;
			return;
		}

		for handle in handles {
			if let Err(e) = handle.await {
				tracing::error!(error = %e, "Task worker terminated abnormally");
			}
		}
		self.inner.stopped.send_replace(true);
		tracing::info!(queue = %self.inner.config.name, "Task queue shut down");
	}
}

//! Task queue lifecycle tests
//!
//! Covers enqueue and execution, failure isolation, record cleanup and shutdown.

use registrar_tasks::{QueueConfig, TaskError, TaskId, TaskQueue, TaskStatus};
use rstest::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Barrier, oneshot};

const WAIT: Duration = Duration::from_secs(5);

fn queue_with(workers: usize) -> TaskQueue {
	let config = QueueConfig::new("test")
		.with_workers(workers)
		.with_poll_interval(Duration::from_millis(50));
	TaskQueue::new(config).unwrap()
}

async fn wait_for_status(queue: &TaskQueue, id: TaskId, status: TaskStatus) {
	for _ in 0..200 {
		if queue.get_status(id) == Some(status) {
			return;
		}
		tokio::time::sleep(Duration::from_millis(10)).await;
	}
	panic!("task {id} never reached {status}");
}

#[rstest]
#[tokio::test]
async fn test_successful_task_lifecycle() {
	// Arrange
	let queue = queue_with(2);

	// Act
	let id = queue
		.enqueue_named("answer", || async { Ok::<_, String>(42) })
		.unwrap();
	let record = queue.wait_for(id, WAIT).await.unwrap();

	// Assert
	assert_eq!(record.id(), id);
	assert_eq!(record.name(), "answer");
	assert_eq!(record.status(), TaskStatus::Success);
	assert_eq!(record.result_as::<i32>(), Some(42));
	assert!(record.error().is_none());
	let started = record.started_at().unwrap();
	let completed = record.completed_at().unwrap();
	assert!(record.created_at() <= started);
	assert!(started <= completed);
	assert_eq!(queue.get_status(id), Some(TaskStatus::Success));

	queue.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn test_failed_task_keeps_worker_alive() {
	// Arrange
	let queue = queue_with(1);

	// Act
	let failing = queue
		.enqueue_named("import", || async { Err::<(), _>("student 1001 not found") })
		.unwrap();
	let failed = queue.wait_for(failing, WAIT).await.unwrap();
	let next = queue
		.enqueue_named("next", || async { Ok::<_, String>("done") })
		.unwrap();
	let succeeded = queue.wait_for(next, WAIT).await.unwrap();

	// Assert
	assert_eq!(failed.status(), TaskStatus::Failure);
	assert_eq!(failed.error(), Some("student 1001 not found"));
	assert!(failed.result().is_none());
	assert_eq!(succeeded.status(), TaskStatus::Success);

	queue.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn test_panicking_task_is_recorded_as_failure() {
	// Arrange
	let queue = queue_with(1);

	// Act
	let panicking = queue
		.enqueue_named("explode", || async {
			if true {
				panic!("kaboom");
			}
			Ok::<u32, String>(0)
		})
		.unwrap();
	let failed = queue.wait_for(panicking, WAIT).await.unwrap();
	let next = queue
		.enqueue_named("after", || async { Ok::<_, String>(7) })
		.unwrap();
	let succeeded = queue.wait_for(next, WAIT).await.unwrap();

	// Assert
	assert_eq!(failed.status(), TaskStatus::Failure);
	assert_eq!(failed.error(), Some("task panicked: kaboom"));
	assert_eq!(succeeded.result_as::<u32>(), Some(7));

	queue.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn test_blocking_task_runs_on_blocking_pool() {
	// Arrange
	let queue = queue_with(1);

	// Act
	let id = queue
		.enqueue_blocking("report", || Ok::<_, String>((1..=100).sum::<u64>()))
		.unwrap();
	let record = queue.wait_for(id, WAIT).await.unwrap();

	// Assert
	assert_eq!(record.status(), TaskStatus::Success);
	assert_eq!(record.result_as::<u64>(), Some(5050));

	queue.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn test_blocking_task_panic_is_recorded() {
	// Arrange
	let queue = queue_with(1);

	// Act
	let id = queue
		.enqueue_blocking("report", || -> Result<(), String> { panic!("out of paper") })
		.unwrap();
	let record = queue.wait_for(id, WAIT).await.unwrap();

	// Assert
	assert_eq!(record.status(), TaskStatus::Failure);
	assert_eq!(record.error(), Some("task panicked: out of paper"));

	queue.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn test_status_moves_through_pending_and_running() {
	// Arrange
	let queue = queue_with(1);
	let (release_first, gate) = oneshot::channel::<()>();

	// Act
	let first = queue
		.enqueue_named("gated", || async move {
			let _ = gate.await;
			Ok::<_, String>(1)
		})
		.unwrap();
	let second = queue
		.enqueue_named("queued", || async { Ok::<_, String>(2) })
		.unwrap();
	wait_for_status(&queue, first, TaskStatus::Running).await;

	// Assert
	assert_eq!(queue.get_status(second), Some(TaskStatus::Pending));
	let stats = queue.statistics();
	assert_eq!(stats.running, 1);
	assert_eq!(stats.pending, 1);
	assert_eq!(stats.busy_workers, 1);

	// Act
	release_first.send(()).unwrap();
	let second_record = queue.wait_for(second, WAIT).await.unwrap();

	// Assert
	assert_eq!(second_record.status(), TaskStatus::Success);
	assert_eq!(queue.get_status(first), Some(TaskStatus::Success));

	queue.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn test_workers_run_tasks_concurrently() {
	// Arrange
	let queue = queue_with(4);
	let barrier = Arc::new(Barrier::new(4));

	// Act: each task only finishes once all four are running at the same time
	let ids: Vec<TaskId> = (0..4)
		.map(|i| {
			let barrier = barrier.clone();
			queue
				.enqueue_named(format!("parallel-{i}"), move || async move {
					barrier.wait().await;
					Ok::<_, String>(i)
				})
				.unwrap()
		})
		.collect();

	// Assert
	for id in ids {
		let record = queue.wait_for(id, WAIT).await.unwrap();
		assert_eq!(record.status(), TaskStatus::Success);
	}

	queue.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn test_single_worker_preserves_fifo_order() {
	// Arrange
	let queue = queue_with(1);
	let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

	// Act
	for i in 0..5 {
		let order = order.clone();
		queue
			.enqueue_named(format!("step-{i}"), move || async move {
				order.lock().push(i);
				Ok::<_, String>(())
			})
			.unwrap();
	}
	queue.shutdown().await;

	// Assert
	assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
}

#[rstest]
#[tokio::test]
async fn test_unnamed_task_uses_function_type_name() {
	// Arrange
	let queue = queue_with(1);

	// Act
	let id = queue.enqueue(|| async { Ok::<_, String>(()) }).unwrap();
	let record = queue.wait_for(id, WAIT).await.unwrap();

	// Assert
	assert!(
		record.name().contains("test_unnamed_task_uses_function_type_name"),
		"unexpected name {}",
		record.name()
	);

	queue.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn test_unknown_task_id() {
	// Arrange
	let queue = queue_with(1);
	let unknown = TaskId::new();

	// Act
	let status = queue.get_status(unknown);
	let record = queue.get_result(unknown);
	let waited = queue.wait_for(unknown, Duration::from_millis(10)).await;

	// Assert
	assert!(status.is_none());
	assert!(record.is_none());
	assert!(matches!(waited, Err(TaskError::NotFound(id)) if id == unknown));

	queue.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn test_wait_for_times_out_on_unfinished_task() {
	// Arrange
	let queue = queue_with(1);
	let (release, gate) = oneshot::channel::<()>();
	let id = queue
		.enqueue_named("slow", || async move {
			let _ = gate.await;
			Ok::<_, String>(())
		})
		.unwrap();

	// Act
	let waited = queue.wait_for(id, Duration::from_millis(50)).await;

	// Assert
	assert!(matches!(waited, Err(TaskError::Timeout(_, _))));

	release.send(()).unwrap();
	queue.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn test_wait_for_without_deadline_returns_terminal_record() {
	// Arrange
	let queue = queue_with(1);
	let (release, gate) = oneshot::channel::<()>();
	let id = queue
		.enqueue_named("gated", || async move {
			let _ = gate.await;
			Ok::<_, String>("graded")
		})
		.unwrap();

	// Act
	let waiter = {
		let queue = queue.clone();
		tokio::spawn(async move { queue.wait_for(id, Duration::MAX).await })
	};
	tokio::time::sleep(Duration::from_millis(20)).await;
	release.send(()).unwrap();
	let record = tokio::time::timeout(WAIT, waiter).await.unwrap().unwrap().unwrap();
	let again = queue.wait_for(id, Duration::MAX).await.unwrap();

	// Assert
	assert_eq!(record.status(), TaskStatus::Success);
	assert_eq!(record.result_as::<String>().as_deref(), Some("graded"));
	assert_eq!(again.status(), TaskStatus::Success);

	queue.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn test_cleanup_with_zero_max_age_removes_finished_records() {
	// Arrange
	let queue = queue_with(2);
	let mut ids = Vec::new();
	for i in 0..3 {
		let id = queue
			.enqueue_named("cleanup", move || async move { Ok::<_, String>(i) })
			.unwrap();
		ids.push(id);
	}
	for id in &ids {
		queue.wait_for(*id, WAIT).await.unwrap();
	}

	// Act
	let removed = queue.cleanup_old_results(Duration::ZERO);

	// Assert
	assert_eq!(removed, 3);
	for id in ids {
		assert!(queue.get_status(id).is_none());
	}
	assert_eq!(queue.statistics().total(), 0);

	queue.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn test_cleanup_keeps_recent_records() {
	// Arrange
	let queue = queue_with(1);
	let id = queue
		.enqueue_named("recent", || async { Ok::<_, String>(()) })
		.unwrap();
	queue.wait_for(id, WAIT).await.unwrap();

	// Act
	let removed = queue.cleanup_old_results(Duration::from_secs(3600));

	// Assert
	assert_eq!(removed, 0);
	assert_eq!(queue.get_status(id), Some(TaskStatus::Success));

	queue.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn test_shutdown_drains_queued_work() {
	// Arrange
	let queue = queue_with(2);
	let ids: Vec<TaskId> = (0..10)
		.map(|i| {
			queue
				.enqueue_named("drain", move || async move {
					tokio::time::sleep(Duration::from_millis(5)).await;
					Ok::<_, String>(i)
				})
				.unwrap()
		})
		.collect();

	// Act
	queue.shutdown().await;

	// Assert
	for id in ids {
		assert_eq!(queue.get_status(id), Some(TaskStatus::Success));
	}
	let stats = queue.statistics();
	assert_eq!(stats.succeeded, 10);
	assert_eq!(stats.busy_workers, 0);
}

#[rstest]
#[tokio::test]
async fn test_concurrent_shutdown_callers_all_wait_for_drain() {
	// Arrange
	let queue = queue_with(1);
	let ids: Vec<TaskId> = (0..3)
		.map(|i| {
			queue
				.enqueue_named("slow", move || async move {
					tokio::time::sleep(Duration::from_millis(30)).await;
					Ok::<_, String>(i)
				})
				.unwrap()
		})
		.collect();

	// Act
	let first = {
		let queue = queue.clone();
		tokio::spawn(async move { queue.shutdown().await })
	};
	tokio::time::sleep(Duration::from_millis(5)).await;
	queue.shutdown().await;

	// Assert
	for id in &ids {
		assert_eq!(queue.get_status(*id), Some(TaskStatus::Success));
	}
	assert_eq!(queue.statistics().busy_workers, 0);
	first.await.unwrap();
}

#[rstest]
#[tokio::test]
async fn test_enqueue_after_shutdown_is_rejected() {
	// Arrange
	let queue = queue_with(1);
	queue.shutdown().await;

	// Act
	let result = queue.enqueue_named("late", || async { Ok::<_, String>(()) });

	// Assert
	assert!(queue.is_shut_down());
	assert!(matches!(result, Err(TaskError::QueueClosed)));
	assert_eq!(queue.statistics().total(), 0);

	// A second shutdown is a no-op
	queue.shutdown().await;
}

#[rstest]
#[tokio::test]
async fn test_statistics_count_outcomes() {
	// Arrange
	let queue = queue_with(2);
	let ok = queue
		.enqueue_named("ok", || async { Ok::<_, String>(()) })
		.unwrap();
	let err = queue
		.enqueue_named("err", || async { Err::<(), _>("nope") })
		.unwrap();
	queue.wait_for(ok, WAIT).await.unwrap();
	queue.wait_for(err, WAIT).await.unwrap();

	// Act
	let stats = queue.statistics();

	// Assert
	assert_eq!(stats.workers, 2);
	assert_eq!(stats.succeeded, 1);
	assert_eq!(stats.failed, 1);
	assert_eq!(stats.failure_rate(), 0.5);

	queue.shutdown().await;
}

#[rstest]
fn test_invalid_config_rejected() {
	// Act
	let result = TaskQueue::new(QueueConfig::default().with_workers(0));

	// Assert
	assert!(matches!(result, Err(TaskError::Config(_))));
}

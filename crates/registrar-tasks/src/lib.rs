//! Background tasks for Registrar
//!
//! Long-running work (report generation, bulk grade imports, notification
//! fan-out) is handed to a [`TaskQueue`]: a fixed pool of worker tasks draining
//! a shared FIFO. Callers get a [`TaskId`] back immediately and follow the task
//! through its [`TaskRecord`]:
//!
//! ```text
//! Pending -> Running -> Success | Failure
//! ```
//!
//! Errors and panics in task bodies are recorded as failures and never take a
//! worker down. Finished records stay in memory until
//! [`TaskQueue::cleanup_old_results`] removes them.

pub mod config;
pub mod errors;
pub mod queue;
pub mod record;
pub mod statistics;
pub mod task;
mod worker;

pub use config::QueueConfig;
pub use errors::{TaskError, TaskResult};
pub use queue::TaskQueue;
pub use record::TaskRecord;
pub use statistics::QueueStatistics;
pub use task::{TaskId, TaskStatus};

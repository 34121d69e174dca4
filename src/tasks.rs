//! Background tasks module.
//!
//! This module provides in-process background task execution.
//!
//! # Examples
//!
//! ```rust,no_run
//! use registrar::tasks::{QueueConfig, TaskQueue};
//! ```

#[cfg(feature = "tasks")]
pub use registrar_tasks::*;

//! # Registrar
//!
//! The concurrent resource layer of the Registrar school-records application.
//!
//! Registrar bundles three components that request handlers share:
//!
//! - [`pool`] - a bounded database connection pool with idle reclamation
//! - [`cache`] - a TTL key/value cache with a remote primary, a local fallback
//!   store and function-result memoization
//! - [`tasks`] - an in-process background task queue with a worker pool
//!
//! [`Resources`] composes them from [`settings::Settings`], and
//! [`logging::init`] installs the `tracing` subscriber.
//!
//! ## Feature Flags
//!
//! - `full` (default) - `pool`, `cache` and `tasks`
//! - `pool` - connection pool (SQLite via `sqlx`)
//! - `cache` - cache manager with the in-memory store
//! - `tasks` - background task queue
//! - `redis-backend` - Redis primary for the cache
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use registrar::Resources;
//! use registrar::settings::Settings;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::from_file("registrar.toml")?.with_env_overrides()?;
//! registrar::logging::init(&settings.log_filter);
//!
//! let resources = Resources::initialize(&settings).await?;
//!
//! let report = resources
//!     .tasks()
//!     .enqueue_blocking("transcript", || Ok::<_, String>("generated"))?;
//! let record = resources.tasks().wait_for(report, Duration::from_secs(30)).await?;
//! println!("{:?}", record.status());
//!
//! resources.shutdown().await;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "cache")]
pub mod cache;
pub mod logging;
#[cfg(feature = "pool")]
pub mod pool;
pub mod resources;
pub mod settings;
#[cfg(feature = "tasks")]
pub mod tasks;

pub use resources::{ResourceError, ResourceResult, Resources};
pub use settings::{Settings, SettingsError};

#[cfg(feature = "pool")]
pub use registrar_pool::{ConnectionPool, PoolConfig, PoolError};

#[cfg(feature = "cache")]
pub use registrar_cache::{CacheConfig, CacheError, CacheManager};

#[cfg(feature = "tasks")]
pub use registrar_tasks::{QueueConfig, TaskError, TaskId, TaskQueue, TaskStatus};

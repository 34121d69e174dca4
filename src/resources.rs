//! Application resource composition
//!
//! [`Resources`] owns the process-wide pool, cache and task queue. Build it
//! once at startup with [`Resources::initialize`], hand clones of the
//! components to request handlers, and call [`Resources::shutdown`] before
//! exit.

use crate::settings::{Settings, SettingsError};
use thiserror::Error;

#[cfg(feature = "cache")]
use registrar_cache::{CacheError, CacheManager};
#[cfg(feature = "pool")]
use registrar_pool::{ConnectionPool, PoolError, SqliteConnectionManager};
#[cfg(feature = "tasks")]
use registrar_tasks::{TaskError, TaskQueue};

/// SQLite-backed pool used by the application
#[cfg(feature = "pool")]
pub type DatabasePool = ConnectionPool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum ResourceError {
	#[error(transparent)]
	Settings(#[from] SettingsError),

	#[cfg(feature = "pool")]
	#[error(transparent)]
	Pool(#[from] PoolError),

	#[cfg(feature = "cache")]
	#[error(transparent)]
	Cache(#[from] CacheError),

	#[cfg(feature = "tasks")]
	#[error(transparent)]
	Tasks(#[from] TaskError),
}

pub type ResourceResult<T> = Result<T, ResourceError>;

/// The application's shared resources
///
/// # Examples
///
/// ```
/// use registrar::Resources;
/// use registrar::settings::Settings;
///
/// # async fn example() {
/// let mut settings = Settings::default();
/// settings.database.path = "sqlite::memory:".to_string();
///
/// let resources = Resources::initialize(&settings).await.unwrap();
/// resources.cache().set("greeting", "hello", None).await;
/// resources.shutdown().await;
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
/// ```
pub struct Resources {
	#[cfg(feature = "pool")]
	pool: DatabasePool,
	#[cfg(feature = "cache")]
	cache: CacheManager,
	#[cfg(feature = "tasks")]
	tasks: TaskQueue,
}

impl Resources {
	/// Build every enabled component from `settings`.
	///
	/// Must be called from within a Tokio runtime. An unreachable remote cache
	/// is not an error; the cache falls back to its local store.
	pub async fn initialize(settings: &Settings) -> ResourceResult<Self> {
		#[cfg(feature = "pool")]
		let pool = ConnectionPool::sqlite(&settings.database.path, settings.pool_config()).await?;

		#[cfg(feature = "cache")]
		let cache = CacheManager::from_config(settings.cache_config()).await?;

		#[cfg(feature = "tasks")]
		let tasks = TaskQueue::new(settings.queue_config())?;

		tracing::info!(
			pool = cfg!(feature = "pool"),
			cache = cfg!(feature = "cache"),
			tasks = cfg!(feature = "tasks"),
			"Resources initialized"
		);

		#[cfg(not(any(feature = "pool", feature = "cache", feature = "tasks")))]
		let _ = settings;

		Ok(Self {
			#[cfg(feature = "pool")]
			pool,
			#[cfg(feature = "cache")]
			cache,
			#[cfg(feature = "tasks")]
			tasks,
		})
	}

	/// Load settings from a TOML file, apply `REGISTRAR_*` overrides and initialize
	pub async fn from_file(path: impl AsRef<std::path::Path>) -> ResourceResult<Self> {
		let settings = Settings::from_file(path)?.with_env_overrides()?;
		Self::initialize(&settings).await
	}

	#[cfg(feature = "pool")]
	pub fn pool(&self) -> &DatabasePool {
		&self.pool
	}

	#[cfg(feature = "cache")]
	pub fn cache(&self) -> &CacheManager {
		&self.cache
	}

	#[cfg(feature = "tasks")]
	pub fn tasks(&self) -> &TaskQueue {
		&self.tasks
	}

	/// Drain the task queue, then close the pool
	pub async fn shutdown(&self) {
		#[cfg(feature = "tasks")]
		self.tasks.shutdown().await;

		#[cfg(feature = "pool")]
		self.pool.close_all().await;

		tracing::info!("Resources shut down");
	}
}

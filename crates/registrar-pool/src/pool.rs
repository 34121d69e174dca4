//! Connection pool implementation

use super::config::PoolConfig;
use super::connection::PooledConnection;
use super::errors::{PoolError, PoolResult};
use super::manager::{ConnectionManager, SqliteConnectionManager};
use super::statistics::PoolStatistics;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Mutable pool state, guarded by a single lock that is never held across `.await`
struct PoolState<C> {
	/// Front holds the longest-idle connection; checkouts take from the back
	idle: VecDeque<PooledConnection<C>>,
	stats: PoolStatistics,
	closed: bool,
}

impl<C> PoolState<C> {
	fn sync_idle(&mut self) {
		self.stats.idle_connections = self.idle.len() as u32;
	}
}

enum Checkout<C> {
	Idle(PooledConnection<C>),
	Create,
	Wait,
	Closed,
}

/// Outcome of one maintenance pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
	/// Idle connections closed for exceeding the idle limit
	pub reclaimed: usize,
	/// Connections opened to restore the minimum
	pub replenished: usize,
}

struct PoolInner<M: ConnectionManager> {
	manager: M,
	config: PoolConfig,
	state: Mutex<PoolState<M::Connection>>,
	released: Notify,
	next_id: AtomicU64,
	maintenance: Mutex<Option<JoinHandle<()>>>,
}

impl<M: ConnectionManager> PoolInner<M> {
	fn next_connection_id(&self) -> u64 {
		self.next_id.fetch_add(1, Ordering::Relaxed) + 1
	}

	fn checkout(&self) -> Checkout<M::Connection> {
		let mut state = self.state.lock();
		if state.closed {
			return Checkout::Closed;
		}

		if let Some(conn) = state.idle.pop_back() {
			state.sync_idle();
			state.stats.record_checkout();
			return Checkout::Idle(conn);
		}

		if state.stats.total_connections < self.config.max_connections {
			// Reserve the slot before connecting so concurrent callers cannot overshoot max
			state.stats.total_connections += 1;
			state.stats.record_checkout();
			return Checkout::Create;
		}

		Checkout::Wait
	}

	/// Open one connection straight into the idle set.
	///
	/// Returns `false` when the pool is full, closed, or the connection attempt failed.
	async fn open_idle(&self) -> bool {
		{
			let mut state = self.state.lock();
			if state.closed || state.stats.total_connections >= self.config.max_connections {
				return false;
			}
			state.stats.total_connections += 1;
		}

		match self.manager.connect().await {
			Ok(raw) => {
				let conn = PooledConnection::new(self.next_connection_id(), raw);
				let rejected = {
					let mut state = self.state.lock();
					if state.closed {
						Some(conn)
					} else {
						state.stats.created_connections += 1;
						state.idle.push_back(conn);
						state.sync_idle();
						None
					}
				};
				if let Some(conn) = rejected {
					self.manager.close(conn.into_inner()).await;
					return false;
				}
				self.released.notify_one();
				true
			}
			Err(e) => {
				{
					let mut state = self.state.lock();
					if !state.closed {
						state.stats.total_connections -= 1;
						state.stats.failed_connections += 1;
					}
				}
				tracing::warn!(error = %e, database = %self.manager.describe(), "Failed to open pooled connection");
				false
			}
		}
	}

	/// Put a checked-out connection back, or close it if it can no longer be used
	async fn release(&self, mut conn: PooledConnection<M::Connection>) {
		conn.mark_released();

		let closed = self.state.lock().closed;
		let valid = !closed
			&& (!self.config.test_on_release || self.manager.is_valid(conn.connection_mut()).await);

		let rejected = {
			let mut state = self.state.lock();
			if state.closed {
				// Counters were reset by close_all; this connection only needs closing
				Some(conn)
			} else {
				state.stats.active_connections = state.stats.active_connections.saturating_sub(1);
				if valid && (state.idle.len() as u32) < self.config.max_connections {
					state.idle.push_back(conn);
					state.sync_idle();
					None
				} else {
					state.stats.total_connections -= 1;
					state.stats.closed_connections += 1;
					Some(conn)
				}
			}
		};

		if let Some(conn) = rejected {
			tracing::debug!(connection_id = conn.id(), "Closing released connection");
			self.manager.close(conn.into_inner()).await;
		}
		self.released.notify_one();
	}

	/// Close a checked-out connection without returning it to the idle set
	async fn discard(&self, conn: PooledConnection<M::Connection>) {
		{
			let mut state = self.state.lock();
			if !state.closed {
				state.stats.active_connections = state.stats.active_connections.saturating_sub(1);
				state.stats.total_connections -= 1;
				state.stats.closed_connections += 1;
			}
		}
		self.manager.close(conn.into_inner()).await;
		self.released.notify_one();
	}

	/// Synchronous fallback for guards dropped outside a runtime: the handle is
	/// dropped without a graceful close
	fn forget(&self, conn: PooledConnection<M::Connection>) {
		{
			let mut state = self.state.lock();
			if !state.closed {
				state.stats.active_connections = state.stats.active_connections.saturating_sub(1);
				state.stats.total_connections -= 1;
				state.stats.closed_connections += 1;
			}
		}
		tracing::debug!(connection_id = conn.id(), "Dropping connection outside of a runtime");
		drop(conn);
		self.released.notify_one();
	}

	async fn run_maintenance(&self) -> MaintenanceReport {
		let now = Instant::now();
		let min = self.config.min_connections as usize;

		let expired = {
			let mut state = self.state.lock();
			if state.closed {
				return MaintenanceReport::default();
			}

			let mut expired = Vec::new();
			let mut kept = VecDeque::with_capacity(state.idle.len());
			while let Some(conn) = state.idle.pop_front() {
				let remaining = state.idle.len() + kept.len();
				if conn.idle_for(now) > self.config.max_idle_time && remaining >= min {
					expired.push(conn);
				} else {
					kept.push_back(conn);
				}
			}
			state.idle = kept;
			state.stats.total_connections -= expired.len() as u32;
			state.stats.closed_connections += expired.len() as u64;
			state.sync_idle();
			expired
		};

		let reclaimed = expired.len();
		for conn in expired {
			tracing::debug!(
				connection_id = conn.id(),
				use_count = conn.use_count(),
				"Reclaiming idle connection"
			);
			self.manager.close(conn.into_inner()).await;
		}

		let missing = {
			let state = self.state.lock();
			min.saturating_sub(state.idle.len())
		};
		let mut replenished = 0;
		for _ in 0..missing {
			if !self.open_idle().await {
				break;
			}
			replenished += 1;
		}

		if reclaimed > 0 || replenished > 0 {
			tracing::debug!(reclaimed, replenished, "Pool maintenance completed");
		}

		MaintenanceReport {
			reclaimed,
			replenished,
		}
	}
}

impl<M: ConnectionManager> Drop for PoolInner<M> {
	fn drop(&mut self) {
		if let Some(handle) = self.maintenance.get_mut().take() {
			handle.abort();
		}
	}
}

/// A bounded connection pool
///
/// Cloning is cheap; all clones share the same connections and counters.
pub struct ConnectionPool<M: ConnectionManager> {
	inner: Arc<PoolInner<M>>,
}

impl<M: ConnectionManager> Clone for ConnectionPool<M> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl ConnectionPool<SqliteConnectionManager> {
	/// Create a SQLite pool for the given file path or `sqlite:` URL
	///
	/// # Examples
	///
	/// ```
	/// use registrar_pool::{ConnectionPool, PoolConfig};
	///
	/// # async fn example() {
	/// let config = PoolConfig::new().with_min_connections(1).with_max_connections(4);
	/// let pool = ConnectionPool::sqlite("sqlite::memory:", config).await.unwrap();
	/// assert_eq!(pool.stats().idle_connections, 1);
	/// pool.close_all().await;
	/// # }
	/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
	/// ```
	pub async fn sqlite(path: &str, config: PoolConfig) -> PoolResult<Self> {
		let manager = SqliteConnectionManager::new(path)?;
		Self::new(manager, config).await
	}

	/// Create a SQLite pool from scalar settings
	pub async fn initialize(
		path: &str,
		min_connections: u32,
		max_connections: u32,
		max_idle_seconds: u64,
	) -> PoolResult<Self> {
		let config = PoolConfig::new()
			.with_min_connections(min_connections)
			.with_max_connections(max_connections)
			.with_max_idle_time(Duration::from_secs(max_idle_seconds));
		Self::sqlite(path, config).await
	}
}

impl<M: ConnectionManager> ConnectionPool<M> {
	/// Create a pool, open `min_connections` eagerly and start maintenance.
	///
	/// Connection failures during warm-up are logged and counted in
	/// `failed_connections`; they do not fail construction.
	///
	/// Must be called from within a Tokio runtime.
	pub async fn new(manager: M, config: PoolConfig) -> PoolResult<Self> {
		config.validate().map_err(PoolError::Config)?;

		let pool = Self {
			inner: Arc::new(PoolInner {
				manager,
				config,
				state: Mutex::new(PoolState {
					idle: VecDeque::new(),
					stats: PoolStatistics::default(),
					closed: false,
				}),
				released: Notify::new(),
				next_id: AtomicU64::new(0),
				maintenance: Mutex::new(None),
			}),
		};

		for _ in 0..pool.inner.config.min_connections {
			pool.inner.open_idle().await;
		}

		let stats = pool.stats();
		tracing::info!(
			database = %pool.inner.manager.describe(),
			min = pool.inner.config.min_connections,
			max = pool.inner.config.max_connections,
			idle = stats.idle_connections,
			failed = stats.failed_connections,
			"Connection pool initialized"
		);

		pool.start_maintenance();
		Ok(pool)
	}

	fn start_maintenance(&self) {
		let weak: Weak<PoolInner<M>> = Arc::downgrade(&self.inner);
		let interval = self.inner.config.maintenance_interval;

		let handle = tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			// The first tick completes immediately
			ticker.tick().await;

			loop {
				ticker.tick().await;
				let Some(inner) = weak.upgrade() else {
					break;
				};
				if inner.state.lock().closed {
					break;
				}
				inner.run_maintenance().await;
			}
		});

		*self.inner.maintenance.lock() = Some(handle);
	}

	/// Acquire a connection using the configured `acquire_timeout`
	pub async fn acquire(&self) -> PoolResult<PoolConnection<M>> {
		self.acquire_timeout(self.inner.config.acquire_timeout).await
	}

	/// Acquire a connection, waiting at most `timeout` when the pool is at capacity.
	///
	/// Idle connections are validated before hand-over; a connection failing the
	/// probe is closed and acquisition continues with the next candidate.
	///
	/// # Errors
	///
	/// - [`PoolError::Exhausted`] if no connection was released in time
	/// - [`PoolError::Connection`] if a new connection was needed and could not be opened
	/// - [`PoolError::Closed`] after [`close_all`](Self::close_all)
	pub async fn acquire_timeout(&self, timeout: Duration) -> PoolResult<PoolConnection<M>> {
		// `None` when the deadline lies beyond what `Instant` can represent: wait without one
		let deadline = tokio::time::Instant::now().checked_add(timeout);
		self.inner.state.lock().stats.total_requests += 1;

		loop {
			// Register for wake-ups before inspecting state so a release in between is not lost
			let notified = self.inner.released.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();

			match self.inner.checkout() {
				Checkout::Closed => {
					return Err(PoolError::Closed);
				}
				Checkout::Idle(mut conn) => {
					let valid = !self.inner.config.test_before_acquire
						|| self.inner.manager.is_valid(conn.connection_mut()).await;
					if valid {
						conn.mark_acquired();
						return Ok(PoolConnection::new(conn, self.inner.clone()));
					}
					tracing::warn!(connection_id = conn.id(), "Discarding connection that failed validation");
					self.inner.discard(conn).await;
				}
				Checkout::Create => match self.inner.manager.connect().await {
					Ok(raw) => {
						let closed = {
							let mut state = self.inner.state.lock();
							if !state.closed {
								state.stats.created_connections += 1;
							}
							state.closed
						};
						if closed {
							// close_all ran while connecting; its counters no longer track this slot
							self.inner.manager.close(raw).await;
							return Err(PoolError::Closed);
						}
						let mut conn = PooledConnection::new(self.inner.next_connection_id(), raw);
						conn.mark_acquired();
						tracing::debug!(connection_id = conn.id(), "Opened new pooled connection");
						return Ok(PoolConnection::new(conn, self.inner.clone()));
					}
					Err(e) => {
						{
							let mut state = self.inner.state.lock();
							if !state.closed {
								state.stats.total_connections -= 1;
								state.stats.active_connections -= 1;
								state.stats.failed_connections += 1;
								state.stats.failed_requests += 1;
							}
						}
						self.inner.released.notify_one();
						tracing::error!(error = %e, "Failed to open connection for acquire");
						return Err(e);
					}
				},
				Checkout::Wait => {
					let Some(deadline) = deadline else {
						notified.await;
						continue;
					};
					if tokio::time::timeout_at(deadline, notified).await.is_err() {
						self.inner.state.lock().stats.failed_requests += 1;
						tracing::warn!(?timeout, "Connection pool exhausted");
						return Err(PoolError::Exhausted(timeout));
					}
				}
			}
		}
	}

	/// Return a connection to the pool.
	///
	/// Equivalent to dropping the guard, but waits for the checkin to finish.
	pub async fn release(&self, conn: PoolConnection<M>) {
		conn.release().await;
	}

	/// Run one maintenance pass immediately
	pub async fn run_maintenance(&self) -> MaintenanceReport {
		self.inner.run_maintenance().await
	}

	/// Snapshot of the pool counters
	pub fn stats(&self) -> PoolStatistics {
		self.inner.state.lock().stats.clone()
	}

	pub fn config(&self) -> &PoolConfig {
		&self.inner.config
	}

	pub fn manager(&self) -> &M {
		&self.inner.manager
	}

	pub fn is_closed(&self) -> bool {
		self.inner.state.lock().closed
	}

	/// Close every connection and reset the counters.
	///
	/// Idle connections are closed immediately. Connections still checked out
	/// are closed as soon as their guard is released. Further `acquire` calls
	/// fail with [`PoolError::Closed`]. Intended for orderly shutdown only.
	pub async fn close_all(&self) {
		if let Some(handle) = self.inner.maintenance.lock().take() {
			handle.abort();
		}

		let (drained, outstanding) = {
			let mut state = self.inner.state.lock();
			state.closed = true;
			let outstanding = state.stats.active_connections;
			let drained: Vec<_> = state.idle.drain(..).collect();
			state.stats = PoolStatistics::default();
			(drained, outstanding)
		};

		let closed = drained.len();
		for conn in drained {
			self.inner.manager.close(conn.into_inner()).await;
		}
		self.inner.released.notify_waiters();

		tracing::info!(closed, outstanding, "Connection pool closed");
	}
}

/// A connection checked out of a [`ConnectionPool`]
///
/// Dereferences to the underlying connection. Dropping the guard returns the
/// connection to the pool, so release happens on every exit path.
pub struct PoolConnection<M: ConnectionManager> {
	conn: Option<PooledConnection<M::Connection>>,
	pool: Arc<PoolInner<M>>,
}

impl<M: ConnectionManager> PoolConnection<M> {
	fn new(conn: PooledConnection<M::Connection>, pool: Arc<PoolInner<M>>) -> Self {
		Self {
			conn: Some(conn),
			pool,
		}
	}

	fn pooled(&self) -> &PooledConnection<M::Connection> {
		// Only `release`/`invalidate` take the connection, and both consume the guard
		self.conn.as_ref().expect("connection already returned to the pool")
	}

	/// Pool-unique connection identifier
	pub fn id(&self) -> u64 {
		self.pooled().id()
	}

	/// Number of checkouts of the underlying connection, including this one
	pub fn use_count(&self) -> u64 {
		self.pooled().use_count()
	}

	pub fn created_at(&self) -> Instant {
		self.pooled().created_at()
	}

	/// Return the connection to the pool and wait for the checkin to complete
	pub async fn release(mut self) {
		if let Some(conn) = self.conn.take() {
			self.pool.release(conn).await;
		}
	}

	/// Close the connection instead of returning it (e.g. after a broken transaction)
	pub async fn invalidate(mut self) {
		if let Some(conn) = self.conn.take() {
			tracing::debug!(connection_id = conn.id(), "Invalidating connection");
			self.pool.discard(conn).await;
		}
	}
}

impl<M: ConnectionManager> Deref for PoolConnection<M> {
	type Target = M::Connection;

	fn deref(&self) -> &Self::Target {
		self.pooled().connection()
	}
}

impl<M: ConnectionManager> DerefMut for PoolConnection<M> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		self.conn
			.as_mut()
			.expect("connection already returned to the pool")
			.connection_mut()
	}
}

impl<M: ConnectionManager> Drop for PoolConnection<M> {
	fn drop(&mut self) {
		let Some(conn) = self.conn.take() else {
			return;
		};
		let pool = self.pool.clone();

		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				handle.spawn(async move {
					pool.release(conn).await;
				});
			}
			Err(_) => pool.forget(conn),
		}
	}
}

//! Test connection manager with fault injection

use async_trait::async_trait;
use registrar_pool::{ConnectionManager, PoolError, PoolResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Fake connection; valid while its generation matches the manager's
#[derive(Debug)]
pub struct MockConnection {
	pub serial: u64,
	generation: u64,
}

#[derive(Default)]
struct MockState {
	opened: AtomicU64,
	closed: AtomicU64,
	generation: AtomicU64,
	fail_connect: AtomicBool,
	connect_delay_ms: AtomicU64,
}

/// Connection manager that records every call and can be told to fail
#[derive(Clone, Default)]
pub struct MockManager {
	state: Arc<MockState>,
}

impl MockManager {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn failing() -> Self {
		let manager = Self::default();
		manager.set_fail_connect(true);
		manager
	}

	pub fn set_fail_connect(&self, fail: bool) {
		self.state.fail_connect.store(fail, Ordering::SeqCst);
	}

	/// Make each `connect` sleep before completing
	pub fn set_connect_delay(&self, delay: Duration) {
		self.state
			.connect_delay_ms
			.store(delay.as_millis() as u64, Ordering::SeqCst);
	}

	/// Make every connection opened so far fail its liveness probe
	pub fn invalidate_all(&self) {
		self.state.generation.fetch_add(1, Ordering::SeqCst);
	}

	pub fn opened(&self) -> u64 {
		self.state.opened.load(Ordering::SeqCst)
	}

	pub fn closed(&self) -> u64 {
		self.state.closed.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ConnectionManager for MockManager {
	type Connection = MockConnection;

	async fn connect(&self) -> PoolResult<MockConnection> {
		let delay = self.state.connect_delay_ms.load(Ordering::SeqCst);
		if delay > 0 {
			tokio::time::sleep(Duration::from_millis(delay)).await;
		}
		if self.state.fail_connect.load(Ordering::SeqCst) {
			return Err(PoolError::Connection("connection refused".to_string()));
		}
		let serial = self.state.opened.fetch_add(1, Ordering::SeqCst) + 1;
		Ok(MockConnection {
			serial,
			generation: self.state.generation.load(Ordering::SeqCst),
		})
	}

	async fn is_valid(&self, conn: &mut MockConnection) -> bool {
		conn.generation == self.state.generation.load(Ordering::SeqCst)
	}

	async fn close(&self, _conn: MockConnection) {
		self.state.closed.fetch_add(1, Ordering::SeqCst);
	}

	fn describe(&self) -> String {
		"mock://registrar".to_string()
	}
}

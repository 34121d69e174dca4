//! Pooled connection wrapper

use std::time::{Duration, Instant};

/// One live backend connection plus the metadata the pool keeps about it
///
/// At any instant a `PooledConnection` is owned either by the pool's idle set
/// or by exactly one caller's [`PoolConnection`](crate::PoolConnection) guard.
#[derive(Debug)]
pub struct PooledConnection<C> {
	id: u64,
	conn: C,
	created_at: Instant,
	last_used: Instant,
	use_count: u64,
	active: bool,
}

impl<C> PooledConnection<C> {
	pub(crate) fn new(id: u64, conn: C) -> Self {
		let now = Instant::now();
		Self {
			id,
			conn,
			created_at: now,
			last_used: now,
			use_count: 0,
			active: false,
		}
	}

	/// Pool-unique connection identifier
	pub fn id(&self) -> u64 {
		self.id
	}

	pub fn created_at(&self) -> Instant {
		self.created_at
	}

	/// Last checkout or checkin time
	pub fn last_used(&self) -> Instant {
		self.last_used
	}

	/// Number of times this connection has been checked out
	pub fn use_count(&self) -> u64 {
		self.use_count
	}

	pub fn is_active(&self) -> bool {
		self.active
	}

	pub fn age(&self) -> Duration {
		self.created_at.elapsed()
	}

	pub fn connection(&self) -> &C {
		&self.conn
	}

	pub fn connection_mut(&mut self) -> &mut C {
		&mut self.conn
	}

	/// Time spent sitting in the idle set; zero while checked out
	pub(crate) fn idle_for(&self, now: Instant) -> Duration {
		if self.active {
			Duration::ZERO
		} else {
			now.saturating_duration_since(self.last_used)
		}
	}

	pub(crate) fn mark_acquired(&mut self) {
		self.active = true;
		self.use_count += 1;
		self.last_used = Instant::now();
	}

	pub(crate) fn mark_released(&mut self) {
		self.active = false;
		self.last_used = Instant::now();
	}

	pub(crate) fn into_inner(self) -> C {
		self.conn
	}
}

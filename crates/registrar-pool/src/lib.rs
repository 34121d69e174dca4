//! Database connection pooling for Registrar
//!
//! A bounded pool of reusable connections with:
//!
//! - eager warm-up of `min_connections`
//! - validated hand-over (`acquire`) and checkin (`release` / guard drop)
//! - bounded waiting with an explicit exhaustion error
//! - a background maintenance loop that reclaims idle connections and
//!   replenishes the minimum
//!
//! ```
//! use registrar_pool::{ConnectionPool, PoolConfig};
//!
//! # async fn example() {
//! let pool = ConnectionPool::sqlite("sqlite::memory:", PoolConfig::new()).await.unwrap();
//!
//! let mut conn = pool.acquire().await.unwrap();
//! let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&mut *conn).await.unwrap();
//! assert_eq!(one, 1);
//! pool.release(conn).await;
//!
//! pool.close_all().await;
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(example());
//! ```

pub mod config;
pub mod connection;
pub mod errors;
pub mod manager;
// Allow module_inception: `registrar_pool::pool::ConnectionPool` mirrors the crate layout
#[allow(clippy::module_inception)]
pub mod pool;
pub mod statistics;

pub use config::PoolConfig;
pub use connection::PooledConnection;
pub use errors::{PoolError, PoolResult};
pub use manager::{ConnectionManager, SqliteConnectionManager};
pub use pool::{ConnectionPool, MaintenanceReport, PoolConnection};
pub use statistics::PoolStatistics;

/// Re-export commonly used types
pub mod prelude {
	pub use super::config::*;
	pub use super::errors::*;
	pub use super::manager::*;
	pub use super::pool::*;
	pub use super::statistics::*;
}

//! Database connection pool module.
//!
//! # Examples
//!
//! ```rust,no_run
//! use registrar::pool::{ConnectionPool, PoolConfig};
//! ```

#[cfg(feature = "pool")]
pub use registrar_pool::*;

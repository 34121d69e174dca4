//! Logging setup
//!
//! All crates in the workspace emit `tracing` events. [`init`] installs a
//! formatting subscriber filtered by `RUST_LOG`, or by the given directive when
//! `RUST_LOG` is unset.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed; the existing one is
/// kept.
///
/// # Examples
///
/// ```
/// registrar::logging::init("registrar=debug");
/// assert!(!registrar::logging::init("registrar=info"));
/// ```
pub fn init(default_filter: &str) -> bool {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

	tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer())
		.try_init()
		.is_ok()
}

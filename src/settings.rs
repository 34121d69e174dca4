//! Settings
//!
//! Settings are read from a TOML document and can then be overridden from the
//! environment. Every field has a default, so an empty document is valid.
//!
//! ```toml
//! log_filter = "registrar=debug"
//!
//! [database]
//! path = "/var/lib/registrar/school.db"
//! max_connections = 20
//!
//! [cache]
//! url = "redis://cache.internal:6379"
//! default_ttl_seconds = 600
//!
//! [tasks]
//! workers = 8
//! ```
//!
//! ## Environment overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `REGISTRAR_DATABASE_PATH` | `database.path` |
//! | `REGISTRAR_DATABASE_MIN_CONNECTIONS` | `database.min_connections` |
//! | `REGISTRAR_DATABASE_MAX_CONNECTIONS` | `database.max_connections` |
//! | `REGISTRAR_DATABASE_MAX_IDLE_SECONDS` | `database.max_idle_seconds` |
//! | `REGISTRAR_CACHE_URL` | `cache.url` |
//! | `REGISTRAR_CACHE_KEY_PREFIX` | `cache.key_prefix` |
//! | `REGISTRAR_CACHE_DEFAULT_TTL_SECONDS` | `cache.default_ttl_seconds` |
//! | `REGISTRAR_TASK_WORKERS` | `tasks.workers` |
//! | `REGISTRAR_LOG` | `log_filter` |

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
#[cfg(any(feature = "pool", feature = "cache", feature = "tasks"))]
use std::time::Duration;
use thiserror::Error;

/// Prefix shared by all environment overrides
pub const ENV_PREFIX: &str = "REGISTRAR_";

#[derive(Debug, Error)]
pub enum SettingsError {
	#[error("Failed to read settings file: {0}")]
	Io(#[from] std::io::Error),

	#[error("Failed to parse settings: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("Invalid value for {key}: {value:?}")]
	InvalidEnv { key: String, value: String },
}

/// Database connection pool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
	/// SQLite file path or `sqlite:` URL
	pub path: String,
	pub min_connections: u32,
	pub max_connections: u32,
	pub max_idle_seconds: u64,
	pub acquire_timeout_seconds: u64,
	pub maintenance_interval_seconds: u64,
}

impl Default for DatabaseSettings {
	fn default() -> Self {
		Self {
			path: "registrar.db".to_string(),
			min_connections: 2,
			max_connections: 10,
			max_idle_seconds: 300,
			acquire_timeout_seconds: 30,
			maintenance_interval_seconds: 60,
		}
	}
}

/// Cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
	/// Remote backend URL; unset runs on the local store only
	pub url: Option<String>,
	pub key_prefix: String,
	/// `None` stores entries without expiry
	pub default_ttl_seconds: Option<u64>,
	pub fallback_enabled: bool,
}

impl Default for CacheSettings {
	fn default() -> Self {
		Self {
			url: None,
			key_prefix: "registrar:".to_string(),
			default_ttl_seconds: Some(300),
			fallback_enabled: true,
		}
	}
}

/// Task queue settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
	pub workers: usize,
	pub poll_interval_ms: u64,
}

impl Default for TaskSettings {
	fn default() -> Self {
		Self {
			workers: 4,
			poll_interval_ms: 1000,
		}
	}
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// `tracing` filter directive used when `RUST_LOG` is unset
	pub log_filter: String,
	pub database: DatabaseSettings,
	pub cache: CacheSettings,
	pub tasks: TaskSettings,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			log_filter: "registrar=info".to_string(),
			database: DatabaseSettings::default(),
			cache: CacheSettings::default(),
			tasks: TaskSettings::default(),
		}
	}
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
	value.trim().parse().map_err(|_| SettingsError::InvalidEnv {
		key: key.to_string(),
		value: value.to_string(),
	})
}

impl Settings {
	/// Parse settings from a TOML document
	///
	/// # Examples
	///
	/// ```
	/// use registrar::settings::Settings;
	///
	/// let settings = Settings::from_toml_str("[tasks]\nworkers = 2").unwrap();
	/// assert_eq!(settings.tasks.workers, 2);
	/// assert_eq!(settings.database.max_connections, 10);
	/// ```
	pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(content)?)
	}

	/// Read settings from a TOML file
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let content = std::fs::read_to_string(path)?;
		Self::from_toml_str(&content)
	}

	/// Apply `REGISTRAR_*` overrides from the process environment
	pub fn with_env_overrides(self) -> Result<Self, SettingsError> {
		self.with_overrides(std::env::vars())
	}

	/// Apply `REGISTRAR_*` overrides from the given variables; others are ignored
	pub fn with_overrides<I, K, V>(mut self, vars: I) -> Result<Self, SettingsError>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		for (key, value) in vars {
			let (key, value) = (key.as_ref(), value.as_ref());
			let Some(name) = key.strip_prefix(ENV_PREFIX) else {
				continue;
			};

			match name {
				"DATABASE_PATH" => self.database.path = value.to_string(),
				"DATABASE_MIN_CONNECTIONS" => self.database.min_connections = parse_env(key, value)?,
				"DATABASE_MAX_CONNECTIONS" => self.database.max_connections = parse_env(key, value)?,
				"DATABASE_MAX_IDLE_SECONDS" => self.database.max_idle_seconds = parse_env(key, value)?,
				"CACHE_URL" if value.trim().is_empty() => self.cache.url = None,
				"CACHE_URL" => self.cache.url = Some(value.to_string()),
				"CACHE_KEY_PREFIX" => self.cache.key_prefix = value.to_string(),
				"CACHE_DEFAULT_TTL_SECONDS" => self.cache.default_ttl_seconds = Some(parse_env(key, value)?),
				"TASK_WORKERS" => self.tasks.workers = parse_env(key, value)?,
				"LOG" => self.log_filter = value.to_string(),
				_ => {}
			}
		}
		Ok(self)
	}

	#[cfg(feature = "pool")]
	pub fn pool_config(&self) -> registrar_pool::PoolConfig {
		let db = &self.database;
		registrar_pool::PoolConfig::new()
			.with_min_connections(db.min_connections)
			.with_max_connections(db.max_connections)
			.with_max_idle_time(Duration::from_secs(db.max_idle_seconds))
			.with_acquire_timeout(Duration::from_secs(db.acquire_timeout_seconds))
			.with_maintenance_interval(Duration::from_secs(db.maintenance_interval_seconds))
	}

	#[cfg(feature = "cache")]
	pub fn cache_config(&self) -> registrar_cache::CacheConfig {
		let cache = &self.cache;
		let config = registrar_cache::CacheConfig::new()
			.with_key_prefix(cache.key_prefix.clone())
			.with_default_ttl(cache.default_ttl_seconds.map(Duration::from_secs))
			.with_fallback(cache.fallback_enabled);
		match &cache.url {
			Some(url) => config.with_url(url.clone()),
			None => config,
		}
	}

	#[cfg(feature = "tasks")]
	pub fn queue_config(&self) -> registrar_tasks::QueueConfig {
		registrar_tasks::QueueConfig::new("registrar")
			.with_workers(self.tasks.workers)
			.with_poll_interval(Duration::from_millis(self.tasks.poll_interval_ms))
	}
}

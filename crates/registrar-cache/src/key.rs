//! Deterministic cache key derivation

use crate::errors::CacheResult;
use md5::{Digest, Md5};
use serde::Serialize;

/// Build `"{prefix}{namespace}:{digest}"` for a call with the given arguments.
///
/// The digest is the hex MD5 of the namespace followed by the JSON encoding of
/// `args`, so equal arguments always map to the same key within a namespace.
///
/// # Examples
///
/// ```
/// use registrar_cache::derive_key;
///
/// let key = derive_key("registrar:", "transcript", &(42, "2024")).unwrap();
/// assert!(key.starts_with("registrar:transcript:"));
/// assert_eq!(key, derive_key("registrar:", "transcript", &(42, "2024")).unwrap());
/// assert_ne!(key, derive_key("registrar:", "transcript", &(43, "2024")).unwrap());
/// ```
pub fn derive_key<A>(prefix: &str, namespace: &str, args: &A) -> CacheResult<String>
where
	A: Serialize + ?Sized,
{
	let encoded = serde_json::to_vec(args)?;

	let mut hasher = Md5::new();
	hasher.update(namespace.as_bytes());
	hasher.update(&encoded);
	let digest = hex::encode(hasher.finalize());

	Ok(format!("{}{}:{}", prefix, namespace, digest))
}

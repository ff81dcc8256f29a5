//! In-memory storage backend.
//!
//! Backs tests and development runs. Entries live in an ordered map so
//! prefix scans are cheap; TTL entries are filtered on read and reaped
//! by `cleanup_expired`.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

struct Entry {
	value: Vec<u8>,
	/// Unix seconds after which the entry no longer exists; None = never.
	expires_at: Option<u64>,
}

impl Entry {
	fn is_expired(&self, now: u64) -> bool {
		matches!(self.expires_at, Some(at) if now >= at)
	}
}

/// In-memory storage implementation.
pub struct MemoryStorage {
	store: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryStorage {
	/// Creates a new MemoryStorage instance.
	pub fn new() -> Self {
		Self {
			store: RwLock::new(BTreeMap::new()),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

fn now_secs() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		match store.get(key) {
			Some(entry) if !entry.is_expired(now_secs()) => Ok(entry.value.clone()),
			_ => Err(StorageError::NotFound),
		}
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let expires_at = ttl.map(|ttl| now_secs().saturating_add(ttl.as_secs()));
		let mut store = self.store.write().await;
		store.insert(key.to_string(), Entry { value, expires_at });
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(matches!(store.get(key), Some(entry) if !entry.is_expired(now_secs())))
	}

	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let now = now_secs();
		let store = self.store.read().await;
		Ok(store
			.range(prefix.to_string()..)
			.take_while(|(key, _)| key.starts_with(prefix))
			.filter(|(_, entry)| !entry.is_expired(now))
			.map(|(key, _)| key.clone())
			.collect())
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		let now = now_secs();
		let mut store = self.store.write().await;
		let before = store.len();
		store.retain(|_, entry| !entry.is_expired(now));
		Ok(before - store.len())
	}
}

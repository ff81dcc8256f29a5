//! File-based storage backend.
//!
//! One JSON file per key under a single data directory. The file name is
//! the URL-safe base64 of the key, so any key round-trips losslessly and
//! prefix scans can recover keys from directory listings. Each file
//! carries a small envelope with the optional expiry timestamp.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

#[derive(Serialize, Deserialize)]
struct Envelope {
	/// Unix seconds after which the entry no longer exists; None = never.
	expires_at: Option<u64>,
	/// Base64 of the stored bytes.
	data: String,
}

impl Envelope {
	fn is_expired(&self, now: u64) -> bool {
		matches!(self.expires_at, Some(at) if now >= at)
	}
}

/// File-backed storage implementation.
pub struct FileStorage {
	base_dir: PathBuf,
}

impl FileStorage {
	/// Creates the backend, making the data directory if needed.
	pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
		let base_dir = base_dir.as_ref().to_path_buf();
		std::fs::create_dir_all(&base_dir)
			.map_err(|e| StorageError::Backend(format!("failed to create data dir: {}", e)))?;
		Ok(Self { base_dir })
	}

	fn path_for(&self, key: &str) -> PathBuf {
		self.base_dir
			.join(format!("{}.json", URL_SAFE_NO_PAD.encode(key)))
	}

	fn key_from_file_name(name: &str) -> Option<String> {
		let encoded = name.strip_suffix(".json")?;
		let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
		String::from_utf8(bytes).ok()
	}

	async fn read_envelope(&self, key: &str) -> Result<Envelope, StorageError> {
		let bytes = match fs::read(self.path_for(key)).await {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(StorageError::NotFound)
			}
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}
}

fn now_secs() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let envelope = self.read_envelope(key).await?;
		if envelope.is_expired(now_secs()) {
			return Err(StorageError::NotFound);
		}
		STANDARD
			.decode(&envelope.data)
			.map_err(|e| StorageError::Serialization(e.to_string()))
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let envelope = Envelope {
			expires_at: ttl.map(|ttl| now_secs().saturating_add(ttl.as_secs())),
			data: STANDARD.encode(&value),
		};
		let bytes = serde_json::to_vec(&envelope)
			.map_err(|e| StorageError::Serialization(e.to_string()))?;

		// Write-then-rename so readers never observe a partial file.
		let path = self.path_for(key);
		let tmp = path.with_extension("tmp");
		fs::write(&tmp, &bytes)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&tmp, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		match fs::remove_file(self.path_for(key)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		match self.read_envelope(key).await {
			Ok(envelope) => Ok(!envelope.is_expired(now_secs())),
			Err(StorageError::NotFound) => Ok(false),
			Err(e) => Err(e),
		}
	}

	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let mut entries = fs::read_dir(&self.base_dir)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		let mut keys = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let name = entry.file_name();
			let Some(name) = name.to_str() else { continue };
			let Some(key) = Self::key_from_file_name(name) else {
				continue;
			};
			if !key.starts_with(prefix) {
				continue;
			}
			// Skip expired entries the same way the reads do.
			match self.read_envelope(&key).await {
				Ok(envelope) if !envelope.is_expired(now_secs()) => keys.push(key),
				_ => continue,
			}
		}
		keys.sort();
		Ok(keys)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		let mut entries = fs::read_dir(&self.base_dir)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		let now = now_secs();
		let mut removed = 0;
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let name = entry.file_name();
			let Some(name) = name.to_str() else { continue };
			let Some(key) = Self::key_from_file_name(name) else {
				continue;
			};
			if let Ok(envelope) = self.read_envelope(&key).await {
				if envelope.is_expired(now) {
					self.delete(&key).await?;
					removed += 1;
				}
			}
		}
		Ok(removed)
	}
}

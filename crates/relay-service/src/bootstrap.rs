//! Builds the engine's components from configuration.

use relay_account::implementations::local::LocalAccount;
use relay_account::AccountService;
use relay_config::Config;
use relay_core::{LogNotifier, RelayEngine};
use relay_delivery::{create_http_delivery, DeliveryService};
use relay_storage::{FileStorage, MemoryStorage, StorageService};
use std::sync::Arc;

/// Builds the configured storage backend.
pub fn build_storage(config: &Config) -> Result<Arc<StorageService>, Box<dyn std::error::Error>> {
	let backend: Box<dyn relay_storage::StorageInterface> = match config.storage.backend.as_str() {
		"file" => {
			let path = config.storage.path.as_deref().unwrap_or("./data");
			Box::new(FileStorage::new(path)?)
		}
		_ => Box::new(MemoryStorage::new()),
	};
	Ok(Arc::new(StorageService::new(backend)))
}

/// Builds the delivery service when a relayer key is configured.
///
/// Without a key the service still starts: relay endpoints answer with
/// a configuration error while the accounting endpoints keep working.
pub async fn build_delivery(config: &Config) -> Option<Arc<DeliveryService>> {
	let Some(key) = config.account.signing_key() else {
		tracing::warn!("relayer signing key not configured; relay endpoints disabled");
		return None;
	};

	let account = match LocalAccount::from_key(key) {
		Ok(account) => AccountService::new(Box::new(account)),
		Err(e) => {
			tracing::warn!(error = %e, "invalid relayer signing key; relay endpoints disabled");
			return None;
		}
	};
	match account.address().await {
		Ok(address) => tracing::info!(relayer = %address, "relayer account loaded"),
		Err(e) => tracing::warn!(error = %e, "could not derive relayer address"),
	}

	match create_http_delivery(&config.network, &account.private_key()) {
		Ok(provider) => Some(Arc::new(DeliveryService::new(
			provider,
			config.network.min_confirmations,
		))),
		Err(e) => {
			tracing::warn!(error = %e, "failed to initialize delivery; relay endpoints disabled");
			None
		}
	}
}

/// Builds the full engine from configuration.
pub async fn build_engine(config: Config) -> Result<Arc<RelayEngine>, Box<dyn std::error::Error>> {
	let storage = build_storage(&config)?;
	let notifier = Arc::new(LogNotifier::new(storage.clone()));
	let delivery = build_delivery(&config).await;
	Ok(Arc::new(RelayEngine::new(
		config, storage, delivery, notifier,
	)))
}

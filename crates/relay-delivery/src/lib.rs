//! Transaction delivery for the tap relay.
//!
//! Handles submission and monitoring of relayed transactions on the
//! active network: raw calldata submission through the relayer wallet,
//! bounded confirmation polling, and the `eth_call` views the nonce
//! oracle and chip registry read through.

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use relay_types::{Transaction, TransactionReceipt};
use thiserror::Error;
use tokio::sync::Mutex;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

pub use implementations::evm::alloy::{create_http_delivery, AlloyDelivery};

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// A call or simulation reverted; carries the raw revert detail so
	/// callers can translate it.
	#[error("Reverted: {0}")]
	Reverted(String),
	/// The relayer signing key could not be used to build a wallet.
	#[error("Invalid relayer key: {0}")]
	InvalidKey(String),
}

/// Trait defining the interface for transaction delivery providers.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Submits a transaction signed by the relayer wallet and returns its
	/// hash. Nonce assignment happens here, which is why the service
	/// serializes calls to this method.
	async fn submit(&self, tx: Transaction) -> Result<B256, DeliveryError>;

	/// Blocks until the transaction has the required confirmations, or
	/// errors when the bounded wait elapses.
	async fn wait_for_confirmation(
		&self,
		hash: &B256,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError>;

	/// Returns the receipt immediately, or an error if not yet mined.
	async fn get_receipt(&self, hash: &B256) -> Result<TransactionReceipt, DeliveryError>;

	/// Executes a read-only call and returns the raw return data.
	///
	/// Reverts surface as [`DeliveryError::Reverted`] carrying the
	/// node-reported detail, including custom error data when present.
	async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, DeliveryError>;

	/// Whether the address has deployed code on the active network.
	async fn has_code(&self, address: Address) -> Result<bool, DeliveryError>;

	/// Current block number.
	async fn get_block_number(&self) -> Result<u64, DeliveryError>;
}

/// Service that manages delivery through the shared relayer wallet.
///
/// The relayer key is a single shared resource: concurrent submissions
/// would race its transaction ordering, so `submit` holds an async lock
/// across nonce assignment and broadcast. Confirmation waiting happens
/// outside the lock.
pub struct DeliveryService {
	provider: Box<dyn DeliveryInterface>,
	submit_lock: Mutex<()>,
	min_confirmations: u64,
}

impl DeliveryService {
	/// Creates a new DeliveryService with the specified provider.
	pub fn new(provider: Box<dyn DeliveryInterface>, min_confirmations: u64) -> Self {
		Self {
			provider,
			submit_lock: Mutex::new(()),
			min_confirmations,
		}
	}

	/// Submits a transaction, serialized on the relayer key.
	pub async fn submit(&self, tx: Transaction) -> Result<B256, DeliveryError> {
		let _guard = self.submit_lock.lock().await;
		self.provider.submit(tx).await
	}

	/// Waits for the configured number of confirmations.
	pub async fn confirm(&self, hash: &B256) -> Result<TransactionReceipt, DeliveryError> {
		self.provider
			.wait_for_confirmation(hash, self.min_confirmations)
			.await
	}

	/// Returns the receipt immediately, or an error if not yet mined.
	pub async fn get_receipt(&self, hash: &B256) -> Result<TransactionReceipt, DeliveryError> {
		self.provider.get_receipt(hash).await
	}

	/// Executes a read-only call.
	pub async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, DeliveryError> {
		self.provider.call(to, data).await
	}

	/// Simulates calldata against a target, discarding the return data.
	pub async fn simulate(&self, to: Address, data: Vec<u8>) -> Result<(), DeliveryError> {
		self.provider.call(to, data).await.map(|_| ())
	}

	/// Whether the address has deployed code.
	pub async fn has_code(&self, address: Address) -> Result<bool, DeliveryError> {
		self.provider.has_code(address).await
	}

	/// Current block number.
	pub async fn get_block_number(&self) -> Result<u64, DeliveryError> {
		self.provider.get_block_number().await
	}
}

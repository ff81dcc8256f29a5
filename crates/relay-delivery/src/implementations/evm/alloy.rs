//! Alloy-based EVM delivery implementation.
//!
//! Submits and monitors transactions over an HTTP provider whose wallet
//! is the relayer key. Confirmation waiting polls receipts against the
//! head block with a bounded timeout.

use crate::{DeliveryError, DeliveryInterface};
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use relay_types::{NetworkConfig, SecretString, Transaction, TransactionReceipt};
use std::time::Duration;

/// EVM delivery over an alloy HTTP provider.
pub struct AlloyDelivery<P> {
	provider: P,
	poll_interval: Duration,
	confirmation_timeout: Duration,
}

impl<P> AlloyDelivery<P> {
	/// Wraps a provider with the given polling parameters.
	pub fn new(provider: P, poll_interval: Duration, confirmation_timeout: Duration) -> Self {
		Self {
			provider,
			poll_interval,
			confirmation_timeout,
		}
	}
}

fn into_receipt(receipt: alloy::rpc::types::TransactionReceipt) -> TransactionReceipt {
	TransactionReceipt {
		hash: receipt.transaction_hash,
		block_number: receipt.block_number.unwrap_or(0),
		gas_used: receipt.gas_used as u64,
		success: receipt.status(),
	}
}

/// Extracts revert detail from an RPC error, keeping the error data
/// (custom error selector and arguments) when the node returns it.
fn classify_rpc_error(error: alloy::transports::TransportError) -> DeliveryError {
	if let Some(payload) = error.as_error_resp() {
		let mut detail = payload.message.to_string();
		if let Some(data) = &payload.data {
			detail.push(' ');
			detail.push_str(&data.to_string());
		}
		DeliveryError::Reverted(detail)
	} else {
		DeliveryError::Network(error.to_string())
	}
}

#[async_trait]
impl<P> DeliveryInterface for AlloyDelivery<P>
where
	P: Provider + Send + Sync,
{
	async fn submit(&self, tx: Transaction) -> Result<B256, DeliveryError> {
		let mut request = TransactionRequest::default()
			.to(tx.to)
			.input(Bytes::from(tx.data).into());
		if !tx.value.is_zero() {
			request = request.value(tx.value);
		}

		let pending = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| DeliveryError::Network(format!("failed to send transaction: {}", e)))?;

		let hash = *pending.tx_hash();
		tracing::info!(tx_hash = %hash, "submitted transaction");
		Ok(hash)
	}

	async fn wait_for_confirmation(
		&self,
		hash: &B256,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		let started = tokio::time::Instant::now();
		tracing::debug!(
			tx_hash = %hash,
			confirmations,
			timeout_secs = self.confirmation_timeout.as_secs(),
			"waiting for confirmations"
		);

		loop {
			if started.elapsed() > self.confirmation_timeout {
				return Err(DeliveryError::Network(format!(
					"timed out after {}s waiting for {} confirmations of {}",
					self.confirmation_timeout.as_secs(),
					confirmations,
					hash
				)));
			}

			let receipt = match self.provider.get_transaction_receipt(*hash).await {
				Ok(Some(receipt)) => receipt,
				Ok(None) => {
					// Not yet mined.
					tokio::time::sleep(self.poll_interval).await;
					continue;
				}
				Err(e) => {
					return Err(DeliveryError::Network(format!(
						"failed to get receipt: {}",
						e
					)));
				}
			};

			let current_block = self
				.provider
				.get_block_number()
				.await
				.map_err(|e| DeliveryError::Network(format!("failed to get block number: {}", e)))?;

			let tx_block = receipt.block_number.unwrap_or(0);
			// Inclusion counts as the first confirmation.
			let seen = current_block.saturating_sub(tx_block).saturating_add(1);
			if seen >= confirmations.max(1) {
				return Ok(into_receipt(receipt));
			}

			tokio::time::sleep(self.poll_interval).await;
		}
	}

	async fn get_receipt(&self, hash: &B256) -> Result<TransactionReceipt, DeliveryError> {
		match self.provider.get_transaction_receipt(*hash).await {
			Ok(Some(receipt)) => Ok(into_receipt(receipt)),
			Ok(None) => Err(DeliveryError::Network(format!(
				"transaction {} not found",
				hash
			))),
			Err(e) => Err(DeliveryError::Network(format!(
				"failed to get receipt: {}",
				e
			))),
		}
	}

	async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, DeliveryError> {
		let request = TransactionRequest::default()
			.to(to)
			.input(Bytes::from(data).into());
		match self.provider.call(request).await {
			Ok(bytes) => Ok(bytes.to_vec()),
			Err(e) => Err(classify_rpc_error(e)),
		}
	}

	async fn has_code(&self, address: Address) -> Result<bool, DeliveryError> {
		let code = self
			.provider
			.get_code_at(address)
			.await
			.map_err(|e| DeliveryError::Network(format!("failed to get code: {}", e)))?;
		Ok(!code.is_empty())
	}

	async fn get_block_number(&self) -> Result<u64, DeliveryError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| DeliveryError::Network(format!("failed to get block number: {}", e)))
	}
}

/// Builds an HTTP delivery provider from the network config and the
/// relayer signing key.
pub fn create_http_delivery(
	network: &NetworkConfig,
	private_key: &SecretString,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	let signer: PrivateKeySigner = private_key
		.with_exposed(|key| key.parse())
		.map_err(|_| DeliveryError::InvalidKey("invalid relayer private key format".to_string()))?;
	let signer = signer.with_chain_id(Some(network.chain_id));
	let wallet = EthereumWallet::from(signer);

	let url = network
		.rpc_url
		.parse()
		.map_err(|e| DeliveryError::Network(format!("invalid RPC URL: {}", e)))?;

	let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

	Ok(Box::new(AlloyDelivery::new(
		provider,
		Duration::from_secs(network.poll_interval_seconds),
		Duration::from_secs(network.confirmation_timeout_seconds),
	)))
}

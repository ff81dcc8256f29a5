//! Relay executor: encodes and settles authorizations on-chain.
//!
//! Two submission modes. Single calls go straight to the target
//! contract. Batches wrap N `executePayment` calls in one Multicall3
//! `aggregate3` with `allowFailure = false` on every call: if any one
//! payment would revert the whole batch reverts, so a split group can
//! never end up partially settled. Calldata is simulated before
//! submission and revert payloads are translated into actionable
//! messages.

use crate::RelayError;
use alloy::primitives::{Address, Bytes, B256};
use alloy::sol_types::{SolCall, SolError};
use relay_delivery::{DeliveryError, DeliveryService};
use relay_types::{
	ChipRegistration, CreditPurchase, IChipRegistry, IMulticall3, ISettler, PaymentAuth,
	Transaction,
};
use std::sync::Arc;

/// Confirmed settlement details returned to the caller.
#[derive(Debug, Clone)]
pub struct Settlement {
	/// Hash of the settled transaction.
	pub tx_hash: B256,
	/// Block the transaction was included in.
	pub block_number: u64,
	/// Gas the transaction consumed.
	pub gas_used: u64,
}

/// Submits signed authorizations through the relayer wallet.
pub struct RelayExecutor {
	delivery: Arc<DeliveryService>,
	multicall: Address,
}

impl RelayExecutor {
	/// Creates an executor over the delivery service.
	pub fn new(delivery: Arc<DeliveryService>, multicall: Address) -> Self {
		Self { delivery, multicall }
	}

	/// Settles a single payment authorization against `target`.
	pub async fn execute_payment(
		&self,
		target: Address,
		auth: &PaymentAuth,
		signature: &[u8],
	) -> Result<Settlement, RelayError> {
		let data = payment_calldata(auth, signature);
		self.send(target, data).await
	}

	/// Settles a batch of payments atomically via `aggregate3`.
	pub async fn execute_batch(
		&self,
		target: Address,
		payments: &[(PaymentAuth, Vec<u8>)],
	) -> Result<Settlement, RelayError> {
		if payments.is_empty() {
			return Err(RelayError::Validation("batch must not be empty".into()));
		}
		let data = batch_calldata(target, payments);
		self.send(self.multicall, data).await
	}

	/// Settles a credit purchase authorization against `target`.
	pub async fn purchase_credits(
		&self,
		target: Address,
		purchase: &CreditPurchase,
		signature: &[u8],
	) -> Result<Settlement, RelayError> {
		let data = ISettler::purchaseCreditsCall {
			purchase: purchase.clone(),
			signature: Bytes::copy_from_slice(signature),
		}
		.abi_encode();
		self.send(target, data).await
	}

	/// Registers a chip binding against the registry contract.
	pub async fn register_chip(
		&self,
		registry: Address,
		registration: &ChipRegistration,
		signature: &[u8],
	) -> Result<Settlement, RelayError> {
		let data = IChipRegistry::registerChipCall {
			registration: registration.clone(),
			signature: Bytes::copy_from_slice(signature),
		}
		.abi_encode();
		self.send(registry, data).await
	}

	/// Simulates, submits, and waits for the configured confirmations.
	async fn send(&self, to: Address, data: Vec<u8>) -> Result<Settlement, RelayError> {
		if !self.delivery.has_code(to).await? {
			return Err(RelayError::Configuration(format!(
				"contract {:#x} is not deployed on the active network",
				to
			)));
		}

		// Pre-flight simulation catches expired, replayed, and unsigned
		// authorizations before gas is spent.
		self.delivery
			.simulate(to, data.clone())
			.await
			.map_err(reject)?;

		let hash = self.delivery.submit(Transaction::call(to, data)).await?;
		let receipt = self.delivery.confirm(&hash).await?;
		if !receipt.success {
			return Err(RelayError::Rejected(
				"transaction reverted on-chain".to_string(),
			));
		}
		tracing::info!(
			tx_hash = %receipt.hash,
			block = receipt.block_number,
			gas_used = receipt.gas_used,
			"settled"
		);
		Ok(Settlement {
			tx_hash: receipt.hash,
			block_number: receipt.block_number,
			gas_used: receipt.gas_used,
		})
	}
}

/// Calldata for a single `executePayment` call.
pub fn payment_calldata(auth: &PaymentAuth, signature: &[u8]) -> Vec<u8> {
	ISettler::executePaymentCall {
		auth: auth.clone(),
		signature: Bytes::copy_from_slice(signature),
	}
	.abi_encode()
}

/// Calldata for an atomic `aggregate3` batch of payments.
///
/// Every call is encoded with `allowFailure = false`: partial
/// settlement is disallowed by construction.
pub fn batch_calldata(target: Address, payments: &[(PaymentAuth, Vec<u8>)]) -> Vec<u8> {
	let calls = payments
		.iter()
		.map(|(auth, signature)| IMulticall3::Call3 {
			target,
			allowFailure: false,
			callData: payment_calldata(auth, signature).into(),
		})
		.collect();
	IMulticall3::aggregate3Call { calls }.abi_encode()
}

fn reject(error: DeliveryError) -> RelayError {
	match error {
		DeliveryError::Reverted(detail) => RelayError::Rejected(translate_revert(&detail)),
		other => other.into(),
	}
}

/// Translates raw revert detail into a user-facing explanation.
///
/// Matches the settlement contract's custom error selectors (the node
/// returns them as hex error data) plus the common ERC-20 revert
/// strings for allowance and balance shortfalls.
pub fn translate_revert(detail: &str) -> String {
	let lower = detail.to_lowercase();
	let has = |selector: [u8; 4], name: &str| {
		lower.contains(&hex::encode(selector)) || lower.contains(&name.to_lowercase())
	};

	if has(ISettler::UnauthorizedSigner::SELECTOR, "UnauthorizedSigner") {
		return "chip is not registered to this wallet".to_string();
	}
	if has(ISettler::InvalidNonce::SELECTOR, "InvalidNonce") {
		return "payment is out of order or was already processed, refresh and try again"
			.to_string();
	}
	if has(ISettler::ExpiredSignature::SELECTOR, "ExpiredSignature") {
		return "authorization expired, please try again".to_string();
	}
	if has(ISettler::InvalidSignature::SELECTOR, "InvalidSignature") {
		return "signature verification failed".to_string();
	}
	if has(
		IChipRegistry::ChipAlreadyRegistered::SELECTOR,
		"ChipAlreadyRegistered",
	) {
		return "chip is already registered".to_string();
	}
	if lower.contains("allowance") {
		return "token allowance is too low, approve the settlement contract and try again"
			.to_string();
	}
	if lower.contains("exceeds balance") || lower.contains("insufficient") {
		return "insufficient token balance for this payment".to_string();
	}
	format!("payment rejected on-chain: {}", detail)
}

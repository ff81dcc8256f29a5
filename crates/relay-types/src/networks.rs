//! Network configuration: the chain the relay operates on and the
//! contracts it talks to.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// The active network and its deployed contract addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
	/// HTTP RPC endpoint.
	pub rpc_url: String,
	/// Chain ID; also bound into the signing domain.
	pub chain_id: u64,
	/// Settlement contract (executePayment, purchaseCredits, nonces).
	pub settlement_address: Address,
	/// Credit contract target for purchase relays. Defaults to the
	/// settlement contract when the deployment co-locates both.
	#[serde(default)]
	pub credit_address: Option<Address>,
	/// Chip registry contract (ownerOf, registerChip).
	pub registry_address: Address,
	/// USDC token address, recorded on credit purchase expenses.
	#[serde(default)]
	pub usdc_address: Option<Address>,
	/// Multicall3-compatible aggregator for atomic batches.
	pub multicall_address: Address,
	/// Confirmations required before a relay call returns.
	#[serde(default = "default_min_confirmations")]
	pub min_confirmations: u64,
	/// Receipt poll interval while waiting for confirmations.
	#[serde(default = "default_poll_interval_seconds")]
	pub poll_interval_seconds: u64,
	/// Upper bound on the confirmation wait before the relay gives up.
	#[serde(default = "default_confirmation_timeout_seconds")]
	pub confirmation_timeout_seconds: u64,
}

impl NetworkConfig {
	/// The contract purchase relays are sent to.
	pub fn credit_target(&self) -> Address {
		self.credit_address.unwrap_or(self.settlement_address)
	}
}

fn default_min_confirmations() -> u64 {
	1
}

fn default_poll_interval_seconds() -> u64 {
	7
}

fn default_confirmation_timeout_seconds() -> u64 {
	300
}

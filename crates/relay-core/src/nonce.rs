//! Nonce oracle: reads the per-payer replay counter.
//!
//! The counter lives on the settlement contract and must be read after
//! wallet resolution, never before: the discovery challenge carries no
//! nonce at all, and a stale read is rejected on-chain. Callers refetch
//! after every successful relay.

use crate::RelayError;
use alloy::primitives::{Address, U256};
use alloy::sol_types::{SolCall, SolValue};
use relay_delivery::DeliveryService;
use relay_types::ISettler;
use std::sync::Arc;

/// Reads the live per-payer nonce from the settlement contract.
pub struct NonceOracle {
	delivery: Arc<DeliveryService>,
	settlement: Address,
}

impl NonceOracle {
	/// Creates an oracle against the given settlement contract.
	pub fn new(delivery: Arc<DeliveryService>, settlement: Address) -> Self {
		Self {
			delivery,
			settlement,
		}
	}

	/// The nonce the payer's next authorization must carry.
	pub async fn current_nonce(&self, payer: Address) -> Result<U256, RelayError> {
		let data = ISettler::noncesCall { payer }.abi_encode();
		let ret = self.delivery.call(self.settlement, data).await?;
		U256::abi_decode(&ret)
			.map_err(|e| RelayError::Network(format!("malformed nonces() response: {}", e)))
	}
}

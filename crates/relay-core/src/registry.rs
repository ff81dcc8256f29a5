//! Registry resolver: maps ephemeral chip addresses to owner wallets.
//!
//! The contract anchors authorization identity on the wallet, but a
//! physical tap only yields the chip's own keypair. The registry
//! indirection lets chips be reissued or rotated without changing wallet
//! identity. A zero-address owner means the chip is unregistered, which
//! is a hard failure for payment flows and a precondition for
//! registration.

use crate::RelayError;
use alloy::primitives::Address;
use alloy::sol_types::{SolCall, SolValue};
use relay_delivery::DeliveryService;
use relay_types::IChipRegistry;
use std::sync::Arc;

/// Resolves chip addresses through the on-chain registry.
pub struct RegistryResolver {
	delivery: Arc<DeliveryService>,
	registry: Address,
}

impl RegistryResolver {
	/// Creates a resolver against the given registry contract.
	pub fn new(delivery: Arc<DeliveryService>, registry: Address) -> Self {
		Self { delivery, registry }
	}

	/// The wallet owning the chip, or None when unregistered.
	pub async fn owner_of(&self, chip_address: Address) -> Result<Option<Address>, RelayError> {
		let data = IChipRegistry::ownerOfCall {
			chipAddress: chip_address,
		}
		.abi_encode();
		let ret = self.delivery.call(self.registry, data).await?;
		let owner = Address::abi_decode(&ret)
			.map_err(|e| RelayError::Network(format!("malformed ownerOf() response: {}", e)))?;
		Ok((owner != Address::ZERO).then_some(owner))
	}

	/// Resolves the owning wallet, failing hard on unregistered chips.
	pub async fn resolve_wallet(&self, chip_address: Address) -> Result<Address, RelayError> {
		self.owner_of(chip_address)
			.await?
			.ok_or(RelayError::ChipNotRegistered)
	}

	/// Enforces the one-owner-per-chip invariant before registration.
	pub async fn ensure_unregistered(&self, chip_address: Address) -> Result<(), RelayError> {
		match self.owner_of(chip_address).await? {
			Some(owner) => Err(RelayError::Validation(format!(
				"chip is already registered to {:#x}",
				owner
			))),
			None => Ok(()),
		}
	}
}

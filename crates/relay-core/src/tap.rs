//! Two-phase chip signing protocol.
//!
//! A chip only reveals its address by signing something; there is no
//! discovery channel independent of signing. The flow therefore runs in
//! two taps:
//!
//! 1. Discovery tap: the chip signs a fresh [`ChipChallenge`], a struct
//!    type no contract accepts, and its address falls out of signature
//!    recovery.
//! 2. The registry resolves chip -> owning wallet (unregistered chips
//!    fail hard), the wallet's live nonce is fetched, and the real
//!    authorization is built.
//! 3. Real tap: the chip signs the authorization digest. That second
//!    signature is the one relayed.
//!
//! The nonce is read strictly after wallet resolution; the challenge
//! carries none.

use crate::nonce::NonceOracle;
use crate::registry::RegistryResolver;
use crate::RelayError;
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use relay_types::{deadline_from_now, AuthorizationBuilder, CreditPurchase, PaymentAuth};
use thiserror::Error;

/// Errors raised by the chip hardware seam.
#[derive(Debug, Error)]
pub enum ChipError {
	/// The tap failed or was aborted.
	#[error("Chip interaction failed: {0}")]
	Interaction(String),
}

/// The external NFC chip: given a digest, returns an ECDSA signature.
///
/// Implemented by hardware bindings outside this workspace; tests use
/// key-backed fakes.
#[async_trait]
pub trait ChipSigner: Send + Sync {
	/// Asks the chip to sign a 32-byte digest, returning 65 signature
	/// bytes.
	async fn sign_digest(&self, digest: B256) -> Result<Vec<u8>, ChipError>;
}

/// A chip resolved to its owning wallet.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedChip {
	/// The chip's own ephemeral address.
	pub chip_address: Address,
	/// The wallet registered as the chip's owner.
	pub wallet: Address,
}

/// Drives the two-tap protocol against a chip.
pub struct TapFlow<'a> {
	builder: &'a AuthorizationBuilder,
	registry: &'a RegistryResolver,
	nonces: &'a NonceOracle,
}

impl<'a> TapFlow<'a> {
	/// Creates a flow over the authorization builder and chain readers.
	pub fn new(
		builder: &'a AuthorizationBuilder,
		registry: &'a RegistryResolver,
		nonces: &'a NonceOracle,
	) -> Self {
		Self {
			builder,
			registry,
			nonces,
		}
	}

	/// Discovery tap: learns the chip's address and resolves its wallet.
	pub async fn resolve(&self, chip: &dyn ChipSigner) -> Result<ResolvedChip, RelayError> {
		let challenge = self.builder.discovery_challenge();
		let signature = chip
			.sign_digest(self.builder.signing_hash(&challenge))
			.await?;
		let chip_address = self.builder.recover_signer(&challenge, &signature)?;
		let wallet = self.registry.resolve_wallet(chip_address).await?;
		Ok(ResolvedChip {
			chip_address,
			wallet,
		})
	}

	/// Full payment flow: resolve, fetch the live nonce, build the real
	/// authorization, and collect the second tap's signature.
	pub async fn signed_payment(
		&self,
		chip: &dyn ChipSigner,
		recipient: Address,
		token: Address,
		amount: U256,
		deadline_ttl_seconds: u64,
	) -> Result<(PaymentAuth, Vec<u8>), RelayError> {
		let resolved = self.resolve(chip).await?;
		let nonce = self.nonces.current_nonce(resolved.wallet).await?;
		let auth = self.builder.payment(
			resolved.wallet,
			recipient,
			token,
			amount,
			nonce,
			deadline_from_now(deadline_ttl_seconds),
		);
		let signature = chip.sign_digest(self.builder.signing_hash(&auth)).await?;
		Ok((auth, signature))
	}

	/// Full credit purchase flow, same shape as [`Self::signed_payment`].
	pub async fn signed_credit_purchase(
		&self,
		chip: &dyn ChipSigner,
		usdc_amount: U256,
		deadline_ttl_seconds: u64,
	) -> Result<(CreditPurchase, Vec<u8>), RelayError> {
		let resolved = self.resolve(chip).await?;
		let nonce = self.nonces.current_nonce(resolved.wallet).await?;
		let purchase = self.builder.credit_purchase(
			resolved.wallet,
			usdc_amount,
			nonce,
			deadline_from_now(deadline_ttl_seconds),
		);
		let signature = chip
			.sign_digest(self.builder.signing_hash(&purchase))
			.await?;
		Ok((purchase, signature))
	}

	/// Discovery tap for an unbound chip, yielding the registration the
	/// owner wallet must sign. Fails when the chip already has an owner.
	pub async fn prepare_registration(
		&self,
		chip: &dyn ChipSigner,
		owner: Address,
	) -> Result<relay_types::ChipRegistration, RelayError> {
		let challenge = self.builder.discovery_challenge();
		let signature = chip
			.sign_digest(self.builder.signing_hash(&challenge))
			.await?;
		let chip_address = self.builder.recover_signer(&challenge, &signature)?;
		self.registry.ensure_unregistered(chip_address).await?;
		Ok(self.builder.chip_registration(owner, chip_address))
	}
}

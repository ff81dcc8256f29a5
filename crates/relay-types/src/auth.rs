//! Authorization building for chip-signed operations.
//!
//! The [`AuthorizationBuilder`] binds every signable struct to the one
//! configured EIP-712 domain and produces the digests chips sign during
//! the two-tap protocol. Signer recovery lives here as well so callers
//! never touch raw signature plumbing.

use crate::contracts::{ChipChallenge, ChipRegistration, CreditPurchase, CreditSpend, PaymentAuth};
use crate::utils::current_timestamp;
use alloy::primitives::{Address, Signature, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

/// Errors that can occur while building or verifying authorizations.
#[derive(Debug, Error)]
pub enum AuthError {
	/// The provided signature bytes could not be parsed.
	#[error("Malformed signature: {0}")]
	MalformedSignature(String),
	/// Recovering the signer address from the signature failed.
	#[error("Signature recovery failed: {0}")]
	Recovery(String),
}

/// The fixed signing domain every authorization is bound to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthDomain {
	/// EIP-712 domain name.
	pub name: String,
	/// EIP-712 domain version.
	pub version: String,
	/// Chain the verifying contract lives on.
	pub chain_id: u64,
	/// The settlement contract verifying the signatures.
	pub verifying_contract: Address,
}

/// Builds the signable struct shapes and their signing digests.
pub struct AuthorizationBuilder {
	domain: Eip712Domain,
}

impl AuthorizationBuilder {
	/// Creates a builder bound to the given domain.
	pub fn new(domain: &AuthDomain) -> Self {
		Self {
			domain: Eip712Domain {
				name: Some(Cow::Owned(domain.name.clone())),
				version: Some(Cow::Owned(domain.version.clone())),
				chain_id: Some(U256::from(domain.chain_id)),
				verifying_contract: Some(domain.verifying_contract),
				salt: None,
			},
		}
	}

	/// Constructs a payment authorization.
	pub fn payment(
		&self,
		payer: Address,
		recipient: Address,
		token: Address,
		amount: U256,
		nonce: U256,
		deadline: U256,
	) -> PaymentAuth {
		PaymentAuth {
			payer,
			recipient,
			token,
			amount,
			nonce,
			deadline,
		}
	}

	/// Constructs a credit purchase authorization.
	pub fn credit_purchase(
		&self,
		buyer: Address,
		usdc_amount: U256,
		nonce: U256,
		deadline: U256,
	) -> CreditPurchase {
		CreditPurchase {
			buyer,
			usdcAmount: usdc_amount,
			nonce,
			deadline,
		}
	}

	/// Constructs a credit spend authorization.
	pub fn credit_spend(
		&self,
		spender: Address,
		amount: U256,
		activity_id: U256,
		nonce: U256,
		deadline: U256,
	) -> CreditSpend {
		CreditSpend {
			spender,
			amount,
			activityId: activity_id,
			nonce,
			deadline,
		}
	}

	/// Constructs a chip registration binding `chip_address` to `owner`.
	pub fn chip_registration(&self, owner: Address, chip_address: Address) -> ChipRegistration {
		ChipRegistration {
			owner,
			chipAddress: chip_address,
		}
	}

	/// Constructs a fresh discovery challenge for the first tap.
	///
	/// The challenge is random per tap; the struct type is distinct from
	/// every authorization type, so the resulting signature can only ever
	/// reveal the chip's address.
	pub fn discovery_challenge(&self) -> ChipChallenge {
		let mut bytes = [0u8; 32];
		rand::fill(&mut bytes);
		ChipChallenge {
			challenge: B256::from(bytes),
			issuedAt: U256::from(current_timestamp()),
		}
	}

	/// Computes the EIP-712 signing digest for any of the struct shapes.
	pub fn signing_hash<S: SolStruct>(&self, value: &S) -> B256 {
		value.eip712_signing_hash(&self.domain)
	}

	/// Recovers the address that signed `value` under this domain.
	pub fn recover_signer<S: SolStruct>(
		&self,
		value: &S,
		signature: &[u8],
	) -> Result<Address, AuthError> {
		let sig = Signature::from_raw(signature)
			.map_err(|e| AuthError::MalformedSignature(e.to_string()))?;
		let digest = self.signing_hash(value);
		sig.recover_address_from_prehash(&digest)
			.map_err(|e| AuthError::Recovery(e.to_string()))
	}
}

//! Local private-key account implementation.
//!
//! Holds the relayer key in process memory as an alloy local signer.

use crate::{AccountError, AccountInterface};
use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use relay_types::{with_0x_prefix, SecretString};

/// Account backed by an in-memory private key.
pub struct LocalAccount {
	signer: PrivateKeySigner,
	key: SecretString,
}

impl LocalAccount {
	/// Parses the relayer key, accepting it with or without 0x prefix.
	pub fn from_key(key: &SecretString) -> Result<Self, AccountError> {
		let signer: PrivateKeySigner = key
			.with_exposed(|raw| with_0x_prefix(raw.trim()).parse())
			.map_err(|_| AccountError::InvalidKey("invalid relayer private key".to_string()))?;
		let key = key.with_exposed(|raw| SecretString::new(with_0x_prefix(raw.trim())));
		Ok(Self { signer, key })
	}
}

#[async_trait]
impl AccountInterface for LocalAccount {
	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_digest(&self, digest: &B256) -> Result<Vec<u8>, AccountError> {
		let signature = self
			.signer
			.sign_hash_sync(digest)
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		Ok(signature.as_bytes().to_vec())
	}

	fn private_key(&self) -> SecretString {
		self.key.clone()
	}
}

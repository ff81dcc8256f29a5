//! Relayer account management.
//!
//! The relayer holds a single server-side hot-wallet key: a scarce,
//! shared resource that pays gas for every relayed transaction. This
//! crate puts that key behind the [`AccountInterface`] trait so the rest
//! of the workspace never handles raw key material.

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use relay_types::SecretString;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
}

/// Trait defining the interface for account implementations.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// The relayer's wallet address.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a 32-byte digest with the relayer key.
	async fn sign_digest(&self, digest: &B256) -> Result<Vec<u8>, AccountError>;

	/// Exposes the private key for delivery providers that need to build
	/// a signing wallet.
	fn private_key(&self) -> SecretString;
}

/// Service that manages the relayer account.
///
/// Wraps an account implementation behind a stable surface for the rest
/// of the workspace.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	/// Creates a new AccountService with the specified implementation.
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	/// The relayer's wallet address.
	pub async fn address(&self) -> Result<Address, AccountError> {
		self.implementation.address().await
	}

	/// Signs a 32-byte digest with the relayer key.
	pub async fn sign_digest(&self, digest: &B256) -> Result<Vec<u8>, AccountError> {
		self.implementation.sign_digest(digest).await
	}

	/// Exposes the private key for delivery providers.
	pub fn private_key(&self) -> SecretString {
		self.implementation.private_key()
	}
}

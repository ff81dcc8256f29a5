//! On-chain definitions: the signable EIP-712 struct shapes and the
//! contract interfaces the relay talks to.
//!
//! All five struct shapes are bound to one signing domain (see
//! [`crate::auth::AuthDomain`]). `ChipChallenge` exists solely for the
//! discovery tap: its type hash can never collide with an authorization
//! type, so a discovery signature is useless as a payment authorization.

use alloy::sol;

sol! {
	/// Authorizes a single token transfer from `payer` to `recipient`.
	/// Single-use: consumed once its nonce is spent on-chain.
	#[derive(Debug, serde::Serialize, serde::Deserialize)]
	struct PaymentAuth {
		address payer;
		address recipient;
		address token;
		uint256 amount;
		uint256 nonce;
		uint256 deadline;
	}

	/// Authorizes minting credits against a USDC payment.
	#[derive(Debug, serde::Serialize, serde::Deserialize)]
	struct CreditPurchase {
		address buyer;
		uint256 usdcAmount;
		uint256 nonce;
		uint256 deadline;
	}

	/// Authorizes spending previously purchased credits on an activity.
	#[derive(Debug, serde::Serialize, serde::Deserialize)]
	struct CreditSpend {
		address spender;
		uint256 amount;
		uint256 activityId;
		uint256 nonce;
		uint256 deadline;
	}

	/// Binds an ephemeral chip address to the wallet that owns it.
	#[derive(Debug, serde::Serialize, serde::Deserialize)]
	struct ChipRegistration {
		address owner;
		address chipAddress;
	}

	/// Discovery-only struct signed during the first tap. Never accepted
	/// by any contract function; exists to learn the chip's address.
	#[derive(Debug, serde::Serialize, serde::Deserialize)]
	struct ChipChallenge {
		bytes32 challenge;
		uint256 issuedAt;
	}

	/// The settlement contract: verifies authorization signatures and
	/// nonces, then moves tokens or mints credits.
	interface ISettler {
		error ExpiredSignature();
		error InvalidNonce();
		error UnauthorizedSigner();
		error InvalidSignature();

		function executePayment(PaymentAuth calldata auth, bytes calldata signature) external;
		function purchaseCredits(CreditPurchase calldata purchase, bytes calldata signature) external;
		function spendCredits(CreditSpend calldata spend, bytes calldata signature) external;
		function nonces(address payer) external view returns (uint256);
	}

	/// The chip registry: one owner per chip, zero address when unbound.
	interface IChipRegistry {
		error ChipAlreadyRegistered();

		function ownerOf(address chipAddress) external view returns (address);
		function registerChip(ChipRegistration calldata registration, bytes calldata signature) external;
	}

	/// Multicall3-compatible aggregator used for atomic batches.
	interface IMulticall3 {
		struct Call3 {
			address target;
			bool allowFailure;
			bytes callData;
		}

		struct Result {
			bool success;
			bytes returnData;
		}

		function aggregate3(Call3[] calldata calls) external payable returns (Result[] memory returnData);
	}
}

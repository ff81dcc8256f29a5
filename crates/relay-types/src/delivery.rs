//! Transaction submission types shared between the executor and the
//! delivery layer.

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// A transaction ready for submission by the relayer wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
	/// Target contract.
	pub to: Address,
	/// ABI-encoded calldata.
	pub data: Vec<u8>,
	/// Native value attached to the call. Always zero for relayed
	/// meta-transactions; the relayer only pays gas.
	pub value: U256,
}

impl Transaction {
	/// A plain contract call carrying no native value.
	pub fn call(to: Address, data: Vec<u8>) -> Self {
		Self {
			to,
			data,
			value: U256::ZERO,
		}
	}
}

/// Receipt details for a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The transaction hash.
	pub hash: B256,
	/// Block the transaction was included in.
	pub block_number: u64,
	/// Gas consumed by the transaction.
	pub gas_used: u64,
	/// Whether execution succeeded.
	pub success: bool,
}

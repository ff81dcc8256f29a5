//! Accounting records persisted through the storage layer.
//!
//! These mirror the relational tables of the settlement backend: circles
//! and their members, expenses with embedded participants, payment
//! requests, and the user profiles feeding notification metadata.

use crate::api::u256_serde;
use crate::utils::current_timestamp;
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Storage namespaces for the accounting records.
pub mod namespaces {
	/// Circle rows, keyed by circle id.
	pub const CIRCLES: &str = "circles";
	/// Expense rows (participants embedded), keyed by expense id.
	pub const EXPENSES: &str = "expenses";
	/// Payment request rows, keyed by request id.
	pub const PAYMENT_REQUESTS: &str = "payment_requests";
	/// Pending-pair index: one entry per (payer, recipient) pair.
	pub const REQUEST_PAIRS: &str = "request_pairs";
	/// User profiles, keyed by lowercase wallet address.
	pub const PROFILES: &str = "profiles";
}

/// A named group of wallets splitting bills with its creator.
///
/// Invariant: a creator has at most one active circle at any time.
/// Members are embedded so a membership change is a single write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circle {
	/// Unique circle id.
	pub id: String,
	/// Display name, e.g. "Trip".
	pub name: String,
	/// Wallet that created and pays through this circle.
	pub creator_wallet: Address,
	/// Whether this is the creator's active circle.
	pub is_active: bool,
	/// Member wallets, excluding the creator.
	pub members: Vec<Address>,
	/// Creation time (Unix seconds).
	pub created_at: u64,
}

/// One participant's share of an expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseParticipant {
	/// Participant wallet.
	pub wallet: Address,
	/// Share in token base units.
	#[serde(with = "u256_serde")]
	pub share_amount: U256,
	/// True for the paying creator's own row.
	pub is_creator: bool,
}

/// Lifecycle status of an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
	/// Shares are outstanding.
	Active,
	/// All shares have been reimbursed.
	Settled,
}

/// An equal-split expense created after a settled payment or purchase.
///
/// Participants are embedded in the document: the expense and its rows
/// persist in one write, so a crash can never leave an orphaned expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
	/// Unique expense id.
	pub id: String,
	/// The wallet that paid the full amount.
	pub creator_wallet: Address,
	/// Human-readable description.
	pub description: String,
	/// Full settled amount in token base units.
	#[serde(with = "u256_serde")]
	pub total_amount: U256,
	/// Token the payment settled in.
	pub token: Address,
	/// Expense status.
	pub status: ExpenseStatus,
	/// One row per member plus the creator.
	pub participants: Vec<ExpenseParticipant>,
	/// Creation time (Unix seconds).
	pub created_at: u64,
}

/// Lifecycle status of a payment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
	/// Awaiting settlement.
	Pending,
	/// Settled by a matching relayed payment.
	Completed,
	/// Past its expiry without settlement.
	Expired,
}

impl RequestStatus {
	/// Lowercase wire representation.
	pub fn as_str(&self) -> &'static str {
		match self {
			RequestStatus::Pending => "pending",
			RequestStatus::Completed => "completed",
			RequestStatus::Expired => "expired",
		}
	}
}

/// A reimbursement request billing `payer` on behalf of `recipient`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
	/// Unique request id.
	pub id: String,
	/// Wallet that owes the amount.
	pub payer: Address,
	/// Wallet to be reimbursed.
	pub recipient: Address,
	/// Token the request settles in.
	pub token: Address,
	/// Requested amount, rendered with six fractional digits.
	pub amount: String,
	/// Optional note shown to the payer.
	pub memo: Option<String>,
	/// Stored status; expiry is derived at read time.
	pub status: RequestStatus,
	/// Creation time (Unix seconds).
	pub created_at: u64,
	/// Expiry time (Unix seconds); 24 hours after creation by default.
	pub expires_at: u64,
}

impl PaymentRequest {
	/// The status as of `now`.
	///
	/// A pending request past its expiry reads as expired. Derivation is
	/// a pure function of `expires_at`, so repeated reads agree without
	/// any write on the read path.
	pub fn status_at(&self, now: u64) -> RequestStatus {
		if self.status == RequestStatus::Pending && now >= self.expires_at {
			RequestStatus::Expired
		} else {
			self.status
		}
	}

	/// The status as of the current clock.
	pub fn effective_status(&self) -> RequestStatus {
		self.status_at(current_timestamp())
	}
}

/// Pending-pair index entry pointing at the open request for a pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPairIndex {
	/// Id of the pending request for this (payer, recipient) pair.
	pub request_id: String,
}

/// Profile metadata consumed when rendering notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
	/// Wallet address the profile belongs to.
	pub wallet: Address,
	/// Display name used in notification copy.
	pub display_name: String,
}

/// Storage key for the pending-pair index.
pub fn request_pair_key(payer: Address, recipient: Address) -> String {
	format!("{:#x}-{:#x}", payer, recipient)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request(status: RequestStatus, expires_at: u64) -> PaymentRequest {
		PaymentRequest {
			id: "r1".to_string(),
			payer: Address::repeat_byte(0x01),
			recipient: Address::repeat_byte(0x02),
			token: Address::repeat_byte(0x03),
			amount: "30.000000".to_string(),
			memo: None,
			status,
			created_at: 1_000,
			expires_at,
		}
	}

	#[test]
	fn pending_request_expires_at_read_time() {
		let row = request(RequestStatus::Pending, 2_000);
		assert_eq!(row.status_at(1_999), RequestStatus::Pending);
		assert_eq!(row.status_at(2_000), RequestStatus::Expired);
		// Derivation is stable across repeated reads.
		assert_eq!(row.status_at(5_000), RequestStatus::Expired);
	}

	#[test]
	fn completed_requests_never_expire() {
		let row = request(RequestStatus::Completed, 2_000);
		assert_eq!(row.status_at(9_999), RequestStatus::Completed);
	}

	#[test]
	fn pair_keys_are_directional() {
		let a = Address::repeat_byte(0x01);
		let b = Address::repeat_byte(0x02);
		assert_ne!(request_pair_key(a, b), request_pair_key(b, a));
	}
}

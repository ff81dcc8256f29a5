//! Payment request lifecycle.
//!
//! Requests move `pending -> completed` when a matching payment settles,
//! or read as `expired` once their deadline passes. Expiry is derived at
//! read time from `expires_at`; nothing is written on the read path, so
//! concurrent readers cannot race each other into conflicting writes.
//!
//! Creation is idempotent per (payer, recipient) pair: while a pending
//! request exists for the pair, creating another one returns the
//! existing id and fires a reminder instead of inserting a duplicate.

use crate::notify::NotifierInterface;
use crate::RelayError;
use alloy::primitives::{Address, U256};
use relay_storage::{StorageError, StorageService};
use relay_types::records::namespaces;
use relay_types::{
	current_timestamp, display_amount, request_pair_key, PaymentRequest, RequestDirection,
	RequestPairIndex, RequestStatus,
};
use std::sync::Arc;

/// Outcome of a create-or-remind call.
pub struct CreatedRequest {
	/// The pending request for the pair (new or pre-existing).
	pub request: PaymentRequest,
	/// True when the request already existed and a reminder was sent.
	pub is_existing: bool,
}

/// Manages payment request rows and their status transitions.
pub struct PaymentRequestLifecycle {
	storage: Arc<StorageService>,
	notifier: Arc<dyn NotifierInterface>,
	ttl_seconds: u64,
}

impl PaymentRequestLifecycle {
	/// Creates the lifecycle manager. `ttl_seconds` bounds how long a
	/// request stays payable (24 hours in the default configuration).
	pub fn new(
		storage: Arc<StorageService>,
		notifier: Arc<dyn NotifierInterface>,
		ttl_seconds: u64,
	) -> Self {
		Self {
			storage,
			notifier,
			ttl_seconds,
		}
	}

	/// Creates a request billing `payer` on behalf of `recipient`, or
	/// reminds the payer when a pending request for the pair exists.
	pub async fn create_or_remind(
		&self,
		payer: Address,
		recipient: Address,
		token: Address,
		amount: U256,
		memo: Option<String>,
	) -> Result<CreatedRequest, RelayError> {
		if amount.is_zero() {
			return Err(RelayError::Validation("amount must be positive".into()));
		}
		if payer == recipient {
			return Err(RelayError::Validation(
				"payer and recipient must differ".into(),
			));
		}

		let pair = request_pair_key(payer, recipient);
		if let Some(existing) = self.pending_for_pair(&pair).await? {
			self.notifier.payment_request_reminder(&existing).await;
			return Ok(CreatedRequest {
				request: existing,
				is_existing: true,
			});
		}

		let now = current_timestamp();
		let request = PaymentRequest {
			id: uuid::Uuid::new_v4().to_string(),
			payer,
			recipient,
			token,
			amount: display_amount(amount),
			memo,
			status: RequestStatus::Pending,
			created_at: now,
			expires_at: now + self.ttl_seconds,
		};
		self.storage
			.store(namespaces::PAYMENT_REQUESTS, &request.id, &request)
			.await?;
		self.storage
			.store(
				namespaces::REQUEST_PAIRS,
				&pair,
				&RequestPairIndex {
					request_id: request.id.clone(),
				},
			)
			.await?;
		self.notifier.payment_request_created(&request).await;
		Ok(CreatedRequest {
			request,
			is_existing: false,
		})
	}

	/// Completes the pending request matching a settled payment from
	/// `payer` to `recipient`, if one exists.
	pub async fn complete_matching(
		&self,
		payer: Address,
		recipient: Address,
	) -> Result<Option<PaymentRequest>, RelayError> {
		let pair = request_pair_key(payer, recipient);
		let Some(mut request) = self.pending_for_pair(&pair).await? else {
			return Ok(None);
		};
		request.status = RequestStatus::Completed;
		self.storage
			.update(namespaces::PAYMENT_REQUESTS, &request.id, &request)
			.await?;
		self.storage.remove(namespaces::REQUEST_PAIRS, &pair).await?;
		Ok(Some(request))
	}

	/// Lists a wallet's requests with statuses derived as of now.
	///
	/// `Incoming` lists what the wallet owes (wallet is payer);
	/// `Outgoing` lists what the wallet is owed (wallet is recipient).
	pub async fn list_for_wallet(
		&self,
		wallet: Address,
		direction: RequestDirection,
	) -> Result<Vec<PaymentRequest>, RelayError> {
		let now = current_timestamp();
		let mut rows: Vec<PaymentRequest> =
			self.storage.list(namespaces::PAYMENT_REQUESTS).await?;
		rows.retain(|row| match direction {
			RequestDirection::Incoming => row.payer == wallet,
			RequestDirection::Outgoing => row.recipient == wallet,
		});
		for row in &mut rows {
			row.status = row.status_at(now);
		}
		rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(rows)
	}

	/// The pending, unexpired request for a pair, if any. Stale index
	/// entries (completed or expired targets) read as no pending request.
	async fn pending_for_pair(&self, pair: &str) -> Result<Option<PaymentRequest>, RelayError> {
		let index: RequestPairIndex =
			match self.storage.retrieve(namespaces::REQUEST_PAIRS, pair).await {
				Ok(index) => index,
				Err(StorageError::NotFound) => return Ok(None),
				Err(e) => return Err(e.into()),
			};
		let request: PaymentRequest = match self
			.storage
			.retrieve(namespaces::PAYMENT_REQUESTS, &index.request_id)
			.await
		{
			Ok(request) => request,
			Err(StorageError::NotFound) => return Ok(None),
			Err(e) => return Err(e.into()),
		};
		if request.effective_status() == RequestStatus::Pending {
			Ok(Some(request))
		} else {
			Ok(None)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::notify::LogNotifier;
	use relay_storage::MemoryStorage;

	fn lifecycle() -> (Arc<StorageService>, PaymentRequestLifecycle) {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let notifier = Arc::new(LogNotifier::new(storage.clone()));
		(
			storage.clone(),
			PaymentRequestLifecycle::new(storage, notifier, 86_400),
		)
	}

	fn wallets() -> (Address, Address) {
		(Address::repeat_byte(0x01), Address::repeat_byte(0x02))
	}

	#[tokio::test]
	async fn duplicate_pair_reminds_instead_of_inserting() {
		let (storage, lifecycle) = lifecycle();
		let (payer, recipient) = wallets();
		let token = Address::repeat_byte(0x03);

		let first = lifecycle
			.create_or_remind(payer, recipient, token, U256::from(30u64), None)
			.await
			.unwrap();
		assert!(!first.is_existing);

		let second = lifecycle
			.create_or_remind(payer, recipient, token, U256::from(99u64), None)
			.await
			.unwrap();
		assert!(second.is_existing);
		assert_eq!(second.request.id, first.request.id);
		// The original amount stands; no new row was written.
		assert_eq!(second.request.amount, "30.000000");

		let rows: Vec<PaymentRequest> = storage
			.list(namespaces::PAYMENT_REQUESTS)
			.await
			.unwrap();
		assert_eq!(rows.len(), 1);
	}

	#[tokio::test]
	async fn reversed_pair_is_a_separate_request() {
		let (storage, lifecycle) = lifecycle();
		let (payer, recipient) = wallets();
		let token = Address::repeat_byte(0x03);

		lifecycle
			.create_or_remind(payer, recipient, token, U256::from(10u64), None)
			.await
			.unwrap();
		let reversed = lifecycle
			.create_or_remind(recipient, payer, token, U256::from(10u64), None)
			.await
			.unwrap();
		assert!(!reversed.is_existing);

		let rows: Vec<PaymentRequest> = storage
			.list(namespaces::PAYMENT_REQUESTS)
			.await
			.unwrap();
		assert_eq!(rows.len(), 2);
	}

	#[tokio::test]
	async fn settlement_completes_the_pending_request() {
		let (_storage, lifecycle) = lifecycle();
		let (payer, recipient) = wallets();
		let token = Address::repeat_byte(0x03);

		lifecycle
			.create_or_remind(payer, recipient, token, U256::from(30u64), None)
			.await
			.unwrap();
		let completed = lifecycle
			.complete_matching(payer, recipient)
			.await
			.unwrap()
			.expect("request completed");
		assert_eq!(completed.status, RequestStatus::Completed);

		// Nothing pending remains for the pair; a new request can be made.
		assert!(lifecycle
			.complete_matching(payer, recipient)
			.await
			.unwrap()
			.is_none());
		let next = lifecycle
			.create_or_remind(payer, recipient, token, U256::from(5u64), None)
			.await
			.unwrap();
		assert!(!next.is_existing);
	}

	#[tokio::test]
	async fn expired_requests_read_as_expired_consistently() {
		let (storage, lifecycle) = lifecycle();
		let (payer, recipient) = wallets();

		// Insert a row whose expiry has already passed.
		let row = PaymentRequest {
			id: "expired-1".to_string(),
			payer,
			recipient,
			token: Address::repeat_byte(0x03),
			amount: "30.000000".to_string(),
			memo: None,
			status: RequestStatus::Pending,
			created_at: 1_000,
			expires_at: 2_000,
		};
		storage
			.store(namespaces::PAYMENT_REQUESTS, &row.id, &row)
			.await
			.unwrap();

		let listed = lifecycle
			.list_for_wallet(payer, RequestDirection::Incoming)
			.await
			.unwrap();
		assert_eq!(listed[0].status, RequestStatus::Expired);

		// Repeated reads agree; the stored row is untouched.
		let listed_again = lifecycle
			.list_for_wallet(payer, RequestDirection::Incoming)
			.await
			.unwrap();
		assert_eq!(listed_again[0].status, RequestStatus::Expired);
		let stored: PaymentRequest = storage
			.retrieve(namespaces::PAYMENT_REQUESTS, &row.id)
			.await
			.unwrap();
		assert_eq!(stored.status, RequestStatus::Pending);
	}

	#[tokio::test]
	async fn expired_pair_does_not_block_a_new_request() {
		let (storage, lifecycle) = lifecycle();
		let (payer, recipient) = wallets();
		let token = Address::repeat_byte(0x03);

		let row = PaymentRequest {
			id: "expired-2".to_string(),
			payer,
			recipient,
			token,
			amount: "10.000000".to_string(),
			memo: None,
			status: RequestStatus::Pending,
			created_at: 1_000,
			expires_at: 2_000,
		};
		storage
			.store(namespaces::PAYMENT_REQUESTS, &row.id, &row)
			.await
			.unwrap();
		storage
			.store(
				namespaces::REQUEST_PAIRS,
				&request_pair_key(payer, recipient),
				&RequestPairIndex {
					request_id: row.id.clone(),
				},
			)
			.await
			.unwrap();

		let created = lifecycle
			.create_or_remind(payer, recipient, token, U256::from(7u64), None)
			.await
			.unwrap();
		assert!(!created.is_existing);
		assert_ne!(created.request.id, row.id);
	}

	#[tokio::test]
	async fn listing_filters_by_direction() {
		let (_storage, lifecycle) = lifecycle();
		let (payer, recipient) = wallets();
		let token = Address::repeat_byte(0x03);

		lifecycle
			.create_or_remind(payer, recipient, token, U256::from(30u64), None)
			.await
			.unwrap();

		let incoming = lifecycle
			.list_for_wallet(payer, RequestDirection::Incoming)
			.await
			.unwrap();
		assert_eq!(incoming.len(), 1);
		assert!(lifecycle
			.list_for_wallet(payer, RequestDirection::Outgoing)
			.await
			.unwrap()
			.is_empty());

		let owed = lifecycle
			.list_for_wallet(recipient, RequestDirection::Outgoing)
			.await
			.unwrap();
		assert_eq!(owed.len(), 1);
	}

	#[tokio::test]
	async fn rejects_self_billing_and_zero_amounts() {
		let (_storage, lifecycle) = lifecycle();
		let (payer, recipient) = wallets();
		let token = Address::repeat_byte(0x03);

		assert!(lifecycle
			.create_or_remind(payer, payer, token, U256::from(1u64), None)
			.await
			.is_err());
		assert!(lifecycle
			.create_or_remind(payer, recipient, token, U256::ZERO, None)
			.await
			.is_err());
	}
}

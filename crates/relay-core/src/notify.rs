//! Notification seam for accounting side effects.
//!
//! Delivery mechanics (push, email) are out of scope; the shipped
//! implementation emits structured tracing events enriched with profile
//! display names. Every call is fire-and-forget: notifier failures must
//! never affect the parent operation, so the interface is infallible.

use alloy::primitives::Address;
use async_trait::async_trait;
use relay_storage::StorageService;
use relay_types::records::namespaces;
use relay_types::{Expense, PaymentRequest, UserProfile};
use std::sync::Arc;

/// Trait for notification sinks.
#[async_trait]
pub trait NotifierInterface: Send + Sync {
	/// A new payment request was created for a payer.
	async fn payment_request_created(&self, request: &PaymentRequest);

	/// A pending request for the pair already existed; nudge the payer.
	async fn payment_request_reminder(&self, request: &PaymentRequest);

	/// A circle split ran after a settled payment or purchase.
	async fn circle_split_completed(&self, circle_name: &str, expense: &Expense, billed: u32);
}

/// Notifier that writes structured log events.
pub struct LogNotifier {
	storage: Arc<StorageService>,
}

impl LogNotifier {
	/// Creates a notifier reading display names from stored profiles.
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	async fn display_name(&self, wallet: Address) -> String {
		let id = format!("{:#x}", wallet);
		match self
			.storage
			.retrieve::<UserProfile>(namespaces::PROFILES, &id)
			.await
		{
			Ok(profile) => profile.display_name,
			Err(_) => id,
		}
	}
}

#[async_trait]
impl NotifierInterface for LogNotifier {
	async fn payment_request_created(&self, request: &PaymentRequest) {
		let payer = self.display_name(request.payer).await;
		let recipient = self.display_name(request.recipient).await;
		tracing::info!(
			request_id = %request.id,
			payer = %payer,
			recipient = %recipient,
			amount = %request.amount,
			"payment request created"
		);
	}

	async fn payment_request_reminder(&self, request: &PaymentRequest) {
		let payer = self.display_name(request.payer).await;
		tracing::info!(
			request_id = %request.id,
			payer = %payer,
			amount = %request.amount,
			"payment request reminder"
		);
	}

	async fn circle_split_completed(&self, circle_name: &str, expense: &Expense, billed: u32) {
		let creator = self.display_name(expense.creator_wallet).await;
		tracing::info!(
			circle = %circle_name,
			expense_id = %expense.id,
			creator = %creator,
			total = %expense.total_amount,
			billed,
			"circle split completed"
		);
	}
}

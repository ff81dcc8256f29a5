//! Circle split engine.
//!
//! After a payment or credit purchase settles on-chain, the payer's
//! active circle (if any) splits the amount equally across payer and
//! members. The on-chain transfer has already succeeded by the time this
//! runs, so every failure here is caught, logged, and swallowed: a split
//! can be missing, but a settled payment is never rolled back.

use crate::circles::CircleDirectory;
use crate::notify::NotifierInterface;
use crate::requests::PaymentRequestLifecycle;
use crate::RelayError;
use alloy::primitives::{Address, U256};
use relay_storage::StorageService;
use relay_types::records::namespaces;
use relay_types::{
	current_timestamp, display_amount, CircleSplitDto, Expense, ExpenseParticipant, ExpenseStatus,
};
use std::sync::Arc;

/// Which settled operation triggered the split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementKind {
	/// A relayed token payment: members are billed their share via
	/// payment requests.
	Payment,
	/// A credit purchase: the expense is recorded but no requests are
	/// created.
	CreditPurchase,
}

/// Distributes settled amounts across the payer's active circle.
pub struct CircleSplitEngine {
	storage: Arc<StorageService>,
	circles: CircleDirectory,
	requests: Arc<PaymentRequestLifecycle>,
	notifier: Arc<dyn NotifierInterface>,
}

impl CircleSplitEngine {
	/// Creates the split engine.
	pub fn new(
		storage: Arc<StorageService>,
		circles: CircleDirectory,
		requests: Arc<PaymentRequestLifecycle>,
		notifier: Arc<dyn NotifierInterface>,
	) -> Self {
		Self {
			storage,
			circles,
			requests,
			notifier,
		}
	}

	/// Runs the split; never fails. Returns None when the payer has no
	/// active circle, the circle has no members, or the split errored.
	pub async fn run(
		&self,
		payer: Address,
		token: Address,
		amount: U256,
		kind: SettlementKind,
	) -> Option<CircleSplitDto> {
		match self.try_run(payer, token, amount, kind).await {
			Ok(outcome) => outcome,
			Err(e) => {
				tracing::warn!(
					payer = %payer,
					amount = %amount,
					error = %e,
					"circle split failed; the settled payment is unaffected"
				);
				None
			}
		}
	}

	async fn try_run(
		&self,
		payer: Address,
		token: Address,
		amount: U256,
		kind: SettlementKind,
	) -> Result<Option<CircleSplitDto>, RelayError> {
		let Some(circle) = self.circles.active_for(payer).await? else {
			return Ok(None);
		};
		if circle.members.is_empty() {
			return Ok(None);
		}

		// Equal split across payer + members, floored in base units.
		// The remainder stays with the payer; it is never redistributed.
		let share = amount / U256::from(circle.members.len() as u64 + 1);

		let mut participants = Vec::with_capacity(circle.members.len() + 1);
		participants.push(ExpenseParticipant {
			wallet: payer,
			share_amount: share,
			is_creator: true,
		});
		for member in &circle.members {
			participants.push(ExpenseParticipant {
				wallet: *member,
				share_amount: share,
				is_creator: false,
			});
		}

		let expense = Expense {
			id: uuid::Uuid::new_v4().to_string(),
			creator_wallet: payer,
			description: match kind {
				SettlementKind::Payment => format!("Split payment via {}", circle.name),
				SettlementKind::CreditPurchase => {
					format!("Split credit purchase via {}", circle.name)
				}
			},
			total_amount: amount,
			token,
			status: ExpenseStatus::Active,
			participants,
			created_at: current_timestamp(),
		};
		// Expense and participants persist in a single write; there is no
		// window where an expense row exists without its participants.
		self.storage
			.store(namespaces::EXPENSES, &expense.id, &expense)
			.await?;

		let mut billed = 0u32;
		if kind == SettlementKind::Payment {
			for member in &circle.members {
				// A member that is also the payer owes nothing.
				if *member == payer {
					continue;
				}
				match self
					.requests
					.create_or_remind(
						*member,
						payer,
						token,
						share,
						Some(expense.description.clone()),
					)
					.await
				{
					Ok(_) => billed += 1,
					Err(e) => {
						tracing::warn!(
							member = %member,
							error = %e,
							"failed to bill circle member"
						);
					}
				}
			}
		} else {
			billed = circle.members.len() as u32;
		}

		self.notifier
			.circle_split_completed(&circle.name, &expense, billed)
			.await;

		Ok(Some(CircleSplitDto {
			expense_id: expense.id,
			members_notified: billed,
			split_amount: display_amount(share),
		}))
	}
}

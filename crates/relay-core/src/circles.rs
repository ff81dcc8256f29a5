//! Circle lookup and maintenance.
//!
//! A circle is a creator's named group of collaborator wallets. The one
//! invariant enforced here: a creator has at most one active circle, so
//! activating a circle deactivates every other circle of the same
//! creator.

use crate::RelayError;
use alloy::primitives::Address;
use relay_storage::StorageService;
use relay_types::records::namespaces;
use relay_types::{current_timestamp, Circle};
use std::sync::Arc;

/// Access to circle rows.
#[derive(Clone)]
pub struct CircleDirectory {
	storage: Arc<StorageService>,
}

impl CircleDirectory {
	/// Creates a directory over the given storage.
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Creates a circle. When `activate` is set, it becomes the
	/// creator's single active circle.
	pub async fn create(
		&self,
		creator: Address,
		name: &str,
		members: Vec<Address>,
		activate: bool,
	) -> Result<Circle, RelayError> {
		if name.trim().is_empty() {
			return Err(RelayError::Validation("circle name must not be empty".into()));
		}
		if activate {
			self.deactivate_all(creator).await?;
		}
		let circle = Circle {
			id: uuid::Uuid::new_v4().to_string(),
			name: name.trim().to_string(),
			creator_wallet: creator,
			is_active: activate,
			members,
			created_at: current_timestamp(),
		};
		self.storage
			.store(namespaces::CIRCLES, &circle.id, &circle)
			.await?;
		Ok(circle)
	}

	/// Makes the circle its creator's single active circle.
	pub async fn activate(&self, circle_id: &str) -> Result<Circle, RelayError> {
		let mut circle: Circle = self
			.storage
			.retrieve(namespaces::CIRCLES, circle_id)
			.await?;
		self.deactivate_all(circle.creator_wallet).await?;
		circle.is_active = true;
		self.storage
			.update(namespaces::CIRCLES, &circle.id, &circle)
			.await?;
		Ok(circle)
	}

	/// The creator's active circle, if any.
	pub async fn active_for(&self, creator: Address) -> Result<Option<Circle>, RelayError> {
		let circles: Vec<Circle> = self.storage.list(namespaces::CIRCLES).await?;
		Ok(circles
			.into_iter()
			.find(|c| c.creator_wallet == creator && c.is_active))
	}

	async fn deactivate_all(&self, creator: Address) -> Result<(), RelayError> {
		let circles: Vec<Circle> = self.storage.list(namespaces::CIRCLES).await?;
		for mut circle in circles {
			if circle.creator_wallet == creator && circle.is_active {
				circle.is_active = false;
				self.storage
					.update(namespaces::CIRCLES, &circle.id, &circle)
					.await?;
			}
		}
		Ok(())
	}
}

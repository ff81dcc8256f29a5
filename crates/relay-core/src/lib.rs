//! Core engine for the tap relay.
//!
//! Wires the authorization builder, chain readers, executor, split
//! engine, and request lifecycle into the operations the HTTP layer
//! exposes. The on-chain outcome of a relay is authoritative: accounting
//! side effects (request completion, circle splits, notifications) run
//! after settlement with local error containment and never change the
//! response status.

use alloy::primitives::Address;
use relay_config::Config;
use relay_delivery::{DeliveryError, DeliveryService};
use relay_storage::{StorageError, StorageService};
use relay_types::{
	ApiError, AuthError, AuthorizationBuilder, BatchPaymentItem, CircleSplitDto,
	CreatePaymentRequestBody, CreatePaymentRequestResponse, ListPaymentRequestsResponse,
	PaymentAuth, PaymentRequestDto, RegisterChipRequest, RegisterChipResponse, RelayBatchRequest,
	RelayBatchResponse, RelayCreditRequest, RelayCreditResponse, RelayPaymentRequest,
	RelayPaymentResponse, RequestDirection,
};
use std::sync::Arc;
use thiserror::Error;

/// Circle lookup and maintenance.
pub mod circles;
/// Relay executor: single and batched settlement.
pub mod executor;
/// Nonce oracle for replay protection.
pub mod nonce;
/// Notification seam.
pub mod notify;
/// Chip registry resolution.
pub mod registry;
/// Payment request lifecycle.
pub mod requests;
/// Circle split engine.
pub mod split;
/// Two-phase chip signing protocol.
pub mod tap;
/// Wire-to-domain validation.
pub mod validate;

pub use circles::CircleDirectory;
pub use executor::{translate_revert, RelayExecutor, Settlement};
pub use nonce::NonceOracle;
pub use notify::{LogNotifier, NotifierInterface};
pub use registry::RegistryResolver;
pub use requests::PaymentRequestLifecycle;
pub use split::{CircleSplitEngine, SettlementKind};
pub use tap::{ChipError, ChipSigner, TapFlow};

/// Errors surfaced by relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
	/// Malformed or missing input (HTTP 400).
	#[error("{0}")]
	Validation(String),
	/// The service is missing required configuration (HTTP 500).
	#[error("{0}")]
	Configuration(String),
	/// The chain rejected the operation; message already translated
	/// (HTTP 500).
	#[error("{0}")]
	Rejected(String),
	/// Network or RPC trouble (HTTP 503).
	#[error("Network error: {0}")]
	Network(String),
	/// A tapped chip has no registered owner wallet.
	#[error("chip not registered")]
	ChipNotRegistered,
	/// Storage backend failure.
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
	/// Chip hardware failure during a tap.
	#[error(transparent)]
	Chip(#[from] ChipError),
}

impl From<DeliveryError> for RelayError {
	fn from(error: DeliveryError) -> Self {
		match error {
			DeliveryError::Reverted(detail) => RelayError::Rejected(translate_revert(&detail)),
			DeliveryError::InvalidKey(message) => RelayError::Configuration(message),
			DeliveryError::Network(message) => RelayError::Network(message),
		}
	}
}

impl From<AuthError> for RelayError {
	fn from(error: AuthError) -> Self {
		RelayError::Validation(error.to_string())
	}
}

impl From<RelayError> for ApiError {
	fn from(error: RelayError) -> Self {
		let message = error.to_string();
		match error {
			RelayError::Validation(_) => ApiError::BadRequest {
				error_type: "validation".to_string(),
				message,
			},
			RelayError::ChipNotRegistered => ApiError::BadRequest {
				error_type: "chip_not_registered".to_string(),
				message,
			},
			RelayError::Configuration(_) => ApiError::InternalServerError {
				error_type: "configuration".to_string(),
				message,
			},
			RelayError::Rejected(_) => ApiError::InternalServerError {
				error_type: "onchain_rejection".to_string(),
				message,
			},
			RelayError::Network(_) => ApiError::ServiceUnavailable {
				error_type: "network".to_string(),
				message,
			},
			RelayError::Storage(_) | RelayError::Chip(_) => ApiError::InternalServerError {
				error_type: "internal".to_string(),
				message,
			},
		}
	}
}

/// The relay engine behind every HTTP endpoint.
pub struct RelayEngine {
	config: Config,
	delivery: Option<Arc<DeliveryService>>,
	builder: AuthorizationBuilder,
	circles: CircleDirectory,
	requests: Arc<PaymentRequestLifecycle>,
	split: CircleSplitEngine,
}

impl RelayEngine {
	/// Wires the engine. `delivery` is None when no relayer key is
	/// configured; relay endpoints then fail with a configuration error
	/// while accounting endpoints keep working.
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		delivery: Option<Arc<DeliveryService>>,
		notifier: Arc<dyn NotifierInterface>,
	) -> Self {
		let builder = AuthorizationBuilder::new(&config.auth_domain());
		let circles = CircleDirectory::new(storage.clone());
		let requests = Arc::new(PaymentRequestLifecycle::new(
			storage.clone(),
			notifier.clone(),
			config.relay.request_ttl_seconds,
		));
		let split = CircleSplitEngine::new(
			storage,
			circles.clone(),
			requests.clone(),
			notifier,
		);
		Self {
			config,
			delivery,
			builder,
			circles,
			requests,
			split,
		}
	}

	/// The configuration the engine was built with.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// The authorization builder bound to the configured domain.
	pub fn builder(&self) -> &AuthorizationBuilder {
		&self.builder
	}

	/// Circle directory, exposed for administrative tooling and tests.
	pub fn circles(&self) -> &CircleDirectory {
		&self.circles
	}

	fn delivery(&self) -> Result<&Arc<DeliveryService>, RelayError> {
		self.delivery.as_ref().ok_or_else(|| {
			RelayError::Configuration("relayer signing key is not configured".to_string())
		})
	}

	fn executor(&self) -> Result<RelayExecutor, RelayError> {
		Ok(RelayExecutor::new(
			self.delivery()?.clone(),
			self.config.network.multicall_address,
		))
	}

	fn settlement_target(&self, override_address: Option<&str>) -> Result<Address, RelayError> {
		match override_address {
			Some(value) => validate::parse_address_field(value, "contractAddress"),
			None => Ok(self.config.network.settlement_address),
		}
	}

	/// Relays a single signed payment authorization.
	///
	/// On success the matching pending payment request (if any) is
	/// completed and the payer's circle split runs; both are best-effort
	/// and never affect the settled payment.
	pub async fn relay_payment(
		&self,
		request: RelayPaymentRequest,
	) -> Result<RelayPaymentResponse, RelayError> {
		let auth = validate::parse_payment_auth(&request.auth)?;
		let signature = validate::parse_signature(&request.signature)?;
		let target = self.settlement_target(request.contract_address.as_deref())?;

		let settlement = self
			.executor()?
			.execute_payment(target, &auth, &signature)
			.await?;

		if let Err(e) = self
			.requests
			.complete_matching(auth.payer, auth.recipient)
			.await
		{
			tracing::warn!(error = %e, "failed to complete matching payment request");
		}
		let circle_split = self
			.split
			.run(auth.payer, auth.token, auth.amount, SettlementKind::Payment)
			.await;

		Ok(RelayPaymentResponse {
			success: true,
			tx_hash: settlement.tx_hash.to_string(),
			block_number: settlement.block_number,
			gas_used: settlement.gas_used,
			circle_split,
		})
	}

	/// Relays a batch of signed payments atomically.
	pub async fn relay_batch(
		&self,
		request: RelayBatchRequest,
	) -> Result<RelayBatchResponse, RelayError> {
		if request.payments.is_empty() {
			return Err(RelayError::Validation(
				"payments must not be empty".to_string(),
			));
		}
		let payments = request
			.payments
			.iter()
			.map(parse_batch_item)
			.collect::<Result<Vec<_>, _>>()?;
		let target = self.settlement_target(request.contract_address.as_deref())?;

		let settlement = self.executor()?.execute_batch(target, &payments).await?;

		Ok(RelayBatchResponse {
			success: true,
			tx_hash: settlement.tx_hash.to_string(),
			block_number: settlement.block_number,
			gas_used: settlement.gas_used,
			payments_count: payments.len(),
		})
	}

	/// Relays a signed credit purchase.
	pub async fn relay_credit_purchase(
		&self,
		request: RelayCreditRequest,
	) -> Result<RelayCreditResponse, RelayError> {
		let purchase = validate::parse_credit_purchase(&request.purchase)?;
		let signature = validate::parse_signature(&request.signature)?;
		let target = match request.contract_address.as_deref() {
			Some(value) => validate::parse_address_field(value, "contractAddress")?,
			None => self.config.network.credit_target(),
		};

		let settlement = self
			.executor()?
			.purchase_credits(target, &purchase, &signature)
			.await?;

		// Credits mint 1:1 against the USDC base amount.
		let credits_minted = purchase.usdcAmount.to_string();
		let usdc = self.config.network.usdc_address.unwrap_or(Address::ZERO);
		let circle_split: Option<CircleSplitDto> = self
			.split
			.run(
				purchase.buyer,
				usdc,
				purchase.usdcAmount,
				SettlementKind::CreditPurchase,
			)
			.await;

		Ok(RelayCreditResponse {
			success: true,
			tx_hash: settlement.tx_hash.to_string(),
			block_number: settlement.block_number,
			gas_used: settlement.gas_used,
			credits_minted,
			circle_split,
		})
	}

	/// Relays a signed chip registration after the uniqueness check.
	pub async fn register_chip(
		&self,
		request: RegisterChipRequest,
	) -> Result<RegisterChipResponse, RelayError> {
		let registration = validate::parse_chip_registration(&request.registration)?;
		let signature = validate::parse_signature(&request.signature)?;

		let registry = RegistryResolver::new(
			self.delivery()?.clone(),
			self.config.network.registry_address,
		);
		registry
			.ensure_unregistered(registration.chipAddress)
			.await?;

		let settlement = self
			.executor()?
			.register_chip(
				self.config.network.registry_address,
				&registration,
				&signature,
			)
			.await?;

		Ok(RegisterChipResponse {
			success: true,
			tx_hash: settlement.tx_hash.to_string(),
			block_number: settlement.block_number,
			gas_used: settlement.gas_used,
		})
	}

	/// Creates a payment request, or reminds the payer when a pending
	/// one exists for the pair.
	pub async fn create_payment_request(
		&self,
		body: CreatePaymentRequestBody,
	) -> Result<CreatePaymentRequestResponse, RelayError> {
		let payer = validate::parse_address_field(&body.payer, "payer")?;
		let recipient = validate::parse_address_field(&body.recipient, "recipient")?;
		let token = validate::parse_address_field(&body.token, "token")?;

		let created = self
			.requests
			.create_or_remind(payer, recipient, token, body.amount, body.memo)
			.await?;

		Ok(CreatePaymentRequestResponse {
			settle_url: self.settle_url(&created.request.id),
			request_id: created.request.id,
			is_existing: created.is_existing,
		})
	}

	/// Lists a wallet's payment requests with derived statuses.
	pub async fn list_payment_requests(
		&self,
		wallet: &str,
		direction: Option<&str>,
	) -> Result<ListPaymentRequestsResponse, RelayError> {
		let wallet = validate::parse_address_field(wallet, "wallet")?;
		let direction = match direction {
			None => RequestDirection::Incoming,
			Some(value) => RequestDirection::parse(value).ok_or_else(|| {
				RelayError::Validation(format!(
					"type: expected 'incoming' or 'outgoing', got '{}'",
					value
				))
			})?,
		};

		let rows = self.requests.list_for_wallet(wallet, direction).await?;
		let requests = rows
			.into_iter()
			.map(|row| PaymentRequestDto {
				id: row.id,
				payer: format!("{:#x}", row.payer),
				recipient: format!("{:#x}", row.recipient),
				token: format!("{:#x}", row.token),
				amount: row.amount,
				memo: row.memo,
				status: row.status.as_str().to_string(),
				created_at: row.created_at,
				expires_at: row.expires_at,
			})
			.collect();
		Ok(ListPaymentRequestsResponse { requests })
	}

	/// Latest block seen by the delivery provider; None when the
	/// provider is unconfigured or unreachable.
	pub async fn latest_block(&self) -> Option<u64> {
		let delivery = self.delivery.as_ref()?;
		delivery.get_block_number().await.ok()
	}

	fn settle_url(&self, request_id: &str) -> String {
		format!(
			"{}/settle/{}",
			self.config.relay.public_base_url.trim_end_matches('/'),
			request_id
		)
	}
}

fn parse_batch_item(item: &BatchPaymentItem) -> Result<(PaymentAuth, Vec<u8>), RelayError> {
	Ok((
		validate::parse_payment_auth(&item.auth)?,
		validate::parse_signature(&item.signature)?,
	))
}

//! API types for the relay HTTP endpoints.
//!
//! Wire DTOs keep addresses as strings and bigints as decimal strings so
//! malformed input surfaces as a 400 with a useful message instead of a
//! serde rejection deep in the framework.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment authorization as it travels over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAuthDto {
	/// Wallet whose nonce and signature authorize the transfer.
	pub payer: String,
	/// Transfer recipient.
	pub recipient: String,
	/// ERC-20 token address.
	pub token: String,
	/// Amount in token base units.
	#[serde(with = "u256_serde")]
	pub amount: U256,
	/// Per-payer replay counter.
	#[serde(with = "u256_serde")]
	pub nonce: U256,
	/// Unix deadline after which the authorization is void.
	#[serde(with = "u256_serde")]
	pub deadline: U256,
}

/// Credit purchase authorization as it travels over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPurchaseDto {
	/// Wallet buying credits.
	pub buyer: String,
	/// USDC amount in base units; credits mint 1:1 against it.
	#[serde(with = "u256_serde")]
	pub usdc_amount: U256,
	/// Per-payer replay counter.
	#[serde(with = "u256_serde")]
	pub nonce: U256,
	/// Unix deadline after which the authorization is void.
	#[serde(with = "u256_serde")]
	pub deadline: U256,
}

/// Chip registration as it travels over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChipRegistrationDto {
	/// Wallet claiming the chip.
	pub owner: String,
	/// The chip's ephemeral address.
	pub chip_address: String,
}

/// `POST /relay/payment` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayPaymentRequest {
	/// The signed authorization.
	pub auth: PaymentAuthDto,
	/// 65-byte hex signature over the authorization digest.
	pub signature: String,
	/// Optional settlement contract override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contract_address: Option<String>,
}

/// Circle split summary embedded in relay responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleSplitDto {
	/// Id of the expense the split created.
	pub expense_id: String,
	/// Number of circle members billed or included.
	pub members_notified: u32,
	/// Each member's share, six fractional digits.
	pub split_amount: String,
}

/// `POST /relay/payment` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayPaymentResponse {
	/// Always true on a 2xx response.
	pub success: bool,
	/// Hash of the settled transaction.
	pub tx_hash: String,
	/// Block the transaction was included in.
	pub block_number: u64,
	/// Gas the transaction consumed.
	pub gas_used: u64,
	/// Split summary, or null when no split ran.
	pub circle_split: Option<CircleSplitDto>,
}

/// One entry of a batch payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPaymentItem {
	/// The signed authorization.
	pub auth: PaymentAuthDto,
	/// 65-byte hex signature over the authorization digest.
	pub signature: String,
}

/// `POST /relay/batch-payment` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayBatchRequest {
	/// Payments settled atomically: all apply or none do.
	pub payments: Vec<BatchPaymentItem>,
	/// Optional settlement contract override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contract_address: Option<String>,
}

/// `POST /relay/batch-payment` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayBatchResponse {
	/// Always true on a 2xx response.
	pub success: bool,
	/// Hash of the settled multicall transaction.
	pub tx_hash: String,
	/// Block the transaction was included in.
	pub block_number: u64,
	/// Gas the transaction consumed.
	pub gas_used: u64,
	/// Number of payments settled in the batch.
	pub payments_count: usize,
}

/// `POST /relay/credit-purchase` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayCreditRequest {
	/// The signed purchase authorization.
	pub purchase: CreditPurchaseDto,
	/// 65-byte hex signature over the purchase digest.
	pub signature: String,
	/// Optional credit contract override.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contract_address: Option<String>,
}

/// `POST /relay/credit-purchase` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayCreditResponse {
	/// Always true on a 2xx response.
	pub success: bool,
	/// Hash of the settled transaction.
	pub tx_hash: String,
	/// Block the transaction was included in.
	pub block_number: u64,
	/// Gas the transaction consumed.
	pub gas_used: u64,
	/// Credits minted, as a decimal string.
	pub credits_minted: String,
	/// Split summary, or null when no split ran.
	pub circle_split: Option<CircleSplitDto>,
}

/// `POST /relay/register-chip` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterChipRequest {
	/// The signed registration.
	pub registration: ChipRegistrationDto,
	/// 65-byte hex signature over the registration digest.
	pub signature: String,
}

/// `POST /relay/register-chip` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterChipResponse {
	/// Always true on a 2xx response.
	pub success: bool,
	/// Hash of the settled transaction.
	pub tx_hash: String,
	/// Block the transaction was included in.
	pub block_number: u64,
	/// Gas the transaction consumed.
	pub gas_used: u64,
}

/// `POST /payment-requests` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequestBody {
	/// Wallet being billed.
	pub payer: String,
	/// Wallet to be reimbursed.
	pub recipient: String,
	/// Token the request settles in.
	pub token: String,
	/// Amount in token base units.
	#[serde(with = "u256_serde")]
	pub amount: U256,
	/// Optional note shown to the payer.
	#[serde(default)]
	pub memo: Option<String>,
}

/// `POST /payment-requests` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequestResponse {
	/// Id of the pending request for the pair (new or existing).
	pub request_id: String,
	/// Link the payer can follow to settle the request.
	pub settle_url: String,
	/// True when a pending request already existed for the pair and a
	/// reminder was sent instead of creating a duplicate.
	pub is_existing: bool,
}

/// One payment request as returned by the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestDto {
	/// Request id.
	pub id: String,
	/// Wallet being billed.
	pub payer: String,
	/// Wallet to be reimbursed.
	pub recipient: String,
	/// Token the request settles in.
	pub token: String,
	/// Requested amount, six fractional digits.
	pub amount: String,
	/// Optional note.
	pub memo: Option<String>,
	/// Status with expiry derived at read time.
	pub status: String,
	/// Creation time (Unix seconds).
	pub created_at: u64,
	/// Expiry time (Unix seconds).
	pub expires_at: u64,
}

/// `GET /payment-requests` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPaymentRequestsResponse {
	/// Requests matching the wallet and direction filters.
	pub requests: Vec<PaymentRequestDto>,
}

/// Direction filter for request listings, from the wallet's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDirection {
	/// Requests the wallet owes (wallet is the payer).
	Incoming,
	/// Requests owed to the wallet (wallet is the recipient).
	Outgoing,
}

impl RequestDirection {
	/// Parses the `type` query parameter.
	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"incoming" => Some(RequestDirection::Incoming),
			"outgoing" => Some(RequestDirection::Outgoing),
			_ => None,
		}
	}
}

/// JSON error body returned for failed requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code.
	pub error: String,
	/// Human-readable description.
	pub message: String,
}

/// Structured API error with HTTP status mapping.
#[derive(Debug)]
pub enum ApiError {
	/// Bad request with validation errors (400).
	BadRequest { error_type: String, message: String },
	/// Service unavailable: network or upstream trouble (503).
	ServiceUnavailable { error_type: String, message: String },
	/// Internal server error: configuration or on-chain rejection (500).
	InternalServerError { error_type: String, message: String },
}

impl ApiError {
	/// Shorthand for a validation failure.
	pub fn bad_request(message: impl Into<String>) -> Self {
		ApiError::BadRequest {
			error_type: "validation".to_string(),
			message: message.into(),
		}
	}

	/// HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ApiError::BadRequest { .. } => 400,
			ApiError::ServiceUnavailable { .. } => 503,
			ApiError::InternalServerError { .. } => 500,
		}
	}

	/// Converts to the JSON error body.
	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			ApiError::BadRequest {
				error_type,
				message,
			}
			| ApiError::ServiceUnavailable {
				error_type,
				message,
			}
			| ApiError::InternalServerError {
				error_type,
				message,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
			},
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ApiError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			ApiError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			}
			ApiError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			}
		}
	}
}

impl std::error::Error for ApiError {}

impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = match self.status_code() {
			400 => StatusCode::BAD_REQUEST,
			503 => StatusCode::SERVICE_UNAVAILABLE,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		};

		(status, Json(self.to_error_response())).into_response()
	}
}

/// Serde module for decimal-string U256 serialization.
pub mod u256_serde {
	use alloy::primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.to_string().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		U256::from_str_radix(&s, 10).map_err(D::Error::custom)
	}
}

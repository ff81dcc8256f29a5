//! Endpoint handlers.
//!
//! Thin translation between HTTP and the engine: deserialize, delegate,
//! map `RelayError` onto the status taxonomy. Bodies are decoded from
//! JSON manually so a missing or malformed field is a 400 from the
//! validation taxonomy rather than a framework rejection.

use crate::server::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use relay_types::{
	ApiError, CreatePaymentRequestBody, CreatePaymentRequestResponse, ListPaymentRequestsResponse,
	RegisterChipRequest, RegisterChipResponse, RelayBatchRequest, RelayBatchResponse,
	RelayCreditRequest, RelayCreditResponse, RelayPaymentRequest, RelayPaymentResponse,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
	serde_json::from_value(body)
		.map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e)))
}

/// Handles `POST /relay/payment`.
pub async fn relay_payment(
	State(state): State<AppState>,
	Json(body): Json<Value>,
) -> Result<Json<RelayPaymentResponse>, ApiError> {
	let request: RelayPaymentRequest = decode(body)?;
	match state.engine.relay_payment(request).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!(error = %e, "payment relay failed");
			Err(ApiError::from(e))
		}
	}
}

/// Handles `POST /relay/batch-payment`.
pub async fn relay_batch_payment(
	State(state): State<AppState>,
	Json(body): Json<Value>,
) -> Result<Json<RelayBatchResponse>, ApiError> {
	let request: RelayBatchRequest = decode(body)?;
	match state.engine.relay_batch(request).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!(error = %e, "batch relay failed");
			Err(ApiError::from(e))
		}
	}
}

/// Handles `POST /relay/credit-purchase`.
pub async fn relay_credit_purchase(
	State(state): State<AppState>,
	Json(body): Json<Value>,
) -> Result<Json<RelayCreditResponse>, ApiError> {
	let request: RelayCreditRequest = decode(body)?;
	match state.engine.relay_credit_purchase(request).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!(error = %e, "credit purchase relay failed");
			Err(ApiError::from(e))
		}
	}
}

/// Handles `POST /relay/register-chip`.
pub async fn register_chip(
	State(state): State<AppState>,
	Json(body): Json<Value>,
) -> Result<Json<RegisterChipResponse>, ApiError> {
	let request: RegisterChipRequest = decode(body)?;
	match state.engine.register_chip(request).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!(error = %e, "chip registration failed");
			Err(ApiError::from(e))
		}
	}
}

/// Handles `POST /payment-requests`.
pub async fn create_payment_request(
	State(state): State<AppState>,
	Json(body): Json<Value>,
) -> Result<Json<CreatePaymentRequestResponse>, ApiError> {
	let body: CreatePaymentRequestBody = decode(body)?;
	match state.engine.create_payment_request(body).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!(error = %e, "payment request creation failed");
			Err(ApiError::from(e))
		}
	}
}

/// Query parameters for `GET /payment-requests`.
#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
	/// Wallet the listing is scoped to.
	pub wallet: Option<String>,
	/// "incoming" (wallet owes) or "outgoing" (wallet is owed).
	#[serde(rename = "type")]
	pub direction: Option<String>,
}

/// Handles `GET /payment-requests`.
pub async fn list_payment_requests(
	State(state): State<AppState>,
	Query(query): Query<ListRequestsQuery>,
) -> Result<Json<ListPaymentRequestsResponse>, ApiError> {
	let Some(wallet) = query.wallet.as_deref() else {
		return Err(ApiError::bad_request("wallet query parameter is required"));
	};
	match state
		.engine
		.list_payment_requests(wallet, query.direction.as_deref())
		.await
	{
		Ok(response) => Ok(Json(response)),
		Err(e) => Err(ApiError::from(e)),
	}
}

/// Handles `GET /health`.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
	match state.engine.latest_block().await {
		Some(block) => (
			StatusCode::OK,
			Json(serde_json::json!({
				"status": "ok",
				"latestBlock": block,
			})),
		),
		None => (
			StatusCode::SERVICE_UNAVAILABLE,
			Json(serde_json::json!({
				"status": "degraded",
			})),
		),
	}
}

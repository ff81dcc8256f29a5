//! HTTP server for the relay API.

use crate::handlers;
use axum::{
	routing::{get, post},
	Router,
};
use relay_config::ApiConfig;
use relay_core::RelayEngine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// The relay engine processing requests.
	pub engine: Arc<RelayEngine>,
}

/// Builds the application router.
pub fn router(engine: Arc<RelayEngine>) -> Router {
	Router::new()
		.route("/relay/payment", post(handlers::relay_payment))
		.route("/relay/batch-payment", post(handlers::relay_batch_payment))
		.route(
			"/relay/credit-purchase",
			post(handlers::relay_credit_purchase),
		)
		.route("/relay/register-chip", post(handlers::register_chip))
		.route(
			"/payment-requests",
			post(handlers::create_payment_request).get(handlers::list_payment_requests),
		)
		.route("/health", get(handlers::health))
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(AppState { engine })
}

/// Binds the listener and serves the API until shutdown.
pub async fn start_server(
	api_config: &ApiConfig,
	engine: Arc<RelayEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine);
	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;
	tracing::info!("relay API listening on {}", bind_address);
	axum::serve(listener, app).await?;
	Ok(())
}

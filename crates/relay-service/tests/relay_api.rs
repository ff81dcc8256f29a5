//! End-to-end tests for the relay API.
//!
//! The router runs against in-memory storage and a scripted delivery
//! fake that models the settlement contract's nonce counter, so the
//! replay-protection and atomic-batch properties can be observed from
//! the HTTP surface down.

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use alloy::sol_types::{SolCall, SolError, SolValue};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use relay_config::Config;
use relay_core::{LogNotifier, RelayEngine};
use relay_delivery::{DeliveryError, DeliveryInterface, DeliveryService};
use relay_storage::{MemoryStorage, StorageService};
use relay_types::{
	current_timestamp, AuthorizationBuilder, IChipRegistry, IMulticall3, ISettler, Transaction,
	TransactionReceipt,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const CONFIG: &str = r#"
[relay]
id = "tap-relay-test"
domain_name = "TapSettlement"

[network]
rpc_url = "http://localhost:8545"
chain_id = 84532
settlement_address = "0x4242424242424242424242424242424242424242"
registry_address = "0x5151515151515151515151515151515151515151"
multicall_address = "0xcA11bde05977b3631167028862bE2a173976CA11"

[storage]
backend = "memory"
"#;

/// Observable state of the fake chain.
#[derive(Default)]
struct FakeChain {
	/// Per-payer nonce counters, as the settlement contract keeps them.
	nonces: Mutex<HashMap<Address, U256>>,
	/// Chip address -> owner wallet, as the registry keeps them.
	owners: Mutex<HashMap<Address, Address>>,
	/// Every transaction that reached broadcast.
	submitted: Mutex<Vec<Transaction>>,
}

impl FakeChain {
	fn nonce_of(&self, payer: Address) -> U256 {
		self.nonces
			.lock()
			.unwrap()
			.get(&payer)
			.copied()
			.unwrap_or(U256::ZERO)
	}

	fn register(&self, chip: Address, owner: Address) {
		self.owners.lock().unwrap().insert(chip, owner);
	}

	fn submitted_count(&self) -> usize {
		self.submitted.lock().unwrap().len()
	}

	fn revert(error_name: [u8; 4]) -> DeliveryError {
		DeliveryError::Reverted(format!(
			"execution reverted: custom error 0x{}",
			hex::encode(error_name)
		))
	}

	fn check_payment(&self, auth: &relay_types::PaymentAuth) -> Result<(), DeliveryError> {
		if auth.deadline < U256::from(current_timestamp()) {
			return Err(Self::revert(ISettler::ExpiredSignature::SELECTOR));
		}
		if auth.nonce != self.nonce_of(auth.payer) {
			return Err(Self::revert(ISettler::InvalidNonce::SELECTOR));
		}
		Ok(())
	}

	/// Applies the state transition of successfully settled calldata.
	fn apply(&self, data: &[u8]) {
		let selector: [u8; 4] = data[..4].try_into().unwrap();
		let mut nonces = self.nonces.lock().unwrap();
		if selector == ISettler::executePaymentCall::SELECTOR {
			let call = ISettler::executePaymentCall::abi_decode(data).unwrap();
			let entry = nonces.entry(call.auth.payer).or_insert(U256::ZERO);
			*entry += U256::from(1u64);
		} else if selector == ISettler::purchaseCreditsCall::SELECTOR {
			let call = ISettler::purchaseCreditsCall::abi_decode(data).unwrap();
			let entry = nonces.entry(call.purchase.buyer).or_insert(U256::ZERO);
			*entry += U256::from(1u64);
		} else if selector == IMulticall3::aggregate3Call::SELECTOR {
			let call = IMulticall3::aggregate3Call::abi_decode(data).unwrap();
			drop(nonces);
			for inner in call.calls {
				self.apply(&inner.callData);
			}
		}
	}
}

struct FakeDelivery {
	chain: Arc<FakeChain>,
}

#[async_trait]
impl DeliveryInterface for FakeDelivery {
	async fn submit(&self, tx: Transaction) -> Result<B256, DeliveryError> {
		self.chain.apply(&tx.data);
		let hash = keccak256(&tx.data);
		self.chain.submitted.lock().unwrap().push(tx);
		Ok(hash)
	}

	async fn wait_for_confirmation(
		&self,
		hash: &B256,
		_confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		Ok(TransactionReceipt {
			hash: *hash,
			block_number: 4_242,
			gas_used: 21_000,
			success: true,
		})
	}

	async fn get_receipt(&self, hash: &B256) -> Result<TransactionReceipt, DeliveryError> {
		self.wait_for_confirmation(hash, 1).await
	}

	async fn call(&self, _to: Address, data: Vec<u8>) -> Result<Vec<u8>, DeliveryError> {
		let selector: [u8; 4] = data[..4].try_into().unwrap();
		if selector == ISettler::noncesCall::SELECTOR {
			let call = ISettler::noncesCall::abi_decode(&data).unwrap();
			return Ok(self.chain.nonce_of(call.payer).abi_encode());
		}
		if selector == IChipRegistry::ownerOfCall::SELECTOR {
			let call = IChipRegistry::ownerOfCall::abi_decode(&data).unwrap();
			let owner = self
				.chain
				.owners
				.lock()
				.unwrap()
				.get(&call.chipAddress)
				.copied()
				.unwrap_or(Address::ZERO);
			return Ok(owner.abi_encode());
		}
		if selector == ISettler::executePaymentCall::SELECTOR {
			let call = ISettler::executePaymentCall::abi_decode(&data).unwrap();
			self.chain.check_payment(&call.auth)?;
			return Ok(Vec::new());
		}
		if selector == ISettler::purchaseCreditsCall::SELECTOR {
			let call = ISettler::purchaseCreditsCall::abi_decode(&data).unwrap();
			if call.purchase.nonce != self.chain.nonce_of(call.purchase.buyer) {
				return Err(FakeChain::revert(ISettler::InvalidNonce::SELECTOR));
			}
			return Ok(Vec::new());
		}
		if selector == IMulticall3::aggregate3Call::SELECTOR {
			let call = IMulticall3::aggregate3Call::abi_decode(&data).unwrap();
			for inner in &call.calls {
				let inner_call =
					ISettler::executePaymentCall::abi_decode(&inner.callData).unwrap();
				self.chain.check_payment(&inner_call.auth)?;
			}
			return Ok(Vec::new());
		}
		if selector == IChipRegistry::registerChipCall::SELECTOR {
			return Ok(Vec::new());
		}
		Ok(Vec::new())
	}

	async fn has_code(&self, _address: Address) -> Result<bool, DeliveryError> {
		Ok(true)
	}

	async fn get_block_number(&self) -> Result<u64, DeliveryError> {
		Ok(4_242)
	}
}

struct TestApp {
	app: Router,
	chain: Arc<FakeChain>,
	engine: Arc<RelayEngine>,
	builder: AuthorizationBuilder,
}

fn test_app(with_relayer_key: bool) -> TestApp {
	let config = Config::from_toml_str(CONFIG).unwrap();
	let builder = AuthorizationBuilder::new(&config.auth_domain());
	let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
	let notifier = Arc::new(LogNotifier::new(storage.clone()));
	let chain = Arc::new(FakeChain::default());
	let delivery = with_relayer_key.then(|| {
		Arc::new(DeliveryService::new(
			Box::new(FakeDelivery {
				chain: chain.clone(),
			}),
			1,
		))
	});
	let engine = Arc::new(RelayEngine::new(config, storage, delivery, notifier));
	TestApp {
		app: relay_service::server::router(engine.clone()),
		chain,
		engine,
		builder,
	}
}

async fn request(
	app: &Router,
	method: &str,
	uri: &str,
	body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
	let request = match body {
		Some(body) => Request::builder()
			.method(method)
			.uri(uri)
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(body.to_string()))
			.unwrap(),
		None => Request::builder()
			.method(method)
			.uri(uri)
			.body(Body::empty())
			.unwrap(),
	};
	let response = app.clone().oneshot(request).await.unwrap();
	let status = response.status();
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	let json = if bytes.is_empty() {
		serde_json::Value::Null
	} else {
		serde_json::from_slice(&bytes).unwrap()
	};
	(status, json)
}

fn addr(byte: u8) -> Address {
	Address::repeat_byte(byte)
}

fn hex_addr(address: Address) -> String {
	format!("{:#x}", address)
}

const TOKEN: u8 = 0xee;
const RECIPIENT: u8 = 0x99;

/// Builds a signed /relay/payment body for the given payer key.
fn payment_body(
	builder: &AuthorizationBuilder,
	payer: &PrivateKeySigner,
	amount: u64,
	nonce: u64,
	deadline: U256,
) -> serde_json::Value {
	let auth = builder.payment(
		payer.address(),
		addr(RECIPIENT),
		addr(TOKEN),
		U256::from(amount),
		U256::from(nonce),
		deadline,
	);
	let signature = payer.sign_hash_sync(&builder.signing_hash(&auth)).unwrap();
	serde_json::json!({
		"auth": {
			"payer": hex_addr(auth.payer),
			"recipient": hex_addr(auth.recipient),
			"token": hex_addr(auth.token),
			"amount": auth.amount.to_string(),
			"nonce": auth.nonce.to_string(),
			"deadline": auth.deadline.to_string(),
		},
		"signature": format!("0x{}", hex::encode(signature.as_bytes())),
	})
}

fn far_deadline() -> U256 {
	U256::from(current_timestamp() + 3_600)
}

#[tokio::test]
async fn relay_payment_settles_and_increments_the_nonce() {
	let fixture = test_app(true);
	let payer = PrivateKeySigner::random();

	let body = payment_body(&fixture.builder, &payer, 100, 0, far_deadline());
	let (status, json) = request(&fixture.app, "POST", "/relay/payment", Some(body)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["success"], true);
	assert!(json["txHash"].as_str().unwrap().starts_with("0x"));
	assert_eq!(json["blockNumber"], 4_242);
	assert!(json["circleSplit"].is_null());
	assert_eq!(fixture.chain.nonce_of(payer.address()), U256::from(1u64));
}

#[tokio::test]
async fn replayed_authorization_is_rejected() {
	let fixture = test_app(true);
	let payer = PrivateKeySigner::random();

	let body = payment_body(&fixture.builder, &payer, 100, 0, far_deadline());
	let (status, _) = request(&fixture.app, "POST", "/relay/payment", Some(body.clone())).await;
	assert_eq!(status, StatusCode::OK);

	// Same signed authorization again: the nonce was consumed.
	let (status, json) = request(&fixture.app, "POST", "/relay/payment", Some(body)).await;
	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert!(json["message"]
		.as_str()
		.unwrap()
		.contains("already processed"));

	// Exactly one settlement reached the chain.
	assert_eq!(fixture.chain.submitted_count(), 1);
	assert_eq!(fixture.chain.nonce_of(payer.address()), U256::from(1u64));
}

#[tokio::test]
async fn expired_authorization_translates_to_guidance() {
	let fixture = test_app(true);
	let payer = PrivateKeySigner::random();

	let body = payment_body(&fixture.builder, &payer, 100, 0, U256::from(1u64));
	let (status, json) = request(&fixture.app, "POST", "/relay/payment", Some(body)).await;
	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert!(json["message"].as_str().unwrap().contains("expired"));
}

#[tokio::test]
async fn batch_with_one_bad_payment_applies_nothing() {
	let fixture = test_app(true);
	let alice = PrivateKeySigner::random();
	let bob = PrivateKeySigner::random();

	let good = payment_body(&fixture.builder, &alice, 50, 0, far_deadline());
	// Bob's nonce is 0 on the fake chain; 5 is out of order.
	let bad = payment_body(&fixture.builder, &bob, 75, 5, far_deadline());

	let body = serde_json::json!({
		"payments": [
			{ "auth": good["auth"], "signature": good["signature"] },
			{ "auth": bad["auth"], "signature": bad["signature"] },
		],
	});
	let (status, json) = request(&fixture.app, "POST", "/relay/batch-payment", Some(body)).await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert!(json["message"]
		.as_str()
		.unwrap()
		.contains("already processed"));
	// All-or-nothing: nothing was broadcast, no nonce moved.
	assert_eq!(fixture.chain.submitted_count(), 0);
	assert_eq!(fixture.chain.nonce_of(alice.address()), U256::ZERO);
	assert_eq!(fixture.chain.nonce_of(bob.address()), U256::ZERO);
}

#[tokio::test]
async fn valid_batch_settles_every_payment_in_one_transaction() {
	let fixture = test_app(true);
	let alice = PrivateKeySigner::random();
	let bob = PrivateKeySigner::random();

	let first = payment_body(&fixture.builder, &alice, 50, 0, far_deadline());
	let second = payment_body(&fixture.builder, &bob, 75, 0, far_deadline());
	let body = serde_json::json!({
		"payments": [
			{ "auth": first["auth"], "signature": first["signature"] },
			{ "auth": second["auth"], "signature": second["signature"] },
		],
	});
	let (status, json) = request(&fixture.app, "POST", "/relay/batch-payment", Some(body)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["paymentsCount"], 2);
	assert_eq!(fixture.chain.submitted_count(), 1);
	assert_eq!(fixture.chain.nonce_of(alice.address()), U256::from(1u64));
	assert_eq!(fixture.chain.nonce_of(bob.address()), U256::from(1u64));
}

#[tokio::test]
async fn empty_batch_is_a_validation_error() {
	let fixture = test_app(true);
	let body = serde_json::json!({ "payments": [] });
	let (status, _) = request(&fixture.app, "POST", "/relay/batch-payment", Some(body)).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_relayer_key_is_a_configuration_error() {
	let fixture = test_app(false);
	let payer = PrivateKeySigner::random();

	let body = payment_body(&fixture.builder, &payer, 100, 0, far_deadline());
	let (status, json) = request(&fixture.app, "POST", "/relay/payment", Some(body)).await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(json["error"], "configuration");
	assert!(json["message"].as_str().unwrap().contains("signing key"));
}

#[tokio::test]
async fn malformed_payer_address_is_a_400() {
	let fixture = test_app(true);
	let body = serde_json::json!({
		"auth": {
			"payer": "not-an-address",
			"recipient": hex_addr(addr(RECIPIENT)),
			"token": hex_addr(addr(TOKEN)),
			"amount": "100",
			"nonce": "0",
			"deadline": far_deadline().to_string(),
		},
		"signature": format!("0x{}", "ab".repeat(65)),
	});
	let (status, json) = request(&fixture.app, "POST", "/relay/payment", Some(body)).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert!(json["message"].as_str().unwrap().contains("auth.payer"));
	assert_eq!(fixture.chain.submitted_count(), 0);
}

#[tokio::test]
async fn missing_required_field_is_a_400() {
	let fixture = test_app(true);
	// No auth at all.
	let body = serde_json::json!({ "signature": format!("0x{}", "ab".repeat(65)) });
	let (status, json) = request(&fixture.app, "POST", "/relay/payment", Some(body)).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error"], "validation");
}

#[tokio::test]
async fn circle_split_runs_after_a_settled_payment() {
	let fixture = test_app(true);
	let payer = PrivateKeySigner::random();
	let m1 = addr(0x01);
	let m2 = addr(0x02);

	fixture
		.engine
		.circles()
		.create(payer.address(), "Trip", vec![m1, m2], true)
		.await
		.unwrap();

	let body = payment_body(&fixture.builder, &payer, 90, 0, far_deadline());
	let (status, json) = request(&fixture.app, "POST", "/relay/payment", Some(body)).await;

	assert_eq!(status, StatusCode::OK);
	assert!(json["txHash"].as_str().is_some());
	assert_eq!(json["circleSplit"]["membersNotified"], 2);
	assert_eq!(json["circleSplit"]["splitAmount"], "30.000000");

	// Each member owes the payer exactly one pending request of 30.
	for member in [m1, m2] {
		let uri = format!("/payment-requests?wallet={}&type=incoming", hex_addr(member));
		let (status, json) = request(&fixture.app, "GET", &uri, None).await;
		assert_eq!(status, StatusCode::OK);
		let rows = json["requests"].as_array().unwrap();
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0]["amount"], "30.000000");
		assert_eq!(rows[0]["recipient"], hex_addr(payer.address()));
		assert_eq!(rows[0]["status"], "pending");
	}

	// And the payer is owed both.
	let uri = format!(
		"/payment-requests?wallet={}&type=outgoing",
		hex_addr(payer.address())
	);
	let (_, json) = request(&fixture.app, "GET", &uri, None).await;
	assert_eq!(json["requests"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn settled_payment_completes_a_matching_request() {
	let fixture = test_app(true);
	let payer = PrivateKeySigner::random();

	let create = serde_json::json!({
		"payer": hex_addr(payer.address()),
		"recipient": hex_addr(addr(RECIPIENT)),
		"token": hex_addr(addr(TOKEN)),
		"amount": "100",
	});
	let (status, created) =
		request(&fixture.app, "POST", "/payment-requests", Some(create)).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(created["isExisting"], false);

	let body = payment_body(&fixture.builder, &payer, 100, 0, far_deadline());
	let (status, _) = request(&fixture.app, "POST", "/relay/payment", Some(body)).await;
	assert_eq!(status, StatusCode::OK);

	let uri = format!(
		"/payment-requests?wallet={}&type=incoming",
		hex_addr(payer.address())
	);
	let (_, json) = request(&fixture.app, "GET", &uri, None).await;
	assert_eq!(json["requests"][0]["status"], "completed");
}

#[tokio::test]
async fn duplicate_payment_request_reminds_instead_of_duplicating() {
	let fixture = test_app(true);
	let body = serde_json::json!({
		"payer": hex_addr(addr(0x01)),
		"recipient": hex_addr(addr(0x02)),
		"token": hex_addr(addr(TOKEN)),
		"amount": "100",
	});

	let (status, first) =
		request(&fixture.app, "POST", "/payment-requests", Some(body.clone())).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(first["isExisting"], false);
	assert!(first["settleUrl"]
		.as_str()
		.unwrap()
		.contains(first["requestId"].as_str().unwrap()));

	let (status, second) = request(&fixture.app, "POST", "/payment-requests", Some(body)).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(second["isExisting"], true);
	assert_eq!(second["requestId"], first["requestId"]);

	let uri = format!(
		"/payment-requests?wallet={}&type=incoming",
		hex_addr(addr(0x01))
	);
	let (_, json) = request(&fixture.app, "GET", &uri, None).await;
	assert_eq!(json["requests"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_direction_is_a_400() {
	let fixture = test_app(true);
	let uri = format!(
		"/payment-requests?wallet={}&type=sideways",
		hex_addr(addr(0x01))
	);
	let (status, _) = request(&fixture.app, "GET", &uri, None).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);

	let (status, _) = request(&fixture.app, "GET", "/payment-requests", None).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn credit_purchase_mints_and_splits_without_billing() {
	let fixture = test_app(true);
	let buyer = PrivateKeySigner::random();
	fixture
		.engine
		.circles()
		.create(buyer.address(), "Trip", vec![addr(0x01), addr(0x02)], true)
		.await
		.unwrap();

	let purchase = fixture.builder.credit_purchase(
		buyer.address(),
		U256::from(90u64),
		U256::ZERO,
		far_deadline(),
	);
	let signature = buyer
		.sign_hash_sync(&fixture.builder.signing_hash(&purchase))
		.unwrap();
	let body = serde_json::json!({
		"purchase": {
			"buyer": hex_addr(buyer.address()),
			"usdcAmount": "90",
			"nonce": "0",
			"deadline": purchase.deadline.to_string(),
		},
		"signature": format!("0x{}", hex::encode(signature.as_bytes())),
	});
	let (status, json) =
		request(&fixture.app, "POST", "/relay/credit-purchase", Some(body)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["creditsMinted"], "90");
	assert_eq!(json["circleSplit"]["splitAmount"], "30.000000");

	// Purchases record the expense but never bill members.
	let uri = format!(
		"/payment-requests?wallet={}&type=incoming",
		hex_addr(addr(0x01))
	);
	let (_, json) = request(&fixture.app, "GET", &uri, None).await;
	assert!(json["requests"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn chip_registration_enforces_one_owner_per_chip() {
	let fixture = test_app(true);
	let owner = PrivateKeySigner::random();
	let chip = addr(0x77);

	let registration = fixture.builder.chip_registration(owner.address(), chip);
	let signature = owner
		.sign_hash_sync(&fixture.builder.signing_hash(&registration))
		.unwrap();
	let body = serde_json::json!({
		"registration": {
			"owner": hex_addr(owner.address()),
			"chipAddress": hex_addr(chip),
		},
		"signature": format!("0x{}", hex::encode(signature.as_bytes())),
	});

	let (status, json) =
		request(&fixture.app, "POST", "/relay/register-chip", Some(body.clone())).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["success"], true);

	// Now bind the chip on the fake registry and try again.
	fixture.chain.register(chip, owner.address());
	let (status, json) = request(&fixture.app, "POST", "/relay/register-chip", Some(body)).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert!(json["message"].as_str().unwrap().contains("already registered"));
}

#[tokio::test]
async fn health_reflects_delivery_availability() {
	let fixture = test_app(true);
	let (status, json) = request(&fixture.app, "GET", "/health", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["latestBlock"], 4_242);

	let keyless = test_app(false);
	let (status, json) = request(&keyless.app, "GET", "/health", None).await;
	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(json["status"], "degraded");
}

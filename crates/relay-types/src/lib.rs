//! Common types for the tap relay service.
//!
//! This crate defines the data types shared across the relay workspace:
//! the signable authorization structs and contract interfaces, the HTTP
//! API request/response shapes, accounting records, and small utilities
//! used by every other crate.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Authorization building: signing domain, struct construction, recovery.
pub mod auth;
/// On-chain struct and interface definitions (EIP-712 structs, contracts).
pub mod contracts;
/// Transaction submission types shared with the delivery layer.
pub mod delivery;
/// Network and contract-address configuration.
pub mod networks;
/// Accounting records persisted through the storage layer.
pub mod records;
/// Secure string type for the relayer signing key.
pub mod secret_string;
/// Formatting and parsing helpers.
pub mod utils;

// Re-export the types most crates need so callers can depend on the
// crate root instead of individual modules.
pub use api::*;
pub use auth::{AuthDomain, AuthError, AuthorizationBuilder};
pub use contracts::{
	ChipChallenge, ChipRegistration, CreditPurchase, CreditSpend, IChipRegistry, IMulticall3,
	ISettler, PaymentAuth,
};
pub use delivery::{Transaction, TransactionReceipt};
pub use networks::NetworkConfig;
pub use records::*;
pub use secret_string::SecretString;
pub use utils::{
	current_timestamp, deadline_from_now, display_amount, parse_address, with_0x_prefix,
	without_0x_prefix,
};

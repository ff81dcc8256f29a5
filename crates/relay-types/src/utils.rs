//! Formatting and parsing helpers shared across the relay workspace.

use alloy::primitives::{Address, U256};

/// Adds a "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Removes a "0x" or "0X" prefix from a hex string if present.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Parses a hex address string, accepting it with or without 0x prefix.
pub fn parse_address(value: &str) -> Result<Address, String> {
	with_0x_prefix(value.trim())
		.parse::<Address>()
		.map_err(|_| format!("invalid address: {}", value))
}

/// Current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
	chrono::Utc::now().timestamp() as u64
}

/// Builds a deadline `ttl_seconds` from now, as the uint256 contracts expect.
pub fn deadline_from_now(ttl_seconds: u64) -> U256 {
	U256::from(current_timestamp() + ttl_seconds)
}

/// Renders a base-unit amount with six fractional digits.
///
/// This is the canonical display precision for accounting amounts in API
/// payloads and payment-request rows: `90 / 3` shares render as
/// `"30.000000"`.
pub fn display_amount(amount: U256) -> String {
	format!("{}.000000", amount)
}

//! Wire-to-domain validation.
//!
//! DTO fields arrive as strings so malformed input becomes a 400 with a
//! field-level message instead of a framework-level rejection.

use crate::RelayError;
use alloy::primitives::{Address, U256};
use relay_types::{
	without_0x_prefix, ChipRegistration, ChipRegistrationDto, CreditPurchase, CreditPurchaseDto,
	PaymentAuth, PaymentAuthDto,
};

/// Parses an address field, naming the field in the error.
pub fn parse_address_field(value: &str, field: &str) -> Result<Address, RelayError> {
	relay_types::parse_address(value)
		.map_err(|_| RelayError::Validation(format!("{}: invalid address '{}'", field, value)))
}

/// Parses a 65-byte hex signature.
pub fn parse_signature(value: &str) -> Result<Vec<u8>, RelayError> {
	let bytes = hex::decode(without_0x_prefix(value.trim()))
		.map_err(|_| RelayError::Validation("signature: invalid hex".to_string()))?;
	if bytes.len() != 65 {
		return Err(RelayError::Validation(format!(
			"signature: expected 65 bytes, got {}",
			bytes.len()
		)));
	}
	Ok(bytes)
}

fn positive(amount: U256, field: &str) -> Result<U256, RelayError> {
	if amount.is_zero() {
		return Err(RelayError::Validation(format!(
			"{}: amount must be positive",
			field
		)));
	}
	Ok(amount)
}

/// Validates a payment authorization DTO into the signable struct.
pub fn parse_payment_auth(dto: &PaymentAuthDto) -> Result<PaymentAuth, RelayError> {
	Ok(PaymentAuth {
		payer: parse_address_field(&dto.payer, "auth.payer")?,
		recipient: parse_address_field(&dto.recipient, "auth.recipient")?,
		token: parse_address_field(&dto.token, "auth.token")?,
		amount: positive(dto.amount, "auth.amount")?,
		nonce: dto.nonce,
		deadline: dto.deadline,
	})
}

/// Validates a credit purchase DTO into the signable struct.
pub fn parse_credit_purchase(dto: &CreditPurchaseDto) -> Result<CreditPurchase, RelayError> {
	Ok(CreditPurchase {
		buyer: parse_address_field(&dto.buyer, "purchase.buyer")?,
		usdcAmount: positive(dto.usdc_amount, "purchase.usdcAmount")?,
		nonce: dto.nonce,
		deadline: dto.deadline,
	})
}

/// Validates a chip registration DTO into the signable struct.
pub fn parse_chip_registration(dto: &ChipRegistrationDto) -> Result<ChipRegistration, RelayError> {
	Ok(ChipRegistration {
		owner: parse_address_field(&dto.owner, "registration.owner")?,
		chipAddress: parse_address_field(&dto.chip_address, "registration.chipAddress")?,
	})
}

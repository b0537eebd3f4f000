// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! ERC-20 / TRC-20 `transfer` call data and `Transfer` event decoding

use thiserror::Error;

/// `transfer(address,uint256)` method selector
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
/// Tron's `function_selector` form of the same method
pub const TRANSFER_SIGNATURE: &str = "transfer(address,uint256)";
/// topic0 of `Transfer(address,address,uint256)`
pub const TRANSFER_TOPIC: &str = "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
	#[error("Invalid hex: {0}")]
	InvalidHex(String),
	#[error("Expected at least {expected} bytes, got {actual}")]
	TooShort { expected: usize, actual: usize },
	#[error("Value does not fit in 128 bits")]
	Overflow,
	#[error("Not a transfer call")]
	NotTransfer,
}

fn unhex(data: &str) -> Result<Vec<u8>, AbiError> {
	let digits = data.trim().trim_start_matches("0x");
	hex::decode(digits).map_err(|e| AbiError::InvalidHex(e.to_string()))
}

fn word(amount: u128) -> [u8; 32] {
	let mut out = [0u8; 32];
	out[16..].copy_from_slice(&amount.to_be_bytes());
	out
}

/// ABI-encoded `(address, uint256)` arguments of a transfer
pub fn transfer_params(to: &[u8; 20], amount: u128) -> Vec<u8> {
	let mut out = Vec::with_capacity(64);
	out.extend_from_slice(&[0u8; 12]);
	out.extend_from_slice(to);
	out.extend_from_slice(&word(amount));
	out
}

/// Full call data: selector followed by the encoded arguments
pub fn transfer_call(to: &[u8; 20], amount: u128) -> Vec<u8> {
	let mut out = TRANSFER_SELECTOR.to_vec();
	out.extend_from_slice(&transfer_params(to, amount));
	out
}

/// Whether transaction input invokes `transfer`
pub fn is_transfer_call(input: &str) -> bool {
	let digits = input.trim().trim_start_matches("0x");
	digits
		.get(..8)
		.is_some_and(|selector| selector.eq_ignore_ascii_case("a9059cbb"))
}

/// Whether an event topic, with or without `0x`, is the `Transfer` topic
pub fn is_transfer_topic(topic: &str) -> bool {
	topic
		.trim()
		.trim_start_matches("0x")
		.eq_ignore_ascii_case(TRANSFER_TOPIC)
}

/// Decode the leading 32-byte word of `data` as an amount
pub fn decode_uint(data: &str) -> Result<u128, AbiError> {
	let raw = unhex(data)?;
	uint_at(&raw, 0)
}

fn uint_at(raw: &[u8], offset: usize) -> Result<u128, AbiError> {
	let end = offset + 32;
	let slot = raw.get(offset..end).ok_or(AbiError::TooShort {
		expected: end,
		actual: raw.len(),
	})?;
	if slot[..16].iter().any(|b| *b != 0) {
		return Err(AbiError::Overflow);
	}
	let mut low = [0u8; 16];
	low.copy_from_slice(&slot[16..]);
	Ok(u128::from_be_bytes(low))
}

/// Recipient and amount of a `transfer` call
pub fn decode_transfer_call(input: &str) -> Result<([u8; 20], u128), AbiError> {
	if !is_transfer_call(input) {
		return Err(AbiError::NotTransfer);
	}
	let raw = unhex(input)?;
	let args = &raw[4..];
	let slot = args.get(..32).ok_or(AbiError::TooShort {
		expected: 36,
		actual: raw.len(),
	})?;
	let mut to = [0u8; 20];
	to.copy_from_slice(&slot[12..]);
	Ok((to, uint_at(args, 32)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use bourse_sdk::keccak256;
	use proptest::prelude::*;

	#[test]
	fn test_constants_match_signatures() {
		let selector = keccak256(TRANSFER_SIGNATURE.as_bytes());
		assert_eq!(&selector[..4], &TRANSFER_SELECTOR);
		let topic = keccak256(b"Transfer(address,address,uint256)");
		assert_eq!(hex::encode(topic), TRANSFER_TOPIC);
		assert!(is_transfer_topic(&format!("0x{}", TRANSFER_TOPIC.to_ascii_uppercase())));
		assert!(!is_transfer_topic("0x8c5be1e5"));
	}

	#[test]
	fn test_transfer_call_layout() {
		let to = [0x11u8; 20];
		let call = transfer_call(&to, 1_000_000);
		assert_eq!(call.len(), 68);
		assert!(is_transfer_call(&format!("0x{}", hex::encode(&call))));
		assert_eq!(&call[16..36], &to);
		assert_eq!(&call[64..], &[0x00, 0x0f, 0x42, 0x40]);
	}

	#[test]
	fn test_rejects_other_calls() {
		assert!(!is_transfer_call("0x095ea7b3"));
		assert!(!is_transfer_call("0x"));
		assert_eq!(decode_transfer_call("0x095ea7b300"), Err(AbiError::NotTransfer));
		assert!(matches!(
			decode_transfer_call("0xa9059cbb0000"),
			Err(AbiError::TooShort { .. })
		));
	}

	#[test]
	fn test_decode_uint_overflow() {
		let data = format!("0x01{}", "00".repeat(31));
		assert_eq!(decode_uint(&data), Err(AbiError::Overflow));
		assert!(matches!(decode_uint("0x00"), Err(AbiError::TooShort { .. })));
	}

	proptest! {
		#[test]
		fn test_transfer_call_decodes(to in any::<[u8; 20]>(), amount in any::<u128>()) {
			let input = hex::encode(transfer_call(&to, amount));
			prop_assert_eq!(decode_transfer_call(&input).unwrap(), (to, amount));
		}
	}
}

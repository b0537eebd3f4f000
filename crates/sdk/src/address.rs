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

//! Address codec
//!
//! Accepted input forms:
//! - 34 chars: Tron Base58-check (21 bytes, leading `0x41`)
//! - 40/42 chars: 20-byte hex with optional `0x`
//! - 42/44 chars: Tron hex with leading `41`, optional `0x`
//! - 64/66 chars: 32-byte event topic, address in the last 20 bytes

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::error::ExchangeError;
use crate::types::Platform;

/// Tron's address version byte
pub const TRON_PREFIX: u8 = 0x41;

static BITCOIN_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^(bc1|[1b])[a-zA-HJ-NP-Z0-9]{25,39}$").expect("valid regex"));
static TRON_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^T[a-zA-HJ-NP-Z0-9]{33}$").expect("valid regex"));
static ETHEREUM_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^0x[a-zA-Z0-9]{40}$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
	#[error("Unsupported address length: {0}")]
	InvalidLength(usize),
	#[error("Invalid hex address: {0}")]
	InvalidHex(String),
	#[error("Invalid base58 address: {0}")]
	InvalidBase58(String),
	#[error("Unexpected address prefix byte: {0:#04x}")]
	InvalidPrefix(u8),
}

/// Decode any accepted form into the 20-byte account id
pub fn decode(address: &str) -> Result<[u8; 20], AddressError> {
	let address = address.trim();
	if address.len() == 34 {
		let raw = bs58::decode(address)
			.with_check(None)
			.into_vec()
			.map_err(|e| AddressError::InvalidBase58(e.to_string()))?;
		return strip_tron_prefix(&raw);
	}

	let digits = address
		.strip_prefix("0x")
		.or_else(|| address.strip_prefix("0X"))
		.unwrap_or(address);
	let raw = match digits.len() {
		40 | 42 | 64 => hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?,
		other => return Err(AddressError::InvalidLength(other)),
	};

	match raw.len() {
		20 => Ok(to_array(&raw)),
		21 => strip_tron_prefix(&raw),
		32 => Ok(to_array(&raw[12..])),
		other => Err(AddressError::InvalidLength(other)),
	}
}

/// Hex form of an address: `41…` when `tron` is set, otherwise `0x…`
pub fn hex(address: &str, tron: bool) -> Result<String, AddressError> {
	let id = decode(address)?;
	if tron {
		Ok(format!("{:02x}{}", TRON_PREFIX, hex::encode(id)))
	} else {
		Ok(format!("0x{}", hex::encode(id)))
	}
}

/// Tron Base58-check form of an address
pub fn base58(address: &str) -> Result<String, AddressError> {
	let id = decode(address)?;
	Ok(base58_from_id(&id))
}

pub fn base58_from_id(id: &[u8; 20]) -> String {
	let mut raw = Vec::with_capacity(21);
	raw.push(TRON_PREFIX);
	raw.extend_from_slice(id);
	bs58::encode(raw).with_check().into_string()
}

/// Canonical form stored for a platform: lowercase `0x` hex for Ethereum,
/// Base58 for Tron
pub fn canonical(platform: Platform, address: &str) -> Result<String, AddressError> {
	match platform {
		Platform::Tron => base58(address),
		Platform::Ethereum => hex(address, false),
		_ => Ok(address.trim().to_string()),
	}
}

/// Validate a user-supplied destination against the platform's format
pub fn validate(platform: Platform, address: &str) -> Result<(), ExchangeError> {
	let valid = match platform {
		Platform::Bitcoin => BITCOIN_RE.is_match(address),
		Platform::Tron => TRON_RE.is_match(address),
		Platform::Ethereum => ETHEREUM_RE.is_match(address),
		Platform::Visa | Platform::Mastercard => !address.trim().is_empty(),
	};
	if valid {
		Ok(())
	} else {
		Err(ExchangeError::invalid(format!(
			"`{}` is not a valid {} address",
			address, platform
		)))
	}
}

fn strip_tron_prefix(raw: &[u8]) -> Result<[u8; 20], AddressError> {
	match raw {
		[TRON_PREFIX, rest @ ..] if rest.len() == 20 => Ok(to_array(rest)),
		[first, ..] if raw.len() == 21 => Err(AddressError::InvalidPrefix(*first)),
		_ => Err(AddressError::InvalidLength(raw.len())),
	}
}

fn to_array(bytes: &[u8]) -> [u8; 20] {
	let mut out = [0u8; 20];
	out.copy_from_slice(bytes);
	out
}

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

//! Deposit-address key derivation
//!
//! A BIP-39 mnemonic is generated from 256 bits of entropy and the account
//! key is derived along the hardened BIP-44 path `m/44'/coin'/0'/0/0`.

use bip39::Mnemonic;
use hmac::{Hmac, Mac};
use k256::{
	FieldBytes, Scalar, SecretKey,
	elliptic_curve::{ff::PrimeField, sec1::ToEncodedPoint},
};
use rand::{RngCore, rngs::OsRng};
use ripemd::Ripemd160;
use sha2::{Digest, Sha512};
use thiserror::Error;

use crate::address::base58_from_id;
use crate::signing::{keccak256, sha256};
use crate::types::Platform;

const HARDENED: u32 = 0x8000_0000;

type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, Error)]
pub enum KeyError {
	#[error("Invalid mnemonic: {0}")]
	Mnemonic(String),
	#[error("Platform {0} has no key derivation")]
	UnsupportedPlatform(Platform),
	#[error("Derived key is out of range")]
	InvalidChild,
}

/// Account derived for one platform
#[derive(Clone)]
pub struct DerivedAccount {
	pub platform: Platform,
	pub address: String,
	/// Compressed SEC1 public key, hex
	pub public_key: String,
	secret: SecretKey,
}

impl DerivedAccount {
	pub fn secret(&self) -> &SecretKey {
		&self.secret
	}

	pub fn private_key_hex(&self) -> String {
		hex::encode(self.secret.to_bytes())
	}
}

impl std::fmt::Debug for DerivedAccount {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DerivedAccount")
			.field("platform", &self.platform)
			.field("address", &self.address)
			.finish_non_exhaustive()
	}
}

struct ExtendedKey {
	secret: SecretKey,
	chain_code: [u8; 32],
}

impl ExtendedKey {
	fn master(seed: &[u8]) -> Result<Self, KeyError> {
		let mut mac = HmacSha512::new_from_slice(b"Bitcoin seed").map_err(|_| KeyError::InvalidChild)?;
		mac.update(seed);
		Self::from_hmac(&mac.finalize().into_bytes(), None)
	}

	fn child(&self, index: u32) -> Result<Self, KeyError> {
		let mut mac =
			HmacSha512::new_from_slice(&self.chain_code).map_err(|_| KeyError::InvalidChild)?;
		if index >= HARDENED {
			mac.update(&[0u8]);
			mac.update(&self.secret.to_bytes());
		} else {
			mac.update(self.secret.public_key().to_encoded_point(true).as_bytes());
		}
		mac.update(&index.to_be_bytes());
		Self::from_hmac(&mac.finalize().into_bytes(), Some(&self.secret))
	}

	fn from_hmac(output: &[u8], parent: Option<&SecretKey>) -> Result<Self, KeyError> {
		let tweak = Option::<Scalar>::from(Scalar::from_repr(*FieldBytes::from_slice(&output[..32])))
			.ok_or(KeyError::InvalidChild)?;
		let scalar = match parent {
			Some(parent) => tweak + *parent.to_nonzero_scalar(),
			None => tweak,
		};
		let secret = SecretKey::from_bytes(&scalar.to_repr()).map_err(|_| KeyError::InvalidChild)?;
		let mut chain_code = [0u8; 32];
		chain_code.copy_from_slice(&output[32..]);
		Ok(Self { secret, chain_code })
	}
}

/// Generate a 24-word mnemonic from 256 bits of OS entropy
pub fn generate_mnemonic() -> Result<String, KeyError> {
	let mut entropy = [0u8; 32];
	OsRng.fill_bytes(&mut entropy);
	let mnemonic = Mnemonic::from_entropy(&entropy).map_err(|e| KeyError::Mnemonic(e.to_string()))?;
	Ok(mnemonic.to_string())
}

/// Derive the first account of `platform` from a mnemonic phrase
pub fn derive(phrase: &str, platform: Platform) -> Result<DerivedAccount, KeyError> {
	let coin = platform
		.coin_type()
		.ok_or(KeyError::UnsupportedPlatform(platform))?;
	let mnemonic =
		Mnemonic::parse_normalized(phrase).map_err(|e| KeyError::Mnemonic(e.to_string()))?;
	let seed = mnemonic.to_seed_normalized("");

	let mut key = ExtendedKey::master(&seed)?;
	for index in [44 | HARDENED, coin | HARDENED, HARDENED, 0, 0] {
		key = key.child(index)?;
	}

	let address = address_of(platform, &key.secret)?;
	let public_key = hex::encode(key.secret.public_key().to_encoded_point(true).as_bytes());
	Ok(DerivedAccount {
		platform,
		address,
		public_key,
		secret: key.secret,
	})
}

/// Address controlled by `secret` on `platform`
pub fn address_of(platform: Platform, secret: &SecretKey) -> Result<String, KeyError> {
	let public = secret.public_key();
	match platform {
		Platform::Ethereum => Ok(format!("0x{}", hex::encode(account_id(secret)))),
		Platform::Tron => Ok(base58_from_id(&account_id(secret))),
		Platform::Bitcoin => {
			let compressed = public.to_encoded_point(true);
			let hash = Ripemd160::digest(sha256(compressed.as_bytes()));
			let mut payload = Vec::with_capacity(21);
			payload.push(0x00);
			payload.extend_from_slice(&hash);
			Ok(bs58::encode(payload).with_check().into_string())
		}
		other => Err(KeyError::UnsupportedPlatform(other)),
	}
}

/// Last 20 bytes of keccak256 over the uncompressed public key
pub fn account_id(secret: &SecretKey) -> [u8; 20] {
	let uncompressed = secret.public_key().to_encoded_point(false);
	let hash = keccak256(&uncompressed.as_bytes()[1..]);
	let mut id = [0u8; 20];
	id.copy_from_slice(&hash[12..]);
	id
}

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

//! Hashing and secp256k1 signing primitives shared by the chain clients

use k256::{
	SecretKey,
	ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey},
};
use sha2::{Digest, Sha256};
use sha3::Keccak256;

/// Error types for signing operations
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
	#[error("Invalid private key: {0}")]
	InvalidKey(String),
	#[error("Signing error: {0}")]
	Signing(String),
}

/// Recoverable secp256k1 signature split into its wire components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
	pub r: [u8; 32],
	pub s: [u8; 32],
	/// Recovery id (0 or 1)
	pub recovery_id: u8,
}

impl RecoverableSignature {
	/// `r || s || v` as used by Tron broadcasts
	pub fn to_bytes(&self) -> [u8; 65] {
		let mut out = [0u8; 65];
		out[..32].copy_from_slice(&self.r);
		out[32..64].copy_from_slice(&self.s);
		out[64] = self.recovery_id;
		out
	}
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
	Keccak256::digest(data).into()
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
	Sha256::digest(data).into()
}

/// Parse a hex private key, with or without `0x`
pub fn secret_from_hex(hex_key: &str) -> Result<SecretKey, SigningError> {
	let raw = hex::decode(hex_key.trim().trim_start_matches("0x"))
		.map_err(|e| SigningError::InvalidKey(e.to_string()))?;
	SecretKey::from_slice(&raw).map_err(|e| SigningError::InvalidKey(e.to_string()))
}

/// Sign a 32-byte digest, returning a low-s recoverable signature
pub fn sign_digest(
	secret: &SecretKey,
	digest: &[u8; 32],
) -> Result<RecoverableSignature, SigningError> {
	let signing_key = SigningKey::from(secret);
	let (signature, recovery_id): (Signature, RecoveryId) = signing_key
		.sign_prehash_recoverable(digest)
		.map_err(|e| SigningError::Signing(e.to_string()))?;

	let bytes = signature.to_bytes();
	let mut r = [0u8; 32];
	let mut s = [0u8; 32];
	r.copy_from_slice(&bytes[..32]);
	s.copy_from_slice(&bytes[32..]);

	Ok(RecoverableSignature {
		r,
		s,
		recovery_id: recovery_id.to_byte(),
	})
}

/// Recover the signer's uncompressed public key (65 bytes, `0x04` prefix)
pub fn recover(digest: &[u8; 32], signature: &RecoverableSignature) -> Result<Vec<u8>, SigningError> {
	let mut rs = [0u8; 64];
	rs[..32].copy_from_slice(&signature.r);
	rs[32..].copy_from_slice(&signature.s);
	let sig = Signature::from_slice(&rs).map_err(|e| SigningError::Signing(e.to_string()))?;
	let recovery_id = RecoveryId::from_byte(signature.recovery_id)
		.ok_or_else(|| SigningError::Signing("invalid recovery id".to_string()))?;
	let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
		.map_err(|e| SigningError::Signing(e.to_string()))?;
	Ok(key.to_encoded_point(false).as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
	use super::*;
	use k256::elliptic_curve::sec1::ToEncodedPoint;

	const KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

	#[test]
	fn test_keccak_empty() {
		assert_eq!(
			hex::encode(keccak256(b"")),
			"c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
		);
	}

	#[test]
	fn test_transfer_selector() {
		let hash = keccak256(b"transfer(address,uint256)");
		assert_eq!(hex::encode(&hash[..4]), "a9059cbb");
	}

	#[test]
	fn test_sign_and_recover() {
		let secret = secret_from_hex(KEY).unwrap();
		let digest = keccak256(b"withdrawal");
		let signature = sign_digest(&secret, &digest).unwrap();
		let recovered = recover(&digest, &signature).unwrap();
		let expected = secret.public_key().to_encoded_point(false);
		assert_eq!(recovered, expected.as_bytes());
	}

	#[test]
	fn test_invalid_key() {
		assert!(secret_from_hex("zz").is_err());
		assert!(secret_from_hex(&"00".repeat(32)).is_err());
	}
}

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

//! Tron HTTP API client
//!
//! Requests are sent with `visible: true` so addresses travel in Base58.
//! Transactions are created by the node and signed locally over their
//! txID.

use async_trait::async_trait;
use bourse_sdk::{Platform, address, sha256, sign_digest, signing};
use serde_json::{Value, json};

use super::abi;
use super::{Block, ChainError, ChainRpc, ChainTx, HttpTransport, Log, SignedTx, Transfer, TxKind};

/// Fee limit attached to token transfers, in sun
pub const FEE_LIMIT: u64 = 100_000_000;
/// Hex length of a 65-byte signature
const SIGNATURE_HEX_LEN: u128 = 130;

fn to_u64(amount: u128) -> Result<u64, ChainError> {
	u64::try_from(amount).map_err(|_| ChainError::Amount(format!("{} does not fit in 64 bits", amount)))
}

fn field<'a>(value: &'a Value, name: &str) -> Result<&'a str, ChainError> {
	value
		.get(name)
		.and_then(Value::as_str)
		.ok_or_else(|| ChainError::InvalidResponse(format!("missing `{}`", name)))
}

fn canonical(raw: &str) -> Result<String, ChainError> {
	Ok(address::canonical(Platform::Tron, raw)?)
}

/// Read one block transaction; only native and token transfers are kept
fn block_tx(tx: &Value) -> Result<Option<ChainTx>, ChainError> {
	let hash = field(tx, "txID")?.to_ascii_lowercase();
	let Some(contract) = tx.pointer("/raw_data/contract/0") else {
		return Ok(None);
	};
	let value = contract
		.pointer("/parameter/value")
		.ok_or_else(|| ChainError::InvalidResponse(format!("{}: missing parameter", hash)))?;

	let found = match contract.get("type").and_then(Value::as_str) {
		Some("TransferContract") => ChainTx {
			from: canonical(field(value, "owner_address")?)?,
			to: canonical(field(value, "to_address")?)?,
			value: value.get("amount").and_then(Value::as_u64).unwrap_or_default() as u128,
			input: String::new(),
			kind: TxKind::Internal,
			hash,
		},
		Some("TriggerSmartContract") => ChainTx {
			from: canonical(field(value, "owner_address")?)?,
			to: canonical(field(value, "contract_address")?)?,
			value: value.get("call_value").and_then(Value::as_u64).unwrap_or_default() as u128,
			input: value.get("data").and_then(Value::as_str).unwrap_or_default().to_string(),
			kind: TxKind::Contract,
			hash,
		},
		_ => return Ok(None),
	};
	Ok(Some(found))
}

/// Attach a signature over the txID, after checking that the txID really
/// is the hash of the raw data the node returned
pub fn sign_transaction(mut tx: Value, private_key: &str) -> Result<SignedTx, ChainError> {
	let tx_id = field(&tx, "txID")?.to_ascii_lowercase();
	let raw_data = hex::decode(field(&tx, "raw_data_hex")?)
		.map_err(|e| ChainError::InvalidResponse(format!("raw_data_hex: {}", e)))?;
	let digest = sha256(&raw_data);
	if hex::encode(digest) != tx_id {
		return Err(ChainError::InvalidResponse(
			"txID does not match raw data".to_string(),
		));
	}

	let secret =
		signing::secret_from_hex(private_key).map_err(|e| ChainError::Signing(e.to_string()))?;
	let signature = sign_digest(&secret, &digest).map_err(|e| ChainError::Signing(e.to_string()))?;
	tx["signature"] = json!([hex::encode(signature.to_bytes())]);

	let raw = serde_json::to_vec(&tx).map_err(|e| ChainError::Signing(e.to_string()))?;
	Ok(SignedTx { hash: tx_id, raw })
}

/// Bandwidth fee of a native transfer, less the account's free bandwidth
pub fn native_fee(raw_data_hex: &str, free_bandwidth: u128) -> u128 {
	(raw_data_hex.len() as u128 * 10).saturating_sub(free_bandwidth)
}

/// Energy plus bandwidth fee of a token transfer
pub fn token_fee(raw_data_hex: &str, energy: u128) -> u128 {
	(9 + 60 + energy * 10 + raw_data_hex.len() as u128 + SIGNATURE_HEX_LEN) * 10
}

/// Token fee from a `triggerconstantcontract` answer
pub fn estimated_token_fee(estimate: &Value) -> Result<u128, ChainError> {
	let energy = estimate
		.get("energy_used")
		.and_then(Value::as_u64)
		.ok_or_else(|| ChainError::InvalidResponse("missing energy_used".to_string()))?;
	let raw = estimate
		.pointer("/transaction/raw_data_hex")
		.and_then(Value::as_str)
		.ok_or_else(|| ChainError::InvalidResponse("missing transaction raw_data_hex".to_string()))?;
	Ok(token_fee(raw, energy as u128))
}

pub struct TronClient {
	transport: HttpTransport,
}

impl TronClient {
	pub fn new(transport: HttpTransport) -> Self {
		Self { transport }
	}

	async fn transaction_info(&self, hash: &str) -> Result<Value, ChainError> {
		self.transport
			.post("/wallet/gettransactioninfobyid", &json!({ "value": hash }))
			.await
	}

	/// Unsigned transaction for `transfer`, created by the node
	async fn create(&self, transfer: &Transfer) -> Result<Value, ChainError> {
		let owner = address::base58(&transfer.from)?;
		let recipient = address::decode(&transfer.to)?;

		let mut response = match &transfer.contract {
			None => {
				self.transport
					.post(
						"/wallet/createtransaction",
						&json!({
							"owner_address": owner,
							"to_address": address::base58(&transfer.to)?,
							"amount": to_u64(transfer.amount)?,
							"visible": true,
						}),
					)
					.await?
			}
			Some(contract) => {
				let mut response = self
					.transport
					.post(
						"/wallet/triggersmartcontract",
						&json!({
							"owner_address": owner,
							"contract_address": address::base58(contract)?,
							"function_selector": abi::TRANSFER_SIGNATURE,
							"parameter": hex::encode(abi::transfer_params(&recipient, transfer.amount)),
							"fee_limit": FEE_LIMIT,
							"call_value": 0,
							"visible": true,
						}),
					)
					.await?;
				response
					.get_mut("transaction")
					.map(Value::take)
					.ok_or_else(|| ChainError::Rpc(format!("contract call rejected: {}", response)))?
			}
		};

		if response.get("txID").is_none() {
			return Err(ChainError::Rpc(format!("transaction not created: {}", response.take())));
		}
		Ok(response)
	}

	async fn free_bandwidth(&self, account: &str) -> Result<u128, ChainError> {
		let resource = self
			.transport
			.post(
				"/wallet/getaccountresource",
				&json!({ "address": address::base58(account)?, "visible": true }),
			)
			.await?;
		let limit = resource.get("freeNetLimit").and_then(Value::as_u64).unwrap_or_default();
		let used = resource.get("freeNetUsed").and_then(Value::as_u64).unwrap_or_default();
		Ok(limit.saturating_sub(used) as u128)
	}
}

#[async_trait]
impl ChainRpc for TronClient {
	fn platform(&self) -> Platform {
		Platform::Tron
	}

	async fn block_number(&self) -> Result<i64, ChainError> {
		let block = self.transport.post("/wallet/getnowblock", &json!({})).await?;
		block
			.pointer("/block_header/raw_data/number")
			.and_then(Value::as_i64)
			.ok_or_else(|| ChainError::InvalidResponse("block without number".to_string()))
	}

	async fn block_by_number(&self, number: i64) -> Result<Option<Block>, ChainError> {
		let block = self
			.transport
			.post("/wallet/getblockbynum", &json!({ "num": number, "visible": true }))
			.await?;
		if block.get("blockID").is_none() {
			return Ok(None);
		}

		let mut transactions = Vec::new();
		if let Some(found) = block.get("transactions").and_then(Value::as_array) {
			for tx in found {
				if let Some(tx) = block_tx(tx)? {
					transactions.push(tx);
				}
			}
		}
		Ok(Some(Block {
			number: block
				.pointer("/block_header/raw_data/number")
				.and_then(Value::as_i64)
				.unwrap_or(number),
			transactions,
		}))
	}

	async fn logs_by_tx(&self, hash: &str) -> Result<Option<Log>, ChainError> {
		let info = self.transaction_info(hash).await?;
		let Some(logs) = info.get("log").and_then(Value::as_array) else {
			return Ok(None);
		};

		for log in logs {
			let topics: Vec<String> = log
				.get("topics")
				.and_then(Value::as_array)
				.map(|t| t.iter().filter_map(Value::as_str).map(str::to_string).collect())
				.unwrap_or_default();
			if !topics.first().is_some_and(|t| abi::is_transfer_topic(t)) {
				continue;
			}
			return Ok(Some(Log {
				address: canonical(field(log, "address")?)?,
				topics,
				data: log.get("data").and_then(Value::as_str).unwrap_or_default().to_string(),
			}));
		}
		Ok(None)
	}

	async fn status(&self, hash: &str) -> Result<bool, ChainError> {
		let info = self.transaction_info(hash).await?;
		if info.get("id").is_none() {
			return Ok(false);
		}
		if info.get("result").and_then(Value::as_str) == Some("FAILED") {
			return Ok(false);
		}
		Ok(match info.pointer("/receipt/result").and_then(Value::as_str) {
			Some(result) => result == "SUCCESS",
			None => true,
		})
	}

	async fn gas_price(&self) -> Result<u128, ChainError> {
		Err(ChainError::Unsupported {
			platform: Platform::Tron,
			operation: "gas_price",
		})
	}

	async fn nonce(&self, _address: &str) -> Result<u128, ChainError> {
		Err(ChainError::Unsupported {
			platform: Platform::Tron,
			operation: "nonce",
		})
	}

	async fn estimate_gas(&self, transfer: &Transfer) -> Result<u128, ChainError> {
		match &transfer.contract {
			None => {
				let tx = self.create(transfer).await?;
				let free = self.free_bandwidth(&transfer.from).await?;
				Ok(native_fee(field(&tx, "raw_data_hex")?, free))
			}
			Some(contract) => {
				let recipient = address::decode(&transfer.to)?;
				let estimate = self
					.transport
					.post(
						"/wallet/triggerconstantcontract",
						&json!({
							"owner_address": address::base58(&transfer.from)?,
							"contract_address": address::base58(contract)?,
							"function_selector": abi::TRANSFER_SIGNATURE,
							"parameter": hex::encode(abi::transfer_params(&recipient, transfer.amount)),
							"visible": true,
						}),
					)
					.await?;
				estimated_token_fee(&estimate)
			}
		}
	}

	async fn sign_and_build(&self, transfer: &Transfer) -> Result<SignedTx, ChainError> {
		let tx = self.create(transfer).await?;
		sign_transaction(tx, &transfer.private_key)
	}

	async fn broadcast(&self, signed: &SignedTx) -> Result<String, ChainError> {
		let body: Value = serde_json::from_slice(&signed.raw)
			.map_err(|e| ChainError::InvalidResponse(format!("signed transaction: {}", e)))?;
		let response = self
			.transport
			.post("/wallet/broadcasttransaction", &body)
			.await?;

		if response.get("result").and_then(Value::as_bool) == Some(true) {
			return Ok(response
				.get("txid")
				.and_then(Value::as_str)
				.map(str::to_ascii_lowercase)
				.unwrap_or_else(|| signed.hash.clone()));
		}

		let code = response.get("code").and_then(Value::as_str).unwrap_or("UNKNOWN");
		// the node hex-encodes its message
		let message = response
			.get("message")
			.and_then(Value::as_str)
			.and_then(|m| hex::decode(m).ok())
			.and_then(|m| String::from_utf8(m).ok())
			.unwrap_or_default();
		Err(ChainError::Rpc(format!("broadcast rejected: {} {}", code, message)))
	}
}

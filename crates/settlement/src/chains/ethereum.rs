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

//! Ethereum-family JSON-RPC client with local EIP-155 signing

use async_trait::async_trait;
use bourse_sdk::{Platform, address, keccak256, sign_digest, signing, units::parse_hex_quantity};
use serde::Deserialize;
use serde_json::{Value, json};

use super::abi;
use super::rlp::{self, Item};
use super::{Block, ChainError, ChainRpc, ChainTx, HttpTransport, Log, SignedTx, Transfer, TxKind};

#[derive(Deserialize)]
struct RpcBlock {
	number: String,
	#[serde(default)]
	transactions: Vec<RpcTransaction>,
}

#[derive(Deserialize)]
struct RpcTransaction {
	hash: String,
	from: String,
	to: Option<String>,
	value: String,
	#[serde(default)]
	input: String,
}

#[derive(Deserialize)]
struct RpcReceipt {
	status: Option<String>,
	#[serde(default)]
	logs: Vec<RpcLog>,
}

#[derive(Deserialize)]
struct RpcLog {
	address: String,
	#[serde(default)]
	topics: Vec<String>,
	#[serde(default)]
	data: String,
}

fn quantity(value: &str) -> Result<u128, ChainError> {
	parse_hex_quantity(value)
		.ok_or_else(|| ChainError::InvalidResponse(format!("`{}` is not a hex quantity", value)))
}

fn hex_quantity(value: u128) -> String {
	format!("{:#x}", value)
}

fn parse<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T, ChainError> {
	serde_json::from_value(value).map_err(|e| ChainError::InvalidResponse(format!("{}: {}", what, e)))
}

/// Legacy (pre-1559) transaction fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTx {
	pub nonce: u128,
	pub gas_price: u128,
	pub gas_limit: u128,
	pub to: [u8; 20],
	pub value: u128,
	pub data: Vec<u8>,
}

impl LegacyTx {
	fn fields(&self) -> Vec<Item> {
		vec![
			Item::uint(self.nonce),
			Item::uint(self.gas_price),
			Item::uint(self.gas_limit),
			Item::bytes(&self.to),
			Item::uint(self.value),
			Item::bytes(&self.data),
		]
	}

	/// RLP payload whose keccak hash is signed under EIP-155
	pub fn signing_payload(&self, chain_id: u64) -> Vec<u8> {
		let mut fields = self.fields();
		fields.extend([Item::uint(chain_id as u128), Item::uint(0), Item::uint(0)]);
		rlp::encode(&Item::List(fields))
	}

	/// Sign with `private_key` and return the raw transaction and its hash
	pub fn sign(&self, chain_id: u64, private_key: &str) -> Result<SignedTx, ChainError> {
		let secret =
			signing::secret_from_hex(private_key).map_err(|e| ChainError::Signing(e.to_string()))?;
		let digest = keccak256(&self.signing_payload(chain_id));
		let signature = sign_digest(&secret, &digest).map_err(|e| ChainError::Signing(e.to_string()))?;

		let v = signature.recovery_id as u128 + chain_id as u128 * 2 + 35;
		let mut fields = self.fields();
		fields.extend([
			Item::uint(v),
			Item::scalar(&signature.r),
			Item::scalar(&signature.s),
		]);
		let raw = rlp::encode(&Item::List(fields));
		Ok(SignedTx {
			hash: format!("0x{}", hex::encode(keccak256(&raw))),
			raw,
		})
	}
}

pub struct EthereumClient {
	transport: HttpTransport,
	chain_id: u64,
}

impl EthereumClient {
	pub fn new(transport: HttpTransport, chain_id: u64) -> Self {
		Self { transport, chain_id }
	}

	/// Recipient, native value and call data of a transfer
	fn call_parts(transfer: &Transfer) -> Result<([u8; 20], u128, Vec<u8>), ChainError> {
		let recipient = address::decode(&transfer.to)?;
		match &transfer.contract {
			Some(contract) => Ok((
				address::decode(contract)?,
				0,
				abi::transfer_call(&recipient, transfer.amount),
			)),
			None => Ok((recipient, transfer.amount, Vec::new())),
		}
	}

	async fn gas_limit(&self, transfer: &Transfer) -> Result<u128, ChainError> {
		let (to, value, data) = Self::call_parts(transfer)?;
		let from = address::hex(&transfer.from, false)?;
		let call = json!({
			"from": from,
			"to": format!("0x{}", hex::encode(to)),
			"value": hex_quantity(value),
			"data": format!("0x{}", hex::encode(data)),
		});
		let result = self.transport.call("eth_estimateGas", json!([call])).await?;
		quantity(result.as_str().unwrap_or_default())
	}

	async fn receipt(&self, hash: &str) -> Result<Option<RpcReceipt>, ChainError> {
		let result = self
			.transport
			.call("eth_getTransactionReceipt", json!([hash]))
			.await?;
		if result.is_null() {
			return Ok(None);
		}
		parse(result, "receipt").map(Some)
	}
}

#[async_trait]
impl ChainRpc for EthereumClient {
	fn platform(&self) -> Platform {
		Platform::Ethereum
	}

	async fn block_number(&self) -> Result<i64, ChainError> {
		let result = self.transport.call("eth_blockNumber", json!([])).await?;
		let height = quantity(result.as_str().unwrap_or_default())?;
		i64::try_from(height).map_err(|_| ChainError::InvalidResponse(format!("block height {}", height)))
	}

	async fn block_by_number(&self, number: i64) -> Result<Option<Block>, ChainError> {
		let result = self
			.transport
			.call("eth_getBlockByNumber", json!([hex_quantity(number as u128), true]))
			.await?;
		if result.is_null() {
			return Ok(None);
		}
		let block: RpcBlock = parse(result, "block")?;

		let mut transactions = Vec::with_capacity(block.transactions.len());
		for tx in block.transactions {
			// contract creations have no recipient
			let Some(to) = tx.to else { continue };
			let kind = if abi::is_transfer_call(&tx.input) {
				TxKind::Contract
			} else {
				TxKind::Internal
			};
			transactions.push(ChainTx {
				hash: tx.hash.to_ascii_lowercase(),
				from: tx.from.to_ascii_lowercase(),
				to: to.to_ascii_lowercase(),
				value: quantity(&tx.value)?,
				input: tx.input,
				kind,
			});
		}

		Ok(Some(Block {
			number: quantity(&block.number)? as i64,
			transactions,
		}))
	}

	async fn logs_by_tx(&self, hash: &str) -> Result<Option<Log>, ChainError> {
		let Some(receipt) = self.receipt(hash).await? else {
			return Ok(None);
		};
		Ok(receipt
			.logs
			.into_iter()
			.find(|log| log.topics.first().is_some_and(|t| abi::is_transfer_topic(t)))
			.map(|log| Log {
				address: log.address.to_ascii_lowercase(),
				topics: log.topics,
				data: log.data,
			}))
	}

	async fn status(&self, hash: &str) -> Result<bool, ChainError> {
		Ok(match self.receipt(hash).await? {
			Some(receipt) => receipt.status.as_deref() != Some("0x0"),
			None => false,
		})
	}

	async fn gas_price(&self) -> Result<u128, ChainError> {
		let result = self.transport.call("eth_gasPrice", json!([])).await?;
		quantity(result.as_str().unwrap_or_default())
	}

	async fn nonce(&self, account: &str) -> Result<u128, ChainError> {
		let account = address::hex(account, false)?;
		let result = self
			.transport
			.call("eth_getTransactionCount", json!([account, "latest"]))
			.await?;
		quantity(result.as_str().unwrap_or_default())
	}

	async fn estimate_gas(&self, transfer: &Transfer) -> Result<u128, ChainError> {
		let limit = self.gas_limit(transfer).await?;
		let price = self.gas_price().await?;
		limit
			.checked_mul(price)
			.ok_or_else(|| ChainError::Amount(format!("gas {} at {}", limit, price)))
	}

	async fn sign_and_build(&self, transfer: &Transfer) -> Result<SignedTx, ChainError> {
		let (to, value, data) = Self::call_parts(transfer)?;
		let tx = LegacyTx {
			nonce: self.nonce(&transfer.from).await?,
			gas_price: self.gas_price().await?,
			gas_limit: self.gas_limit(transfer).await?,
			to,
			value,
			data,
		};
		tx.sign(self.chain_id, &transfer.private_key)
	}

	async fn broadcast(&self, signed: &SignedTx) -> Result<String, ChainError> {
		let raw = format!("0x{}", hex::encode(&signed.raw));
		let result = self
			.transport
			.call("eth_sendRawTransaction", json!([raw]))
			.await?;
		Ok(result
			.as_str()
			.map(str::to_ascii_lowercase)
			.unwrap_or_else(|| signed.hash.clone()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	// EIP-155 example transaction
	fn example() -> LegacyTx {
		LegacyTx {
			nonce: 9,
			gas_price: 20_000_000_000,
			gas_limit: 21_000,
			to: [0x35; 20],
			value: 1_000_000_000_000_000_000,
			data: Vec::new(),
		}
	}

	const KEY: &str = "0x4646464646464646464646464646464646464646464646464646464646464646";

	#[test]
	fn test_eip155_signing_hash() {
		let payload = example().signing_payload(1);
		assert_eq!(
			hex::encode(&payload),
			"ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
		);
		assert_eq!(
			hex::encode(keccak256(&payload)),
			"daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
		);
	}

	#[test]
	fn test_eip155_signed_transaction() {
		let signed = example().sign(1, KEY).unwrap();
		assert_eq!(
			hex::encode(&signed.raw),
			"f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
		);
		assert_eq!(signed.hash, format!("0x{}", hex::encode(keccak256(&signed.raw))));
	}

	#[test]
	fn test_token_transfer_targets_contract() {
		let transfer = Transfer {
			from: format!("0x{}", "11".repeat(20)),
			private_key: KEY.to_string(),
			to: format!("0x{}", "22".repeat(20)),
			amount: 5,
			contract: Some(format!("0x{}", "33".repeat(20))),
		};
		let (to, value, data) = EthereumClient::call_parts(&transfer).unwrap();
		assert_eq!(to, [0x33; 20]);
		assert_eq!(value, 0);
		assert_eq!(abi::decode_transfer_call(&hex::encode(data)).unwrap(), ([0x22; 20], 5));
	}

	#[test]
	fn test_block_parsing_tags_transfers() {
		let block: RpcBlock = serde_json::from_value(json!({
			"number": "0x10",
			"transactions": [
				{"hash": "0xAA", "from": "0x01", "to": "0x02", "value": "0x0de0b6b3a7640000", "input": "0x"},
				{"hash": "0xbb", "from": "0x01", "to": "0x03", "value": "0x0", "input": "0xa9059cbb00"},
				{"hash": "0xcc", "from": "0x01", "to": null, "value": "0x0", "input": "0x6080"}
			]
		}))
		.unwrap();
		assert_eq!(quantity(&block.number).unwrap(), 16);
		assert_eq!(block.transactions.len(), 3);
		assert!(block.transactions[2].to.is_none());
		assert!(abi::is_transfer_call(&block.transactions[1].input));
		assert_eq!(quantity(&block.transactions[0].value).unwrap(), 1_000_000_000_000_000_000);
	}
}

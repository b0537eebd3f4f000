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

//! Chain clients
//!
//! [`ChainRpc`] is the one interface the scanner, the ladder and the
//! withdrawal engine talk to. [`ChainClient`] implements it for the
//! Ethereum and Tron families; which one is picked follows the chain row's
//! platform. Clients are built per use by a [`ChainConnector`] and hold no
//! state beyond their HTTP transport.

pub mod abi;
pub mod ethereum;
pub mod rlp;
pub mod transport;
pub mod tron;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bourse_sdk::{Chain, Platform, address::AddressError};
use thiserror::Error;
use tracing::debug;

pub use abi::AbiError;
pub use ethereum::EthereumClient;
pub use transport::{HttpTransport, RetryPolicy};
pub use tron::TronClient;

/// Error types for chain operations
#[derive(Debug, Error)]
pub enum ChainError {
	#[error("Connection refused: {0}")]
	ConnectionRefused(String),
	#[error("Network error: {0}")]
	Network(String),
	#[error("RPC error: {0}")]
	Rpc(String),
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	#[error("{operation} is not supported on {platform}")]
	Unsupported {
		platform: Platform,
		operation: &'static str,
	},
	#[error("Signing error: {0}")]
	Signing(String),
	#[error("Amount error: {0}")]
	Amount(String),
	#[error("ABI error: {0}")]
	Abi(#[from] AbiError),
	#[error("Address error: {0}")]
	Address(#[from] AddressError),
}

/// How a transaction moves value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
	/// Native coin transfer
	Internal,
	/// Token contract call
	Contract,
}

/// Transaction as seen in a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTx {
	pub hash: String,
	pub from: String,
	/// Recipient of a native transfer, the token contract of a call
	pub to: String,
	/// Native value in the chain's smallest unit
	pub value: u128,
	/// Call data as hex
	pub input: String,
	pub kind: TxKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
	pub number: i64,
	pub transactions: Vec<ChainTx>,
}

/// `Transfer` event emitted by a token contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
	pub address: String,
	pub topics: Vec<String>,
	pub data: String,
}

/// Outgoing transfer from an exchange wallet
#[derive(Clone)]
pub struct Transfer {
	pub from: String,
	pub private_key: String,
	pub to: String,
	/// Amount in the smallest unit of what is sent
	pub amount: u128,
	/// Token contract; `None` sends the native coin
	pub contract: Option<String>,
}

impl std::fmt::Debug for Transfer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Transfer")
			.field("from", &self.from)
			.field("to", &self.to)
			.field("amount", &self.amount)
			.field("contract", &self.contract)
			.finish_non_exhaustive()
	}
}

/// Signed transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
	pub hash: String,
	/// RLP bytes on Ethereum, the signed JSON document on Tron
	pub raw: Vec<u8>,
}

#[async_trait]
pub trait ChainRpc: Send + Sync {
	fn platform(&self) -> Platform;

	async fn block_number(&self) -> Result<i64, ChainError>;

	/// Block with its transactions; `None` while the block does not exist
	async fn block_by_number(&self, number: i64) -> Result<Option<Block>, ChainError>;

	/// First `Transfer` event of a transaction
	async fn logs_by_tx(&self, hash: &str) -> Result<Option<Log>, ChainError>;

	/// True when the transaction executed successfully; false for a failed
	/// or missing receipt
	async fn status(&self, hash: &str) -> Result<bool, ChainError>;

	async fn gas_price(&self) -> Result<u128, ChainError>;

	async fn nonce(&self, address: &str) -> Result<u128, ChainError>;

	/// Network fee of `transfer` in the native coin's smallest unit
	async fn estimate_gas(&self, transfer: &Transfer) -> Result<u128, ChainError>;

	async fn sign_and_build(&self, transfer: &Transfer) -> Result<SignedTx, ChainError>;

	/// Publish a signed transaction; returns its hash
	async fn broadcast(&self, signed: &SignedTx) -> Result<String, ChainError>;
}

pub enum ChainClient {
	Ethereum(EthereumClient),
	Tron(TronClient),
}

impl ChainClient {
	/// Client for the chain's platform, without probing it
	pub fn new(chain: &Chain, timeout: Duration, retry: RetryPolicy) -> Result<Self, ChainError> {
		let transport = HttpTransport::new(&chain.rpc, timeout, retry)?;
		match chain.platform {
			Platform::Ethereum => Ok(ChainClient::Ethereum(EthereumClient::new(
				transport,
				chain.network as u64,
			))),
			Platform::Tron => Ok(ChainClient::Tron(TronClient::new(transport))),
			other => Err(ChainError::Unsupported {
				platform: other,
				operation: "chain client",
			}),
		}
	}

	fn inner(&self) -> &dyn ChainRpc {
		match self {
			ChainClient::Ethereum(client) => client,
			ChainClient::Tron(client) => client,
		}
	}
}

#[async_trait]
impl ChainRpc for ChainClient {
	fn platform(&self) -> Platform {
		self.inner().platform()
	}

	async fn block_number(&self) -> Result<i64, ChainError> {
		self.inner().block_number().await
	}

	async fn block_by_number(&self, number: i64) -> Result<Option<Block>, ChainError> {
		self.inner().block_by_number(number).await
	}

	async fn logs_by_tx(&self, hash: &str) -> Result<Option<Log>, ChainError> {
		self.inner().logs_by_tx(hash).await
	}

	async fn status(&self, hash: &str) -> Result<bool, ChainError> {
		self.inner().status(hash).await
	}

	async fn gas_price(&self) -> Result<u128, ChainError> {
		self.inner().gas_price().await
	}

	async fn nonce(&self, address: &str) -> Result<u128, ChainError> {
		self.inner().nonce(address).await
	}

	async fn estimate_gas(&self, transfer: &Transfer) -> Result<u128, ChainError> {
		self.inner().estimate_gas(transfer).await
	}

	async fn sign_and_build(&self, transfer: &Transfer) -> Result<SignedTx, ChainError> {
		self.inner().sign_and_build(transfer).await
	}

	async fn broadcast(&self, signed: &SignedTx) -> Result<String, ChainError> {
		self.inner().broadcast(signed).await
	}
}

/// Builds a ready client for a chain row
#[async_trait]
pub trait ChainConnector: Send + Sync {
	/// Fails with [`ChainError::ConnectionRefused`] when the node does not
	/// answer
	async fn connect(&self, chain: &Chain, retry: RetryPolicy) -> Result<Arc<dyn ChainRpc>, ChainError>;
}

/// Connects over HTTP and probes the node with a block-height request
pub struct HttpConnector {
	timeout: Duration,
}

impl HttpConnector {
	pub fn new(timeout: Duration) -> Self {
		Self { timeout }
	}
}

#[async_trait]
impl ChainConnector for HttpConnector {
	async fn connect(&self, chain: &Chain, retry: RetryPolicy) -> Result<Arc<dyn ChainRpc>, ChainError> {
		let client = ChainClient::new(chain, self.timeout, retry)?;
		match client.block_number().await {
			Ok(height) => {
				debug!(target: "chain", chain = chain.id, height, "Connected");
				Ok(Arc::new(client))
			}
			Err(e) => Err(ChainError::ConnectionRefused(format!("{}: {}", chain.name, e))),
		}
	}
}

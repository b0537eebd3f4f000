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

#![allow(dead_code)]

use std::{
	collections::{HashMap, HashSet},
	sync::{
		Arc, Mutex,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};

use async_trait::async_trait;
use bourse_sdk::{
	Asset, AssetGroup, Chain, Contract, Direction, MarketKind, Platform, Protocol, Reserve, Transaction,
	Wallet,
};
use bourse_settlement::{
	Context,
	chains::{Block, ChainConnector, ChainError, ChainRpc, ChainTx, Log, RetryPolicy, SignedTx, Transfer, TxKind, abi},
};
use bourse_store::{
	Events, MemoryPublisher, PriceFeed, PriceOracle, QuoteSource, ReserveKey, StaticQuotes, connect_memory,
	ledger, registry, repo::transactions,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::SqlitePool;

pub const ALICE: i64 = 1;
pub const BOB: i64 = 2;

pub const ALICE_ADDR: &str = "0x1111111111111111111111111111111111111111";
pub const BOB_ADDR: &str = "0x2222222222222222222222222222222222222222";
pub const OUTSIDE_ADDR: &str = "0x9999999999999999999999999999999999999999";
pub const TOKEN_ADDR: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";

/// Wei per ether
pub const ETHER: u128 = 1_000_000_000_000_000_000;

#[derive(Default)]
pub struct FakeState {
	pub height: i64,
	pub blocks: HashMap<i64, Block>,
	pub logs: HashMap<String, Log>,
	pub failed: HashSet<String>,
	/// Fee returned by `estimate_gas`, in wei
	pub gas: u128,
	pub sent: Vec<Transfer>,
	pub broadcast_error: Option<String>,
	/// `logs_by_tx` fails with a network error while set
	pub logs_down: bool,
	/// `block_number` panics while set
	pub crash: bool,
}

/// In-memory node
#[derive(Default)]
pub struct FakeChain {
	pub state: Mutex<FakeState>,
}

impl FakeChain {
	pub fn set_height(&self, height: i64) {
		self.state.lock().unwrap().height = height;
	}

	pub fn push_block(&self, number: i64, transactions: Vec<ChainTx>) {
		let mut state = self.state.lock().unwrap();
		state.blocks.insert(number, Block { number, transactions });
		state.height = state.height.max(number);
	}

	pub fn add_log(&self, hash: &str, log: Log) {
		self.state.lock().unwrap().logs.insert(hash.to_string(), log);
	}

	pub fn fail_tx(&self, hash: &str) {
		self.state.lock().unwrap().failed.insert(hash.to_string());
	}

	pub fn set_gas(&self, wei: u128) {
		self.state.lock().unwrap().gas = wei;
	}

	pub fn break_broadcast(&self, reason: &str) {
		self.state.lock().unwrap().broadcast_error = Some(reason.to_string());
	}

	pub fn set_logs_down(&self, down: bool) {
		self.state.lock().unwrap().logs_down = down;
	}

	pub fn set_crash(&self, crash: bool) {
		self.state.lock().unwrap().crash = crash;
	}

	pub fn sent(&self) -> Vec<Transfer> {
		self.state.lock().unwrap().sent.clone()
	}
}

#[async_trait]
impl ChainRpc for FakeChain {
	fn platform(&self) -> Platform {
		Platform::Ethereum
	}

	async fn block_number(&self) -> Result<i64, ChainError> {
		let (height, crash) = {
			let state = self.state.lock().unwrap();
			(state.height, state.crash)
		};
		if crash {
			panic!("node client crashed");
		}
		Ok(height)
	}

	async fn block_by_number(&self, number: i64) -> Result<Option<Block>, ChainError> {
		Ok(self.state.lock().unwrap().blocks.get(&number).cloned())
	}

	async fn logs_by_tx(&self, hash: &str) -> Result<Option<Log>, ChainError> {
		let state = self.state.lock().unwrap();
		if state.logs_down {
			return Err(ChainError::Network("connection reset".to_string()));
		}
		Ok(state.logs.get(hash).cloned())
	}

	async fn status(&self, hash: &str) -> Result<bool, ChainError> {
		Ok(!self.state.lock().unwrap().failed.contains(hash))
	}

	async fn gas_price(&self) -> Result<u128, ChainError> {
		Ok(1)
	}

	async fn nonce(&self, _address: &str) -> Result<u128, ChainError> {
		Ok(0)
	}

	async fn estimate_gas(&self, _transfer: &Transfer) -> Result<u128, ChainError> {
		Ok(self.state.lock().unwrap().gas)
	}

	async fn sign_and_build(&self, transfer: &Transfer) -> Result<SignedTx, ChainError> {
		let mut state = self.state.lock().unwrap();
		state.sent.push(transfer.clone());
		Ok(SignedTx {
			hash: format!("0xsent{}", state.sent.len()),
			raw: Vec::new(),
		})
	}

	async fn broadcast(&self, signed: &SignedTx) -> Result<String, ChainError> {
		match &self.state.lock().unwrap().broadcast_error {
			Some(reason) => Err(ChainError::Rpc(reason.clone())),
			None => Ok(signed.hash.clone()),
		}
	}
}

/// Hands out the fake node unless told to refuse
pub struct FakeConnector {
	pub chain: Arc<FakeChain>,
	pub refuse: AtomicBool,
}

impl FakeConnector {
	pub fn set_refuse(&self, refuse: bool) {
		self.refuse.store(refuse, Ordering::SeqCst);
	}
}

#[async_trait]
impl ChainConnector for FakeConnector {
	async fn connect(&self, chain: &Chain, _retry: RetryPolicy) -> Result<Arc<dyn ChainRpc>, ChainError> {
		if self.refuse.load(Ordering::SeqCst) {
			return Err(ChainError::ConnectionRefused(chain.name.clone()));
		}
		let node: Arc<dyn ChainRpc> = self.chain.clone();
		Ok(node)
	}
}

pub struct Harness {
	pub ctx: Context,
	pub pool: SqlitePool,
	pub publisher: Arc<MemoryPublisher>,
	pub node: Arc<FakeChain>,
	pub connector: Arc<FakeConnector>,
	pub chain_id: i64,
}

fn asset(symbol: &str, name: &str, chain_id: i64) -> Asset {
	Asset {
		symbol: symbol.to_string(),
		name: name.to_string(),
		group: AssetGroup::Crypto,
		kind: MarketKind::Spot,
		min_withdraw: dec!(0.01),
		max_withdraw: dec!(1000),
		min_trade: Decimal::ZERO,
		max_trade: Decimal::ZERO,
		fees_trade: dec!(0.1),
		fees_discount: Decimal::ZERO,
		fees_charges: Decimal::ZERO,
		chains: vec![chain_id],
		status: true,
	}
}

/// An Ethereum chain at block 10 needing 3 confirmations with a 0.01 eth
/// withdraw fee, eth and usdt (6 decimals, 0.02 eth per transfer) listed
/// on it, deposit wallets for Alice and Bob and eth priced at 2000 usdt
pub async fn setup() -> Harness {
	let pool = connect_memory().await.unwrap();
	let chain_id = {
		let mut conn = pool.acquire().await.unwrap();
		let chain_id = registry::create_chain(
			&mut conn,
			&Chain {
				id: 0,
				name: "Ethereum".to_string(),
				rpc: "http://node.test".to_string(),
				platform: Platform::Ethereum,
				block: 10,
				network: 1,
				confirmation: 3,
				decimals: 18,
				parent_symbol: "eth".to_string(),
				fees: dec!(0.01),
				tag: "ERC20".to_string(),
				status: true,
				alive: true,
			},
		)
		.await
		.unwrap();
		registry::create_asset(&mut conn, &asset("eth", "Ether", chain_id)).await.unwrap();
		registry::create_asset(&mut conn, &asset("usdt", "Tether USD", chain_id)).await.unwrap();
		registry::create_contract(
			&mut conn,
			&Contract {
				id: 0,
				symbol: "usdt".to_string(),
				chain_id,
				address: TOKEN_ADDR.to_string(),
				decimals: 6,
				protocol: Protocol::Erc20,
				fees: dec!(0.02),
			},
		)
		.await
		.unwrap();
		for (user_id, address) in [(ALICE, ALICE_ADDR), (BOB, BOB_ADDR)] {
			registry::import_wallet(
				&mut conn,
				&Wallet {
					id: 0,
					user_id,
					platform: Platform::Ethereum,
					address: address.to_string(),
					private_key: "11".repeat(32),
				},
			)
			.await
			.unwrap();
		}
		chain_id
	};

	let publisher = Arc::new(MemoryPublisher::new());
	let quotes: Vec<Arc<dyn QuoteSource>> =
		vec![Arc::new(StaticQuotes::new("test").with("eth", "usdt", dec!(2000)))];
	let feed: Arc<dyn PriceFeed> = Arc::new(PriceOracle::new(quotes).with_pause(Duration::ZERO));
	let node = Arc::new(FakeChain::default());
	let connector = Arc::new(FakeConnector {
		chain: node.clone(),
		refuse: AtomicBool::new(false),
	});
	let ctx = Context::new(pool.clone(), Events::new(publisher.clone()), connector.clone(), feed);
	Harness {
		ctx,
		pool,
		publisher,
		node,
		connector,
		chain_id,
	}
}

impl Harness {
	pub async fn chain(&self) -> Chain {
		let mut conn = self.pool.acquire().await.unwrap();
		registry::chain_endpoint(&mut conn, self.chain_id).await.unwrap()
	}

	pub async fn fund(&self, user_id: i64, symbol: &str, amount: Decimal) {
		let mut conn = self.pool.acquire().await.unwrap();
		ledger::adjust_balance(&mut conn, user_id, symbol, MarketKind::Spot, amount, Direction::Plus)
			.await
			.unwrap();
	}

	pub async fn balance(&self, user_id: i64, symbol: &str) -> Decimal {
		let mut conn = self.pool.acquire().await.unwrap();
		ledger::balance(&mut conn, user_id, symbol, MarketKind::Spot).await.unwrap()
	}

	/// Put `value` (and `reverse` of it as reverse credit) on a reserve row
	pub async fn seed_reserve(&self, key: &ReserveKey, value: Decimal, reverse: Decimal) {
		let mut conn = self.pool.acquire().await.unwrap();
		ledger::adjust_reserve(&mut conn, key, value, Direction::Plus).await.unwrap();
		if reverse > Decimal::ZERO {
			ledger::adjust_reverse(&mut conn, key, reverse, Direction::Plus).await.unwrap();
		}
	}

	pub async fn reserve(&self, key: &ReserveKey) -> Reserve {
		let mut conn = self.pool.acquire().await.unwrap();
		ledger::reserve(&mut conn, key).await.unwrap().unwrap()
	}

	pub async fn tx(&self, id: i64) -> Transaction {
		let mut conn = self.pool.acquire().await.unwrap();
		transactions::get(&mut conn, id).await.unwrap()
	}

	pub async fn history(&self, user_id: i64) -> Vec<Transaction> {
		let mut conn = self.pool.acquire().await.unwrap();
		transactions::for_user(&mut conn, user_id).await.unwrap()
	}

	pub async fn fees_charges(&self, symbol: &str) -> Decimal {
		let mut conn = self.pool.acquire().await.unwrap();
		registry::query_asset(&mut conn, symbol).await.unwrap().fees_charges
	}
}

pub fn eth_key(user_id: i64, address: &str) -> ReserveKey {
	ReserveKey::new(user_id, "eth", Platform::Ethereum, Protocol::Mainnet, address)
}

pub fn usdt_key(user_id: i64, address: &str) -> ReserveKey {
	ReserveKey::new(user_id, "usdt", Platform::Ethereum, Protocol::Erc20, address)
}

pub fn native_transfer(hash: &str, to: &str, wei: u128) -> ChainTx {
	ChainTx {
		hash: hash.to_string(),
		from: OUTSIDE_ADDR.to_string(),
		to: to.to_string(),
		value: wei,
		input: "0x".to_string(),
		kind: TxKind::Internal,
	}
}

fn topic(address: &str) -> String {
	format!("0x{}{}", "0".repeat(24), address.trim_start_matches("0x"))
}

/// A usdt `transfer` call and its `Transfer` event
pub fn token_transfer(hash: &str, to: &str, amount: u128) -> (ChainTx, Log) {
	let mut recipient = [0u8; 20];
	recipient.copy_from_slice(&hex::decode(to.trim_start_matches("0x")).unwrap());
	let tx = ChainTx {
		hash: hash.to_string(),
		from: OUTSIDE_ADDR.to_string(),
		to: TOKEN_ADDR.to_string(),
		value: 0,
		input: format!("0x{}", hex::encode(abi::transfer_call(&recipient, amount))),
		kind: TxKind::Contract,
	};
	let log = Log {
		address: TOKEN_ADDR.to_string(),
		topics: vec![
			format!("0x{}", abi::TRANSFER_TOPIC),
			topic(OUTSIDE_ADDR),
			topic(to),
		],
		data: format!("0x{}", hex::encode(&abi::transfer_params(&recipient, amount)[32..])),
	};
	(tx, log)
}

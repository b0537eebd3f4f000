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

//! Asset, chain, contract, pair and wallet registry

use bourse_sdk::{
	Asset, Chain, Contract, ExchangeError, MarketKind, Pair, Platform, Wallet, address, keys,
};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use tracing::info;

use crate::error::{Result, StoreError};
use crate::rows;

/// How a caller names a pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairRef {
	Id(i64),
	Symbols { base: String, quote: String },
}

impl PairRef {
	pub fn symbols(base: impl Into<String>, quote: impl Into<String>) -> Self {
		PairRef::Symbols {
			base: base.into(),
			quote: quote.into(),
		}
	}
}

pub async fn query_asset(conn: &mut SqliteConnection, symbol: &str) -> Result<Asset> {
	let row = sqlx::query("SELECT * FROM assets WHERE symbol = ?")
		.bind(symbol.to_ascii_lowercase())
		.fetch_optional(&mut *conn)
		.await?
		.ok_or_else(|| ExchangeError::not_found(format!("asset `{}`", symbol)))?;
	rows::asset(&row)
}

/// Whether `symbol` is listed and enabled; a missing asset counts as
/// disabled
async fn asset_enabled(conn: &mut SqliteConnection, symbol: &str) -> Result<bool> {
	match query_asset(conn, symbol).await {
		Ok(asset) => Ok(asset.status),
		Err(StoreError::Exchange(ExchangeError::NotFound(_))) => Ok(false),
		Err(e) => Err(e),
	}
}

pub async fn assets(conn: &mut SqliteConnection) -> Result<Vec<Asset>> {
	let found = sqlx::query("SELECT * FROM assets ORDER BY symbol")
		.fetch_all(&mut *conn)
		.await?;
	found.iter().map(rows::asset).collect()
}

pub async fn create_asset(conn: &mut SqliteConnection, asset: &Asset) -> Result<()> {
	let symbol = asset.symbol.trim().to_ascii_lowercase();
	if symbol.chars().count() < 2 {
		return Err(ExchangeError::invalid("symbol must have at least 2 characters").into());
	}
	if asset.name.trim().chars().count() < 4 {
		return Err(ExchangeError::invalid("name must have at least 4 characters").into());
	}
	if query_asset(conn, &symbol).await.is_ok() {
		return Err(ExchangeError::AlreadyExists(format!("asset `{}`", symbol)).into());
	}

	sqlx::query(
		"INSERT INTO assets (symbol, name, asset_group, type, min_withdraw, max_withdraw,
			min_trade, max_trade, fees_trade, fees_discount, fees_charges, chains, status)
		 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(&symbol)
	.bind(asset.name.trim())
	.bind(asset.group.as_str())
	.bind(asset.kind.as_str())
	.bind(asset.min_withdraw.to_string())
	.bind(asset.max_withdraw.to_string())
	.bind(asset.min_trade.to_string())
	.bind(asset.max_trade.to_string())
	.bind(asset.fees_trade.to_string())
	.bind(asset.fees_discount.to_string())
	.bind(asset.fees_charges.to_string())
	.bind(serde_json::to_string(&asset.chains)?)
	.bind(asset.status)
	.execute(&mut *conn)
	.await?;

	info!(target: "registry", symbol = %symbol, "Asset created");
	Ok(())
}

/// Add withdrawal fees charged in `symbol` to the asset's accumulator
pub async fn add_fees_charges(
	conn: &mut SqliteConnection,
	symbol: &str,
	amount: Decimal,
) -> Result<Decimal> {
	let asset = query_asset(conn, symbol).await?;
	let total = asset.fees_charges + amount;
	sqlx::query("UPDATE assets SET fees_charges = ? WHERE symbol = ?")
		.bind(total.to_string())
		.bind(&asset.symbol)
		.execute(&mut *conn)
		.await?;
	Ok(total)
}

async fn pair_row(conn: &mut SqliteConnection, pair: &PairRef, kind: MarketKind) -> Result<Pair> {
	let row = match pair {
		PairRef::Id(id) => {
			sqlx::query("SELECT * FROM pairs WHERE id = ?")
				.bind(*id)
				.fetch_optional(&mut *conn)
				.await?
		}
		PairRef::Symbols { base, quote } => {
			sqlx::query("SELECT * FROM pairs WHERE base_unit = ? AND quote_unit = ? AND type = ?")
				.bind(base.to_ascii_lowercase())
				.bind(quote.to_ascii_lowercase())
				.bind(kind.as_str())
				.fetch_optional(&mut *conn)
				.await?
		}
	};
	let row = row.ok_or_else(|| ExchangeError::not_found(format!("pair {:?}", pair)))?;
	rows::pair(&row)
}

/// Look a pair up. Its effective status is false when both of its assets
/// are disabled; with `require_active` an inactive pair is `NotFound`.
pub async fn query_pair(
	conn: &mut SqliteConnection,
	pair: &PairRef,
	kind: MarketKind,
	require_active: bool,
) -> Result<Pair> {
	let mut found = pair_row(conn, pair, kind).await?;
	let base = asset_enabled(conn, &found.base_unit).await?;
	let quote = asset_enabled(conn, &found.quote_unit).await?;
	if !base && !quote {
		found.status = false;
	}
	if require_active && !found.status {
		return Err(ExchangeError::not_found(format!("active pair {}", found.symbol())).into());
	}
	Ok(found)
}

pub async fn pairs(conn: &mut SqliteConnection, kind: Option<MarketKind>) -> Result<Vec<Pair>> {
	let found = match kind {
		Some(kind) => {
			sqlx::query("SELECT * FROM pairs WHERE type = ? ORDER BY id")
				.bind(kind.as_str())
				.fetch_all(&mut *conn)
				.await?
		}
		None => sqlx::query("SELECT * FROM pairs ORDER BY id").fetch_all(&mut *conn).await?,
	};
	found.iter().map(rows::pair).collect()
}

pub async fn set_pair_price(conn: &mut SqliteConnection, pair_id: i64, price: Decimal) -> Result<()> {
	sqlx::query("UPDATE pairs SET price = ? WHERE id = ?")
		.bind(price.to_string())
		.bind(pair_id)
		.execute(&mut *conn)
		.await?;
	Ok(())
}

/// Register a pair. The same two units may not be listed twice for one
/// market type, in either order.
pub async fn create_pair(conn: &mut SqliteConnection, pair: &Pair) -> Result<i64> {
	let base = pair.base_unit.trim().to_ascii_lowercase();
	let quote = pair.quote_unit.trim().to_ascii_lowercase();
	if base == quote {
		return Err(ExchangeError::invalid("base and quote must differ").into());
	}
	query_asset(conn, &base).await?;
	query_asset(conn, &quote).await?;

	let duplicate = sqlx::query(
		"SELECT id FROM pairs WHERE type = ?
		 AND ((base_unit = ? AND quote_unit = ?) OR (base_unit = ? AND quote_unit = ?))",
	)
	.bind(pair.kind.as_str())
	.bind(&base)
	.bind(&quote)
	.bind(&quote)
	.bind(&base)
	.fetch_optional(&mut *conn)
	.await?;
	if duplicate.is_some() {
		return Err(ExchangeError::DuplicatePair { base, quote }.into());
	}

	let id = sqlx::query(
		"INSERT INTO pairs (base_unit, quote_unit, base_decimal, quote_decimal, price, type, status)
		 VALUES (?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(&base)
	.bind(&quote)
	.bind(pair.base_decimal as i64)
	.bind(pair.quote_decimal as i64)
	.bind(pair.price.to_string())
	.bind(pair.kind.as_str())
	.bind(pair.status)
	.execute(&mut *conn)
	.await?
	.last_insert_rowid();

	info!(target: "registry", id, base = %base, quote = %quote, kind = %pair.kind, "Pair created");
	Ok(id)
}

async fn chain_row(conn: &mut SqliteConnection, id: i64, require_active: bool) -> Result<Chain> {
	let row = sqlx::query("SELECT * FROM chains WHERE id = ?")
		.bind(id)
		.fetch_optional(&mut *conn)
		.await?
		.ok_or_else(|| ExchangeError::not_found(format!("chain {}", id)))?;
	let chain = rows::chain(&row)?;
	if require_active && !chain.status {
		return Err(ExchangeError::not_found(format!("active chain {}", id)).into());
	}
	Ok(chain)
}

/// Chain parameters for callers outside the core; the rpc endpoint is
/// stripped.
pub async fn query_chain(conn: &mut SqliteConnection, id: i64, require_active: bool) -> Result<Chain> {
	Ok(chain_row(conn, id, require_active).await?.redacted())
}

/// Chain including its rpc endpoint, for the settlement loops only
pub async fn chain_endpoint(conn: &mut SqliteConnection, id: i64) -> Result<Chain> {
	chain_row(conn, id, false).await
}

/// Enabled chains including their rpc endpoints, for the settlement loops
pub async fn active_chains(conn: &mut SqliteConnection) -> Result<Vec<Chain>> {
	let found = sqlx::query("SELECT * FROM chains WHERE status = 1 ORDER BY id")
		.fetch_all(&mut *conn)
		.await?;
	found.iter().map(rows::chain).collect()
}

pub async fn create_chain(conn: &mut SqliteConnection, chain: &Chain) -> Result<i64> {
	if chain.name.trim().chars().count() < 4 {
		return Err(ExchangeError::invalid("chain name must have at least 4 characters").into());
	}
	if chain.parent_symbol.trim().chars().count() < 2 {
		return Err(ExchangeError::invalid("parent symbol must have at least 2 characters").into());
	}
	if chain.confirmation < 0 || chain.block < 0 {
		return Err(ExchangeError::invalid("block and confirmation must not be negative").into());
	}

	let id = sqlx::query(
		"INSERT INTO chains (name, rpc, platform, block, network, confirmation, decimals,
			parent_symbol, fees, tag, status, alive)
		 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(chain.name.trim())
	.bind(chain.rpc.trim())
	.bind(chain.platform.as_str())
	.bind(chain.block)
	.bind(chain.network)
	.bind(chain.confirmation)
	.bind(chain.decimals as i64)
	.bind(chain.parent_symbol.trim().to_ascii_lowercase())
	.bind(chain.fees.to_string())
	.bind(&chain.tag)
	.bind(chain.status)
	.bind(chain.alive)
	.execute(&mut *conn)
	.await?
	.last_insert_rowid();

	info!(target: "registry", id, name = %chain.name, platform = %chain.platform, "Chain created");
	Ok(id)
}

/// Persist the scanner cursor
pub async fn set_chain_block(conn: &mut SqliteConnection, id: i64, block: i64) -> Result<()> {
	sqlx::query("UPDATE chains SET block = ? WHERE id = ?")
		.bind(block)
		.bind(id)
		.execute(&mut *conn)
		.await?;
	Ok(())
}

/// Record the prober's verdict; returns true when the flag changed
pub async fn set_chain_alive(conn: &mut SqliteConnection, id: i64, alive: bool) -> Result<bool> {
	let changed = sqlx::query("UPDATE chains SET alive = ? WHERE id = ? AND alive != ?")
		.bind(alive)
		.bind(id)
		.bind(alive)
		.execute(&mut *conn)
		.await?
		.rows_affected();
	Ok(changed > 0)
}

/// Token parameters; an empty stored protocol reads as `mainnet`
pub async fn query_contract(
	conn: &mut SqliteConnection,
	symbol: &str,
	chain_id: i64,
) -> Result<Contract> {
	let row = sqlx::query("SELECT * FROM contracts WHERE symbol = ? AND chain_id = ?")
		.bind(symbol.to_ascii_lowercase())
		.bind(chain_id)
		.fetch_optional(&mut *conn)
		.await?
		.ok_or_else(|| {
			ExchangeError::not_found(format!("contract `{}` on chain {}", symbol, chain_id))
		})?;
	rows::contract(&row)
}

/// Token deployed at `contract_address` on any chain of `platform`
pub async fn query_contract_by_address(
	conn: &mut SqliteConnection,
	contract_address: &str,
	platform: Platform,
) -> Result<Option<Contract>> {
	let Ok(canonical) = address::canonical(platform, contract_address) else {
		return Ok(None);
	};
	let row = sqlx::query(
		"SELECT c.* FROM contracts c JOIN chains ch ON ch.id = c.chain_id
		 WHERE c.address = ? AND ch.platform = ?",
	)
	.bind(canonical)
	.bind(platform.as_str())
	.fetch_optional(&mut *conn)
	.await?;
	row.as_ref().map(rows::contract).transpose()
}

pub async fn create_contract(conn: &mut SqliteConnection, contract: &Contract) -> Result<i64> {
	let chain = chain_row(conn, contract.chain_id, false).await?;
	let symbol = contract.symbol.trim().to_ascii_lowercase();
	query_asset(conn, &symbol).await?;
	let canonical = address::canonical(chain.platform, &contract.address)
		.map_err(|e| ExchangeError::invalid(format!("contract address: {}", e)))?;

	let id = sqlx::query(
		"INSERT INTO contracts (symbol, chain_id, address, decimals, protocol, fees)
		 VALUES (?, ?, ?, ?, ?, ?)",
	)
	.bind(&symbol)
	.bind(contract.chain_id)
	.bind(&canonical)
	.bind(contract.decimals as i64)
	.bind(contract.protocol.as_str())
	.bind(contract.fees.to_string())
	.execute(&mut *conn)
	.await
	.map_err(|e| match e {
		sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::from(
			ExchangeError::AlreadyExists(format!("contract `{}` on chain {}", symbol, chain.id)),
		),
		other => other.into(),
	})?
	.last_insert_rowid();

	info!(target: "registry", id, symbol = %symbol, chain = chain.id, "Contract created");
	Ok(id)
}

/// Exchange-held wallet at `address`, if any
pub async fn wallet(
	conn: &mut SqliteConnection,
	wallet_address: &str,
	platform: Platform,
) -> Result<Option<Wallet>> {
	let canonical =
		address::canonical(platform, wallet_address).unwrap_or_else(|_| wallet_address.to_string());
	let row = sqlx::query("SELECT * FROM wallets WHERE address = ? AND platform = ?")
		.bind(canonical)
		.bind(platform.as_str())
		.fetch_optional(&mut *conn)
		.await?;
	row.as_ref().map(rows::wallet).transpose()
}

pub async fn wallet_of_user(
	conn: &mut SqliteConnection,
	user_id: i64,
	platform: Platform,
) -> Result<Option<Wallet>> {
	let row = sqlx::query("SELECT * FROM wallets WHERE user_id = ? AND platform = ? ORDER BY id LIMIT 1")
		.bind(user_id)
		.bind(platform.as_str())
		.fetch_optional(&mut *conn)
		.await?;
	row.as_ref().map(rows::wallet).transpose()
}

/// Return the user's deposit wallet on `platform`, deriving a fresh
/// keypair on first use
pub async fn create_wallet(
	conn: &mut SqliteConnection,
	user_id: i64,
	platform: Platform,
) -> Result<Wallet> {
	if let Some(existing) = wallet_of_user(conn, user_id, platform).await? {
		return Ok(existing);
	}

	let phrase = keys::generate_mnemonic().map_err(ExchangeError::invalid)?;
	let account = keys::derive(&phrase, platform).map_err(ExchangeError::invalid)?;

	let id = sqlx::query(
		"INSERT INTO wallets (user_id, platform, address, private_key) VALUES (?, ?, ?, ?)",
	)
	.bind(user_id)
	.bind(platform.as_str())
	.bind(&account.address)
	.bind(account.private_key_hex())
	.execute(&mut *conn)
	.await?
	.last_insert_rowid();

	info!(target: "registry", id, user_id, platform = %platform, address = %account.address, "Wallet created");
	Ok(Wallet {
		id,
		user_id,
		platform,
		private_key: account.private_key_hex(),
		address: account.address,
	})
}

/// Insert a wallet with a known key, e.g. an imported hot wallet
pub async fn import_wallet(conn: &mut SqliteConnection, wallet: &Wallet) -> Result<i64> {
	let canonical = address::canonical(wallet.platform, &wallet.address)
		.map_err(|e| ExchangeError::invalid(format!("wallet address: {}", e)))?;
	let id = sqlx::query(
		"INSERT INTO wallets (user_id, platform, address, private_key) VALUES (?, ?, ?, ?)",
	)
	.bind(wallet.user_id)
	.bind(wallet.platform.as_str())
	.bind(canonical)
	.bind(&wallet.private_key)
	.execute(&mut *conn)
	.await?
	.last_insert_rowid();
	Ok(id)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::db;
	use bourse_sdk::{AssetGroup, Protocol};
	use rust_decimal_macros::dec;

	pub(crate) fn asset(symbol: &str) -> Asset {
		Asset {
			symbol: symbol.to_string(),
			name: format!("{} coin", symbol),
			group: AssetGroup::Crypto,
			kind: MarketKind::Spot,
			min_withdraw: dec!(0.01),
			max_withdraw: dec!(1000),
			min_trade: dec!(0.0001),
			max_trade: dec!(100000),
			fees_trade: dec!(0.1),
			fees_discount: Decimal::ZERO,
			fees_charges: Decimal::ZERO,
			chains: vec![1],
			status: true,
		}
	}

	fn pair(base: &str, quote: &str) -> Pair {
		Pair {
			id: 0,
			base_unit: base.to_string(),
			quote_unit: quote.to_string(),
			base_decimal: 8,
			quote_decimal: 2,
			price: dec!(100),
			kind: MarketKind::Spot,
			status: true,
		}
	}

	fn chain() -> Chain {
		Chain {
			id: 0,
			name: "Ethereum".to_string(),
			rpc: "http://node:8545".to_string(),
			platform: Platform::Ethereum,
			block: 100,
			network: 1,
			confirmation: 12,
			decimals: 18,
			parent_symbol: "eth".to_string(),
			fees: dec!(0.01),
			tag: String::new(),
			status: true,
			alive: true,
		}
	}

	#[tokio::test]
	async fn test_asset_validation() {
		let pool = db::connect_memory().await.unwrap();
		let mut conn = pool.acquire().await.unwrap();

		let mut short = asset("b");
		let err = create_asset(&mut conn, &short).await.unwrap_err();
		assert!(matches!(err.exchange(), Some(ExchangeError::InvalidInput(_))));

		short.symbol = "btc".to_string();
		short.name = "btc".to_string();
		assert!(create_asset(&mut conn, &short).await.is_err());

		create_asset(&mut conn, &asset("BTC")).await.unwrap();
		let stored = query_asset(&mut conn, "btc").await.unwrap();
		assert_eq!(stored.chains, vec![1]);
		let err = create_asset(&mut conn, &asset("btc")).await.unwrap_err();
		assert!(matches!(err.exchange(), Some(ExchangeError::AlreadyExists(_))));
	}

	#[tokio::test]
	async fn test_duplicate_pair_either_direction() {
		let pool = db::connect_memory().await.unwrap();
		let mut conn = pool.acquire().await.unwrap();
		create_asset(&mut conn, &asset("btc")).await.unwrap();
		create_asset(&mut conn, &asset("usdt")).await.unwrap();

		create_pair(&mut conn, &pair("btc", "usdt")).await.unwrap();
		let err = create_pair(&mut conn, &pair("usdt", "btc")).await.unwrap_err();
		assert!(matches!(err.exchange(), Some(ExchangeError::DuplicatePair { .. })));

		let mut cross = pair("btc", "usdt");
		cross.kind = MarketKind::Cross;
		assert!(create_pair(&mut conn, &cross).await.is_ok());
	}

	#[tokio::test]
	async fn test_pair_inactive_when_both_assets_disabled() {
		let pool = db::connect_memory().await.unwrap();
		let mut conn = pool.acquire().await.unwrap();
		let mut btc = asset("btc");
		btc.status = false;
		let mut usdt = asset("usdt");
		usdt.status = false;
		create_asset(&mut conn, &btc).await.unwrap();
		create_asset(&mut conn, &usdt).await.unwrap();
		let id = create_pair(&mut conn, &pair("btc", "usdt")).await.unwrap();

		let found = query_pair(&mut conn, &PairRef::Id(id), MarketKind::Spot, false)
			.await
			.unwrap();
		assert!(!found.status);
		let err = query_pair(&mut conn, &PairRef::symbols("btc", "usdt"), MarketKind::Spot, true)
			.await
			.unwrap_err();
		assert!(matches!(err.exchange(), Some(ExchangeError::NotFound(_))));
	}

	#[tokio::test]
	async fn test_pair_lookup_surfaces_unreadable_asset() {
		let pool = db::connect_memory().await.unwrap();
		let mut conn = pool.acquire().await.unwrap();
		create_asset(&mut conn, &asset("btc")).await.unwrap();
		create_asset(&mut conn, &asset("usdt")).await.unwrap();
		let id = create_pair(&mut conn, &pair("btc", "usdt")).await.unwrap();
		sqlx::query("UPDATE assets SET chains = 'garbage' WHERE symbol = 'btc'")
			.execute(&mut *conn)
			.await
			.unwrap();

		let err = query_pair(&mut conn, &PairRef::Id(id), MarketKind::Spot, false)
			.await
			.unwrap_err();
		assert!(matches!(err, StoreError::Corrupt { .. }));
	}

	#[tokio::test]
	async fn test_chain_rpc_is_redacted() {
		let pool = db::connect_memory().await.unwrap();
		let mut conn = pool.acquire().await.unwrap();
		let id = create_chain(&mut conn, &chain()).await.unwrap();
		assert!(query_chain(&mut conn, id, true).await.unwrap().rpc.is_empty());
		assert_eq!(chain_endpoint(&mut conn, id).await.unwrap().rpc, "http://node:8545");
	}

	#[tokio::test]
	async fn test_contract_lookup() {
		let pool = db::connect_memory().await.unwrap();
		let mut conn = pool.acquire().await.unwrap();
		create_asset(&mut conn, &asset("usdt")).await.unwrap();
		let chain_id = create_chain(&mut conn, &chain()).await.unwrap();
		create_contract(
			&mut conn,
			&Contract {
				id: 0,
				symbol: "usdt".to_string(),
				chain_id,
				address: "0xDAC17F958D2EE523A2206206994597C13D831EC7".to_string(),
				decimals: 6,
				protocol: Protocol::Erc20,
				fees: dec!(0.002),
			},
		)
		.await
		.unwrap();

		let found = query_contract_by_address(
			&mut conn,
			"0xdac17f958d2ee523a2206206994597c13d831ec7",
			Platform::Ethereum,
		)
		.await
		.unwrap()
		.unwrap();
		assert_eq!(found.symbol, "usdt");
		assert!(
			query_contract_by_address(&mut conn, &found.address, Platform::Tron)
				.await
				.unwrap()
				.is_none()
		);
		let err = query_contract(&mut conn, "usdt", chain_id + 1).await.unwrap_err();
		assert!(matches!(err.exchange(), Some(ExchangeError::NotFound(_))));
	}

	#[tokio::test]
	async fn test_empty_protocol_reads_as_mainnet() {
		let pool = db::connect_memory().await.unwrap();
		let mut conn = pool.acquire().await.unwrap();
		sqlx::query(
			"INSERT INTO contracts (symbol, chain_id, address, decimals, protocol, fees)
			 VALUES ('eth', 1, '0x00', 18, '', '0')",
		)
		.execute(&mut *conn)
		.await
		.unwrap();
		let found = query_contract(&mut conn, "eth", 1).await.unwrap();
		assert_eq!(found.protocol, Protocol::Mainnet);
	}

	#[tokio::test]
	async fn test_create_wallet_is_stable() {
		let pool = db::connect_memory().await.unwrap();
		let mut conn = pool.acquire().await.unwrap();
		let first = create_wallet(&mut conn, 3, Platform::Tron).await.unwrap();
		let again = create_wallet(&mut conn, 3, Platform::Tron).await.unwrap();
		assert_eq!(first.address, again.address);
		let found = wallet(&mut conn, &first.address, Platform::Tron).await.unwrap().unwrap();
		assert_eq!(found.user_id, 3);
		assert_eq!(found.private_key, first.private_key);
		assert_eq!(first.private_key.len(), 64);
	}
}

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

//! Row decoders for the entity tables

use std::str::FromStr;

use bourse_sdk::{
	Asset, Balance, Candle, Chain, Contract, FutureOrder, Order, Pair, Protocol, Reserve,
	Trade, Transaction, Wallet,
};
use rust_decimal::Decimal;
use sqlx::{Row, sqlite::SqliteRow};

use crate::error::{Result, StoreError};

pub(crate) fn decimal(row: &SqliteRow, column: &str) -> Result<Decimal> {
	let raw: String = row.try_get(column)?;
	Decimal::from_str(raw.trim()).map_err(|e| StoreError::corrupt(column, e))
}

pub(crate) fn tag<T>(row: &SqliteRow, column: &str) -> Result<T>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	let raw: String = row.try_get(column)?;
	raw.parse().map_err(|e| StoreError::corrupt(column, e))
}

fn flag(row: &SqliteRow, column: &str) -> Result<bool> {
	Ok(row.try_get::<i64, _>(column)? != 0)
}

fn small(row: &SqliteRow, column: &str) -> Result<u32> {
	let raw: i64 = row.try_get(column)?;
	u32::try_from(raw).map_err(|e| StoreError::corrupt(column, e))
}

pub(crate) fn asset(row: &SqliteRow) -> Result<Asset> {
	let chains: String = row.try_get("chains")?;
	Ok(Asset {
		symbol: row.try_get("symbol")?,
		name: row.try_get("name")?,
		group: tag(row, "asset_group")?,
		kind: tag(row, "type")?,
		min_withdraw: decimal(row, "min_withdraw")?,
		max_withdraw: decimal(row, "max_withdraw")?,
		min_trade: decimal(row, "min_trade")?,
		max_trade: decimal(row, "max_trade")?,
		fees_trade: decimal(row, "fees_trade")?,
		fees_discount: decimal(row, "fees_discount")?,
		fees_charges: decimal(row, "fees_charges")?,
		chains: serde_json::from_str(&chains).map_err(|e| StoreError::corrupt("chains", e))?,
		status: flag(row, "status")?,
	})
}

pub(crate) fn chain(row: &SqliteRow) -> Result<Chain> {
	Ok(Chain {
		id: row.try_get("id")?,
		name: row.try_get("name")?,
		rpc: row.try_get("rpc")?,
		platform: tag(row, "platform")?,
		block: row.try_get("block")?,
		network: row.try_get("network")?,
		confirmation: row.try_get("confirmation")?,
		decimals: small(row, "decimals")?,
		parent_symbol: row.try_get("parent_symbol")?,
		fees: decimal(row, "fees")?,
		tag: row.try_get("tag")?,
		status: flag(row, "status")?,
		alive: flag(row, "alive")?,
	})
}

pub(crate) fn contract(row: &SqliteRow) -> Result<Contract> {
	let protocol: String = row.try_get("protocol")?;
	Ok(Contract {
		id: row.try_get("id")?,
		symbol: row.try_get("symbol")?,
		chain_id: row.try_get("chain_id")?,
		address: row.try_get("address")?,
		decimals: small(row, "decimals")?,
		protocol: Protocol::parse_or_mainnet(&protocol)
			.map_err(|e| StoreError::corrupt("protocol", e))?,
		fees: decimal(row, "fees")?,
	})
}

pub(crate) fn pair(row: &SqliteRow) -> Result<Pair> {
	Ok(Pair {
		id: row.try_get("id")?,
		base_unit: row.try_get("base_unit")?,
		quote_unit: row.try_get("quote_unit")?,
		base_decimal: small(row, "base_decimal")?,
		quote_decimal: small(row, "quote_decimal")?,
		price: decimal(row, "price")?,
		kind: tag(row, "type")?,
		status: flag(row, "status")?,
	})
}

pub(crate) fn order(row: &SqliteRow) -> Result<Order> {
	Ok(Order {
		id: row.try_get("id")?,
		user_id: row.try_get("user_id")?,
		base_unit: row.try_get("base_unit")?,
		quote_unit: row.try_get("quote_unit")?,
		price: decimal(row, "price")?,
		quantity: decimal(row, "quantity")?,
		value: decimal(row, "value")?,
		assigning: tag(row, "assigning")?,
		trading: tag(row, "trading")?,
		kind: tag(row, "type")?,
		status: tag(row, "status")?,
		create_at: row.try_get("create_at")?,
	})
}

pub(crate) fn future(row: &SqliteRow) -> Result<FutureOrder> {
	Ok(FutureOrder {
		id: row.try_get("id")?,
		user_id: row.try_get("user_id")?,
		base_unit: row.try_get("base_unit")?,
		quote_unit: row.try_get("quote_unit")?,
		price: decimal(row, "price")?,
		quantity: decimal(row, "quantity")?,
		value: decimal(row, "value")?,
		leverage: small(row, "leverage")?,
		position: tag(row, "position")?,
		assigning: tag(row, "assigning")?,
		trading: tag(row, "trading")?,
		status: tag(row, "status")?,
		parent: row.try_get("parent")?,
		settled: decimal(row, "settled")?,
		entry: decimal(row, "entry")?,
		create_at: row.try_get("create_at")?,
	})
}

pub(crate) fn trade(row: &SqliteRow) -> Result<Trade> {
	Ok(Trade {
		id: row.try_get("id")?,
		order_id: row.try_get("order_id")?,
		assigning: tag(row, "assigning")?,
		user_id: row.try_get("user_id")?,
		counterparty: row.try_get("counterparty")?,
		base_unit: row.try_get("base_unit")?,
		quote_unit: row.try_get("quote_unit")?,
		price: decimal(row, "price")?,
		quantity: decimal(row, "quantity")?,
		fees: decimal(row, "fees")?,
		maker: flag(row, "maker")?,
		kind: tag(row, "type")?,
		create_at: row.try_get("create_at")?,
	})
}

pub(crate) fn balance(row: &SqliteRow) -> Result<Balance> {
	Ok(Balance {
		user_id: row.try_get("user_id")?,
		symbol: row.try_get("symbol")?,
		kind: tag(row, "type")?,
		value: decimal(row, "value")?,
	})
}

pub(crate) fn reserve(row: &SqliteRow) -> Result<Reserve> {
	Ok(Reserve {
		id: row.try_get("id")?,
		user_id: row.try_get("user_id")?,
		symbol: row.try_get("symbol")?,
		platform: tag(row, "platform")?,
		protocol: tag(row, "protocol")?,
		address: row.try_get("address")?,
		value: decimal(row, "value")?,
		reverse: decimal(row, "reverse")?,
		lock: flag(row, "lock")?,
	})
}

pub(crate) fn wallet(row: &SqliteRow) -> Result<Wallet> {
	Ok(Wallet {
		id: row.try_get("id")?,
		user_id: row.try_get("user_id")?,
		platform: tag(row, "platform")?,
		address: row.try_get("address")?,
		private_key: row.try_get("private_key")?,
	})
}

pub(crate) fn transaction(row: &SqliteRow) -> Result<Transaction> {
	Ok(Transaction {
		id: row.try_get("id")?,
		hash: row.try_get("hash")?,
		symbol: row.try_get("symbol")?,
		value: decimal(row, "value")?,
		fees: decimal(row, "fees")?,
		confirmation: row.try_get("confirmation")?,
		address: row.try_get("address")?,
		chain_id: row.try_get("chain_id")?,
		block: row.try_get("block")?,
		user_id: row.try_get("user_id")?,
		assignment: tag(row, "assignment")?,
		group: tag(row, "asset_group")?,
		platform: tag(row, "platform")?,
		protocol: tag(row, "protocol")?,
		allocation: tag(row, "allocation")?,
		parent: row.try_get("parent")?,
		status: tag(row, "status")?,
		repayment: flag(row, "repayment")?,
		hook: flag(row, "hook")?,
		error: row.try_get("error")?,
		create_at: row.try_get("create_at")?,
	})
}

pub(crate) fn candle(row: &SqliteRow) -> Result<Candle> {
	Ok(Candle {
		base_unit: row.try_get("base_unit")?,
		quote_unit: row.try_get("quote_unit")?,
		resolution: tag(row, "resolution")?,
		time: row.try_get("time")?,
		open: decimal(row, "open")?,
		close: decimal(row, "close")?,
		low: decimal(row, "low")?,
		high: decimal(row, "high")?,
		volume: decimal(row, "volume")?,
		price: decimal(row, "price")?,
		trades: row.try_get("trades")?,
	})
}

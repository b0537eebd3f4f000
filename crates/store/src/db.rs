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

//! Connection pool and schema
//!
//! Decimals are stored as TEXT and parsed with `rust_decimal`; enums are
//! stored as their lowercase tag. The schema is created idempotently.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{
	SqlitePool,
	sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::info;

use crate::error::Result;

/// Database connection settings shared by the service binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
	/// SQLite URL, e.g. `sqlite://bourse.db`
	pub url: String,
	/// Pool size. Every operation runs in one transaction on one
	/// connection, so a single connection serializes all writers.
	pub max_connections: u32,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			url: "sqlite://bourse.db".to_string(),
			max_connections: 1,
		}
	}
}

/// Open the pool and create any missing tables
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
	let options = SqliteConnectOptions::from_str(&config.url)?
		.create_if_missing(true)
		.foreign_keys(false);

	let pool = SqlitePoolOptions::new()
		.max_connections(config.max_connections.max(1))
		.idle_timeout(None)
		.max_lifetime(None)
		.connect_with(options)
		.await?;

	migrate(&pool).await?;
	info!(target: "store", url = %config.url, "Database ready");
	Ok(pool)
}

/// In-memory database for tests and dry runs
pub async fn connect_memory() -> Result<SqlitePool> {
	connect(&DatabaseConfig {
		url: "sqlite::memory:".to_string(),
		max_connections: 1,
	})
	.await
}

const SCHEMA: &[&str] = &[
	"CREATE TABLE IF NOT EXISTS assets (
		symbol TEXT PRIMARY KEY,
		name TEXT NOT NULL,
		asset_group TEXT NOT NULL,
		type TEXT NOT NULL,
		min_withdraw TEXT NOT NULL DEFAULT '0',
		max_withdraw TEXT NOT NULL DEFAULT '0',
		min_trade TEXT NOT NULL DEFAULT '0',
		max_trade TEXT NOT NULL DEFAULT '0',
		fees_trade TEXT NOT NULL DEFAULT '0',
		fees_discount TEXT NOT NULL DEFAULT '0',
		fees_charges TEXT NOT NULL DEFAULT '0',
		chains TEXT NOT NULL DEFAULT '[]',
		status INTEGER NOT NULL DEFAULT 1
	)",
	"CREATE TABLE IF NOT EXISTS chains (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		name TEXT NOT NULL,
		rpc TEXT NOT NULL,
		platform TEXT NOT NULL,
		block INTEGER NOT NULL DEFAULT 0,
		network INTEGER NOT NULL DEFAULT 0,
		confirmation INTEGER NOT NULL DEFAULT 0,
		decimals INTEGER NOT NULL DEFAULT 18,
		parent_symbol TEXT NOT NULL,
		fees TEXT NOT NULL DEFAULT '0',
		tag TEXT NOT NULL DEFAULT '',
		status INTEGER NOT NULL DEFAULT 1,
		alive INTEGER NOT NULL DEFAULT 1
	)",
	"CREATE TABLE IF NOT EXISTS contracts (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		symbol TEXT NOT NULL,
		chain_id INTEGER NOT NULL,
		address TEXT NOT NULL,
		decimals INTEGER NOT NULL,
		protocol TEXT NOT NULL DEFAULT '',
		fees TEXT NOT NULL DEFAULT '0',
		UNIQUE (symbol, chain_id)
	)",
	"CREATE TABLE IF NOT EXISTS pairs (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		base_unit TEXT NOT NULL,
		quote_unit TEXT NOT NULL,
		base_decimal INTEGER NOT NULL DEFAULT 8,
		quote_decimal INTEGER NOT NULL DEFAULT 8,
		price TEXT NOT NULL DEFAULT '0',
		type TEXT NOT NULL,
		status INTEGER NOT NULL DEFAULT 1
	)",
	"CREATE TABLE IF NOT EXISTS orders (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		user_id INTEGER NOT NULL,
		base_unit TEXT NOT NULL,
		quote_unit TEXT NOT NULL,
		price TEXT NOT NULL,
		quantity TEXT NOT NULL,
		value TEXT NOT NULL,
		assigning TEXT NOT NULL,
		trading TEXT NOT NULL,
		type TEXT NOT NULL,
		status TEXT NOT NULL,
		create_at INTEGER NOT NULL
	)",
	"CREATE TABLE IF NOT EXISTS futures (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		user_id INTEGER NOT NULL,
		base_unit TEXT NOT NULL,
		quote_unit TEXT NOT NULL,
		price TEXT NOT NULL,
		quantity TEXT NOT NULL,
		value TEXT NOT NULL,
		leverage INTEGER NOT NULL,
		position TEXT NOT NULL,
		assigning TEXT NOT NULL,
		trading TEXT NOT NULL,
		status TEXT NOT NULL,
		parent INTEGER,
		settled TEXT NOT NULL DEFAULT '0',
		entry TEXT NOT NULL DEFAULT '0',
		create_at INTEGER NOT NULL
	)",
	"CREATE TABLE IF NOT EXISTS trades (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		order_id INTEGER NOT NULL,
		assigning TEXT NOT NULL,
		user_id INTEGER NOT NULL,
		counterparty INTEGER NOT NULL,
		base_unit TEXT NOT NULL,
		quote_unit TEXT NOT NULL,
		price TEXT NOT NULL,
		quantity TEXT NOT NULL,
		fees TEXT NOT NULL,
		maker INTEGER NOT NULL,
		type TEXT NOT NULL,
		create_at INTEGER NOT NULL
	)",
	"CREATE TABLE IF NOT EXISTS balances (
		user_id INTEGER NOT NULL,
		symbol TEXT NOT NULL,
		type TEXT NOT NULL,
		value TEXT NOT NULL DEFAULT '0',
		PRIMARY KEY (user_id, symbol, type)
	)",
	"CREATE TABLE IF NOT EXISTS reserves (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		user_id INTEGER NOT NULL,
		symbol TEXT NOT NULL,
		platform TEXT NOT NULL,
		protocol TEXT NOT NULL,
		address TEXT NOT NULL,
		value TEXT NOT NULL DEFAULT '0',
		reverse TEXT NOT NULL DEFAULT '0',
		lock INTEGER NOT NULL DEFAULT 0,
		UNIQUE (user_id, symbol, platform, protocol, address)
	)",
	"CREATE TABLE IF NOT EXISTS wallets (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		user_id INTEGER NOT NULL,
		platform TEXT NOT NULL,
		address TEXT NOT NULL,
		private_key TEXT NOT NULL,
		UNIQUE (platform, address)
	)",
	"CREATE TABLE IF NOT EXISTS transactions (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		hash TEXT NOT NULL,
		symbol TEXT NOT NULL,
		value TEXT NOT NULL,
		fees TEXT NOT NULL DEFAULT '0',
		confirmation INTEGER NOT NULL DEFAULT 0,
		address TEXT NOT NULL,
		chain_id INTEGER NOT NULL,
		block INTEGER NOT NULL DEFAULT 0,
		user_id INTEGER NOT NULL,
		assignment TEXT NOT NULL,
		asset_group TEXT NOT NULL,
		platform TEXT NOT NULL,
		protocol TEXT NOT NULL,
		allocation TEXT NOT NULL,
		parent INTEGER,
		status TEXT NOT NULL,
		repayment INTEGER NOT NULL DEFAULT 0,
		hook INTEGER NOT NULL DEFAULT 0,
		error TEXT,
		create_at INTEGER NOT NULL,
		UNIQUE (hash, assignment)
	)",
	"CREATE TABLE IF NOT EXISTS ohlcv (
		base_unit TEXT NOT NULL,
		quote_unit TEXT NOT NULL,
		resolution TEXT NOT NULL,
		time INTEGER NOT NULL,
		open TEXT NOT NULL,
		close TEXT NOT NULL,
		low TEXT NOT NULL,
		high TEXT NOT NULL,
		volume TEXT NOT NULL,
		price TEXT NOT NULL,
		trades INTEGER NOT NULL,
		PRIMARY KEY (base_unit, quote_unit, resolution, time)
	)",
	"CREATE INDEX IF NOT EXISTS idx_orders_book ON orders (base_unit, quote_unit, type, status)",
	"CREATE INDEX IF NOT EXISTS idx_futures_book ON futures (base_unit, quote_unit, status)",
	"CREATE INDEX IF NOT EXISTS idx_transactions_status ON transactions (assignment, status)",
];

/// Create the twelve core tables and their indexes
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
	for statement in SCHEMA {
		sqlx::query(statement).execute(pool).await?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_migrate_is_idempotent() {
		let pool = connect_memory().await.unwrap();
		migrate(&pool).await.unwrap();

		let tables: Vec<(String,)> =
			sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'")
				.fetch_all(&pool)
				.await
				.unwrap();
		assert_eq!(tables.len(), 12);
	}
}

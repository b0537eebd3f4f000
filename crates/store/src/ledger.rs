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

//! Balance and reserve ledger
//!
//! Every function runs on the caller's connection, normally the open
//! transaction of the surrounding operation, so a failed step rolls back
//! everything the operation already wrote. Values never drop below zero.

use bourse_sdk::{
	Balance, Direction, ExchangeError, MarketKind, Platform, Protocol, Reserve,
};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::Result;
use crate::rows;

/// Identity of one reserve row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveKey {
	pub user_id: i64,
	pub symbol: String,
	pub platform: Platform,
	pub protocol: Protocol,
	pub address: String,
}

impl ReserveKey {
	pub fn new(
		user_id: i64,
		symbol: impl Into<String>,
		platform: Platform,
		protocol: Protocol,
		address: impl Into<String>,
	) -> Self {
		Self {
			user_id,
			symbol: symbol.into(),
			platform,
			protocol,
			address: address.into(),
		}
	}
}

impl From<&Reserve> for ReserveKey {
	fn from(reserve: &Reserve) -> Self {
		Self::new(
			reserve.user_id,
			reserve.symbol.clone(),
			reserve.platform,
			reserve.protocol,
			reserve.address.clone(),
		)
	}
}

fn apply(current: Decimal, delta: Decimal, direction: Direction, what: &str) -> Result<Decimal> {
	if delta.is_sign_negative() && !delta.is_zero() {
		return Err(ExchangeError::invalid(format!("negative delta {} for {}", delta, what)).into());
	}
	match direction {
		Direction::Plus => Ok(current + delta),
		Direction::Minus if current >= delta => Ok(current - delta),
		Direction::Minus => Err(ExchangeError::insufficient(format!(
			"{} holds {}, needs {}",
			what, current, delta
		))
		.into()),
	}
}

/// Materialize a zeroed balance row. With `fail_if_exists` an existing row
/// is an `AlreadyExists` error, otherwise it is left untouched.
pub async fn ensure_balance_row(
	conn: &mut SqliteConnection,
	user_id: i64,
	symbol: &str,
	kind: MarketKind,
	fail_if_exists: bool,
) -> Result<()> {
	let inserted = sqlx::query(
		"INSERT OR IGNORE INTO balances (user_id, symbol, type, value) VALUES (?, ?, ?, '0')",
	)
	.bind(user_id)
	.bind(symbol)
	.bind(kind.as_str())
	.execute(&mut *conn)
	.await?
	.rows_affected();

	if inserted == 0 && fail_if_exists {
		return Err(ExchangeError::AlreadyExists(format!(
			"balance {}/{} for user {}",
			symbol, kind, user_id
		))
		.into());
	}
	Ok(())
}

/// Current balance, zero when the row does not exist yet
pub async fn balance(
	conn: &mut SqliteConnection,
	user_id: i64,
	symbol: &str,
	kind: MarketKind,
) -> Result<Decimal> {
	let row = sqlx::query("SELECT * FROM balances WHERE user_id = ? AND symbol = ? AND type = ?")
		.bind(user_id)
		.bind(symbol)
		.bind(kind.as_str())
		.fetch_optional(&mut *conn)
		.await?;
	match row {
		Some(row) => rows::decimal(&row, "value"),
		None => Ok(Decimal::ZERO),
	}
}

pub async fn balances(conn: &mut SqliteConnection, user_id: i64) -> Result<Vec<Balance>> {
	let found = sqlx::query("SELECT * FROM balances WHERE user_id = ? ORDER BY symbol, type")
		.bind(user_id)
		.fetch_all(&mut *conn)
		.await?;
	found.iter().map(rows::balance).collect()
}

/// Apply `delta` to a balance row, creating it on the first credit.
/// Returns the new value.
pub async fn adjust_balance(
	conn: &mut SqliteConnection,
	user_id: i64,
	symbol: &str,
	kind: MarketKind,
	delta: Decimal,
	direction: Direction,
) -> Result<Decimal> {
	ensure_balance_row(conn, user_id, symbol, kind, false).await?;
	let current = balance(conn, user_id, symbol, kind).await?;
	let what = format!("balance {}/{} of user {}", symbol, kind, user_id);
	let next = apply(current, delta, direction, &what)?;

	sqlx::query("UPDATE balances SET value = ? WHERE user_id = ? AND symbol = ? AND type = ?")
		.bind(next.to_string())
		.bind(user_id)
		.bind(symbol)
		.bind(kind.as_str())
		.execute(&mut *conn)
		.await?;

	debug!(target: "ledger", user_id, symbol, %kind, %delta, %direction, value = %next, "Balance adjusted");
	Ok(next)
}

pub async fn reserve(conn: &mut SqliteConnection, key: &ReserveKey) -> Result<Option<Reserve>> {
	let row = sqlx::query(
		"SELECT * FROM reserves
		 WHERE user_id = ? AND symbol = ? AND platform = ? AND protocol = ? AND address = ?",
	)
	.bind(key.user_id)
	.bind(&key.symbol)
	.bind(key.platform.as_str())
	.bind(key.protocol.as_str())
	.bind(&key.address)
	.fetch_optional(&mut *conn)
	.await?;
	row.as_ref().map(rows::reserve).transpose()
}

async fn ensure_reserve_row(conn: &mut SqliteConnection, key: &ReserveKey) -> Result<Reserve> {
	sqlx::query(
		"INSERT OR IGNORE INTO reserves (user_id, symbol, platform, protocol, address)
		 VALUES (?, ?, ?, ?, ?)",
	)
	.bind(key.user_id)
	.bind(&key.symbol)
	.bind(key.platform.as_str())
	.bind(key.protocol.as_str())
	.bind(&key.address)
	.execute(&mut *conn)
	.await?;

	reserve(conn, key)
		.await?
		.ok_or_else(|| ExchangeError::not_found(format!("reserve {} at {}", key.symbol, key.address)).into())
}

/// Apply `delta` to a reserve's value. Returns the new value.
pub async fn adjust_reserve(
	conn: &mut SqliteConnection,
	key: &ReserveKey,
	delta: Decimal,
	direction: Direction,
) -> Result<Decimal> {
	let current = ensure_reserve_row(conn, key).await?;
	let what = format!("reserve {} at {}", key.symbol, key.address);
	let next = apply(current.value, delta, direction, &what)?;

	sqlx::query("UPDATE reserves SET value = ? WHERE id = ?")
		.bind(next.to_string())
		.bind(current.id)
		.execute(&mut *conn)
		.await?;

	debug!(target: "ledger", reserve = current.id, symbol = %key.symbol, %delta, %direction, value = %next, "Reserve adjusted");
	Ok(next)
}

/// Apply `delta` to a reserve's reverse credit. Returns the new credit.
pub async fn adjust_reverse(
	conn: &mut SqliteConnection,
	key: &ReserveKey,
	delta: Decimal,
	direction: Direction,
) -> Result<Decimal> {
	let current = ensure_reserve_row(conn, key).await?;
	let what = format!("reverse credit {} at {}", key.symbol, key.address);
	let next = apply(current.reverse, delta, direction, &what)?;

	sqlx::query("UPDATE reserves SET reverse = ? WHERE id = ?")
		.bind(next.to_string())
		.bind(current.id)
		.execute(&mut *conn)
		.await?;

	debug!(target: "ledger", reserve = current.id, symbol = %key.symbol, %delta, %direction, reverse = %next, "Reverse adjusted");
	Ok(next)
}

/// Lock or unlock every reserve of `user_id` for the symbol on a platform
pub async fn set_reserve_lock(
	conn: &mut SqliteConnection,
	user_id: i64,
	symbol: &str,
	platform: Platform,
	protocol: Protocol,
	locked: bool,
) -> Result<()> {
	sqlx::query(
		"UPDATE reserves SET lock = ? WHERE user_id = ? AND symbol = ? AND platform = ? AND protocol = ?",
	)
	.bind(locked)
	.bind(user_id)
	.bind(symbol)
	.bind(platform.as_str())
	.bind(protocol.as_str())
	.execute(&mut *conn)
	.await?;
	Ok(())
}

async fn reserves_for(
	conn: &mut SqliteConnection,
	symbol: &str,
	platform: Platform,
	protocol: Protocol,
) -> Result<Vec<Reserve>> {
	let found = sqlx::query(
		"SELECT * FROM reserves WHERE symbol = ? AND platform = ? AND protocol = ? ORDER BY id ASC",
	)
	.bind(symbol)
	.bind(platform.as_str())
	.bind(protocol.as_str())
	.fetch_all(&mut *conn)
	.await?;
	found.iter().map(rows::reserve).collect()
}

/// Sum of all reserve values for a symbol on a platform and protocol
pub async fn reserve_value(
	conn: &mut SqliteConnection,
	symbol: &str,
	platform: Platform,
	protocol: Protocol,
) -> Result<Decimal> {
	Ok(reserves_for(conn, symbol, platform, protocol)
		.await?
		.iter()
		.map(|r| r.value)
		.sum())
}

/// Oldest unlocked reserve able to pay `amount`, skipping `exclude_address`
pub async fn funding_reserve(
	conn: &mut SqliteConnection,
	symbol: &str,
	platform: Platform,
	protocol: Protocol,
	amount: Decimal,
	exclude_address: Option<&str>,
) -> Result<Option<Reserve>> {
	Ok(reserves_for(conn, symbol, platform, protocol)
		.await?
		.into_iter()
		.find(|r| !r.lock && r.value >= amount && Some(r.address.as_str()) != exclude_address))
}

/// Unlocked native-coin reserve of `user_id` able to pay `gas`
pub async fn gas_reserve(
	conn: &mut SqliteConnection,
	user_id: i64,
	symbol: &str,
	platform: Platform,
	gas: Decimal,
) -> Result<Option<Reserve>> {
	Ok(reserves_for(conn, symbol, platform, Protocol::Mainnet)
		.await?
		.into_iter()
		.find(|r| r.user_id == user_id && !r.lock && r.value >= gas))
}

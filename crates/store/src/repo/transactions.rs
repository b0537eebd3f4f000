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

use bourse_sdk::{Allocation, Assignment, AssetGroup, ExchangeError, Transaction, TxStatus};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;

use crate::error::Result;
use crate::rows;

/// Insert a transaction; `tx.id` is ignored and the stored row returned
pub async fn insert(conn: &mut SqliteConnection, tx: &Transaction) -> Result<Transaction> {
	let id = sqlx::query(
		"INSERT INTO transactions (hash, symbol, value, fees, confirmation, address, chain_id,
			block, user_id, assignment, asset_group, platform, protocol, allocation, parent,
			status, repayment, hook, error, create_at)
		 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(&tx.hash)
	.bind(&tx.symbol)
	.bind(tx.value.to_string())
	.bind(tx.fees.to_string())
	.bind(tx.confirmation)
	.bind(&tx.address)
	.bind(tx.chain_id)
	.bind(tx.block)
	.bind(tx.user_id)
	.bind(tx.assignment.as_str())
	.bind(tx.group.as_str())
	.bind(tx.platform.as_str())
	.bind(tx.protocol.as_str())
	.bind(tx.allocation.as_str())
	.bind(tx.parent)
	.bind(tx.status.as_str())
	.bind(tx.repayment)
	.bind(tx.hook)
	.bind(&tx.error)
	.bind(tx.create_at)
	.execute(&mut *conn)
	.await?
	.last_insert_rowid();

	Ok(Transaction { id, ..tx.clone() })
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Transaction> {
	let row = sqlx::query("SELECT * FROM transactions WHERE id = ?")
		.bind(id)
		.fetch_optional(&mut *conn)
		.await?
		.ok_or_else(|| ExchangeError::not_found(format!("transaction {}", id)))?;
	rows::transaction(&row)
}

/// An internal transfer is stored twice under one hash, once per
/// assignment
pub async fn by_hash(
	conn: &mut SqliteConnection,
	hash: &str,
	assignment: Assignment,
) -> Result<Option<Transaction>> {
	let row = sqlx::query("SELECT * FROM transactions WHERE hash = ? AND assignment = ?")
		.bind(hash)
		.bind(assignment.as_str())
		.fetch_optional(&mut *conn)
		.await?;
	row.as_ref().map(rows::transaction).transpose()
}

async fn select(
	conn: &mut SqliteConnection,
	sql: &str,
	binds: &[&str],
) -> Result<Vec<Transaction>> {
	let mut query = sqlx::query(sql);
	for value in binds {
		query = query.bind(*value);
	}
	let found = query.fetch_all(&mut *conn).await?;
	found.iter().map(rows::transaction).collect()
}

/// Pending deposits of one chain, oldest first
pub async fn pending_deposits(conn: &mut SqliteConnection, chain_id: i64) -> Result<Vec<Transaction>> {
	let found = sqlx::query(
		"SELECT * FROM transactions
		 WHERE assignment = 'deposit' AND status = 'pending' AND chain_id = ?
		 ORDER BY id ASC",
	)
	.bind(chain_id)
	.fetch_all(&mut *conn)
	.await?;
	found.iter().map(rows::transaction).collect()
}

/// Pending crypto withdrawals with the given allocation, oldest first
pub async fn pending_withdrawals(
	conn: &mut SqliteConnection,
	allocation: Allocation,
) -> Result<Vec<Transaction>> {
	select(
		conn,
		"SELECT * FROM transactions
		 WHERE assignment = ? AND status = 'pending' AND asset_group = ? AND allocation = ?
		 ORDER BY id ASC",
		&[
			Assignment::Withdrawal.as_str(),
			AssetGroup::Crypto.as_str(),
			allocation.as_str(),
		],
	)
	.await
}

/// Pending crypto withdrawals the dispatcher may pick up (anything but
/// `reward`), oldest first
pub async fn dispatchable_withdrawals(conn: &mut SqliteConnection) -> Result<Vec<Transaction>> {
	select(
		conn,
		"SELECT * FROM transactions
		 WHERE assignment = ? AND status = 'pending' AND asset_group = ? AND allocation != ?
		 ORDER BY id ASC",
		&[
			Assignment::Withdrawal.as_str(),
			AssetGroup::Crypto.as_str(),
			Allocation::Reward.as_str(),
		],
	)
	.await
}

/// Transactions linked to `parent`
pub async fn children(conn: &mut SqliteConnection, parent: i64) -> Result<Vec<Transaction>> {
	let found = sqlx::query("SELECT * FROM transactions WHERE parent = ? ORDER BY id ASC")
		.bind(parent)
		.fetch_all(&mut *conn)
		.await?;
	found.iter().map(rows::transaction).collect()
}

pub async fn for_user(conn: &mut SqliteConnection, user_id: i64) -> Result<Vec<Transaction>> {
	let found = sqlx::query("SELECT * FROM transactions WHERE user_id = ? ORDER BY id DESC")
		.bind(user_id)
		.fetch_all(&mut *conn)
		.await?;
	found.iter().map(rows::transaction).collect()
}

/// Move a transaction from `from` to `to`. The update is guarded on the
/// current status so each transition happens at most once; returns false
/// when the row was no longer in `from`.
pub async fn transition(
	conn: &mut SqliteConnection,
	id: i64,
	from: TxStatus,
	to: TxStatus,
) -> Result<bool> {
	if !from.can_become(to) {
		return Err(ExchangeError::invalid(format!("transaction cannot go from {} to {}", from, to)).into());
	}
	let changed = sqlx::query("UPDATE transactions SET status = ? WHERE id = ? AND status = ?")
		.bind(to.as_str())
		.bind(id)
		.bind(from.as_str())
		.execute(&mut *conn)
		.await?
		.rows_affected();
	Ok(changed == 1)
}

pub async fn set_confirmation(conn: &mut SqliteConnection, id: i64, confirmation: i64) -> Result<()> {
	sqlx::query("UPDATE transactions SET confirmation = ? WHERE id = ?")
		.bind(confirmation)
		.bind(id)
		.execute(&mut *conn)
		.await?;
	Ok(())
}

pub async fn set_allocation(conn: &mut SqliteConnection, id: i64, allocation: Allocation) -> Result<()> {
	sqlx::query("UPDATE transactions SET allocation = ? WHERE id = ?")
		.bind(allocation.as_str())
		.bind(id)
		.execute(&mut *conn)
		.await?;
	Ok(())
}

pub async fn set_hook(conn: &mut SqliteConnection, id: i64, hook: bool) -> Result<()> {
	sqlx::query("UPDATE transactions SET hook = ? WHERE id = ?")
		.bind(hook)
		.bind(id)
		.execute(&mut *conn)
		.await?;
	Ok(())
}

/// Promote an `internal` row to `pending` once its on-chain transfer is
/// seen, recording the block it landed in
pub async fn promote_internal(conn: &mut SqliteConnection, id: i64, block: i64) -> Result<bool> {
	let changed = sqlx::query(
		"UPDATE transactions SET status = 'pending', block = ? WHERE id = ? AND status = 'internal'",
	)
	.bind(block)
	.bind(id)
	.execute(&mut *conn)
	.await?
	.rows_affected();
	Ok(changed == 1)
}

/// Record a dispatched withdrawal: `processing -> filled`, with its
/// on-chain hash and the gas actually charged
pub async fn complete(
	conn: &mut SqliteConnection,
	id: i64,
	hash: &str,
	fees: Decimal,
	repayment: bool,
) -> Result<bool> {
	let changed = sqlx::query(
		"UPDATE transactions SET status = 'filled', hash = ?, fees = ?, repayment = ?, error = NULL
		 WHERE id = ? AND status = 'processing'",
	)
	.bind(hash)
	.bind(fees.to_string())
	.bind(repayment)
	.bind(id)
	.execute(&mut *conn)
	.await?
	.rows_affected();
	Ok(changed == 1)
}

/// Mark a non-terminal transaction failed with the reason
pub async fn fail(conn: &mut SqliteConnection, id: i64, error: &str) -> Result<bool> {
	let changed = sqlx::query(
		"UPDATE transactions SET status = 'failed', error = ?
		 WHERE id = ? AND status IN ('pending', 'processing')",
	)
	.bind(error)
	.bind(id)
	.execute(&mut *conn)
	.await?
	.rows_affected();
	Ok(changed == 1)
}

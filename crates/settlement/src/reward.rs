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

//! Reward sweep
//!
//! A token withdrawal parked as `reward` has a funding reserve but no
//! native coin at that address to pay gas. The sweep queues one internal
//! native-coin withdrawal from another reserve to that address. Once the
//! top-up confirms, the ladder hands the token withdrawal back to the
//! dispatcher.

use bourse_sdk::{Allocation, AssetGroup, Assignment, Protocol, Transaction, TxStatus, now};
use bourse_store::{Topic, ledger, registry, repo::transactions};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::Result;
use crate::context::Context;

/// Result of sweeping one parked withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sweep {
	/// A gas top-up was queued
	Queued(i64),
	/// Gas showed up meanwhile; handed back to the dispatcher
	Released,
	/// A top-up is already in flight
	InFlight,
	/// No reserve can fund the token side any more
	Unfunded,
}

/// Sweep every parked withdrawal once. Returns how many top-ups were queued.
pub async fn sweep(ctx: &Context) -> Result<usize> {
	let parked = {
		let mut conn = ctx.pool.acquire().await?;
		transactions::pending_withdrawals(&mut conn, Allocation::Reward).await?
	};

	let mut queued = 0;
	for tx in parked {
		match sweep_one(ctx, &tx).await {
			Ok(Sweep::Queued(topup)) => {
				info!(target: "reward", tx = tx.id, topup, "Gas top-up queued");
				queued += 1;
			}
			Ok(outcome) => debug!(target: "reward", tx = tx.id, ?outcome, "Nothing queued"),
			Err(e) => warn!(target: "reward", tx = tx.id, error = %e, "Sweep failed"),
		}
	}
	Ok(queued)
}

pub async fn sweep_one(ctx: &Context, tx: &Transaction) -> Result<Sweep> {
	let mut db = ctx.pool.begin().await?;

	let children = transactions::children(&mut *db, tx.id).await?;
	if children.iter().any(|c| c.status != TxStatus::Failed) {
		return Ok(Sweep::InFlight);
	}

	let chain = registry::chain_endpoint(&mut *db, tx.chain_id).await?;
	let Some(funding) =
		ledger::funding_reserve(&mut *db, &tx.symbol, tx.platform, tx.protocol, tx.value, None).await?
	else {
		return Ok(Sweep::Unfunded);
	};

	if ledger::gas_reserve(&mut *db, funding.user_id, &chain.parent_symbol, tx.platform, tx.fees)
		.await?
		.is_some()
	{
		transactions::set_allocation(&mut *db, tx.id, Allocation::External).await?;
		db.commit().await?;
		return Ok(Sweep::Released);
	}

	let topup = transactions::insert(
		&mut *db,
		&Transaction {
			id: 0,
			hash: Uuid::new_v4().to_string(),
			symbol: chain.parent_symbol.clone(),
			value: tx.fees,
			fees: chain.fees,
			confirmation: 0,
			address: funding.address.clone(),
			chain_id: chain.id,
			block: 0,
			user_id: funding.user_id,
			assignment: Assignment::Withdrawal,
			group: AssetGroup::Crypto,
			platform: tx.platform,
			protocol: Protocol::Mainnet,
			allocation: Allocation::Internal,
			parent: Some(tx.id),
			status: TxStatus::Pending,
			repayment: false,
			hook: false,
			error: None,
			create_at: now(),
		},
	)
	.await?;
	db.commit().await?;

	debug!(target: "reward", tx = tx.id, value = %topup.value, address = %topup.address, "Top-up recorded");
	ctx.events.emit(&topup, &[Topic::WithdrawStatus]).await;
	Ok(Sweep::Queued(topup.id))
}

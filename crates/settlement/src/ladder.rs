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

//! Deposit confirmation ladder
//!
//! Walks the pending deposits of one chain after each scanner tick. A
//! deposit whose receipt failed is marked `failed`. One that is deep
//! enough is either credited to the owner's spot balance (`filled`) or,
//! when it is dust or an internal gas top-up, parked as reverse credit
//! (`reserve`). Either way its value joins the reserve row of the
//! receiving address.

use bourse_sdk::{
	Allocation, Chain, Direction, MarketKind, Protocol, Transaction, TxStatus,
};
use bourse_store::{Outbox, ReserveKey, Topic, ledger, registry, repo::transactions};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::Result;
use crate::chains::ChainRpc;
use crate::context::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
	Waiting,
	Filled,
	Reserved,
	Failed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LadderReport {
	pub waiting: usize,
	pub filled: usize,
	pub reserved: usize,
	pub failed: usize,
}

impl LadderReport {
	fn count(&mut self, step: Step) {
		match step {
			Step::Waiting => self.waiting += 1,
			Step::Filled => self.filled += 1,
			Step::Reserved => self.reserved += 1,
			Step::Failed => self.failed += 1,
		}
	}
}

/// Advance every pending deposit of `chain` given the node's height
pub async fn confirm(
	ctx: &Context,
	client: &dyn ChainRpc,
	chain: &Chain,
	current_block: i64,
) -> Result<LadderReport> {
	let pending = {
		let mut conn = ctx.pool.acquire().await?;
		transactions::pending_deposits(&mut conn, chain.id).await?
	};

	let mut report = LadderReport::default();
	for tx in pending {
		let (id, hash) = (tx.id, tx.hash.clone());
		match advance(ctx, client, chain, current_block, tx).await {
			Ok(step) => report.count(step),
			Err(e) => warn!(target: "ladder", chain = chain.id, tx = id, hash = %hash, error = %e, "Deposit not advanced"),
		}
	}
	Ok(report)
}

/// Fee below which a deposit is not worth crediting, in deposit units
async fn chain_fee(ctx: &Context, chain: &Chain, tx: &Transaction) -> Result<Decimal> {
	if tx.protocol == Protocol::Mainnet {
		return Ok(chain.fees);
	}
	let contract = {
		let mut conn = ctx.pool.acquire().await?;
		registry::query_contract(&mut conn, &tx.symbol, chain.id).await?
	};
	Ok(contract.fees * ctx.price(&chain.parent_symbol, &tx.symbol).await?)
}

async fn advance(
	ctx: &Context,
	client: &dyn ChainRpc,
	chain: &Chain,
	current_block: i64,
	tx: Transaction,
) -> Result<Step> {
	if !client.status(&tx.hash).await? {
		let mut conn = ctx.pool.acquire().await?;
		if !transactions::fail(&mut conn, tx.id, "transaction failed on chain").await? {
			return Ok(Step::Waiting);
		}
		let failed = transactions::get(&mut conn, tx.id).await?;
		drop(conn);

		info!(target: "ladder", tx = tx.id, hash = %tx.hash, "Deposit failed");
		ctx.events.emit(&failed, &[Topic::DepositStatus]).await;
		return Ok(Step::Failed);
	}

	let confirmation = tx.confirmation.max(current_block - tx.block);
	if confirmation < chain.confirmation {
		if confirmation > tx.confirmation {
			let mut conn = ctx.pool.acquire().await?;
			transactions::set_confirmation(&mut conn, tx.id, confirmation).await?;
		}
		debug!(target: "ladder", tx = tx.id, confirmation, needed = chain.confirmation, "Deposit waiting");
		return Ok(Step::Waiting);
	}

	let fee = chain_fee(ctx, chain, &tx).await?;
	let key = ReserveKey::new(tx.user_id, &tx.symbol, tx.platform, tx.protocol, &tx.address);

	let mut db = ctx.pool.begin().await?;
	let mut outbox = Outbox::new();
	transactions::set_confirmation(&mut *db, tx.id, confirmation).await?;

	let step = if tx.value > fee && tx.allocation != Allocation::Internal {
		if !transactions::transition(&mut *db, tx.id, TxStatus::Pending, TxStatus::Filled).await? {
			return Ok(Step::Waiting);
		}
		ledger::adjust_balance(&mut *db, tx.user_id, &tx.symbol, MarketKind::Spot, tx.value, Direction::Plus)
			.await?;
		transactions::set_hook(&mut *db, tx.id, true).await?;
		Step::Filled
	} else {
		if !transactions::transition(&mut *db, tx.id, TxStatus::Pending, TxStatus::Reserve).await? {
			return Ok(Step::Waiting);
		}
		// the withdrawal this top-up was paying gas for can go out now
		if let Some(parent) = tx.parent {
			transactions::set_allocation(&mut *db, parent, Allocation::External).await?;
		}
		ledger::adjust_reverse(&mut *db, &key, tx.value, Direction::Plus).await?;
		Step::Reserved
	};
	ledger::adjust_reserve(&mut *db, &key, tx.value, Direction::Plus).await?;

	let stored = transactions::get(&mut *db, tx.id).await?;
	match step {
		Step::Filled => outbox.push(&stored, &[Topic::DepositOpen, Topic::DepositStatus]),
		_ => outbox.push(&stored, &[Topic::DepositStatus]),
	}
	db.commit().await?;

	info!(
		target: "ladder",
		tx = tx.id,
		user_id = tx.user_id,
		symbol = %tx.symbol,
		value = %tx.value,
		status = %stored.status,
		"Deposit confirmed"
	);
	ctx.events.flush(outbox).await;
	Ok(step)
}

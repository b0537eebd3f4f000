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

//! Withdrawal dispatch
//!
//! Picks up pending crypto withdrawals, finds a reserve able to pay them,
//! signs and broadcasts the transfer and books the result against the
//! reserves. Token withdrawals whose reserve has no native coin for gas
//! are handed to the reward sweep instead.

use bourse_sdk::{
	Allocation, AssetGroup, Assignment, Chain, Contract, Direction, MarketKind, Protocol, Reserve,
	Transaction, TxStatus, Wallet, from_base_units, now,
};
use bourse_store::{Outbox, ReserveKey, Topic, ledger, registry, repo::transactions};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use tracing::{debug, error, info, warn};

use crate::chains::RetryPolicy;
use crate::context::Context;
use crate::transaction::{self, Amounts};
use crate::Result;

/// What happened to one withdrawal on a dispatch pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
	/// Broadcast and booked
	Sent { hash: String },
	/// No unlocked reserve can pay it yet
	Unfunded,
	/// Waiting on a gas top-up from the reward sweep
	Deferred,
	/// Another worker moved it first
	Skipped,
	/// Marked failed with the reason
	Failed(String),
}

/// Reserves and keys a withdrawal is paid from
#[derive(Debug, Clone)]
struct Route {
	chain: Chain,
	contract: Option<Contract>,
	funding: Reserve,
	gas: Option<Reserve>,
	wallet: Wallet,
}

enum Plan {
	Ready(Route),
	Unfunded,
	Deferred,
}

struct Sent {
	hash: String,
	amounts: Amounts,
}

pub struct WithdrawalEngine {
	ctx: Context,
}

impl WithdrawalEngine {
	pub fn new(ctx: Context) -> Self {
		Self { ctx }
	}

	/// Dispatch every pending withdrawal once. Returns how many were sent.
	pub async fn tick(&self) -> Result<usize> {
		let pending = {
			let mut conn = self.ctx.pool.acquire().await?;
			transactions::dispatchable_withdrawals(&mut conn).await?
		};

		let mut sent = 0;
		for tx in pending {
			let id = tx.id;
			match self.dispatch(tx).await {
				Ok(Outcome::Sent { .. }) => sent += 1,
				Ok(outcome) => debug!(target: "withdrawal", tx = id, ?outcome, "Withdrawal not sent"),
				Err(e) => warn!(target: "withdrawal", tx = id, error = %e, "Withdrawal dispatch failed"),
			}
		}
		Ok(sent)
	}

	/// Run one pending withdrawal through funding, broadcast and booking
	pub async fn dispatch(&self, tx: Transaction) -> Result<Outcome> {
		let route = match self.route(&tx).await? {
			Plan::Ready(route) => route,
			Plan::Unfunded => {
				debug!(target: "withdrawal", tx = tx.id, symbol = %tx.symbol, value = %tx.value, "No reserve can fund withdrawal");
				return Ok(Outcome::Unfunded);
			}
			Plan::Deferred => {
				info!(target: "withdrawal", tx = tx.id, symbol = %tx.symbol, "Withdrawal waiting on gas top-up");
				return Ok(Outcome::Deferred);
			}
		};

		// claim and lock together; a failed lock leaves the row pending
		let processing = {
			let mut db = self.ctx.pool.begin().await?;
			if !transactions::transition(&mut *db, tx.id, TxStatus::Pending, TxStatus::Processing).await? {
				return Ok(Outcome::Skipped);
			}
			lock_reserve(&mut *db, &route.funding, true).await?;
			let processing = transactions::get(&mut *db, tx.id).await?;
			db.commit().await?;
			processing
		};
		self.ctx.events.emit(&processing, &[Topic::WithdrawStatus]).await;

		let outcome = match self.send(&route, &tx).await {
			Ok(sent) => match self.settle(&route, &tx, &sent).await {
				Ok(()) => {
					info!(
						target: "withdrawal",
						tx = tx.id,
						hash = %sent.hash,
						symbol = %tx.symbol,
						sent = %sent.amounts.sent,
						gas = %sent.amounts.gas,
						"Withdrawal sent"
					);
					Outcome::Sent { hash: sent.hash }
				}
				Err(e) => {
					// on chain already; the balance stays debited
					error!(target: "withdrawal", tx = tx.id, hash = %sent.hash, error = %e, "Broadcast withdrawal not booked");
					let reason = format!("broadcast as {} but not booked: {}", sent.hash, e);
					self.fail(&tx, &reason, false).await?;
					Outcome::Failed(reason)
				}
			},
			Err(e) => {
				warn!(target: "withdrawal", tx = tx.id, error = %e, "Withdrawal not broadcast");
				let reason = e.to_string();
				self.fail(&tx, &reason, tx.allocation != Allocation::Internal).await?;
				Outcome::Failed(reason)
			}
		};

		if let Err(e) = self.unlock(&route.funding).await {
			error!(target: "withdrawal", tx = tx.id, reserve = route.funding.id, error = %e, "Reserve left locked");
		}
		Ok(outcome)
	}

	async fn route(&self, tx: &Transaction) -> Result<Plan> {
		let mut conn = self.ctx.pool.acquire().await?;
		let chain = registry::chain_endpoint(&mut conn, tx.chain_id).await?;
		let contract = match tx.protocol {
			Protocol::Mainnet => None,
			_ => Some(registry::query_contract(&mut conn, &tx.symbol, chain.id).await?),
		};

		// an internal top-up must not fund itself and pays its own gas
		let (exclude, needed) = match tx.allocation {
			Allocation::Internal => (Some(tx.address.as_str()), tx.value + tx.fees),
			_ => (None, tx.value),
		};
		let Some(funding) =
			ledger::funding_reserve(&mut conn, &tx.symbol, tx.platform, tx.protocol, needed, exclude).await?
		else {
			return Ok(Plan::Unfunded);
		};

		let gas = match contract {
			Some(_) => {
				match ledger::gas_reserve(&mut conn, funding.user_id, &chain.parent_symbol, tx.platform, tx.fees)
					.await?
				{
					Some(gas) => Some(gas),
					None => {
						transactions::set_allocation(&mut conn, tx.id, Allocation::Reward).await?;
						return Ok(Plan::Deferred);
					}
				}
			}
			None => None,
		};

		let wallet = registry::wallet(&mut conn, &funding.address, tx.platform)
			.await?
			.ok_or_else(|| bourse_sdk::ExchangeError::not_found(format!("wallet {}", funding.address)))?;

		Ok(Plan::Ready(Route {
			chain,
			contract,
			funding,
			gas,
			wallet,
		}))
	}

	async fn unlock(&self, reserve: &Reserve) -> Result<()> {
		let mut conn = self.ctx.pool.acquire().await?;
		lock_reserve(&mut conn, reserve, false).await
	}

	/// Estimate, sign and broadcast. No connection is held meanwhile.
	async fn send(&self, route: &Route, tx: &Transaction) -> Result<Sent> {
		let chain = &route.chain;
		let contract = route.contract.as_ref();
		let price = match contract {
			Some(_) => self.ctx.price(&chain.parent_symbol, &tx.symbol).await?,
			None => Decimal::ONE,
		};
		let decimals = contract.map_or(chain.decimals, |c| c.decimals);

		let client = self.ctx.connector.connect(chain, RetryPolicy::DISPATCH).await?;
		let draft = transaction::transfer(&route.wallet, &tx.address, tx.value, decimals, contract)?;
		let gas = from_base_units(client.estimate_gas(&draft).await?, chain.decimals)?;

		let amounts = transaction::plan(tx, contract.is_some(), gas, price)?;
		let transfer = transaction::transfer(&route.wallet, &tx.address, amounts.sent, decimals, contract)?;
		let signed = client.sign_and_build(&transfer).await?;
		let hash = client.broadcast(&signed).await?;
		Ok(Sent { hash, amounts })
	}

	/// Book a broadcast withdrawal against the reserves in one transaction
	async fn settle(&self, route: &Route, tx: &Transaction, sent: &Sent) -> Result<()> {
		let Amounts { sent: value, gas, charged } = sent.amounts;
		let funding = ReserveKey::from(&route.funding);

		let mut db = self.ctx.pool.begin().await?;
		let mut outbox = Outbox::new();

		let payer = match &route.gas {
			Some(gas_reserve) => {
				let payer = ReserveKey::from(gas_reserve);
				ledger::adjust_reserve(&mut *db, &payer, gas, Direction::Minus).await?;
				ledger::adjust_reserve(&mut *db, &funding, value, Direction::Minus).await?;
				payer
			}
			None => {
				ledger::adjust_reserve(&mut *db, &funding, value + gas, Direction::Minus).await?;
				funding
			}
		};

		// gas that came from a top-up is paid back out of reverse credit
		let reverse = ledger::reserve(&mut *db, &payer)
			.await?
			.map_or(Decimal::ZERO, |r| r.reverse);
		let repayment = gas > Decimal::ZERO && reverse >= gas;
		if repayment {
			ledger::adjust_reverse(&mut *db, &payer, gas, Direction::Minus).await?;
		}

		if tx.allocation != Allocation::Internal {
			registry::add_fees_charges(&mut *db, &tx.symbol, charged).await?;
		}
		if !transactions::complete(&mut *db, tx.id, &sent.hash, gas, repayment).await? {
			return Err(bourse_sdk::ExchangeError::invalid(format!("withdrawal {} is no longer processing", tx.id)).into());
		}

		if tx.allocation == Allocation::Internal {
			let linked = transactions::insert(&mut *db, &linked_deposit(tx, &sent.hash, value)).await?;
			debug!(target: "withdrawal", tx = tx.id, deposit = linked.id, "Linked deposit recorded");
		}

		let done = transactions::get(&mut *db, tx.id).await?;
		match tx.allocation {
			Allocation::Internal => outbox.push(&done, &[Topic::WithdrawStatus]),
			_ => outbox.push(&done, &[Topic::WithdrawStatus, Topic::NotifyWithdraw]),
		}
		db.commit().await?;
		self.ctx.events.flush(outbox).await;
		Ok(())
	}

	async fn fail(&self, tx: &Transaction, reason: &str, refund: bool) -> Result<()> {
		let mut db = self.ctx.pool.begin().await?;
		if !transactions::fail(&mut *db, tx.id, reason).await? {
			return Ok(());
		}
		if refund {
			ledger::adjust_balance(&mut *db, tx.user_id, &tx.symbol, MarketKind::Spot, tx.value, Direction::Plus)
				.await?;
		}
		let failed = transactions::get(&mut *db, tx.id).await?;
		db.commit().await?;
		self.ctx.events.emit(&failed, &[Topic::WithdrawStatus]).await;
		Ok(())
	}
}

async fn lock_reserve(conn: &mut SqliteConnection, reserve: &Reserve, locked: bool) -> Result<()> {
	ledger::set_reserve_lock(
		conn,
		reserve.user_id,
		&reserve.symbol,
		reserve.platform,
		reserve.protocol,
		locked,
	)
	.await?;
	Ok(())
}

/// The receiving side of an internal transfer. It stays `internal` until
/// the scanner sees the hash on chain.
fn linked_deposit(tx: &Transaction, hash: &str, value: Decimal) -> Transaction {
	Transaction {
		id: 0,
		hash: hash.to_string(),
		symbol: tx.symbol.clone(),
		value,
		fees: Decimal::ZERO,
		confirmation: 0,
		address: tx.address.clone(),
		chain_id: tx.chain_id,
		block: 0,
		user_id: tx.user_id,
		assignment: Assignment::Deposit,
		group: AssetGroup::Crypto,
		platform: tx.platform,
		protocol: tx.protocol,
		allocation: Allocation::Internal,
		parent: tx.parent,
		status: TxStatus::Internal,
		repayment: false,
		hook: false,
		error: None,
		create_at: now(),
	}
}

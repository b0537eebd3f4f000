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

//! Deposit scanner
//!
//! Every tick reads the active, live chains and starts block work for each
//! chain that is idle. The per-chain state (running, armed, cursor) lives
//! in the scanner loop itself; block work runs as a spawned task and
//! reports back through a channel that is drained at tick boundaries.
//!
//! Block work reads the block at the chain's cursor, records a pending
//! deposit for every transfer into an exchange wallet, advances the cursor
//! by one and then runs the confirmation ladder.

use std::{collections::HashMap, time::Duration};

use bourse_sdk::{
	Allocation, AssetGroup, Assignment, Chain, Protocol, Transaction, TxStatus, address,
	from_base_units, now,
};
use bourse_store::{Outbox, Topic, registry, repo::transactions};
use rust_decimal::Decimal;
use tokio::{
	sync::{mpsc, watch},
	time,
};
use tracing::{debug, info, warn};

use crate::Result;
use crate::chains::{ChainRpc, ChainTx, RetryPolicy, TxKind, abi};
use crate::context::Context;
use crate::ladder;

/// Transfer into an exchange wallet found in a block
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
	pub hash: String,
	pub user_id: i64,
	pub symbol: String,
	pub protocol: Protocol,
	pub address: String,
	pub value: Decimal,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
	pub block: i64,
	pub deposits: usize,
	pub promoted: usize,
}

/// Resolve a block transaction to a deposit, if it pays an exchange wallet
pub async fn candidate(
	ctx: &Context,
	client: &dyn ChainRpc,
	chain: &Chain,
	tx: &ChainTx,
) -> Result<Option<Candidate>> {
	match tx.kind {
		TxKind::Internal => {
			if tx.value == 0 {
				return Ok(None);
			}
			let mut conn = ctx.pool.acquire().await?;
			let Some(wallet) = registry::wallet(&mut conn, &tx.to, chain.platform).await? else {
				return Ok(None);
			};
			Ok(Some(Candidate {
				hash: tx.hash.clone(),
				user_id: wallet.user_id,
				symbol: chain.parent_symbol.clone(),
				protocol: Protocol::Mainnet,
				address: wallet.address,
				value: from_base_units(tx.value, chain.decimals)?,
			}))
		}
		TxKind::Contract => {
			let contract = {
				let mut conn = ctx.pool.acquire().await?;
				registry::query_contract_by_address(&mut conn, &tx.to, chain.platform).await?
			};
			let Some(contract) = contract.filter(|c| c.chain_id == chain.id) else {
				return Ok(None);
			};
			let Some(log) = client.logs_by_tx(&tx.hash).await? else {
				return Ok(None);
			};
			if address::canonical(chain.platform, &log.address).ok().as_deref() != Some(contract.address.as_str()) {
				return Ok(None);
			}
			let Some(topic) = log.topics.get(2) else {
				return Ok(None);
			};
			let destination = address::canonical(chain.platform, topic)
				.map_err(crate::chains::ChainError::from)?;

			let mut conn = ctx.pool.acquire().await?;
			let Some(wallet) = registry::wallet(&mut conn, &destination, chain.platform).await? else {
				return Ok(None);
			};
			let amount = abi::decode_uint(&log.data).map_err(crate::chains::ChainError::from)?;
			Ok(Some(Candidate {
				hash: tx.hash.clone(),
				user_id: wallet.user_id,
				symbol: contract.symbol,
				protocol: contract.protocol,
				address: wallet.address,
				value: from_base_units(amount, contract.decimals)?,
			}))
		}
	}
}

fn pending_deposit(chain: &Chain, found: &Candidate) -> Transaction {
	Transaction {
		id: 0,
		hash: found.hash.clone(),
		symbol: found.symbol.clone(),
		value: found.value,
		fees: Decimal::ZERO,
		confirmation: 0,
		address: found.address.clone(),
		chain_id: chain.id,
		block: chain.block,
		user_id: found.user_id,
		assignment: Assignment::Deposit,
		group: AssetGroup::Crypto,
		platform: chain.platform,
		protocol: found.protocol,
		allocation: Allocation::External,
		parent: None,
		status: TxStatus::Pending,
		repayment: false,
		hook: false,
		error: None,
		create_at: now(),
	}
}

/// Record the deposits of the block at the chain's cursor and advance the
/// cursor. `None` while the node does not have that block yet. A malformed
/// transaction is skipped; any node or database failure leaves the cursor
/// in place so the block is read again.
pub async fn scan_block(ctx: &Context, client: &dyn ChainRpc, chain: &Chain) -> Result<Option<ScanReport>> {
	let Some(block) = client.block_by_number(chain.block).await? else {
		return Ok(None);
	};

	let mut found = Vec::new();
	for tx in &block.transactions {
		match candidate(ctx, client, chain, tx).await {
			Ok(Some(deposit)) if deposit.value > Decimal::ZERO => found.push(deposit),
			Ok(_) => {}
			Err(e) if e.is_malformed() => {
				debug!(target: "scanner", chain = chain.id, hash = %tx.hash, error = %e, "Transaction skipped")
			}
			Err(e) => return Err(e),
		}
	}

	let mut report = ScanReport {
		block: chain.block,
		..ScanReport::default()
	};
	let mut db = ctx.pool.begin().await?;
	let mut outbox = Outbox::new();
	for deposit in &found {
		match transactions::by_hash(&mut *db, &deposit.hash, Assignment::Deposit).await? {
			Some(known) if known.status == TxStatus::Internal => {
				if transactions::promote_internal(&mut *db, known.id, chain.block).await? {
					let promoted = transactions::get(&mut *db, known.id).await?;
					outbox.push(&promoted, &[Topic::DepositStatus]);
					report.promoted += 1;
				}
			}
			Some(_) => {}
			None => {
				let stored = transactions::insert(&mut *db, &pending_deposit(chain, deposit)).await?;
				outbox.push(&stored, &[Topic::DepositOpen, Topic::DepositStatus]);
				report.deposits += 1;
			}
		}
	}
	registry::set_chain_block(&mut *db, chain.id, chain.block + 1).await?;
	db.commit().await?;

	if report.deposits + report.promoted > 0 {
		info!(
			target: "scanner",
			chain = chain.id,
			block = chain.block,
			deposits = report.deposits,
			promoted = report.promoted,
			"Block scanned"
		);
	}
	ctx.events.flush(outbox).await;
	Ok(Some(report))
}

/// One round of block work for a chain: scan the cursor block when the
/// node has it, then run the ladder. Returns the cursor afterwards.
pub async fn scan_chain(ctx: &Context, chain: &Chain) -> Result<i64> {
	let client = ctx.connector.connect(chain, RetryPolicy::SCANNER).await?;
	let current = client.block_number().await?;

	let mut cursor = chain.block;
	if chain.block <= current {
		match scan_block(ctx, client.as_ref(), chain).await {
			Ok(Some(report)) => cursor = report.block + 1,
			Ok(None) => debug!(target: "scanner", chain = chain.id, block = chain.block, "Block not available"),
			Err(e) => warn!(target: "scanner", chain = chain.id, block = chain.block, error = %e, "Block scan failed"),
		}
	}

	let report = ladder::confirm(ctx, client.as_ref(), chain, current).await?;
	if report.filled + report.reserved + report.failed > 0 {
		debug!(target: "scanner", chain = chain.id, ?report, "Ladder advanced");
	}
	Ok(cursor)
}

#[derive(Debug, Clone, Copy)]
struct ChainState {
	running: bool,
	armed: bool,
	cursor: i64,
}

struct Completion {
	chain_id: i64,
	cursor: Option<i64>,
}

/// Sends the chain's completion when block work ends, including when the
/// task panics, so the chain never stays marked running
struct Report {
	chain_id: i64,
	cursor: Option<i64>,
	done: mpsc::UnboundedSender<Completion>,
}

impl Drop for Report {
	fn drop(&mut self) {
		self.done
			.send(Completion {
				chain_id: self.chain_id,
				cursor: self.cursor,
			})
			.ok();
	}
}

pub struct Scanner {
	ctx: Context,
	states: HashMap<i64, ChainState>,
	done_tx: mpsc::UnboundedSender<Completion>,
	done_rx: mpsc::UnboundedReceiver<Completion>,
}

impl Scanner {
	pub fn new(ctx: Context) -> Self {
		let (done_tx, done_rx) = mpsc::unbounded_channel();
		Self {
			ctx,
			states: HashMap::new(),
			done_tx,
			done_rx,
		}
	}

	fn apply(&mut self, done: Completion) {
		if let Some(state) = self.states.get_mut(&done.chain_id) {
			state.running = false;
			state.armed = true;
			if let Some(cursor) = done.cursor {
				state.cursor = cursor;
			}
		}
	}

	fn collect(&mut self) {
		while let Ok(done) = self.done_rx.try_recv() {
			self.apply(done);
		}
	}

	/// Start block work for every live chain that is not already busy.
	/// Returns how many chains were started.
	pub async fn tick(&mut self) -> Result<usize> {
		self.collect();
		let chains = {
			let mut conn = self.ctx.pool.acquire().await?;
			registry::active_chains(&mut conn).await?
		};

		let mut started = 0;
		for chain in chains.into_iter().filter(|c| c.alive) {
			let state = self.states.entry(chain.id).or_insert(ChainState {
				running: false,
				armed: true,
				cursor: chain.block,
			});
			if state.running {
				continue;
			}
			// cursor moved outside the scanner
			if state.cursor != chain.block {
				state.cursor = chain.block;
				state.armed = true;
			}
			if !state.armed {
				continue;
			}
			state.running = true;
			state.armed = false;

			let ctx = self.ctx.clone();
			let mut report = Report {
				chain_id: chain.id,
				cursor: None,
				done: self.done_tx.clone(),
			};
			tokio::spawn(async move {
				match scan_chain(&ctx, &chain).await {
					Ok(cursor) => report.cursor = Some(cursor),
					Err(e) => debug!(target: "scanner", chain = chain.id, error = %e, "Chain skipped"),
				}
			});
			started += 1;
		}
		Ok(started)
	}

	/// Wait until no chain has block work in flight
	pub async fn wait_idle(&mut self) {
		while self.states.values().any(|s| s.running) {
			match self.done_rx.recv().await {
				Some(done) => self.apply(done),
				None => break,
			}
		}
	}

	/// Tick every `period` until shutdown, then let in-flight work finish
	pub async fn run(mut self, period: Duration, mut shutdown: watch::Receiver<bool>) {
		info!(target: "scanner", period = ?period, "Scanner started");
		let mut interval = time::interval(period);
		interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
		loop {
			tokio::select! {
				_ = interval.tick() => {
					if let Err(e) = self.tick().await {
						warn!(target: "scanner", error = %e, "Tick failed");
					}
				}
				changed = shutdown.changed() => {
					if changed.is_err() || *shutdown.borrow() {
						break;
					}
				}
			}
		}
		self.wait_idle().await;
		info!(target: "scanner", "Scanner stopped");
	}
}

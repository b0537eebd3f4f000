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

//! Withdrawal request intake and cancellation
//!
//! A request is checked against the destination format, the exchange's
//! own wallets, the asset limits and both the user's balance and the
//! exchange's reserves before the balance is debited and a pending
//! withdrawal is recorded for the dispatcher.

use bourse_sdk::{
	Allocation, AssetGroup, Assignment, Direction, ExchangeError, MarketKind, Protocol, Transaction,
	TxStatus, address, now,
};
use bourse_store::{Outbox, Topic, ledger, registry, repo::transactions};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::Result;
use crate::context::Context;

/// A user's request to withdraw to an external address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
	pub user_id: i64,
	pub symbol: String,
	pub chain_id: i64,
	pub address: String,
	pub value: Decimal,
}

/// Fees of withdrawing one asset on one chain
struct Quote {
	protocol: Protocol,
	/// Recorded on the transaction, in native coin
	fees: Decimal,
	/// Same fee in the withdrawn asset
	fee_in_asset: Decimal,
}

/// Validate a request, debit the user's spot balance and record a pending
/// withdrawal
pub async fn request_withdrawal(ctx: &Context, request: WithdrawalRequest) -> Result<Transaction> {
	if request.value <= Decimal::ZERO {
		return Err(ExchangeError::invalid("withdrawal value must be positive").into());
	}

	let (asset, chain, contract) = {
		let mut conn = ctx.pool.acquire().await?;
		let asset = registry::query_asset(&mut conn, &request.symbol).await?;
		let chain = registry::query_chain(&mut conn, request.chain_id, true).await?;
		let contract = if asset.symbol == chain.parent_symbol {
			None
		} else {
			Some(registry::query_contract(&mut conn, &asset.symbol, chain.id).await?)
		};
		(asset, chain, contract)
	};
	if !asset.status || asset.group != AssetGroup::Crypto {
		return Err(ExchangeError::invalid(format!("{} cannot be withdrawn", asset.symbol)).into());
	}
	if !asset.chains.contains(&chain.id) {
		return Err(ExchangeError::invalid(format!("{} is not issued on {}", asset.symbol, chain.name)).into());
	}

	address::validate(chain.platform, &request.address)?;
	let destination = address::canonical(chain.platform, &request.address)
		.map_err(|e| ExchangeError::invalid(e.to_string()))?;

	let quote = match &contract {
		None => Quote {
			protocol: Protocol::Mainnet,
			fees: chain.fees,
			fee_in_asset: chain.fees,
		},
		Some(contract) => Quote {
			protocol: contract.protocol,
			fees: contract.fees,
			fee_in_asset: contract.fees * ctx.price(&chain.parent_symbol, &asset.symbol).await?,
		},
	};

	if request.value < asset.min_withdraw + quote.fee_in_asset {
		return Err(ExchangeError::insufficient(format!(
			"minimum withdrawal is {} {}",
			asset.min_withdraw + quote.fee_in_asset,
			asset.symbol
		))
		.into());
	}
	if asset.max_withdraw > Decimal::ZERO && request.value > asset.max_withdraw {
		return Err(ExchangeError::insufficient(format!(
			"maximum withdrawal is {} {}",
			asset.max_withdraw, asset.symbol
		))
		.into());
	}

	let mut db = ctx.pool.begin().await?;
	if let Some(own) = registry::wallet_of_user(&mut *db, request.user_id, chain.platform).await? {
		if own.address == destination {
			return Err(ExchangeError::SameAddress.into());
		}
	}
	if registry::wallet(&mut *db, &destination, chain.platform).await?.is_some() {
		return Err(ExchangeError::InternalAddress.into());
	}

	let reserves = ledger::reserve_value(&mut *db, &asset.symbol, chain.platform, quote.protocol).await?;
	if reserves < request.value {
		return Err(ExchangeError::insufficient(format!("exchange reserve of {}", asset.symbol)).into());
	}
	ledger::adjust_balance(
		&mut *db,
		request.user_id,
		&asset.symbol,
		MarketKind::Spot,
		request.value,
		Direction::Minus,
	)
	.await?;

	let tx = transactions::insert(
		&mut *db,
		&Transaction {
			id: 0,
			hash: Uuid::new_v4().to_string(),
			symbol: asset.symbol.clone(),
			value: request.value,
			fees: quote.fees,
			confirmation: 0,
			address: destination,
			chain_id: chain.id,
			block: 0,
			user_id: request.user_id,
			assignment: Assignment::Withdrawal,
			group: AssetGroup::Crypto,
			platform: chain.platform,
			protocol: quote.protocol,
			allocation: Allocation::External,
			parent: None,
			status: TxStatus::Pending,
			repayment: false,
			hook: false,
			error: None,
			create_at: now(),
		},
	)
	.await?;

	let mut outbox = Outbox::new();
	outbox.push(&tx, &[Topic::WithdrawStatus]);
	db.commit().await?;

	info!(
		target: "withdrawal",
		tx = tx.id,
		user_id = tx.user_id,
		symbol = %tx.symbol,
		value = %tx.value,
		"Withdrawal requested"
	);
	ctx.events.flush(outbox).await;
	Ok(tx)
}

/// Cancel a withdrawal the dispatcher has not picked up and refund it
pub async fn cancel_withdrawal(ctx: &Context, user_id: i64, id: i64) -> Result<Transaction> {
	let mut db = ctx.pool.begin().await?;
	let tx = transactions::get(&mut *db, id).await?;
	if tx.user_id != user_id || tx.assignment != Assignment::Withdrawal {
		return Err(ExchangeError::not_found(format!("withdrawal {}", id)).into());
	}
	if tx.status != TxStatus::Pending || tx.allocation == Allocation::Internal {
		return Err(ExchangeError::invalid(format!("withdrawal {} is {}", id, tx.status)).into());
	}
	if !transactions::fail(&mut *db, id, "cancelled by user").await? {
		return Err(ExchangeError::invalid(format!("withdrawal {} is no longer pending", id)).into());
	}
	ledger::adjust_balance(&mut *db, user_id, &tx.symbol, MarketKind::Spot, tx.value, Direction::Plus).await?;

	let cancelled = transactions::get(&mut *db, id).await?;
	let mut outbox = Outbox::new();
	outbox.push(&cancelled, &[Topic::WithdrawStatus]);
	db.commit().await?;

	info!(target: "withdrawal", tx = id, user_id, "Withdrawal cancelled");
	ctx.events.flush(outbox).await;
	Ok(cancelled)
}

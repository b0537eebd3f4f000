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

mod common;

use bourse_sdk::{Allocation, ExchangeError, Platform, Protocol, TxStatus};
use bourse_settlement::{
	Outcome, WithdrawalEngine, WithdrawalRequest, cancel_withdrawal, request_withdrawal, reward, scanner,
};
use bourse_store::{Topic, ledger, repo::transactions};
use common::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const CAROL: i64 = 3;

fn request(user_id: i64, symbol: &str, address: &str, value: Decimal, chain_id: i64) -> WithdrawalRequest {
	WithdrawalRequest {
		user_id,
		symbol: symbol.to_string(),
		chain_id,
		address: address.to_string(),
		value,
	}
}

fn rejection(result: bourse_settlement::Result<bourse_sdk::Transaction>) -> ExchangeError {
	result.unwrap_err().exchange().cloned().unwrap()
}

#[tokio::test]
async fn test_token_withdrawal_repays_reverse() {
	let h = setup().await;
	h.seed_reserve(&eth_key(ALICE, ALICE_ADDR), dec!(0.10), dec!(0.05)).await;
	h.seed_reserve(&usdt_key(ALICE, ALICE_ADDR), dec!(1000), Decimal::ZERO).await;
	h.fund(BOB, "usdt", dec!(100)).await;
	h.node.set_gas(ETHER / 50);

	let tx = request_withdrawal(&h.ctx, request(BOB, "usdt", OUTSIDE_ADDR, dec!(100), h.chain_id))
		.await
		.unwrap();
	assert_eq!(tx.status, TxStatus::Pending);
	assert_eq!(tx.protocol, Protocol::Erc20);
	assert_eq!(tx.fees, dec!(0.02));
	assert_eq!(h.balance(BOB, "usdt").await, Decimal::ZERO);

	let engine = WithdrawalEngine::new(h.ctx.clone());
	let outcome = engine.dispatch(tx.clone()).await.unwrap();
	assert_eq!(outcome, Outcome::Sent { hash: "0xsent1".to_string() });

	// 100 − 0.02 × 2000
	let sent = h.node.sent();
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].amount, 60_000_000);
	assert_eq!(sent[0].contract.as_deref(), Some(TOKEN_ADDR));
	assert_eq!(sent[0].from, ALICE_ADDR);
	assert_eq!(sent[0].to, OUTSIDE_ADDR);

	let token = h.reserve(&usdt_key(ALICE, ALICE_ADDR)).await;
	assert_eq!(token.value, dec!(940));
	assert!(!token.lock);
	let parent = h.reserve(&eth_key(ALICE, ALICE_ADDR)).await;
	assert_eq!(parent.value, dec!(0.08));
	assert_eq!(parent.reverse, dec!(0.03));
	assert_eq!(h.fees_charges("usdt").await, dec!(40));

	let done = h.tx(tx.id).await;
	assert_eq!(done.status, TxStatus::Filled);
	assert_eq!(done.hash, "0xsent1");
	assert_eq!(done.fees, dec!(0.02));
	assert!(done.repayment);

	let statuses: Vec<_> = h
		.publisher
		.on(Topic::WithdrawStatus)
		.into_iter()
		.map(|p| p["status"].as_str().unwrap().to_string())
		.collect();
	assert_eq!(statuses, vec!["pending", "processing", "filled"]);
	assert_eq!(h.publisher.on(Topic::NotifyWithdraw).len(), 1);
}

#[tokio::test]
async fn test_native_withdrawal_pays_gas_from_value() {
	let h = setup().await;
	h.seed_reserve(&eth_key(ALICE, ALICE_ADDR), dec!(5), Decimal::ZERO).await;
	h.fund(BOB, "eth", dec!(2)).await;
	h.node.set_gas(ETHER / 500);

	let tx = request_withdrawal(&h.ctx, request(BOB, "eth", OUTSIDE_ADDR, dec!(1), h.chain_id))
		.await
		.unwrap();
	assert_eq!(tx.protocol, Protocol::Mainnet);

	let engine = WithdrawalEngine::new(h.ctx.clone());
	assert_eq!(engine.tick().await.unwrap(), 1);

	assert_eq!(h.node.sent()[0].amount, 998_000_000_000_000_000);
	assert!(h.node.sent()[0].contract.is_none());
	assert_eq!(h.reserve(&eth_key(ALICE, ALICE_ADDR)).await.value, dec!(4));
	assert_eq!(h.fees_charges("eth").await, dec!(0.01));
	assert_eq!(h.balance(BOB, "eth").await, dec!(1));

	let done = h.tx(tx.id).await;
	assert_eq!(done.status, TxStatus::Filled);
	assert_eq!(done.fees, dec!(0.002));
	assert!(!done.repayment);

	// nothing left to send
	assert_eq!(engine.tick().await.unwrap(), 0);
}

#[tokio::test]
async fn test_broadcast_failure_refunds() {
	let h = setup().await;
	h.seed_reserve(&eth_key(ALICE, ALICE_ADDR), dec!(5), Decimal::ZERO).await;
	h.fund(BOB, "eth", dec!(1)).await;
	h.node.set_gas(ETHER / 500);
	h.node.break_broadcast("nonce too low");

	let tx = request_withdrawal(&h.ctx, request(BOB, "eth", OUTSIDE_ADDR, dec!(1), h.chain_id))
		.await
		.unwrap();
	assert_eq!(h.balance(BOB, "eth").await, Decimal::ZERO);

	let engine = WithdrawalEngine::new(h.ctx.clone());
	let outcome = engine.dispatch(tx.clone()).await.unwrap();
	assert!(matches!(outcome, Outcome::Failed(ref reason) if reason.contains("nonce too low")));

	let failed = h.tx(tx.id).await;
	assert_eq!(failed.status, TxStatus::Failed);
	assert!(failed.error.unwrap().contains("nonce too low"));
	assert_eq!(h.balance(BOB, "eth").await, dec!(1));

	let reserve = h.reserve(&eth_key(ALICE, ALICE_ADDR)).await;
	assert_eq!(reserve.value, dec!(5));
	assert!(!reserve.lock);
	assert_eq!(h.publisher.on(Topic::WithdrawStatus).last().unwrap()["status"], "failed");
	assert!(h.publisher.on(Topic::NotifyWithdraw).is_empty());
}

#[tokio::test]
async fn test_locked_reserve_leaves_withdrawal_pending() {
	let h = setup().await;
	h.seed_reserve(&eth_key(ALICE, ALICE_ADDR), dec!(5), Decimal::ZERO).await;
	h.fund(BOB, "eth", dec!(1)).await;
	let tx = request_withdrawal(&h.ctx, request(BOB, "eth", OUTSIDE_ADDR, dec!(1), h.chain_id))
		.await
		.unwrap();
	{
		let mut conn = h.pool.acquire().await.unwrap();
		ledger::set_reserve_lock(&mut conn, ALICE, "eth", Platform::Ethereum, Protocol::Mainnet, true)
			.await
			.unwrap();
	}

	let engine = WithdrawalEngine::new(h.ctx.clone());
	assert_eq!(engine.dispatch(tx.clone()).await.unwrap(), Outcome::Unfunded);
	assert_eq!(h.tx(tx.id).await.status, TxStatus::Pending);
	assert!(h.node.sent().is_empty());
}

#[tokio::test]
async fn test_failed_reserve_lock_keeps_withdrawal_pending() {
	let h = setup().await;
	h.seed_reserve(&eth_key(ALICE, ALICE_ADDR), dec!(5), Decimal::ZERO).await;
	h.fund(BOB, "eth", dec!(1)).await;
	h.node.set_gas(ETHER / 500);
	let tx = request_withdrawal(&h.ctx, request(BOB, "eth", OUTSIDE_ADDR, dec!(1), h.chain_id))
		.await
		.unwrap();
	sqlx::query(
		"CREATE TRIGGER frozen_reserves BEFORE UPDATE OF lock ON reserves
		 BEGIN SELECT RAISE(ABORT, 'reserves frozen'); END",
	)
	.execute(&h.pool)
	.await
	.unwrap();

	let engine = WithdrawalEngine::new(h.ctx.clone());
	assert!(engine.dispatch(tx.clone()).await.is_err());
	assert_eq!(h.tx(tx.id).await.status, TxStatus::Pending);
	assert!(h.node.sent().is_empty());
	assert!(h.publisher.on(Topic::WithdrawStatus).iter().all(|p| p["status"] == "pending"));

	sqlx::query("DROP TRIGGER frozen_reserves").execute(&h.pool).await.unwrap();
	assert_eq!(engine.tick().await.unwrap(), 1);
	assert_eq!(h.tx(tx.id).await.status, TxStatus::Filled);
	assert!(!h.reserve(&eth_key(ALICE, ALICE_ADDR)).await.lock);
}

#[tokio::test]
async fn test_reward_sweep_tops_up_gas() {
	let h = setup().await;
	// Alice's address holds usdt but no eth; Bob's holds the eth
	h.seed_reserve(&usdt_key(ALICE, ALICE_ADDR), dec!(1000), Decimal::ZERO).await;
	h.seed_reserve(&eth_key(BOB, BOB_ADDR), dec!(1), Decimal::ZERO).await;
	h.fund(CAROL, "usdt", dec!(100)).await;
	h.node.set_gas(ETHER / 1000);

	let withdrawal = request_withdrawal(&h.ctx, request(CAROL, "usdt", OUTSIDE_ADDR, dec!(100), h.chain_id))
		.await
		.unwrap();
	let engine = WithdrawalEngine::new(h.ctx.clone());
	assert_eq!(engine.dispatch(withdrawal.clone()).await.unwrap(), Outcome::Deferred);
	assert_eq!(h.tx(withdrawal.id).await.allocation, Allocation::Reward);

	assert_eq!(reward::sweep(&h.ctx).await.unwrap(), 1);
	assert_eq!(reward::sweep(&h.ctx).await.unwrap(), 0);
	let topup = {
		let mut conn = h.pool.acquire().await.unwrap();
		let children = transactions::children(&mut conn, withdrawal.id).await.unwrap();
		assert_eq!(children.len(), 1);
		children.into_iter().next().unwrap()
	};
	assert_eq!(topup.symbol, "eth");
	assert_eq!(topup.value, dec!(0.02));
	assert_eq!(topup.address, ALICE_ADDR);
	assert_eq!(topup.user_id, ALICE);
	assert_eq!(topup.allocation, Allocation::Internal);

	// the dispatcher sends the top-up from Bob's reserve
	assert_eq!(engine.tick().await.unwrap(), 1);
	let sent = h.node.sent();
	assert_eq!(sent[0].from, BOB_ADDR);
	assert_eq!(sent[0].to, ALICE_ADDR);
	assert_eq!(sent[0].amount, ETHER / 50);
	assert_eq!(h.reserve(&eth_key(BOB, BOB_ADDR)).await.value, dec!(0.979));
	assert_eq!(h.fees_charges("eth").await, Decimal::ZERO);
	assert!(h.publisher.on(Topic::NotifyWithdraw).is_empty());

	let linked = {
		let mut conn = h.pool.acquire().await.unwrap();
		transactions::by_hash(&mut conn, "0xsent1", bourse_sdk::Assignment::Deposit)
			.await
			.unwrap()
			.unwrap()
	};
	assert_eq!(linked.status, TxStatus::Internal);
	assert_eq!(linked.parent, Some(withdrawal.id));

	// the scanner sees the top-up land and the ladder releases the token withdrawal
	h.node.push_block(10, vec![native_transfer("0xsent1", ALICE_ADDR, ETHER / 50)]);
	h.node.set_height(13);
	scanner::scan_chain(&h.ctx, &h.chain().await).await.unwrap();
	assert_eq!(h.tx(linked.id).await.status, TxStatus::Reserve);
	assert_eq!(h.tx(withdrawal.id).await.allocation, Allocation::External);
	let gas = h.reserve(&eth_key(ALICE, ALICE_ADDR)).await;
	assert_eq!(gas.value, dec!(0.02));
	assert_eq!(gas.reverse, dec!(0.02));

	assert_eq!(engine.tick().await.unwrap(), 1);
	let done = h.tx(withdrawal.id).await;
	assert_eq!(done.status, TxStatus::Filled);
	assert!(done.repayment);
	assert_eq!(h.node.sent()[1].amount, 60_000_000);
	let gas = h.reserve(&eth_key(ALICE, ALICE_ADDR)).await;
	assert_eq!(gas.value, dec!(0.019));
	assert_eq!(gas.reverse, dec!(0.019));
	assert_eq!(h.reserve(&usdt_key(ALICE, ALICE_ADDR)).await.value, dec!(940));
	assert_eq!(h.balance(ALICE, "eth").await, Decimal::ZERO);
}

#[tokio::test]
async fn test_request_validation() {
	let h = setup().await;
	h.seed_reserve(&eth_key(ALICE, ALICE_ADDR), dec!(3), Decimal::ZERO).await;
	h.fund(BOB, "eth", dec!(2)).await;
	let id = h.chain_id;

	assert!(matches!(
		rejection(request_withdrawal(&h.ctx, request(BOB, "eth", "0x123", dec!(1), id)).await),
		ExchangeError::InvalidInput(_)
	));
	assert_eq!(
		rejection(request_withdrawal(&h.ctx, request(BOB, "eth", BOB_ADDR, dec!(1), id)).await),
		ExchangeError::SameAddress
	);
	assert_eq!(
		rejection(request_withdrawal(&h.ctx, request(BOB, "eth", ALICE_ADDR, dec!(1), id)).await),
		ExchangeError::InternalAddress
	);
	// minimum is 0.01 plus the 0.01 chain fee
	assert!(matches!(
		rejection(request_withdrawal(&h.ctx, request(BOB, "eth", OUTSIDE_ADDR, dec!(0.015), id)).await),
		ExchangeError::InsufficientFunds(_)
	));
	assert!(matches!(
		rejection(request_withdrawal(&h.ctx, request(BOB, "eth", OUTSIDE_ADDR, dec!(1001), id)).await),
		ExchangeError::InsufficientFunds(_)
	));
	assert!(matches!(
		rejection(request_withdrawal(&h.ctx, request(BOB, "eth", OUTSIDE_ADDR, Decimal::ZERO, id)).await),
		ExchangeError::InvalidInput(_)
	));
	assert!(matches!(
		rejection(request_withdrawal(&h.ctx, request(BOB, "eth", OUTSIDE_ADDR, dec!(2.5), id)).await),
		ExchangeError::InsufficientFunds(_)
	));
	// more than the exchange holds
	h.fund(BOB, "eth", dec!(10)).await;
	assert!(matches!(
		rejection(request_withdrawal(&h.ctx, request(BOB, "eth", OUTSIDE_ADDR, dec!(4), id)).await),
		ExchangeError::InsufficientFunds(_)
	));
	assert!(matches!(
		rejection(request_withdrawal(&h.ctx, request(BOB, "eth", OUTSIDE_ADDR, dec!(1), id + 1)).await),
		ExchangeError::NotFound(_)
	));

	assert_eq!(h.balance(BOB, "eth").await, dec!(12));
	assert!(h.history(BOB).await.is_empty());
	assert!(h.publisher.on(Topic::WithdrawStatus).is_empty());
}

#[tokio::test]
async fn test_cancel_refunds_pending_withdrawal() {
	let h = setup().await;
	h.seed_reserve(&eth_key(ALICE, ALICE_ADDR), dec!(3), Decimal::ZERO).await;
	h.fund(BOB, "eth", dec!(1)).await;
	let tx = request_withdrawal(&h.ctx, request(BOB, "eth", OUTSIDE_ADDR, dec!(1), h.chain_id))
		.await
		.unwrap();

	assert!(matches!(
		rejection(cancel_withdrawal(&h.ctx, ALICE, tx.id).await),
		ExchangeError::NotFound(_)
	));

	let cancelled = cancel_withdrawal(&h.ctx, BOB, tx.id).await.unwrap();
	assert_eq!(cancelled.status, TxStatus::Failed);
	assert_eq!(h.balance(BOB, "eth").await, dec!(1));
	assert!(matches!(
		rejection(cancel_withdrawal(&h.ctx, BOB, tx.id).await),
		ExchangeError::InvalidInput(_)
	));

	// a cancelled withdrawal is never dispatched
	let engine = WithdrawalEngine::new(h.ctx.clone());
	assert_eq!(engine.tick().await.unwrap(), 0);
	assert!(h.node.sent().is_empty());
}

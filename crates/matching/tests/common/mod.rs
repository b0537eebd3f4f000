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

#![allow(dead_code)]

use std::sync::Arc;

use bourse_matching::{MatchingEngine, OrderRequest};
use bourse_sdk::{Asset, AssetGroup, Assigning, Direction, MarketKind, Pair, Trading};
use bourse_store::{Events, MemoryPublisher, connect_memory, ledger, registry};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::SqlitePool;

pub const ALICE: i64 = 1;
pub const BOB: i64 = 2;

pub struct Harness {
	pub engine: MatchingEngine,
	pub pool: SqlitePool,
	pub publisher: Arc<MemoryPublisher>,
}

fn asset(symbol: &str, name: &str) -> Asset {
	Asset {
		symbol: symbol.to_string(),
		name: name.to_string(),
		group: AssetGroup::Crypto,
		kind: MarketKind::Spot,
		min_withdraw: Decimal::ZERO,
		max_withdraw: Decimal::ZERO,
		min_trade: Decimal::ZERO,
		max_trade: Decimal::ZERO,
		fees_trade: dec!(0.1),
		fees_discount: Decimal::ZERO,
		fees_charges: Decimal::ZERO,
		chains: vec![],
		status: true,
	}
}

fn pair(kind: MarketKind, price: Decimal) -> Pair {
	Pair {
		id: 0,
		base_unit: "btc".to_string(),
		quote_unit: "usdt".to_string(),
		base_decimal: 8,
		quote_decimal: 2,
		price,
		kind,
		status: true,
	}
}

/// btc/usdt listed as a spot pair at 100 and a futures pair at 100, with a
/// 0.1% trade fee and no maker discount
pub async fn setup() -> Harness {
	let pool = connect_memory().await.unwrap();
	{
		let mut conn = pool.acquire().await.unwrap();
		registry::create_asset(&mut conn, &asset("btc", "Bitcoin")).await.unwrap();
		registry::create_asset(&mut conn, &asset("usdt", "Tether USD")).await.unwrap();
		registry::create_pair(&mut conn, &pair(MarketKind::Spot, dec!(100))).await.unwrap();
		registry::create_pair(&mut conn, &pair(MarketKind::Future, dec!(100))).await.unwrap();
	}
	let publisher = Arc::new(MemoryPublisher::new());
	let engine = MatchingEngine::new(pool.clone(), Events::new(publisher.clone()));
	Harness {
		engine,
		pool,
		publisher,
	}
}

impl Harness {
	pub async fn fund(&self, user_id: i64, symbol: &str, kind: MarketKind, amount: Decimal) {
		let mut conn = self.pool.acquire().await.unwrap();
		ledger::adjust_balance(&mut conn, user_id, symbol, kind, amount, Direction::Plus)
			.await
			.unwrap();
	}

	pub async fn balance(&self, user_id: i64, symbol: &str, kind: MarketKind) -> Decimal {
		let mut conn = self.pool.acquire().await.unwrap();
		ledger::balance(&mut conn, user_id, symbol, kind).await.unwrap()
	}

	pub async fn set_discount(&self, symbol: &str, discount: Decimal) {
		sqlx::query("UPDATE assets SET fees_discount = ? WHERE symbol = ?")
			.bind(discount.to_string())
			.bind(symbol)
			.execute(&self.pool)
			.await
			.unwrap();
	}
}

pub fn limit(user_id: i64, assigning: Assigning, price: Decimal, quantity: Decimal) -> OrderRequest {
	OrderRequest {
		user_id,
		base_unit: "btc".to_string(),
		quote_unit: "usdt".to_string(),
		kind: MarketKind::Spot,
		assigning,
		trading: Trading::Limit,
		price,
		quantity,
	}
}

pub fn market(user_id: i64, assigning: Assigning, quantity: Decimal) -> OrderRequest {
	OrderRequest {
		trading: Trading::Market,
		..limit(user_id, assigning, Decimal::ZERO, quantity)
	}
}

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

//! Database-backed matching engine
//!
//! There is no in-memory book: every placement reads the resting side of
//! its pair, matches, moves balances and writes trades inside a single
//! database transaction. Events are collected in an [`Outbox`] and only
//! published once that transaction has committed, so observers never see
//! a match that was rolled back.

mod futures;
mod spot;
pub mod ticker;

use bourse_sdk::{Asset, ExchangeError, FutureOrder, MarketKind, Order, Pair};
use bourse_store::{Events, Outbox, PairRef, StoreError, registry};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};

use crate::types::{FuturePlacement, FutureRequest, OrderRequest, Placement};

/// Counterparty recorded when the exchange itself fills a market order
pub const HOUSE: i64 = 0;

/// Error types for matching engine operations
#[derive(Debug, Error)]
pub enum EngineError {
	#[error(transparent)]
	Exchange(#[from] ExchangeError),
	#[error("Store error: {0}")]
	Store(StoreError),
}

impl EngineError {
	/// The caller-visible kind, when the order was rejected
	pub fn exchange(&self) -> Option<&ExchangeError> {
		match self {
			EngineError::Exchange(e) => Some(e),
			EngineError::Store(e) => e.exchange(),
		}
	}
}

impl From<StoreError> for EngineError {
	fn from(e: StoreError) -> Self {
		match e {
			StoreError::Exchange(e) => EngineError::Exchange(e),
			other => EngineError::Store(other),
		}
	}
}

impl From<sqlx::Error> for EngineError {
	fn from(e: sqlx::Error) -> Self {
		EngineError::Store(StoreError::Database(e))
	}
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Pair together with both of its assets
pub(crate) struct Listing {
	pub pair: Pair,
	pub base: Asset,
	pub quote: Asset,
}

impl Listing {
	async fn load(
		conn: &mut SqliteConnection,
		base: &str,
		quote: &str,
		kind: MarketKind,
	) -> Result<Self> {
		let pair = registry::query_pair(conn, &PairRef::symbols(base, quote), kind, true).await?;
		let base = registry::query_asset(conn, &pair.base_unit).await?;
		let quote = registry::query_asset(conn, &pair.quote_unit).await?;
		Ok(Self { pair, base, quote })
	}
}

#[derive(Clone)]
pub struct MatchingEngine {
	pool: SqlitePool,
	events: Events,
}

impl MatchingEngine {
	pub fn new(pool: SqlitePool, events: Events) -> Self {
		Self { pool, events }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	/// Validate, debit and match a spot, stock or cross order
	pub async fn place_order(&self, request: OrderRequest) -> Result<Placement> {
		let mut tx = self.pool.begin().await?;
		let mut outbox = Outbox::new();
		let placement = spot::place(&mut *tx, &mut outbox, &request).await?;
		tx.commit().await?;

		info!(
			target: "matching",
			order = placement.order.id,
			user_id = request.user_id,
			pair = %format!("{}/{}", placement.order.base_unit, placement.order.quote_unit),
			assigning = %placement.order.assigning,
			trades = placement.trades.len(),
			status = %placement.order.status,
			"Order placed"
		);
		self.events.flush(outbox).await;
		Ok(placement)
	}

	/// Cancel a pending order of `user_id` and refund its remaining value
	pub async fn cancel_order(&self, user_id: i64, order_id: i64) -> Result<Order> {
		let mut tx = self.pool.begin().await?;
		let mut outbox = Outbox::new();
		let order = spot::cancel(&mut *tx, &mut outbox, user_id, order_id).await?;
		tx.commit().await?;

		debug!(target: "matching", order = order_id, user_id, "Order cancelled");
		self.events.flush(outbox).await;
		Ok(order)
	}

	/// Open or close a futures position
	pub async fn place_future(&self, request: FutureRequest) -> Result<FuturePlacement> {
		let mut tx = self.pool.begin().await?;
		let mut outbox = Outbox::new();
		let placement = futures::place(&mut *tx, &mut outbox, &request).await?;
		tx.commit().await?;

		info!(
			target: "matching",
			order = placement.order.id,
			user_id = request.user_id,
			assigning = %placement.order.assigning,
			position = %placement.order.position,
			trades = placement.trades.len(),
			"Future placed"
		);
		self.events.flush(outbox).await;
		Ok(placement)
	}

	pub async fn cancel_future(&self, user_id: i64, order_id: i64) -> Result<FutureOrder> {
		let mut tx = self.pool.begin().await?;
		let mut outbox = Outbox::new();
		let order = futures::cancel(&mut *tx, &mut outbox, user_id, order_id).await?;
		tx.commit().await?;

		debug!(target: "matching", order = order_id, user_id, "Future cancelled");
		self.events.flush(outbox).await;
		Ok(order)
	}
}

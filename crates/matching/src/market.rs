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

//! Background market loops
//!
//! - price refresh: moves each active pair's last price to the oracle's
//! - market refresh: publishes `market/status` with last price and 24h
//!   change
//!
//! Both run on a fixed interval until the shutdown signal flips.

use std::{sync::Arc, time::Duration};

use bourse_store::{Events, PriceFeed, Topic, oracle, registry};
use sqlx::SqlitePool;
use tokio::{sync::watch, task::JoinHandle, time};
use tracing::{debug, info, warn};

use crate::engine::Result;
use crate::types::MarketStatus;

/// Set every active pair's price from `feed`. Returns how many moved.
pub async fn refresh_prices(pool: &SqlitePool, feed: &dyn PriceFeed) -> Result<usize> {
	let pairs = {
		let mut conn = pool.acquire().await?;
		registry::pairs(&mut conn, None).await?
	};

	let mut updated = 0;
	for pair in pairs.iter().filter(|p| p.status) {
		let Some(price) = feed.price(&pair.base_unit, &pair.quote_unit).await else {
			debug!(target: "market", pair = %pair.symbol(), "No oracle price");
			continue;
		};
		if price == pair.price {
			continue;
		}
		let mut conn = pool.acquire().await?;
		registry::set_pair_price(&mut conn, pair.id, price).await?;
		updated += 1;
	}
	Ok(updated)
}

/// Publish `market/status` for every active pair
pub async fn refresh_markets(pool: &SqlitePool, events: &Events) -> Result<usize> {
	let mut conn = pool.acquire().await?;
	let pairs = registry::pairs(&mut conn, None).await?;

	let mut statuses = Vec::new();
	for pair in pairs.into_iter().filter(|p| p.status) {
		let ratio = oracle::ratio(&mut conn, &pair.base_unit, &pair.quote_unit).await?;
		statuses.push(MarketStatus {
			pair_id: pair.id,
			base_unit: pair.base_unit,
			quote_unit: pair.quote_unit,
			kind: pair.kind,
			price: pair.price,
			ratio,
		});
	}
	drop(conn);

	for status in &statuses {
		events.emit(status, &[Topic::MarketStatus]).await;
	}
	Ok(statuses.len())
}

/// Spawn the price and market refresh loops
pub fn spawn(
	pool: SqlitePool,
	events: Events,
	feed: Arc<dyn PriceFeed>,
	price_every: Duration,
	market_every: Duration,
	shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
	let prices = {
		let pool = pool.clone();
		let shutdown = shutdown.clone();
		tokio::spawn(run_every("price refresh", price_every, shutdown, move || {
			let pool = pool.clone();
			let feed = feed.clone();
			async move { refresh_prices(&pool, feed.as_ref()).await }
		}))
	};
	let markets = tokio::spawn(run_every("market refresh", market_every, shutdown, move || {
		let pool = pool.clone();
		let events = events.clone();
		async move { refresh_markets(&pool, &events).await }
	}));
	vec![prices, markets]
}

async fn run_every<F, Fut>(
	name: &'static str,
	period: Duration,
	mut shutdown: watch::Receiver<bool>,
	mut tick: F,
) where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<usize>>,
{
	info!(target: "market", task = name, period = ?period, "Loop started");
	let mut interval = time::interval(period);
	interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
	loop {
		tokio::select! {
			_ = interval.tick() => match tick().await {
				Ok(count) => debug!(target: "market", task = name, count, "Tick done"),
				Err(e) => warn!(target: "market", task = name, error = %e, "Tick failed"),
			},
			changed = shutdown.changed() => {
				if changed.is_err() || *shutdown.borrow() {
					break;
				}
			}
		}
	}
	info!(target: "market", task = name, "Loop stopped");
}

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

//! Price oracle adapter
//!
//! Up to six external quote sources are asked once each, concurrently.
//! Zero and failed answers are dropped and the rest averaged. When nothing
//! survives the inverse pair is asked once and `1/x` returned.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use bourse_sdk::{PRICE_SCALE, Resolution, round};
use futures::future::join_all;
use moka::sync::Cache;
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::Result;
use crate::repo::candles;

/// Most sources consulted per request
pub const MAX_SOURCES: usize = 6;

#[derive(Debug, Clone, Error)]
pub enum OracleError {
	#[error("No quote for {base}/{quote}")]
	NoQuote { base: String, quote: String },
	#[error("Quote source unavailable: {0}")]
	Unavailable(String),
}

/// One external price source
#[async_trait]
pub trait QuoteSource: Send + Sync {
	fn name(&self) -> &str;

	/// Sources that quote USD and USDT separately are asked for `usd`
	/// whenever the caller asks for `usdt`
	fn distinguishes_usd(&self) -> bool {
		false
	}

	async fn quote(&self, base: &str, quote: &str) -> std::result::Result<Decimal, OracleError>;
}

/// What the settlement and matching loops need from an oracle
#[async_trait]
pub trait PriceFeed: Send + Sync {
	/// Price of one `base` in `quote`, or `None` when no source knows it
	async fn price(&self, base: &str, quote: &str) -> Option<Decimal>;
}

/// Aggregating oracle over a set of [`QuoteSource`]s
pub struct PriceOracle {
	sources: Vec<Arc<dyn QuoteSource>>,
	pause: Duration,
	cache: Cache<(String, String), Decimal>,
}

impl PriceOracle {
	/// Build an oracle over the first [`MAX_SOURCES`] sources
	pub fn new(mut sources: Vec<Arc<dyn QuoteSource>>) -> Self {
		if sources.len() > MAX_SOURCES {
			warn!(target: "oracle", count = sources.len(), "Too many quote sources, extra ones ignored");
			sources.truncate(MAX_SOURCES);
		}
		Self {
			sources,
			pause: Duration::from_secs(1),
			cache: Cache::builder()
				.max_capacity(10_000)
				.time_to_live(Duration::from_secs(30))
				.build(),
		}
	}

	/// Delay after gathering quotes; keeps the load on the sources bounded
	pub fn with_pause(mut self, pause: Duration) -> Self {
		self.pause = pause;
		self
	}

	pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
		self.cache = Cache::builder().max_capacity(10_000).time_to_live(ttl).build();
		self
	}

	async fn gather(&self, base: &str, quote: &str) -> Option<Decimal> {
		let requests = self.sources.iter().map(|source| {
			let asked = if source.distinguishes_usd() && quote == "usdt" {
				"usd"
			} else {
				quote
			};
			async move { (source.name().to_string(), source.quote(base, asked).await) }
		});
		let answers = join_all(requests).await;

		if !self.pause.is_zero() {
			tokio::time::sleep(self.pause).await;
		}

		let mut quotes = Vec::with_capacity(answers.len());
		for (name, answer) in answers {
			match answer {
				Ok(price) if price > Decimal::ZERO => quotes.push(price),
				Ok(_) => debug!(target: "oracle", source = %name, base, quote, "Zero quote dropped"),
				Err(e) => debug!(target: "oracle", source = %name, base, quote, error = %e, "Quote failed"),
			}
		}
		if quotes.is_empty() {
			return None;
		}
		let count = Decimal::from(quotes.len());
		Some(quotes.into_iter().sum::<Decimal>() / count)
	}
}

#[async_trait]
impl PriceFeed for PriceOracle {
	async fn price(&self, base: &str, quote: &str) -> Option<Decimal> {
		let base = base.to_ascii_lowercase();
		let quote = quote.to_ascii_lowercase();
		if base == quote {
			return Some(Decimal::ONE);
		}
		let key = (base.clone(), quote.clone());
		if let Some(cached) = self.cache.get(&key) {
			return Some(cached);
		}

		// the direct pair first, then its inverse exactly once
		let mut found = None;
		for attempt in 0..2 {
			if attempt == 0 {
				found = self.gather(&base, &quote).await;
			} else if let Some(inverse) = self.gather(&quote, &base).await {
				found = Some(round(Decimal::ONE / inverse, PRICE_SCALE));
			}
			if found.is_some() {
				break;
			}
		}

		match found {
			Some(price) => {
				self.cache.insert(key, price);
				Some(price)
			}
			None => {
				warn!(target: "oracle", base = %base, quote = %quote, "No price available");
				None
			}
		}
	}
}

/// Fixed quotes, e.g. from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticQuotes {
	name: String,
	quotes: HashMap<(String, String), Decimal>,
	usd_aware: bool,
}

impl StaticQuotes {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	pub fn with(mut self, base: &str, quote: &str, price: Decimal) -> Self {
		self.quotes
			.insert((base.to_ascii_lowercase(), quote.to_ascii_lowercase()), price);
		self
	}

	/// Mark the table as one that keys USD quotes under `usd`
	pub fn usd_aware(mut self) -> Self {
		self.usd_aware = true;
		self
	}
}

#[async_trait]
impl QuoteSource for StaticQuotes {
	fn name(&self) -> &str {
		&self.name
	}

	fn distinguishes_usd(&self) -> bool {
		self.usd_aware
	}

	async fn quote(&self, base: &str, quote: &str) -> std::result::Result<Decimal, OracleError> {
		self.quotes
			.get(&(base.to_string(), quote.to_string()))
			.copied()
			.ok_or_else(|| OracleError::NoQuote {
				base: base.to_string(),
				quote: quote.to_string(),
			})
	}
}

/// Percent change between the two most recent daily candles
pub async fn ratio(conn: &mut SqliteConnection, base: &str, quote: &str) -> Result<Decimal> {
	let recent = candles::latest(conn, base, quote, Resolution::Day, 2).await?;
	let [current, previous] = recent.as_slice() else {
		return Ok(Decimal::ZERO);
	};
	if previous.close.is_zero() {
		return Ok(Decimal::ZERO);
	}
	Ok(round(
		(current.close - previous.close) / previous.close * Decimal::ONE_HUNDRED,
		PRICE_SCALE,
	))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	struct Failing;

	#[async_trait]
	impl QuoteSource for Failing {
		fn name(&self) -> &str {
			"failing"
		}

		async fn quote(&self, _: &str, _: &str) -> std::result::Result<Decimal, OracleError> {
			Err(OracleError::Unavailable("timeout".to_string()))
		}
	}

	fn oracle(sources: Vec<Arc<dyn QuoteSource>>) -> PriceOracle {
		PriceOracle::new(sources).with_pause(Duration::ZERO)
	}

	#[tokio::test]
	async fn test_mean_of_surviving_quotes() {
		let oracle = oracle(vec![
			Arc::new(StaticQuotes::new("a").with("eth", "usdt", dec!(2000))),
			Arc::new(StaticQuotes::new("b").with("eth", "usdt", dec!(2100))),
			Arc::new(StaticQuotes::new("c").with("eth", "usdt", Decimal::ZERO)),
			Arc::new(Failing),
		]);
		assert_eq!(oracle.price("ETH", "usdt").await, Some(dec!(2050)));
	}

	#[tokio::test]
	async fn test_inverse_pair() {
		let oracle = oracle(vec![Arc::new(StaticQuotes::new("a").with("usdt", "trx", dec!(3)))]);
		assert_eq!(oracle.price("trx", "usdt").await, Some(dec!(0.33333333)));
	}

	#[tokio::test]
	async fn test_no_price() {
		let oracle = oracle(vec![Arc::new(Failing)]);
		assert_eq!(oracle.price("abc", "xyz").await, None);
	}

	#[tokio::test]
	async fn test_same_symbol_is_one() {
		let oracle = oracle(Vec::new());
		assert_eq!(oracle.price("eth", "ETH").await, Some(Decimal::ONE));
	}

	#[tokio::test]
	async fn test_usd_aware_source_gets_usd() {
		let oracle = oracle(vec![Arc::new(
			StaticQuotes::new("fiat").with("btc", "usd", dec!(60000)).usd_aware(),
		)]);
		assert_eq!(oracle.price("btc", "usdt").await, Some(dec!(60000)));
	}

	#[tokio::test]
	async fn test_sources_are_capped() {
		let sources: Vec<Arc<dyn QuoteSource>> = (0..8)
			.map(|i| {
				Arc::new(StaticQuotes::new(format!("s{}", i)).with("a", "b", Decimal::from(i + 1)))
					as Arc<dyn QuoteSource>
			})
			.collect();
		// only 1..=6 are asked
		assert_eq!(oracle(sources).price("a", "b").await, Some(dec!(3.5)));
	}

	#[tokio::test]
	async fn test_ratio_over_daily_candles() {
		let pool = crate::db::connect_memory().await.unwrap();
		let mut conn = pool.acquire().await.unwrap();
		assert_eq!(ratio(&mut conn, "btc", "usdt").await.unwrap(), Decimal::ZERO);

		for (time, close) in [(0, dec!(100)), (86_400, dec!(110))] {
			candles::upsert(
				&mut conn,
				&bourse_sdk::Candle {
					base_unit: "btc".to_string(),
					quote_unit: "usdt".to_string(),
					resolution: Resolution::Day,
					time,
					open: close,
					close,
					low: close,
					high: close,
					volume: dec!(1),
					price: close,
					trades: 1,
				},
			)
			.await
			.unwrap();
		}
		assert_eq!(ratio(&mut conn, "btc", "usdt").await.unwrap(), dec!(10));
	}
}

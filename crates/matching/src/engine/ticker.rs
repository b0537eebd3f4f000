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

//! Candle updates after each execution
//!
//! Every trade folds into the current bucket of each resolution, moves the
//! pair's last price and publishes `trade/ticker:<resolution>`. This never
//! calls back into matching.

use bourse_sdk::{Candle, Pair, Resolution, now};
use bourse_store::{Outbox, Result, Topic, registry, repo::candles};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;

pub async fn record(
	conn: &mut SqliteConnection,
	outbox: &mut Outbox,
	pair: &Pair,
	price: Decimal,
	quantity: Decimal,
) -> Result<()> {
	record_at(conn, outbox, pair, price, quantity, now()).await
}

/// [`record`] for a trade executed at unix time `at`
pub async fn record_at(
	conn: &mut SqliteConnection,
	outbox: &mut Outbox,
	pair: &Pair,
	price: Decimal,
	quantity: Decimal,
	at: i64,
) -> Result<()> {
	for resolution in Resolution::ALL {
		let time = resolution.bucket(at);
		let current = candles::get(conn, &pair.base_unit, &pair.quote_unit, *resolution, time).await?;
		let candle = match current {
			Some(candle) => fold(candle, price, quantity),
			None => Candle {
				base_unit: pair.base_unit.clone(),
				quote_unit: pair.quote_unit.clone(),
				resolution: *resolution,
				time,
				open: price,
				close: price,
				low: price,
				high: price,
				volume: quantity,
				price,
				trades: 1,
			},
		};
		candles::upsert(conn, &candle).await?;
		outbox.push(&candle, &[Topic::TradeTicker(*resolution)]);
	}
	registry::set_pair_price(conn, pair.id, price).await
}

/// Add one execution to an existing candle
pub fn fold(mut candle: Candle, price: Decimal, quantity: Decimal) -> Candle {
	let volume = candle.volume + quantity;
	if !volume.is_zero() {
		candle.price = (candle.price * candle.volume + price * quantity) / volume;
	}
	candle.close = price;
	candle.low = candle.low.min(price);
	candle.high = candle.high.max(price);
	candle.volume = volume;
	candle.trades += 1;
	candle
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	#[test]
	fn test_fold_tracks_range_and_average() {
		let candle = Candle {
			base_unit: "btc".to_string(),
			quote_unit: "usdt".to_string(),
			resolution: Resolution::Minute,
			time: 60,
			open: dec!(100),
			close: dec!(100),
			low: dec!(100),
			high: dec!(100),
			volume: dec!(1),
			price: dec!(100),
			trades: 1,
		};
		let candle = fold(candle, dec!(90), dec!(3));
		assert_eq!(candle.open, dec!(100));
		assert_eq!(candle.close, dec!(90));
		assert_eq!(candle.low, dec!(90));
		assert_eq!(candle.high, dec!(100));
		assert_eq!(candle.volume, dec!(4));
		assert_eq!(candle.price, dec!(92.5));
		assert_eq!(candle.trades, 2);
	}
}

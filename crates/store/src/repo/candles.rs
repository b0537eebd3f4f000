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

use bourse_sdk::{Candle, Resolution};
use sqlx::SqliteConnection;

use crate::error::Result;
use crate::rows;

pub async fn get(
	conn: &mut SqliteConnection,
	base: &str,
	quote: &str,
	resolution: Resolution,
	time: i64,
) -> Result<Option<Candle>> {
	let row = sqlx::query(
		"SELECT * FROM ohlcv WHERE base_unit = ? AND quote_unit = ? AND resolution = ? AND time = ?",
	)
	.bind(base)
	.bind(quote)
	.bind(resolution.as_str())
	.bind(time)
	.fetch_optional(&mut *conn)
	.await?;
	row.as_ref().map(rows::candle).transpose()
}

/// Insert or replace the candle for its bucket
pub async fn upsert(conn: &mut SqliteConnection, candle: &Candle) -> Result<()> {
	sqlx::query(
		"INSERT INTO ohlcv (base_unit, quote_unit, resolution, time, open, close, low, high,
			volume, price, trades)
		 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
		 ON CONFLICT (base_unit, quote_unit, resolution, time) DO UPDATE SET
			open = excluded.open,
			close = excluded.close,
			low = excluded.low,
			high = excluded.high,
			volume = excluded.volume,
			price = excluded.price,
			trades = excluded.trades",
	)
	.bind(&candle.base_unit)
	.bind(&candle.quote_unit)
	.bind(candle.resolution.as_str())
	.bind(candle.time)
	.bind(candle.open.to_string())
	.bind(candle.close.to_string())
	.bind(candle.low.to_string())
	.bind(candle.high.to_string())
	.bind(candle.volume.to_string())
	.bind(candle.price.to_string())
	.bind(candle.trades)
	.execute(&mut *conn)
	.await?;
	Ok(())
}

/// Most recent candles first
pub async fn latest(
	conn: &mut SqliteConnection,
	base: &str,
	quote: &str,
	resolution: Resolution,
	limit: i64,
) -> Result<Vec<Candle>> {
	let found = sqlx::query(
		"SELECT * FROM ohlcv WHERE base_unit = ? AND quote_unit = ? AND resolution = ?
		 ORDER BY time DESC LIMIT ?",
	)
	.bind(base)
	.bind(quote)
	.bind(resolution.as_str())
	.bind(limit)
	.fetch_all(&mut *conn)
	.await?;
	found.iter().map(rows::candle).collect()
}

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

use bourse_sdk::Trade;
use sqlx::SqliteConnection;

use crate::error::Result;
use crate::rows;

/// Write one side of an execution; returns the row id
pub async fn insert(conn: &mut SqliteConnection, trade: &Trade) -> Result<i64> {
	let id = sqlx::query(
		"INSERT INTO trades (order_id, assigning, user_id, counterparty, base_unit, quote_unit,
			price, quantity, fees, maker, type, create_at)
		 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(trade.order_id)
	.bind(trade.assigning.as_str())
	.bind(trade.user_id)
	.bind(trade.counterparty)
	.bind(&trade.base_unit)
	.bind(&trade.quote_unit)
	.bind(trade.price.to_string())
	.bind(trade.quantity.to_string())
	.bind(trade.fees.to_string())
	.bind(trade.maker)
	.bind(trade.kind.as_str())
	.bind(trade.create_at)
	.execute(&mut *conn)
	.await?
	.last_insert_rowid();
	Ok(id)
}

pub async fn for_order(conn: &mut SqliteConnection, order_id: i64) -> Result<Vec<Trade>> {
	let found = sqlx::query("SELECT * FROM trades WHERE order_id = ? ORDER BY id ASC")
		.bind(order_id)
		.fetch_all(&mut *conn)
		.await?;
	found.iter().map(rows::trade).collect()
}

pub async fn for_user(conn: &mut SqliteConnection, user_id: i64) -> Result<Vec<Trade>> {
	let found = sqlx::query("SELECT * FROM trades WHERE user_id = ? ORDER BY id ASC")
		.bind(user_id)
		.fetch_all(&mut *conn)
		.await?;
	found.iter().map(rows::trade).collect()
}

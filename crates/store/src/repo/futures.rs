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

use bourse_sdk::{Assigning, ExchangeError, FutureOrder, OrderStatus, Position};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;

use crate::error::Result;
use crate::rows;

pub async fn insert(conn: &mut SqliteConnection, order: &FutureOrder) -> Result<FutureOrder> {
	let id = sqlx::query(
		"INSERT INTO futures (user_id, base_unit, quote_unit, price, quantity, value, leverage,
			position, assigning, trading, status, parent, settled, entry, create_at)
		 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(order.user_id)
	.bind(&order.base_unit)
	.bind(&order.quote_unit)
	.bind(order.price.to_string())
	.bind(order.quantity.to_string())
	.bind(order.value.to_string())
	.bind(order.leverage as i64)
	.bind(order.position.as_str())
	.bind(order.assigning.as_str())
	.bind(order.trading.as_str())
	.bind(order.status.as_str())
	.bind(order.parent)
	.bind(order.settled.to_string())
	.bind(order.entry.to_string())
	.bind(order.create_at)
	.execute(&mut *conn)
	.await?
	.last_insert_rowid();

	Ok(FutureOrder { id, ..order.clone() })
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<FutureOrder> {
	let row = sqlx::query("SELECT * FROM futures WHERE id = ?")
		.bind(id)
		.fetch_optional(&mut *conn)
		.await?
		.ok_or_else(|| ExchangeError::not_found(format!("future order {}", id)))?;
	rows::future(&row)
}

/// Persist every mutable column of a futures row
pub async fn save(conn: &mut SqliteConnection, order: &FutureOrder) -> Result<()> {
	sqlx::query(
		"UPDATE futures SET quantity = ?, value = ?, status = ?, settled = ?, entry = ? WHERE id = ?",
	)
	.bind(order.quantity.to_string())
	.bind(order.value.to_string())
	.bind(order.status.as_str())
	.bind(order.settled.to_string())
	.bind(order.entry.to_string())
	.bind(order.id)
	.execute(&mut *conn)
	.await?;
	Ok(())
}

/// Pending futures orders of one assigning and position, oldest first
pub async fn pending_side(
	conn: &mut SqliteConnection,
	base: &str,
	quote: &str,
	assigning: Assigning,
	position: Position,
	exclude_user: i64,
) -> Result<Vec<FutureOrder>> {
	let found = sqlx::query(
		"SELECT * FROM futures
		 WHERE base_unit = ? AND quote_unit = ? AND assigning = ? AND position = ?
		   AND status = 'pending' AND user_id != ?
		 ORDER BY id ASC",
	)
	.bind(base)
	.bind(quote)
	.bind(assigning.as_str())
	.bind(position.as_str())
	.bind(exclude_user)
	.fetch_all(&mut *conn)
	.await?;
	found.iter().map(rows::future).collect()
}

/// Open rows of a user that still hold a matched, unclosed quantity
pub async fn open_positions(conn: &mut SqliteConnection, user_id: i64) -> Result<Vec<FutureOrder>> {
	let found = sqlx::query(
		"SELECT * FROM futures WHERE user_id = ? AND assigning = 'open' ORDER BY id ASC",
	)
	.bind(user_id)
	.fetch_all(&mut *conn)
	.await?;
	let orders = found.iter().map(rows::future).collect::<Result<Vec<_>>>()?;
	Ok(orders
		.into_iter()
		.filter(|o| o.closable() > Decimal::ZERO)
		.collect())
}

pub async fn for_user(
	conn: &mut SqliteConnection,
	user_id: i64,
	status: Option<OrderStatus>,
) -> Result<Vec<FutureOrder>> {
	let found = match status {
		Some(status) => {
			sqlx::query("SELECT * FROM futures WHERE user_id = ? AND status = ? ORDER BY id DESC")
				.bind(user_id)
				.bind(status.as_str())
				.fetch_all(&mut *conn)
				.await?
		}
		None => {
			sqlx::query("SELECT * FROM futures WHERE user_id = ? ORDER BY id DESC")
				.bind(user_id)
				.fetch_all(&mut *conn)
				.await?
		}
	};
	found.iter().map(rows::future).collect()
}

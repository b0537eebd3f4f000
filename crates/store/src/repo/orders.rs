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

use bourse_sdk::{Assigning, ExchangeError, MarketKind, Order, OrderStatus};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;

use crate::error::Result;
use crate::rows;

/// Insert a new order row; `order.id` is ignored and the stored row returned
pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> Result<Order> {
	let id = sqlx::query(
		"INSERT INTO orders (user_id, base_unit, quote_unit, price, quantity, value,
			assigning, trading, type, status, create_at)
		 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
	)
	.bind(order.user_id)
	.bind(&order.base_unit)
	.bind(&order.quote_unit)
	.bind(order.price.to_string())
	.bind(order.quantity.to_string())
	.bind(order.value.to_string())
	.bind(order.assigning.as_str())
	.bind(order.trading.as_str())
	.bind(order.kind.as_str())
	.bind(order.status.as_str())
	.bind(order.create_at)
	.execute(&mut *conn)
	.await?
	.last_insert_rowid();

	Ok(Order { id, ..order.clone() })
}

pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Order> {
	let row = sqlx::query("SELECT * FROM orders WHERE id = ?")
		.bind(id)
		.fetch_optional(&mut *conn)
		.await?
		.ok_or_else(|| ExchangeError::not_found(format!("order {}", id)))?;
	rows::order(&row)
}

/// Persist the remaining value and status of an order
pub async fn update(
	conn: &mut SqliteConnection,
	id: i64,
	value: Decimal,
	status: OrderStatus,
) -> Result<()> {
	sqlx::query("UPDATE orders SET value = ?, status = ? WHERE id = ?")
		.bind(value.to_string())
		.bind(status.as_str())
		.bind(id)
		.execute(&mut *conn)
		.await?;
	Ok(())
}

/// Pending orders on one side of a book, oldest first, excluding one user
pub async fn pending_side(
	conn: &mut SqliteConnection,
	base: &str,
	quote: &str,
	kind: MarketKind,
	assigning: Assigning,
	exclude_user: i64,
) -> Result<Vec<Order>> {
	let found = sqlx::query(
		"SELECT * FROM orders
		 WHERE base_unit = ? AND quote_unit = ? AND type = ? AND assigning = ?
		   AND status = 'pending' AND user_id != ?
		 ORDER BY id ASC",
	)
	.bind(base)
	.bind(quote)
	.bind(kind.as_str())
	.bind(assigning.as_str())
	.bind(exclude_user)
	.fetch_all(&mut *conn)
	.await?;
	found.iter().map(rows::order).collect()
}

pub async fn for_user(
	conn: &mut SqliteConnection,
	user_id: i64,
	status: Option<OrderStatus>,
) -> Result<Vec<Order>> {
	let found = match status {
		Some(status) => {
			sqlx::query("SELECT * FROM orders WHERE user_id = ? AND status = ? ORDER BY id DESC")
				.bind(user_id)
				.bind(status.as_str())
				.fetch_all(&mut *conn)
				.await?
		}
		None => {
			sqlx::query("SELECT * FROM orders WHERE user_id = ? ORDER BY id DESC")
				.bind(user_id)
				.fetch_all(&mut *conn)
				.await?
		}
	};
	found.iter().map(rows::order).collect()
}

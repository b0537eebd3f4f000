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

//! Futures positions
//!
//! An `open` row posts `quantity × price / leverage` of quote as margin
//! and becomes a position as it matches. A `close` row names the open row
//! it reduces; the closable quantity is reserved on the parent when the
//! close is placed and released again if the close is cancelled.

use bourse_sdk::{
	Assigning, Direction, ExchangeError, FutureOrder, MarketKind, OrderStatus, Position, Trade,
	Trading, now,
};
use bourse_store::{
	Outbox, Topic, ledger,
	repo::{futures, trades},
};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use tracing::debug;

use super::{HOUSE, Listing, Result};
use crate::matcher::{self, Side};
use crate::types::{FuturePlacement, FutureRequest};

pub(super) async fn place(
	conn: &mut SqliteConnection,
	outbox: &mut Outbox,
	request: &FutureRequest,
) -> Result<FuturePlacement> {
	let side = Side::of_future(request.assigning, request.position).ok_or_else(|| {
		ExchangeError::invalid(format!("`{}` is not a futures order direction", request.assigning))
	})?;
	if request.quantity <= Decimal::ZERO {
		return Err(ExchangeError::invalid("quantity must be positive").into());
	}

	let listing =
		Listing::load(conn, &request.base_unit, &request.quote_unit, MarketKind::Future).await?;
	let pair = &listing.pair;

	let price = match request.trading {
		Trading::Limit => request.price,
		Trading::Market => {
			let resting = futures::pending_side(
				conn,
				&pair.base_unit,
				&pair.quote_unit,
				request.assigning,
				request.position.opposite(),
				request.user_id,
			)
			.await?;
			matcher::market_price(side, pair.price, resting.iter().map(|o| o.price))
		}
	};
	if price <= Decimal::ZERO {
		return Err(ExchangeError::ImpossiblePrice.into());
	}

	let mut order = if request.assigning == Assigning::Open {
		open(conn, &listing, request, price).await?
	} else {
		close(conn, &listing, request, price).await?
	};
	outbox.push(&order, &[Topic::FutureCreate]);

	let mut trades = replay(conn, outbox, &listing, side, &mut order).await?;
	if order.trading == Trading::Market && order.value > Decimal::ZERO {
		let (price, quantity) = (order.price, order.value);
		trades.push(fill(conn, &listing, &mut order, false, HOUSE, price, quantity).await?);
		outbox.push(&order, &[Topic::FutureStatus]);
		debug!(target: "matching", order = order.id, %price, %quantity, "House filled future");
	}
	Ok(FuturePlacement { order, trades })
}

async fn open(
	conn: &mut SqliteConnection,
	listing: &Listing,
	request: &FutureRequest,
	price: Decimal,
) -> Result<FutureOrder> {
	if request.leverage == 0 {
		return Err(ExchangeError::invalid("leverage must be at least 1").into());
	}
	let quote = &listing.quote;
	let notional = request.quantity * price;
	if notional < quote.min_trade || matcher::above_max(notional, quote.max_trade) {
		return Err(ExchangeError::invalid(format!(
			"{} {} is outside the trade limits [{}, {}]",
			notional, quote.symbol, quote.min_trade, quote.max_trade
		))
		.into());
	}

	let margin = notional / Decimal::from(request.leverage);
	let available = ledger::balance(conn, request.user_id, &quote.symbol, MarketKind::Future).await?;
	if available < margin {
		return Err(ExchangeError::insufficient(format!(
			"{} {} margin available, {} required",
			available, quote.symbol, margin
		))
		.into());
	}
	ledger::adjust_balance(
		conn,
		request.user_id,
		&quote.symbol,
		MarketKind::Future,
		margin,
		Direction::Minus,
	)
	.await?;

	Ok(futures::insert(
		conn,
		&FutureOrder {
			id: 0,
			user_id: request.user_id,
			base_unit: listing.pair.base_unit.clone(),
			quote_unit: listing.pair.quote_unit.clone(),
			price,
			quantity: request.quantity,
			value: request.quantity,
			leverage: request.leverage,
			position: request.position,
			assigning: Assigning::Open,
			trading: request.trading,
			status: OrderStatus::Pending,
			parent: None,
			settled: Decimal::ZERO,
			entry: Decimal::ZERO,
			create_at: now(),
		},
	)
	.await?)
}

async fn close(
	conn: &mut SqliteConnection,
	listing: &Listing,
	request: &FutureRequest,
	price: Decimal,
) -> Result<FutureOrder> {
	let parent_id = request
		.parent
		.ok_or_else(|| ExchangeError::invalid("a close order must name the position it reduces"))?;
	let mut parent = futures::get(conn, parent_id).await?;
	if parent.user_id != request.user_id || parent.assigning != Assigning::Open {
		return Err(ExchangeError::not_found(format!("position {}", parent_id)).into());
	}
	if parent.position != request.position
		|| parent.base_unit != listing.pair.base_unit
		|| parent.quote_unit != listing.pair.quote_unit
	{
		return Err(ExchangeError::invalid(format!(
			"position {} is a {} {}/{} position",
			parent_id, parent.position, parent.base_unit, parent.quote_unit
		))
		.into());
	}
	if parent.closable() < request.quantity {
		return Err(ExchangeError::insufficient(format!(
			"position {} has {} left to close",
			parent_id,
			parent.closable()
		))
		.into());
	}

	parent.settled += request.quantity;
	futures::save(conn, &parent).await?;

	Ok(futures::insert(
		conn,
		&FutureOrder {
			id: 0,
			user_id: request.user_id,
			base_unit: parent.base_unit.clone(),
			quote_unit: parent.quote_unit.clone(),
			price,
			quantity: request.quantity,
			value: request.quantity,
			leverage: parent.leverage,
			position: parent.position,
			assigning: Assigning::Close,
			trading: request.trading,
			status: OrderStatus::Pending,
			parent: Some(parent.id),
			settled: Decimal::ZERO,
			entry: Decimal::ZERO,
			create_at: now(),
		},
	)
	.await?)
}

/// Opens match opposite opens, closes match opposite closes
async fn replay(
	conn: &mut SqliteConnection,
	outbox: &mut Outbox,
	listing: &Listing,
	side: Side,
	taker: &mut FutureOrder,
) -> Result<Vec<Trade>> {
	let resting = futures::pending_side(
		conn,
		&taker.base_unit,
		&taker.quote_unit,
		taker.assigning,
		taker.position.opposite(),
		taker.user_id,
	)
	.await?;

	let mut trades = Vec::new();
	for mut maker in matcher::priority(side, taker.price, resting) {
		if taker.value <= Decimal::ZERO {
			break;
		}
		let quantity = taker.value.min(maker.value);
		let price = maker.price;
		let counterparty = maker.user_id;
		trades.push(fill(conn, listing, taker, false, counterparty, price, quantity).await?);
		fill(conn, listing, &mut maker, true, taker.user_id, price, quantity).await?;

		outbox.push(&*taker, &[Topic::FutureStatus]);
		outbox.push(&maker, &[Topic::FutureStatus]);
		debug!(
			target: "matching",
			taker = taker.id,
			maker = maker.id,
			%price,
			%quantity,
			"Matched future"
		);
	}
	Ok(trades)
}

/// Apply one execution to a futures row and write its trade row.
///
/// Opens move their entry price to the quantity-weighted average. Closes
/// pay back the parent's margin for the closed quantity plus its profit
/// or loss, less the trade fee, never below zero.
#[allow(clippy::too_many_arguments)]
async fn fill(
	conn: &mut SqliteConnection,
	listing: &Listing,
	order: &mut FutureOrder,
	maker: bool,
	counterparty: i64,
	price: Decimal,
	quantity: Decimal,
) -> Result<Trade> {
	let fees = match order.assigning {
		Assigning::Open => {
			let matched = order.quantity - order.value;
			order.entry = (order.entry * matched + price * quantity) / (matched + quantity);
			Decimal::ZERO
		}
		_ => {
			let parent_id = order
				.parent
				.ok_or_else(|| ExchangeError::invalid(format!("close {} has no position", order.id)))?;
			let parent = futures::get(conn, parent_id).await?;
			let fees = matcher::fee(quantity * price, matcher::fee_rate(&listing.base, maker));
			let payout = (quantity * parent.price / Decimal::from(parent.leverage.max(1))
				+ profit(&parent, price, quantity)
				- fees)
				.max(Decimal::ZERO);
			if payout > Decimal::ZERO {
				ledger::adjust_balance(
					conn,
					order.user_id,
					&listing.quote.symbol,
					MarketKind::Future,
					payout,
					Direction::Plus,
				)
				.await?;
			}
			fees
		}
	};

	order.value -= quantity;
	if order.value.is_zero() {
		order.status = OrderStatus::Filled;
	}
	futures::save(conn, order).await?;

	let mut trade = Trade {
		id: 0,
		order_id: order.id,
		assigning: order.assigning,
		user_id: order.user_id,
		counterparty,
		base_unit: order.base_unit.clone(),
		quote_unit: order.quote_unit.clone(),
		price,
		quantity,
		fees,
		maker,
		kind: MarketKind::Future,
		create_at: now(),
	};
	trade.id = trades::insert(conn, &trade).await?;
	Ok(trade)
}

/// Profit of closing `quantity` of an open position at `price`
pub(crate) fn profit(position: &FutureOrder, price: Decimal, quantity: Decimal) -> Decimal {
	match position.position {
		Position::Long => (price - position.entry) * quantity,
		Position::Short => (position.entry - price) * quantity,
	}
}

pub(super) async fn cancel(
	conn: &mut SqliteConnection,
	outbox: &mut Outbox,
	user_id: i64,
	order_id: i64,
) -> Result<FutureOrder> {
	let mut order = futures::get(conn, order_id).await?;
	if order.user_id != user_id {
		return Err(ExchangeError::not_found(format!("future order {}", order_id)).into());
	}
	if order.status != OrderStatus::Pending {
		return Err(ExchangeError::invalid(format!("future order {} is already {}", order_id, order.status)).into());
	}

	if order.assigning == Assigning::Open {
		let refund = order.value * order.price / Decimal::from(order.leverage.max(1));
		ledger::adjust_balance(
			conn,
			user_id,
			&order.quote_unit,
			MarketKind::Future,
			refund,
			Direction::Plus,
		)
		.await?;
		// The matched part stays open as a position
		order.quantity -= order.value;
		order.value = Decimal::ZERO;
	} else if let Some(parent_id) = order.parent {
		let mut parent = futures::get(conn, parent_id).await?;
		parent.settled = (parent.settled - order.value).max(Decimal::ZERO);
		futures::save(conn, &parent).await?;
	}

	order.status = OrderStatus::Cancel;
	futures::save(conn, &order).await?;
	outbox.push(&order, &[Topic::FutureCancel]);
	Ok(order)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	fn position(side: Position, entry: Decimal) -> FutureOrder {
		FutureOrder {
			id: 1,
			user_id: 1,
			base_unit: "btc".to_string(),
			quote_unit: "usdt".to_string(),
			price: entry,
			quantity: dec!(2),
			value: Decimal::ZERO,
			leverage: 10,
			position: side,
			assigning: Assigning::Open,
			trading: Trading::Limit,
			status: OrderStatus::Filled,
			parent: None,
			settled: Decimal::ZERO,
			entry,
			create_at: 0,
		}
	}

	#[test]
	fn test_profit_by_position() {
		assert_eq!(profit(&position(Position::Long, dec!(100)), dec!(110), dec!(2)), dec!(20));
		assert_eq!(profit(&position(Position::Short, dec!(100)), dec!(110), dec!(2)), dec!(-20));
		assert_eq!(profit(&position(Position::Short, dec!(100)), dec!(90), dec!(1)), dec!(10));
	}
}

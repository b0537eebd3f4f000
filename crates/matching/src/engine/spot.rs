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

//! Spot, stock and cross orders

use bourse_sdk::{Assigning, Direction, ExchangeError, MarketKind, Order, OrderStatus, Trade, Trading, now};
use bourse_store::{
	Outbox, Topic, ledger,
	repo::{orders, trades},
};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use tracing::debug;

use super::{HOUSE, Listing, Result, ticker};
use crate::matcher::{self, Side};
use crate::types::{OrderRequest, Placement};

pub(super) async fn place(
	conn: &mut SqliteConnection,
	outbox: &mut Outbox,
	request: &OrderRequest,
) -> Result<Placement> {
	let side = Side::of_spot(request.assigning).ok_or_else(|| {
		ExchangeError::invalid(format!("`{}` is not a spot order direction", request.assigning))
	})?;
	if request.kind == MarketKind::Future {
		return Err(ExchangeError::invalid("futures orders are placed as positions").into());
	}
	if request.quantity <= Decimal::ZERO {
		return Err(ExchangeError::invalid("quantity must be positive").into());
	}

	let listing = Listing::load(conn, &request.base_unit, &request.quote_unit, request.kind).await?;
	let pair = &listing.pair;

	let price = match request.trading {
		Trading::Limit => request.price,
		Trading::Market => {
			let resting = orders::pending_side(
				conn,
				&pair.base_unit,
				&pair.quote_unit,
				request.kind,
				request.assigning.opposite(),
				request.user_id,
			)
			.await?;
			matcher::market_price(side, pair.price, resting.iter().map(|o| o.price))
		}
	};
	if price <= Decimal::ZERO {
		return Err(ExchangeError::ImpossiblePrice.into());
	}

	// A market buy is sized in quote
	let quantity = match (side, request.trading) {
		(Side::Bid, Trading::Market) => matcher::truncate(request.quantity / price, pair.base_decimal),
		_ => request.quantity,
	};
	if quantity <= Decimal::ZERO {
		return Err(ExchangeError::invalid(format!("quantity rounds to zero at price {}", price)).into());
	}

	let (asset, debit) = match side {
		Side::Bid => (&listing.quote, quantity * price),
		Side::Ask => (&listing.base, quantity),
	};
	if debit < asset.min_trade || matcher::above_max(debit, asset.max_trade) {
		return Err(ExchangeError::invalid(format!(
			"{} {} is outside the trade limits [{}, {}]",
			debit, asset.symbol, asset.min_trade, asset.max_trade
		))
		.into());
	}
	let available = ledger::balance(conn, request.user_id, &asset.symbol, request.kind).await?;
	if available < debit {
		return Err(ExchangeError::insufficient(format!(
			"{} {} available, {} required",
			available, asset.symbol, debit
		))
		.into());
	}
	ledger::adjust_balance(conn, request.user_id, &asset.symbol, request.kind, debit, Direction::Minus)
		.await?;

	let mut order = orders::insert(
		conn,
		&Order {
			id: 0,
			user_id: request.user_id,
			base_unit: pair.base_unit.clone(),
			quote_unit: pair.quote_unit.clone(),
			price,
			quantity,
			value: quantity,
			assigning: request.assigning,
			trading: request.trading,
			kind: request.kind,
			status: OrderStatus::Pending,
			create_at: now(),
		},
	)
	.await?;

	let mut trades = replay(conn, outbox, &listing, side, &mut order).await?;
	if order.trading == Trading::Market && order.value > Decimal::ZERO {
		trades.push(house_fill(conn, outbox, &listing, &mut order).await?);
	}
	if trades.is_empty() {
		outbox.push(&order, &[Topic::OrderCreate]);
	}
	Ok(Placement { order, trades })
}

/// Match `taker` against the resting side of its pair until it is filled
/// or nothing crosses any more
async fn replay(
	conn: &mut SqliteConnection,
	outbox: &mut Outbox,
	listing: &Listing,
	side: Side,
	taker: &mut Order,
) -> Result<Vec<Trade>> {
	let resting = orders::pending_side(
		conn,
		&taker.base_unit,
		&taker.quote_unit,
		taker.kind,
		taker.assigning.opposite(),
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
		trades.push(execute(conn, listing, taker, Some(&maker), price, quantity).await?);

		for order in [&mut *taker, &mut maker] {
			order.value -= quantity;
			if order.value.is_zero() {
				order.status = OrderStatus::Filled;
			}
			orders::update(conn, order.id, order.value, order.status).await?;
		}

		outbox.push(&*taker, &[Topic::OrderCreate, Topic::OrderStatus]);
		outbox.push(&maker, &[Topic::OrderStatus]);
		if maker.status == OrderStatus::Filled {
			outbox.push(&maker, &[Topic::OrderFilled]);
		}
		if taker.status == OrderStatus::Filled {
			outbox.push(&*taker, &[Topic::OrderFilled]);
		}
		ticker::record(conn, outbox, &listing.pair, price, quantity).await?;

		debug!(
			target: "matching",
			taker = taker.id,
			maker = maker.id,
			%price,
			%quantity,
			"Matched"
		);
	}
	Ok(trades)
}

/// The exchange takes the unmatched rest of a market order at its price
async fn house_fill(
	conn: &mut SqliteConnection,
	outbox: &mut Outbox,
	listing: &Listing,
	order: &mut Order,
) -> Result<Trade> {
	let (price, quantity) = (order.price, order.value);
	let trade = execute(conn, listing, order, None, price, quantity).await?;

	order.value = Decimal::ZERO;
	order.status = OrderStatus::Filled;
	orders::update(conn, order.id, order.value, order.status).await?;
	outbox.push(&*order, &[Topic::OrderCreate, Topic::OrderStatus, Topic::OrderFilled]);
	ticker::record(conn, outbox, &listing.pair, price, quantity).await?;

	debug!(target: "matching", order = order.id, %price, %quantity, "House filled");
	Ok(trade)
}

/// Settle one execution. Returns the taker's trade row.
async fn execute(
	conn: &mut SqliteConnection,
	listing: &Listing,
	taker: &Order,
	maker: Option<&Order>,
	price: Decimal,
	quantity: Decimal,
) -> Result<Trade> {
	let at = now();
	let counterparty = maker.map(|m| m.user_id).unwrap_or(HOUSE);
	let trade = credit(conn, listing, taker, false, counterparty, price, quantity, at).await?;
	if let Some(maker) = maker {
		credit(conn, listing, maker, true, taker.user_id, price, quantity, at).await?;
	}

	// A bid above the execution price gets the difference back
	if taker.assigning == Assigning::Buy && taker.price > price {
		ledger::adjust_balance(
			conn,
			taker.user_id,
			&listing.quote.symbol,
			taker.kind,
			(taker.price - price) * quantity,
			Direction::Plus,
		)
		.await?;
	}
	Ok(trade)
}

/// Credit one side of an execution net of its fee and write its trade row
#[allow(clippy::too_many_arguments)]
async fn credit(
	conn: &mut SqliteConnection,
	listing: &Listing,
	order: &Order,
	maker: bool,
	counterparty: i64,
	price: Decimal,
	quantity: Decimal,
	at: i64,
) -> Result<Trade> {
	let rate = matcher::fee_rate(&listing.base, maker);
	let (symbol, received, fees) = match order.assigning {
		Assigning::Buy => (
			&listing.base.symbol,
			matcher::net(quantity, rate),
			matcher::fee(quantity * price, rate),
		),
		_ => (
			&listing.quote.symbol,
			matcher::net(quantity * price, rate),
			matcher::fee(quantity, rate),
		),
	};
	ledger::adjust_balance(conn, order.user_id, symbol, order.kind, received, Direction::Plus).await?;

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
		kind: order.kind,
		create_at: at,
	};
	trade.id = trades::insert(conn, &trade).await?;
	Ok(trade)
}

pub(super) async fn cancel(
	conn: &mut SqliteConnection,
	outbox: &mut Outbox,
	user_id: i64,
	order_id: i64,
) -> Result<Order> {
	let mut order = orders::get(conn, order_id).await?;
	if order.user_id != user_id {
		return Err(ExchangeError::not_found(format!("order {}", order_id)).into());
	}
	if order.status != OrderStatus::Pending {
		return Err(ExchangeError::invalid(format!("order {} is already {}", order_id, order.status)).into());
	}

	let (symbol, refund) = match order.assigning {
		Assigning::Buy => (order.quote_unit.clone(), order.value * order.price),
		_ => (order.base_unit.clone(), order.value),
	};
	ledger::adjust_balance(conn, user_id, &symbol, order.kind, refund, Direction::Plus).await?;

	order.status = OrderStatus::Cancel;
	orders::update(conn, order.id, order.value, order.status).await?;
	outbox.push(&order, &[Topic::OrderCancel]);
	Ok(order)
}

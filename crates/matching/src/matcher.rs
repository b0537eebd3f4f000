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

//! Price-time priority rules
//!
//! The book lives in the database; these helpers decide which resting
//! orders an incoming order crosses, in which order they are consumed and
//! what each side pays in fees.

use bourse_sdk::{Asset, Assigning, FutureOrder, Order, Position};
use rust_decimal::{Decimal, RoundingStrategy};

/// Which side of the book an incoming order takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
	/// Pays quote for base; crosses resting asks at or below its limit
	Bid,
	/// Sells base for quote; crosses resting bids at or above its limit
	Ask,
}

impl Side {
	pub fn of_spot(assigning: Assigning) -> Option<Side> {
		match assigning {
			Assigning::Buy => Some(Side::Bid),
			Assigning::Sell => Some(Side::Ask),
			Assigning::Open | Assigning::Close => None,
		}
	}

	/// Opening a long or closing a short buys; the other two sell
	pub fn of_future(assigning: Assigning, position: Position) -> Option<Side> {
		match (assigning, position) {
			(Assigning::Open, Position::Long) | (Assigning::Close, Position::Short) => Some(Side::Bid),
			(Assigning::Open, Position::Short) | (Assigning::Close, Position::Long) => Some(Side::Ask),
			_ => None,
		}
	}

	/// Whether a resting order at `resting` crosses an incoming `limit`
	pub fn crosses(&self, limit: Decimal, resting: Decimal) -> bool {
		match self {
			Side::Bid => limit >= resting,
			Side::Ask => limit <= resting,
		}
	}
}

/// Resting order as seen by the matcher
pub trait Resting {
	fn id(&self) -> i64;
	fn price(&self) -> Decimal;
}

impl Resting for Order {
	fn id(&self) -> i64 {
		self.id
	}

	fn price(&self) -> Decimal {
		self.price
	}
}

impl Resting for FutureOrder {
	fn id(&self) -> i64 {
		self.id
	}

	fn price(&self) -> Decimal {
		self.price
	}
}

/// Keep the resting orders an incoming `side` order at `limit` crosses,
/// best price first and oldest first within a price.
pub fn priority<T: Resting>(side: Side, limit: Decimal, resting: Vec<T>) -> Vec<T> {
	let mut crossed: Vec<T> = resting
		.into_iter()
		.filter(|order| side.crosses(limit, order.price()))
		.collect();
	crossed.sort_by(|a, b| {
		let by_price = match side {
			Side::Bid => a.price().cmp(&b.price()),
			Side::Ask => b.price().cmp(&a.price()),
		};
		by_price.then(a.id().cmp(&b.id()))
	});
	crossed
}

/// Price a market order trades at.
///
/// A bid takes the cheapest resting ask at or above the last price, an ask
/// the highest resting bid at or below it. With nothing on that side of the
/// last price the last price itself is used.
pub fn market_price(side: Side, last: Decimal, resting: impl IntoIterator<Item = Decimal>) -> Decimal {
	let resting = resting.into_iter();
	let found = match side {
		Side::Bid => resting.filter(|p| *p >= last).min(),
		Side::Ask => resting.filter(|p| *p <= last).max(),
	};
	found.unwrap_or(last)
}

/// Trade fee in percent for the taker or a resting maker
pub fn fee_rate(asset: &Asset, maker: bool) -> Decimal {
	if maker {
		(asset.fees_trade - asset.fees_discount).max(Decimal::ZERO)
	} else {
		asset.fees_trade
	}
}

/// `rate` percent of `amount`
pub fn fee(amount: Decimal, rate: Decimal) -> Decimal {
	amount * rate / Decimal::ONE_HUNDRED
}

/// `amount` less `rate` percent
pub fn net(amount: Decimal, rate: Decimal) -> Decimal {
	amount - fee(amount, rate)
}

/// Drop digits beyond `dp` places
pub fn truncate(value: Decimal, dp: u32) -> Decimal {
	value.round_dp_with_strategy(dp, RoundingStrategy::ToZero)
}

/// `true` when `max` is set and `amount` exceeds it
pub fn above_max(amount: Decimal, max: Decimal) -> bool {
	max > Decimal::ZERO && amount > max
}

#[cfg(test)]
mod tests {
	use super::*;
	use bourse_sdk::{AssetGroup, MarketKind, OrderStatus, Trading};
	use proptest::prelude::*;
	use rust_decimal_macros::dec;

	fn ask(id: i64, price: Decimal) -> Order {
		Order {
			id,
			user_id: 7,
			base_unit: "btc".to_string(),
			quote_unit: "usdt".to_string(),
			price,
			quantity: Decimal::ONE,
			value: Decimal::ONE,
			assigning: Assigning::Sell,
			trading: Trading::Limit,
			kind: MarketKind::Spot,
			status: OrderStatus::Pending,
			create_at: 0,
		}
	}

	#[test]
	fn test_bid_takes_cheapest_asks_first() {
		let book = vec![ask(1, dec!(101)), ask(2, dec!(99)), ask(3, dec!(100)), ask(4, dec!(99))];
		let ids: Vec<i64> = priority(Side::Bid, dec!(100), book).iter().map(|o| o.id).collect();
		assert_eq!(ids, vec![2, 4, 3]);
	}

	#[test]
	fn test_ask_takes_highest_bids_first() {
		let book = vec![ask(1, dec!(48)), ask(2, dec!(50)), ask(3, dec!(52)), ask(4, dec!(50))];
		let ids: Vec<i64> = priority(Side::Ask, dec!(50), book).iter().map(|o| o.id).collect();
		assert_eq!(ids, vec![3, 2, 4]);
	}

	#[test]
	fn test_future_sides() {
		assert_eq!(Side::of_future(Assigning::Open, Position::Long), Some(Side::Bid));
		assert_eq!(Side::of_future(Assigning::Close, Position::Long), Some(Side::Ask));
		assert_eq!(Side::of_future(Assigning::Close, Position::Short), Some(Side::Bid));
		assert_eq!(Side::of_future(Assigning::Buy, Position::Long), None);
		assert_eq!(Side::of_spot(Assigning::Open), None);
	}

	#[test]
	fn test_market_price() {
		let asks = [dec!(99), dec!(103), dec!(101)];
		assert_eq!(market_price(Side::Bid, dec!(100), asks), dec!(101));
		assert_eq!(market_price(Side::Ask, dec!(100), asks), dec!(99));
		assert_eq!(market_price(Side::Bid, dec!(100), []), dec!(100));
	}

	#[test]
	fn test_fees() {
		let asset = Asset {
			symbol: "btc".to_string(),
			name: "Bitcoin".to_string(),
			group: AssetGroup::Crypto,
			kind: MarketKind::Spot,
			min_withdraw: Decimal::ZERO,
			max_withdraw: Decimal::ZERO,
			min_trade: Decimal::ZERO,
			max_trade: Decimal::ZERO,
			fees_trade: dec!(0.2),
			fees_discount: dec!(0.3),
			fees_charges: Decimal::ZERO,
			chains: vec![],
			status: true,
		};
		assert_eq!(fee_rate(&asset, false), dec!(0.2));
		assert_eq!(fee_rate(&asset, true), Decimal::ZERO);
		assert_eq!(net(dec!(100), dec!(0.1)), dec!(99.9));
		assert_eq!(truncate(dec!(0.123456789), 4), dec!(0.1234));
		assert!(above_max(dec!(2), dec!(1)));
		assert!(!above_max(dec!(2), Decimal::ZERO));
	}

	proptest! {
		#[test]
		fn prop_priority_only_returns_crossing_orders_in_order(
			prices in proptest::collection::vec(1i64..200, 0..32),
			limit in 1i64..200,
			bid in any::<bool>(),
		) {
			let side = if bid { Side::Bid } else { Side::Ask };
			let limit = Decimal::from(limit);
			let book: Vec<Order> = prices
				.iter()
				.enumerate()
				.map(|(i, p)| ask(i as i64, Decimal::from(*p)))
				.collect();
			let expected = book.iter().filter(|o| side.crosses(limit, o.price)).count();

			let ranked = priority(side, limit, book);
			prop_assert_eq!(ranked.len(), expected);
			for pair in ranked.windows(2) {
				let better = match side {
					Side::Bid => pair[0].price < pair[1].price,
					Side::Ask => pair[0].price > pair[1].price,
				};
				prop_assert!(better || (pair[0].price == pair[1].price && pair[0].id < pair[1].id));
			}
		}
	}
}

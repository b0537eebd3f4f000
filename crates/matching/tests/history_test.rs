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

//! Ledger and order invariants over random histories of limit orders and
//! cancellations.

mod common;

use bourse_sdk::{Assigning, MarketKind, Order, OrderStatus, Trade};
use bourse_store::repo::{orders, trades};
use common::{ALICE, BOB, Harness, limit, setup};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const CAROL: i64 = 3;
const USERS: [i64; 3] = [ALICE, BOB, CAROL];
const SPOT: MarketKind = MarketKind::Spot;

const FUND_BTC: Decimal = dec!(1000);
const FUND_USDT: Decimal = dec!(100000);
const TAKER_RATE: Decimal = dec!(0.1);
const MAKER_RATE: Decimal = dec!(0.05);

#[derive(Debug, Clone)]
enum Step {
	Place {
		user: usize,
		buy: bool,
		price: i64,
		quantity: i64,
	},
	/// Cancel the n-th placed order, modulo how many exist
	Cancel(usize),
}

fn step() -> impl Strategy<Value = Step> {
	prop_oneof![
		3 => (0..USERS.len(), any::<bool>(), 95i64..=105, 1i64..=5).prop_map(|(user, buy, price, quantity)| {
			Step::Place { user, buy, price, quantity }
		}),
		1 => any::<usize>().prop_map(Step::Cancel),
	]
}

fn rate(trade: &Trade) -> Decimal {
	if trade.maker { MAKER_RATE } else { TAKER_RATE }
}

fn fee(amount: Decimal, rate: Decimal) -> Decimal {
	amount * rate / Decimal::ONE_HUNDRED
}

async fn replay(h: &Harness, steps: &[Step]) {
	let mut placed: Vec<(i64, i64)> = Vec::new();
	for step in steps {
		match step {
			Step::Place {
				user,
				buy,
				price,
				quantity,
			} => {
				let assigning = if *buy { Assigning::Buy } else { Assigning::Sell };
				let request = limit(USERS[*user], assigning, Decimal::from(*price), Decimal::from(*quantity));
				let placement = h.engine.place_order(request).await.unwrap();
				placed.push((USERS[*user], placement.order.id));
			}
			Step::Cancel(n) => {
				if placed.is_empty() {
					continue;
				}
				let (user, id) = placed[n % placed.len()];
				// already filled or cancelled orders are refused
				let _ = h.engine.cancel_order(user, id).await;
			}
		}
	}
}

async fn history(h: &Harness) -> Vec<(Order, Vec<Trade>)> {
	let mut conn = h.pool.acquire().await.unwrap();
	let mut out = Vec::new();
	for user in USERS {
		for order in orders::for_user(&mut conn, user, None).await.unwrap() {
			let fills = trades::for_order(&mut conn, order.id).await.unwrap();
			out.push((order, fills));
		}
	}
	out
}

async fn check(h: &Harness) {
	let history = history(h).await;

	for user in USERS {
		// every ledger movement the history implies, applied to the funding
		let mut base = FUND_BTC;
		let mut quote = FUND_USDT;
		for (order, fills) in history.iter().filter(|(o, _)| o.user_id == user) {
			let cancelled = order.status == OrderStatus::Cancel;
			match order.assigning {
				Assigning::Buy => {
					quote -= order.quantity * order.price;
					if cancelled {
						quote += order.value * order.price;
					}
					for trade in fills {
						base += trade.quantity - fee(trade.quantity, rate(trade));
						quote += (order.price - trade.price) * trade.quantity;
					}
				}
				_ => {
					base -= order.quantity;
					if cancelled {
						base += order.value;
					}
					for trade in fills {
						let value = trade.quantity * trade.price;
						quote += value - fee(value, rate(trade));
					}
				}
			}
		}
		assert_eq!(h.balance(user, "btc", SPOT).await, base, "btc of user {user}");
		assert_eq!(h.balance(user, "usdt", SPOT).await, quote, "usdt of user {user}");
		assert!(base >= Decimal::ZERO && quote >= Decimal::ZERO);
	}

	let mut bought = Decimal::ZERO;
	let mut sold = Decimal::ZERO;
	let mut base_fees = Decimal::ZERO;
	let mut quote_fees = Decimal::ZERO;
	let mut resting_base = Decimal::ZERO;
	let mut resting_quote = Decimal::ZERO;
	for (order, fills) in &history {
		let executed: Decimal = fills.iter().map(|t| t.quantity).sum();
		assert!(order.value >= Decimal::ZERO);
		assert_eq!(executed, order.quantity - order.value, "order {}", order.id);
		assert_eq!(order.status == OrderStatus::Filled, order.value.is_zero(), "order {}", order.id);

		for trade in fills {
			assert_ne!(trade.counterparty, order.user_id);
			match order.assigning {
				Assigning::Buy => {
					assert!(trade.price <= order.price);
					assert_eq!(trade.fees, fee(trade.quantity * trade.price, rate(trade)));
					bought += trade.quantity;
					base_fees += fee(trade.quantity, rate(trade));
				}
				_ => {
					assert!(trade.price >= order.price);
					assert_eq!(trade.fees, fee(trade.quantity, rate(trade)));
					sold += trade.quantity;
					quote_fees += fee(trade.quantity * trade.price, rate(trade));
				}
			}
		}
		if order.status == OrderStatus::Pending {
			match order.assigning {
				Assigning::Buy => resting_quote += order.value * order.price,
				_ => resting_base += order.value,
			}
		}
	}
	assert_eq!(bought, sold);

	// what left the balances is either resting on the book or kept as fees
	let mut base_total = resting_base;
	let mut quote_total = resting_quote;
	for user in USERS {
		base_total += h.balance(user, "btc", SPOT).await;
		quote_total += h.balance(user, "usdt", SPOT).await;
	}
	assert_eq!(base_total + base_fees, FUND_BTC * Decimal::from(USERS.len()));
	assert_eq!(quote_total + quote_fees, FUND_USDT * Decimal::from(USERS.len()));
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(24))]

	#[test]
	fn test_random_history_keeps_ledger_consistent(steps in proptest::collection::vec(step(), 1..40)) {
		let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
		runtime.block_on(async {
			let h = setup().await;
			h.set_discount("btc", TAKER_RATE - MAKER_RATE).await;
			for user in USERS {
				h.fund(user, "btc", SPOT, FUND_BTC).await;
				h.fund(user, "usdt", SPOT, FUND_USDT).await;
			}
			replay(&h, &steps).await;
			check(&h).await;
		});
	}
}

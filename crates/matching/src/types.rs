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

use bourse_sdk::{Assigning, FutureOrder, MarketKind, Order, Position, Trade, Trading};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Spot, stock or cross order submitted by a user
///
/// For a market buy `quantity` is denominated in the quote unit; every
/// other order gives it in base units. `price` is ignored for market
/// orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
	pub user_id: i64,
	pub base_unit: String,
	pub quote_unit: String,
	#[serde(rename = "type")]
	pub kind: MarketKind,
	pub assigning: Assigning,
	pub trading: Trading,
	pub price: Decimal,
	pub quantity: Decimal,
}

/// Futures order submitted by a user
///
/// A close names the open row it reduces through `parent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FutureRequest {
	pub user_id: i64,
	pub base_unit: String,
	pub quote_unit: String,
	pub assigning: Assigning,
	pub position: Position,
	pub trading: Trading,
	pub price: Decimal,
	pub quantity: Decimal,
	pub leverage: u32,
	pub parent: Option<i64>,
}

/// Outcome of placing a spot order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
	pub order: Order,
	/// Trade rows written for the incoming order's side
	pub trades: Vec<Trade>,
}

/// Outcome of placing a futures order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuturePlacement {
	pub order: FutureOrder,
	pub trades: Vec<Trade>,
}

/// Payload of `market/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStatus {
	pub pair_id: i64,
	pub base_unit: String,
	pub quote_unit: String,
	#[serde(rename = "type")]
	pub kind: MarketKind,
	pub price: Decimal,
	/// 24h change in percent
	pub ratio: Decimal,
}

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

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;

/// Declares a lowercase string-tagged enum with `as_str`, `Display` and
/// `FromStr` (unknown tags are rejected as `InvalidInput`).
macro_rules! string_enum {
	($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(rename_all = "lowercase")]
		pub enum $name {
			$($variant),+
		}

		impl $name {
			pub const ALL: &'static [$name] = &[$($name::$variant),+];

			pub fn as_str(&self) -> &'static str {
				match self {
					$($name::$variant => $text),+
				}
			}
		}

		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				f.write_str(self.as_str())
			}
		}

		impl std::str::FromStr for $name {
			type Err = ExchangeError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				match s.to_ascii_lowercase().as_str() {
					$($text => Ok($name::$variant),)+
					other => Err(ExchangeError::InvalidInput(format!(
						"unknown {} `{}`",
						stringify!($name).to_ascii_lowercase(),
						other
					))),
				}
			}
		}
	};
}

string_enum! {
	/// Blockchain or card network a chain row talks to
	Platform {
		Ethereum => "ethereum",
		Tron => "tron",
		Bitcoin => "bitcoin",
		Visa => "visa",
		Mastercard => "mastercard",
	}
}

impl Platform {
	/// BIP-44 coin type used for key derivation
	pub fn coin_type(&self) -> Option<u32> {
		match self {
			Platform::Bitcoin => Some(0),
			Platform::Ethereum => Some(60),
			Platform::Tron => Some(195),
			Platform::Visa | Platform::Mastercard => None,
		}
	}
}

string_enum! {
	/// Token standard of a contract; `mainnet` is the chain's native coin
	Protocol {
		Mainnet => "mainnet",
		Erc20 => "erc20",
		Trc20 => "trc20",
		Bep20 => "bep20",
	}
}

impl Protocol {
	/// Parse a stored protocol, treating the empty string as `mainnet`
	pub fn parse_or_mainnet(s: &str) -> Result<Self, ExchangeError> {
		if s.trim().is_empty() {
			Ok(Protocol::Mainnet)
		} else {
			s.parse()
		}
	}
}

string_enum! {
	AssetGroup {
		Crypto => "crypto",
		Fiat => "fiat",
		Action => "action",
	}
}

string_enum! {
	/// Market type of an asset, pair, order or balance row
	MarketKind {
		Spot => "spot",
		Stock => "stock",
		Cross => "cross",
		Future => "future",
	}
}

string_enum! {
	/// Direction of an order
	Assigning {
		Buy => "buy",
		Sell => "sell",
		Open => "open",
		Close => "close",
	}
}

impl Assigning {
	pub fn opposite(&self) -> Assigning {
		match self {
			Assigning::Buy => Assigning::Sell,
			Assigning::Sell => Assigning::Buy,
			Assigning::Open => Assigning::Close,
			Assigning::Close => Assigning::Open,
		}
	}
}

string_enum! {
	Trading {
		Market => "market",
		Limit => "limit",
	}
}

string_enum! {
	Position {
		Long => "long",
		Short => "short",
	}
}

impl Position {
	pub fn opposite(&self) -> Position {
		match self {
			Position::Long => Position::Short,
			Position::Short => Position::Long,
		}
	}
}

string_enum! {
	/// Order lifecycle: `pending` until its remaining value reaches zero
	/// (`filled`) or the owner cancels it (`cancel`)
	OrderStatus {
		Pending => "pending",
		Filled => "filled",
		Cancel => "cancel",
	}
}

impl OrderStatus {
	pub fn can_become(&self, next: OrderStatus) -> bool {
		matches!(
			(self, next),
			(OrderStatus::Pending, OrderStatus::Filled) | (OrderStatus::Pending, OrderStatus::Cancel)
		)
	}

	pub fn is_terminal(&self) -> bool {
		!matches!(self, OrderStatus::Pending)
	}
}

string_enum! {
	Assignment {
		Deposit => "deposit",
		Withdrawal => "withdrawal",
	}
}

string_enum! {
	/// Routing of a transaction's value
	Allocation {
		External => "external",
		Internal => "internal",
		Reward => "reward",
	}
}

string_enum! {
	/// Transaction lifecycle.
	///
	/// Deposits: `internal -> pending -> {filled, reserve, failed}`.
	/// Withdrawals: `pending -> processing -> {filled, failed}` (or
	/// `pending -> failed` when the request is cancelled).
	TxStatus {
		Pending => "pending",
		Processing => "processing",
		Filled => "filled",
		Failed => "failed",
		Reserve => "reserve",
		Internal => "internal",
	}
}

impl TxStatus {
	pub fn can_become(&self, next: TxStatus) -> bool {
		use TxStatus::*;
		matches!(
			(self, next),
			(Internal, Pending)
				| (Pending, Processing)
				| (Pending, Filled)
				| (Pending, Failed)
				| (Pending, Reserve)
				| (Processing, Filled)
				| (Processing, Failed)
		)
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, TxStatus::Filled | TxStatus::Failed | TxStatus::Reserve)
	}
}

string_enum! {
	/// Sign of a ledger mutation
	Direction {
		Plus => "plus",
		Minus => "minus",
	}
}

/// Tradable or depositable asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
	pub symbol: String,
	pub name: String,
	pub group: AssetGroup,
	#[serde(rename = "type")]
	pub kind: MarketKind,
	pub min_withdraw: Decimal,
	pub max_withdraw: Decimal,
	pub min_trade: Decimal,
	pub max_trade: Decimal,
	/// Trade fee in percent
	pub fees_trade: Decimal,
	/// Percent subtracted from `fees_trade` for resting (maker) orders
	pub fees_discount: Decimal,
	/// Accumulated withdrawal fees charged in this asset
	pub fees_charges: Decimal,
	/// Chain ids the asset is issued on
	pub chains: Vec<i64>,
	pub status: bool,
}

/// Chain the exchange scans and withdraws on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
	pub id: i64,
	pub name: String,
	pub rpc: String,
	pub platform: Platform,
	/// Next block the deposit scanner will read
	pub block: i64,
	pub network: i64,
	pub confirmation: i64,
	pub decimals: u32,
	pub parent_symbol: String,
	/// Withdraw fee in native units
	pub fees: Decimal,
	pub tag: String,
	pub status: bool,
	/// Set by the liveness prober
	pub alive: bool,
}

impl Chain {
	/// Copy of the chain without its rpc endpoint, for anything leaving the core
	pub fn redacted(mut self) -> Self {
		self.rpc.clear();
		self
	}
}

/// Token deployed on a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
	pub id: i64,
	pub symbol: String,
	pub chain_id: i64,
	pub address: String,
	pub decimals: u32,
	pub protocol: Protocol,
	/// Gas of one transfer, in native units of the parent chain
	pub fees: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
	pub id: i64,
	pub base_unit: String,
	pub quote_unit: String,
	pub base_decimal: u32,
	pub quote_decimal: u32,
	/// Last known price
	pub price: Decimal,
	#[serde(rename = "type")]
	pub kind: MarketKind,
	pub status: bool,
}

impl Pair {
	pub fn symbol(&self) -> String {
		format!("{}/{}", self.base_unit, self.quote_unit)
	}
}

/// Spot, stock or cross order row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
	pub id: i64,
	pub user_id: i64,
	pub base_unit: String,
	pub quote_unit: String,
	pub price: Decimal,
	pub quantity: Decimal,
	/// Remaining unfilled quantity in base units
	pub value: Decimal,
	pub assigning: Assigning,
	pub trading: Trading,
	#[serde(rename = "type")]
	pub kind: MarketKind,
	pub status: OrderStatus,
	pub create_at: i64,
}

/// Futures order row; an `open` row filled by matching is an open position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FutureOrder {
	pub id: i64,
	pub user_id: i64,
	pub base_unit: String,
	pub quote_unit: String,
	pub price: Decimal,
	pub quantity: Decimal,
	/// Remaining unmatched quantity
	pub value: Decimal,
	pub leverage: u32,
	pub position: Position,
	pub assigning: Assigning,
	pub trading: Trading,
	pub status: OrderStatus,
	/// Open row a close order reduces
	pub parent: Option<i64>,
	/// Quantity of an open row already closed or reserved by pending closes
	pub settled: Decimal,
	/// Average execution price of the matched quantity
	pub entry: Decimal,
	pub create_at: i64,
}

impl FutureOrder {
	/// Matched quantity of an open row still available to close
	pub fn closable(&self) -> Decimal {
		self.quantity - self.value - self.settled
	}
}

/// One side of an execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
	pub id: i64,
	pub order_id: i64,
	pub assigning: Assigning,
	pub user_id: i64,
	pub counterparty: i64,
	pub base_unit: String,
	pub quote_unit: String,
	pub price: Decimal,
	pub quantity: Decimal,
	/// Fee booked for this side: quote units on the buy side, base units
	/// on the sell side
	pub fees: Decimal,
	pub maker: bool,
	#[serde(rename = "type")]
	pub kind: MarketKind,
	pub create_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
	pub user_id: i64,
	pub symbol: String,
	#[serde(rename = "type")]
	pub kind: MarketKind,
	pub value: Decimal,
}

/// Funds the exchange holds at one on-chain address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reserve {
	pub id: i64,
	pub user_id: i64,
	pub symbol: String,
	pub platform: Platform,
	pub protocol: Protocol,
	pub address: String,
	pub value: Decimal,
	/// Credit from internal fee top-ups, drawn down by gas repayment
	pub reverse: Decimal,
	pub lock: bool,
}

/// Exchange-held deposit address
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
	pub id: i64,
	pub user_id: i64,
	pub platform: Platform,
	pub address: String,
	#[serde(skip_serializing)]
	pub private_key: String,
}

impl std::fmt::Debug for Wallet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Wallet")
			.field("id", &self.id)
			.field("user_id", &self.user_id)
			.field("platform", &self.platform)
			.field("address", &self.address)
			.finish_non_exhaustive()
	}
}

/// Deposit or withdrawal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
	pub id: i64,
	/// On-chain hash once known, otherwise a synthetic uuid
	pub hash: String,
	pub symbol: String,
	pub value: Decimal,
	pub fees: Decimal,
	pub confirmation: i64,
	/// Destination address
	pub address: String,
	pub chain_id: i64,
	pub block: i64,
	pub user_id: i64,
	pub assignment: Assignment,
	pub group: AssetGroup,
	pub platform: Platform,
	pub protocol: Protocol,
	pub allocation: Allocation,
	pub parent: Option<i64>,
	pub status: TxStatus,
	pub repayment: bool,
	pub hook: bool,
	pub error: Option<String>,
	pub create_at: i64,
}

/// Fixed candle width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
	#[serde(rename = "1m")]
	Minute,
	#[serde(rename = "5m")]
	FiveMinutes,
	#[serde(rename = "15m")]
	FifteenMinutes,
	#[serde(rename = "30m")]
	HalfHour,
	#[serde(rename = "1h")]
	Hour,
	#[serde(rename = "4h")]
	FourHours,
	#[serde(rename = "1d")]
	Day,
	#[serde(rename = "1w")]
	Week,
}

impl Resolution {
	pub const ALL: &'static [Resolution] = &[
		Resolution::Minute,
		Resolution::FiveMinutes,
		Resolution::FifteenMinutes,
		Resolution::HalfHour,
		Resolution::Hour,
		Resolution::FourHours,
		Resolution::Day,
		Resolution::Week,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Resolution::Minute => "1m",
			Resolution::FiveMinutes => "5m",
			Resolution::FifteenMinutes => "15m",
			Resolution::HalfHour => "30m",
			Resolution::Hour => "1h",
			Resolution::FourHours => "4h",
			Resolution::Day => "1d",
			Resolution::Week => "1w",
		}
	}

	pub fn seconds(&self) -> i64 {
		match self {
			Resolution::Minute => 60,
			Resolution::FiveMinutes => 300,
			Resolution::FifteenMinutes => 900,
			Resolution::HalfHour => 1_800,
			Resolution::Hour => 3_600,
			Resolution::FourHours => 14_400,
			Resolution::Day => 86_400,
			Resolution::Week => 604_800,
		}
	}

	/// Start of the bucket containing `timestamp`
	pub fn bucket(&self, timestamp: i64) -> i64 {
		timestamp - timestamp.rem_euclid(self.seconds())
	}
}

impl std::str::FromStr for Resolution {
	type Err = ExchangeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Resolution::ALL
			.iter()
			.copied()
			.find(|r| r.as_str() == s)
			.ok_or_else(|| ExchangeError::InvalidInput(format!("unknown resolution `{}`", s)))
	}
}

/// Time-bucketed trade aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
	pub base_unit: String,
	pub quote_unit: String,
	pub resolution: Resolution,
	/// Bucket start, unix seconds
	pub time: i64,
	pub open: Decimal,
	pub close: Decimal,
	pub low: Decimal,
	pub high: Decimal,
	pub volume: Decimal,
	/// Average execution price over the bucket
	pub price: Decimal,
	pub trades: i64,
}

/// Current unix time in seconds
pub fn now() -> i64 {
	chrono::Utc::now().timestamp()
}

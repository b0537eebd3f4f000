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

use std::sync::Arc;

use bourse_store::{Events, PriceFeed};
use sqlx::SqlitePool;

use crate::chains::ChainConnector;

/// Handles shared by every settlement loop
#[derive(Clone)]
pub struct Context {
	pub pool: SqlitePool,
	pub events: Events,
	pub connector: Arc<dyn ChainConnector>,
	pub feed: Arc<dyn PriceFeed>,
}

impl Context {
	pub fn new(
		pool: SqlitePool,
		events: Events,
		connector: Arc<dyn ChainConnector>,
		feed: Arc<dyn PriceFeed>,
	) -> Self {
		Self {
			pool,
			events,
			connector,
			feed,
		}
	}

	/// Price of one `base` in `quote`
	pub(crate) async fn price(&self, base: &str, quote: &str) -> crate::Result<rust_decimal::Decimal> {
		self.feed
			.price(base, quote)
			.await
			.ok_or_else(|| crate::SettlementError::no_price(base, quote))
	}
}

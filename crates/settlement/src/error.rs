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

use bourse_sdk::{ExchangeError, units::UnitError};
use bourse_store::StoreError;
use thiserror::Error;

use crate::chains::ChainError;
use crate::transaction::TransactionError;

/// Error types for settlement operations
#[derive(Debug, Error)]
pub enum SettlementError {
	#[error(transparent)]
	Exchange(#[from] ExchangeError),
	#[error("Store error: {0}")]
	Store(StoreError),
	#[error("Chain error: {0}")]
	Chain(#[from] ChainError),
	#[error("No price for {base}/{quote}")]
	NoPrice { base: String, quote: String },
	#[error("Unit error: {0}")]
	Units(#[from] UnitError),
	#[error(transparent)]
	Transaction(#[from] TransactionError),
}

impl SettlementError {
	/// The caller-visible kind, when a request was rejected
	pub fn exchange(&self) -> Option<&ExchangeError> {
		match self {
			SettlementError::Exchange(e) => Some(e),
			SettlementError::Store(e) => e.exchange(),
			_ => None,
		}
	}

	/// Whether the failure is confined to one malformed transaction, as
	/// opposed to the node or the database being unavailable
	pub fn is_malformed(&self) -> bool {
		matches!(
			self,
			SettlementError::Chain(
				ChainError::InvalidResponse(_) | ChainError::Abi(_) | ChainError::Address(_)
			) | SettlementError::Units(_)
		)
	}

	pub(crate) fn no_price(base: &str, quote: &str) -> Self {
		SettlementError::NoPrice {
			base: base.to_string(),
			quote: quote.to_string(),
		}
	}
}

impl From<StoreError> for SettlementError {
	fn from(e: StoreError) -> Self {
		match e {
			StoreError::Exchange(e) => SettlementError::Exchange(e),
			other => SettlementError::Store(other),
		}
	}
}

impl From<sqlx::Error> for SettlementError {
	fn from(e: sqlx::Error) -> Self {
		SettlementError::Store(StoreError::Database(e))
	}
}

pub type Result<T> = std::result::Result<T, SettlementError>;

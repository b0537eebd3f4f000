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

use thiserror::Error;

/// Error kinds surfaced to callers of the exchange core
///
/// Lower layers wrap these together with their own infrastructure errors;
/// a caller only needs to match on this enum to decide what to tell the
/// user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	#[error("Insufficient funds: {0}")]
	InsufficientFunds(String),
	#[error("Impossible price")]
	ImpossiblePrice,
	#[error("Pair {base}/{quote} already exists")]
	DuplicatePair { base: String, quote: String },
	#[error("Destination address belongs to the exchange")]
	InternalAddress,
	#[error("Destination address equals the source address")]
	SameAddress,
	#[error("Two-factor code mismatch")]
	TwoFactor,
	#[error("Security code mismatch")]
	SecurityCode,
	#[error("Account is blocked")]
	Blocked,
	#[error("Already exists: {0}")]
	AlreadyExists(String),
}

impl ExchangeError {
	pub fn not_found(what: impl std::fmt::Display) -> Self {
		ExchangeError::NotFound(what.to_string())
	}

	pub fn invalid(what: impl std::fmt::Display) -> Self {
		ExchangeError::InvalidInput(what.to_string())
	}

	pub fn insufficient(what: impl std::fmt::Display) -> Self {
		ExchangeError::InsufficientFunds(what.to_string())
	}
}

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

use bourse_sdk::ExchangeError;
use thiserror::Error;

/// Errors raised by the persistence layer
///
/// Domain failures are carried as [`ExchangeError`] so the service layers
/// can hand them to callers unchanged; everything else is infrastructure.
#[derive(Debug, Error)]
pub enum StoreError {
	#[error(transparent)]
	Exchange(#[from] ExchangeError),
	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("Corrupt column `{column}`: {reason}")]
	Corrupt { column: String, reason: String },
	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl StoreError {
	/// The caller-visible kind, when this is a domain failure
	pub fn exchange(&self) -> Option<&ExchangeError> {
		match self {
			StoreError::Exchange(e) => Some(e),
			_ => None,
		}
	}

	pub(crate) fn corrupt(column: &str, reason: impl std::fmt::Display) -> Self {
		StoreError::Corrupt {
			column: column.to_string(),
			reason: reason.to_string(),
		}
	}
}

pub type Result<T> = std::result::Result<T, StoreError>;

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

use bourse_store::DatabaseConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default log level when `RUST_LOG` is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Console output is off unless `LOG_TO_CONSOLE` enables it
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;
/// Log files go to `{LOG_DIR}/settlement/`
pub const LOG_COMPONENT_NAME: &str = "settlement";

/// One fixed quote fed to the price oracle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
	pub base: String,
	pub quote: String,
	pub price: Decimal,
}

/// Settlement service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
	pub database: DatabaseConfig,
	/// Deposit scanner tick, in milliseconds
	pub scan_interval_ms: u64,
	/// Withdrawal dispatch tick, in seconds
	pub withdrawal_interval_secs: u64,
	/// Reward sweep tick, in seconds
	pub reward_interval_secs: u64,
	/// Chain liveness probe tick, in seconds
	pub probe_interval_secs: u64,
	/// Timeout of a single chain RPC request, in seconds
	pub rpc_timeout_secs: u64,
	/// Pause after each oracle fan-out, in milliseconds
	pub oracle_pause_ms: u64,
	/// Capacity of the publisher channel
	pub publisher_capacity: usize,
	pub quotes: Vec<QuoteConfig>,
}

impl Default for SettlementConfig {
	fn default() -> Self {
		Self {
			database: DatabaseConfig::default(),
			scan_interval_ms: 1_000,
			withdrawal_interval_secs: 60,
			reward_interval_secs: 60,
			probe_interval_secs: 30,
			rpc_timeout_secs: 10,
			oracle_pause_ms: 1_000,
			publisher_capacity: 4_096,
			quotes: Vec::new(),
		}
	}
}

impl SettlementConfig {
	/// Load configuration from environment variables, e.g.
	/// `SETTLEMENT_RPC_TIMEOUT_SECS` or `SETTLEMENT_DATABASE__URL`
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(environment())
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(environment())
			.build()?;

		cfg.try_deserialize()
	}
}

fn environment() -> config::Environment {
	config::Environment::with_prefix("SETTLEMENT")
		.prefix_separator("_")
		.separator("__")
}

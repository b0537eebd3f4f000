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

//! Bourse Store - persistence layer of the exchange core
//!
//! The relational database is the single source of truth. This crate owns
//! the SQLite schema and exposes:
//! - the balance and reserve ledger
//! - the asset / chain / contract / pair / wallet registry
//! - repositories for orders, trades, transactions and candles
//! - the publisher facade with its post-commit outbox
//! - the price oracle adapter
//!
//! Everything that writes takes a `&mut SqliteConnection` so a whole
//! operation can run inside one database transaction.

pub mod db;
pub mod error;
pub mod ledger;
pub mod oracle;
pub mod publisher;
pub mod registry;
pub mod repo;
mod rows;

pub use db::{DatabaseConfig, connect, connect_memory};
pub use error::{Result, StoreError};
pub use ledger::ReserveKey;
pub use oracle::{PriceFeed, PriceOracle, QuoteSource, StaticQuotes};
pub use publisher::{Events, MemoryPublisher, Message, Outbox, Publisher, Topic};
pub use registry::PairRef;

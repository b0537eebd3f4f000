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

//! Bourse Matching - order matching for spot, stock, cross and futures
//! markets
//!
//! The book is the `orders` / `futures` tables. [`MatchingEngine`] runs
//! each placement or cancellation as one database transaction: validate,
//! debit, replay the resting side by price then id, credit both sides net
//! of fees, write trades and fold them into candles. Events are published
//! after commit.

pub mod config;
pub mod engine;
pub mod logging;
pub mod market;
pub mod matcher;
pub mod types;

pub use engine::{EngineError, HOUSE, MatchingEngine};
pub use matcher::Side;
pub use types::*;

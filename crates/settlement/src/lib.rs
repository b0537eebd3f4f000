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

//! Bourse Settlement - deposits and withdrawals on Ethereum and Tron
//!
//! The [`scanner`] walks each live chain block by block and records
//! transfers into exchange wallets as pending deposits; the [`ladder`]
//! credits them once deep enough. Withdrawals are requested through
//! [`validator`], sent by the [`withdrawal`] engine from the exchange's
//! reserves, and token withdrawals short of gas are topped up by the
//! [`reward`] sweep. The [`prober`] keeps each chain's liveness flag
//! current.

pub mod chains;
pub mod config;
pub mod context;
pub mod error;
pub mod ladder;
pub mod logging;
pub mod prober;
pub mod reward;
pub mod scanner;
pub mod service;
pub mod transaction;
pub mod validator;
pub mod withdrawal;

pub use context::Context;
pub use error::{Result, SettlementError};
pub use validator::{WithdrawalRequest, cancel_withdrawal, request_withdrawal};
pub use withdrawal::{Outcome, WithdrawalEngine};

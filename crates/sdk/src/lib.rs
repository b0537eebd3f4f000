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

//! Bourse SDK - shared domain types and crypto primitives
//!
//! Everything in here is pure: entity types and enums, the error kinds
//! surfaced by the exchange core, unit conversion, address codecs, signing
//! and deposit-key derivation.
//!
//! The SDK is designed to be lightweight and embeddable:
//! - No I/O
//! - No runtime initialization
//! - No environment or configuration loading

pub mod address;
pub mod error;
pub mod keys;
pub mod signing;
pub mod types;
pub mod units;

pub use error::ExchangeError;
pub use keys::{DerivedAccount, KeyError};
pub use signing::{RecoverableSignature, SigningError, keccak256, sha256, sign_digest};
pub use types::*;
pub use units::{PRICE_SCALE, from_base_units, round, to_base_units};

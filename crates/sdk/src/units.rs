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

//! Conversion between human decimal amounts and on-chain integer units

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Scale used for prices returned by the oracle
pub const PRICE_SCALE: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
	#[error("Negative amount: {0}")]
	Negative(Decimal),
	#[error("Amount overflows {decimals} decimals")]
	Overflow { decimals: u32 },
}

/// Convert `value` to integer units with `decimals` places, truncating
/// anything below the smallest unit.
pub fn to_base_units(value: Decimal, decimals: u32) -> Result<u128, UnitError> {
	if value.is_sign_negative() && !value.is_zero() {
		return Err(UnitError::Negative(value));
	}
	let truncated = value.round_dp_with_strategy(decimals, RoundingStrategy::ToZero);
	let mantissa = u128::try_from(truncated.mantissa()).map_err(|_| UnitError::Negative(value))?;
	let shift = decimals - truncated.scale();
	10u128
		.checked_pow(shift)
		.and_then(|factor| mantissa.checked_mul(factor))
		.ok_or(UnitError::Overflow { decimals })
}

/// Convert integer units with `decimals` places to a decimal amount
pub fn from_base_units(amount: u128, decimals: u32) -> Result<Decimal, UnitError> {
	let signed = i128::try_from(amount).map_err(|_| UnitError::Overflow { decimals })?;
	Decimal::try_from_i128_with_scale(signed, decimals)
		.map(|d| d.normalize())
		.map_err(|_| UnitError::Overflow { decimals })
}

/// Round half away from zero to `dp` places
pub fn round(value: Decimal, dp: u32) -> Decimal {
	value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a `0x`-prefixed hex quantity as used by Ethereum JSON-RPC
pub fn parse_hex_quantity(s: &str) -> Option<u128> {
	let digits = s.strip_prefix("0x").unwrap_or(s);
	if digits.is_empty() {
		return Some(0);
	}
	u128::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use rust_decimal_macros::dec;

	#[test]
	fn test_to_base_units() {
		assert_eq!(to_base_units(dec!(1.5), 18).unwrap(), 1_500_000_000_000_000_000);
		assert_eq!(to_base_units(dec!(100), 6).unwrap(), 100_000_000);
		assert_eq!(to_base_units(dec!(0.1234567), 6).unwrap(), 123_456);
		assert_eq!(to_base_units(Decimal::ZERO, 18).unwrap(), 0);
		assert!(matches!(to_base_units(dec!(-1), 6), Err(UnitError::Negative(_))));
	}

	#[test]
	fn test_from_base_units() {
		assert_eq!(from_base_units(1_500_000_000_000_000_000, 18).unwrap(), dec!(1.5));
		assert_eq!(from_base_units(123_456, 6).unwrap(), dec!(0.123456));
		assert!(from_base_units(u128::MAX, 18).is_err());
	}

	#[test]
	fn test_parse_hex_quantity() {
		assert_eq!(parse_hex_quantity("0x0"), Some(0));
		assert_eq!(parse_hex_quantity("0x"), Some(0));
		assert_eq!(parse_hex_quantity("0x1bc16d674ec80000"), Some(2_000_000_000_000_000_000));
		assert_eq!(parse_hex_quantity("0xzz"), None);
	}

	proptest! {
		#[test]
		fn prop_integer_round_trip(units in 0u64..u64::MAX, decimals in 0u32..19) {
			let value = Decimal::from_i128_with_scale(units as i128, decimals);
			let integer = to_base_units(value, decimals).unwrap();
			let back = from_base_units(integer, decimals).unwrap();
			prop_assert_eq!(round(back, decimals), value.normalize());
		}
	}
}

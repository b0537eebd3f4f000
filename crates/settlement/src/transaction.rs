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

//! Outgoing transfer planning
//!
//! Splits a withdrawal into what goes on chain and what the exchange
//! keeps, then builds the chain-level [`Transfer`].

use bourse_sdk::{Allocation, Contract, Transaction, Wallet, to_base_units, units::UnitError};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::chains::Transfer;

/// Error types for transfer construction
#[derive(Debug, Error)]
pub enum TransactionError {
	#[error("Withdrawal of {value} does not cover the fee of {fee}")]
	BelowFee { value: Decimal, fee: Decimal },
	#[error("Unit error: {0}")]
	Units(#[from] UnitError),
}

/// Amounts of one dispatched withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amounts {
	/// Sent on chain, in the withdrawn asset
	pub sent: Decimal,
	/// Network fee, in the native coin
	pub gas: Decimal,
	/// Fee kept from the user, in the withdrawn asset
	pub charged: Decimal,
}

/// Work out the on-chain amount.
///
/// External native withdrawals pay the estimated gas out of the value.
/// External token withdrawals give up the recorded fee converted to token
/// units at `price` (tokens per native coin). Internal transfers move the
/// value unchanged.
pub fn plan(tx: &Transaction, token: bool, gas: Decimal, price: Decimal) -> Result<Amounts, TransactionError> {
	if tx.allocation == Allocation::Internal {
		return Ok(Amounts {
			sent: tx.value,
			gas,
			charged: Decimal::ZERO,
		});
	}

	let (deducted, charged) = if token {
		let fee = tx.fees * price;
		(fee, fee)
	} else {
		(gas, tx.fees)
	};
	let sent = tx.value - deducted;
	if sent <= Decimal::ZERO {
		return Err(TransactionError::BelowFee {
			value: tx.value,
			fee: deducted,
		});
	}
	Ok(Amounts { sent, gas, charged })
}

/// Transfer of `amount` from `wallet` to `to`, in token units when a
/// contract is given
pub fn transfer(
	wallet: &Wallet,
	to: &str,
	amount: Decimal,
	decimals: u32,
	contract: Option<&Contract>,
) -> Result<Transfer, TransactionError> {
	Ok(Transfer {
		from: wallet.address.clone(),
		private_key: wallet.private_key.clone(),
		to: to.to_string(),
		amount: to_base_units(amount, decimals)?,
		contract: contract.map(|c| c.address.clone()),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use bourse_sdk::{AssetGroup, Assignment, Platform, Protocol, TxStatus};
	use rust_decimal_macros::dec;

	fn withdrawal(value: Decimal, fees: Decimal, allocation: Allocation) -> Transaction {
		Transaction {
			id: 1,
			hash: "w-1".to_string(),
			symbol: "usdt".to_string(),
			value,
			fees,
			confirmation: 0,
			address: "0xabc".to_string(),
			chain_id: 1,
			block: 0,
			user_id: 9,
			assignment: Assignment::Withdrawal,
			group: AssetGroup::Crypto,
			platform: Platform::Ethereum,
			protocol: Protocol::Erc20,
			allocation,
			parent: None,
			status: TxStatus::Pending,
			repayment: false,
			hook: false,
			error: None,
			create_at: 0,
		}
	}

	#[test]
	fn test_token_fee_in_token_units() {
		let tx = withdrawal(dec!(100), dec!(0.02), Allocation::External);
		let amounts = plan(&tx, true, dec!(0.021), dec!(2000)).unwrap();
		assert_eq!(amounts.sent, dec!(60));
		assert_eq!(amounts.charged, dec!(40));
		assert_eq!(amounts.gas, dec!(0.021));
	}

	#[test]
	fn test_native_pays_gas_from_value() {
		let tx = withdrawal(dec!(1.5), dec!(0.01), Allocation::External);
		let amounts = plan(&tx, false, dec!(0.002), Decimal::ONE).unwrap();
		assert_eq!(amounts.sent, dec!(1.498));
		assert_eq!(amounts.charged, dec!(0.01));
	}

	#[test]
	fn test_internal_moves_value_unchanged() {
		let tx = withdrawal(dec!(0.02), dec!(0.01), Allocation::Internal);
		let amounts = plan(&tx, false, dec!(0.001), Decimal::ONE).unwrap();
		assert_eq!(amounts.sent, dec!(0.02));
		assert_eq!(amounts.charged, Decimal::ZERO);
	}

	#[test]
	fn test_fee_larger_than_value() {
		let tx = withdrawal(dec!(30), dec!(0.02), Allocation::External);
		assert!(matches!(
			plan(&tx, true, dec!(0.02), dec!(2000)),
			Err(TransactionError::BelowFee { .. })
		));
	}

	#[test]
	fn test_transfer_in_base_units() {
		let wallet = Wallet {
			id: 1,
			user_id: 9,
			platform: Platform::Ethereum,
			address: "0xfrom".to_string(),
			private_key: "key".to_string(),
		};
		let contract = Contract {
			id: 1,
			symbol: "usdt".to_string(),
			chain_id: 1,
			address: "0xtoken".to_string(),
			decimals: 6,
			protocol: Protocol::Erc20,
			fees: dec!(0.02),
		};
		let transfer = transfer(&wallet, "0xto", dec!(60.5), 6, Some(&contract)).unwrap();
		assert_eq!(transfer.amount, 60_500_000);
		assert_eq!(transfer.contract.as_deref(), Some("0xtoken"));
		assert_eq!(transfer.from, "0xfrom");
	}
}

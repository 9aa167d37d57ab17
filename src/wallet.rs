// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Wallet ledger engine: validates one operation (top-up, SMS purchase, SMS
//! debit) against the current account and produces the next state plus the
//! ledger entry to append. Pure: the caller persists both in one transaction.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{TransactionKind, WalletAccount, WalletTransaction};

/// Policy constants for wallet operations. Defaults match the published
/// pricing; all three are overridable through settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletPolicy {
    pub min_topup: Decimal,
    pub min_sms_purchase: i64,
    pub sms_unit_price: Decimal,
}

impl Default for WalletPolicy {
    fn default() -> Self {
        WalletPolicy {
            min_topup: Decimal::new(500, 2),    // 5.00
            min_sms_purchase: 10,               // units
            sms_unit_price: Decimal::new(10, 2), // 0.10 per unit
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalletOp {
    TopUp { amount: Decimal, method: String },
    PurchaseSms { units: i64 },
    DebitSms { count: i64, reason: String },
}

/// The record to append alongside the new account state. Signed deltas plus
/// the resulting balances, so the history reconciles without replaying.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub kind: TransactionKind,
    pub amount_delta: Decimal,
    pub sms_units_delta: i64,
    pub resulting_balance: Decimal,
    pub resulting_sms_units: i64,
    pub description: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum WalletError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Amount {given} is below the minimum of {minimum}")]
    BelowMinimum { given: Decimal, minimum: Decimal },

    #[error("Insufficient wallet balance: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error("Insufficient SMS units: need {needed}, have {available}")]
    InsufficientUnits { needed: i64, available: i64 },
}

/// Validate `op` against `account` and return the next state plus the entry
/// to append. On error the account is untouched and nothing is recorded.
pub fn apply(
    account: &WalletAccount,
    op: &WalletOp,
    policy: &WalletPolicy,
) -> Result<(WalletAccount, LedgerEntry), WalletError> {
    match op {
        WalletOp::TopUp { amount, method } => {
            if *amount <= Decimal::ZERO {
                return Err(WalletError::InvalidAmount);
            }
            if *amount < policy.min_topup {
                return Err(WalletError::BelowMinimum {
                    given: *amount,
                    minimum: policy.min_topup,
                });
            }
            let next = WalletAccount {
                balance: account.balance + *amount,
                sms_units: account.sms_units,
            };
            let entry = LedgerEntry {
                kind: TransactionKind::TopUp,
                amount_delta: *amount,
                sms_units_delta: 0,
                resulting_balance: next.balance,
                resulting_sms_units: next.sms_units,
                description: format!("Wallet top-up via {}", method),
            };
            Ok((next, entry))
        }
        WalletOp::PurchaseSms { units } => {
            if *units <= 0 {
                return Err(WalletError::InvalidAmount);
            }
            if *units < policy.min_sms_purchase {
                return Err(WalletError::BelowMinimum {
                    given: Decimal::from(*units),
                    minimum: Decimal::from(policy.min_sms_purchase),
                });
            }
            let cost = Decimal::from(*units) * policy.sms_unit_price;
            if cost > account.balance {
                return Err(WalletError::InsufficientFunds {
                    needed: cost,
                    available: account.balance,
                });
            }
            let next = WalletAccount {
                balance: account.balance - cost,
                sms_units: account.sms_units + *units,
            };
            let entry = LedgerEntry {
                kind: TransactionKind::SmsPurchase,
                amount_delta: -cost,
                sms_units_delta: *units,
                resulting_balance: next.balance,
                resulting_sms_units: next.sms_units,
                description: format!("Purchased {} SMS units", units),
            };
            Ok((next, entry))
        }
        WalletOp::DebitSms { count, reason } => {
            if *count <= 0 {
                return Err(WalletError::InvalidAmount);
            }
            if *count > account.sms_units {
                return Err(WalletError::InsufficientUnits {
                    needed: *count,
                    available: account.sms_units,
                });
            }
            let next = WalletAccount {
                balance: account.balance,
                sms_units: account.sms_units - *count,
            };
            let entry = LedgerEntry {
                kind: TransactionKind::SmsUsage,
                amount_delta: Decimal::ZERO,
                sms_units_delta: -*count,
                resulting_balance: next.balance,
                resulting_sms_units: next.sms_units,
                description: reason.clone(),
            };
            Ok((next, entry))
        }
    }
}

/// A history reconciles when the running totals of its deltas land exactly on
/// the current account state (transactions start from a zero wallet).
pub fn reconciles(transactions: &[WalletTransaction], account: &WalletAccount) -> bool {
    let amount_total: Decimal = transactions.iter().map(|t| t.amount_delta).sum();
    let units_total: i64 = transactions.iter().map(|t| t.sms_units_delta).sum();
    amount_total == account.balance && units_total == account.sms_units
}

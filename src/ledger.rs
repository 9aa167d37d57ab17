// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Fee ledger resolver: derives paid-to-date, outstanding balance, and a
//! payment-status classification from fee assignments and payment records.
//! Pure computation over already-fetched rows; callers persist nothing here.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{FeeAssignment, Payment, PaymentStatus};

/// The (year, term, level) a student is billed under. Passed explicitly into
/// every resolve call; there is no ambient session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeContext {
    pub academic_year: String,
    pub term: String,
    pub level: String,
}

impl FeeContext {
    pub fn new(academic_year: &str, term: &str, level: &str) -> Self {
        FeeContext {
            academic_year: academic_year.to_string(),
            term: term.to_string(),
            level: level.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityWarning {
    /// A payment exists for a (year, term) with no configured charge.
    PaymentWithoutCharge { paid: Decimal },
}

impl std::fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityWarning::PaymentWithoutCharge { paid } => write!(
                f,
                "{} paid but no fee assignment is configured for this term",
                paid
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeSummary {
    pub total_fees: Decimal,
    pub paid_amount: Decimal,
    pub balance: Decimal,
    pub status: PaymentStatus,
    pub warnings: Vec<IntegrityWarning>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Payment amount must be greater than zero")]
    InvalidAmount,

    #[error("Payment of {amount} exceeds outstanding balance of {balance}")]
    Overpayment { amount: Decimal, balance: Decimal },

    #[error("Payment reference '{0}' already exists")]
    DuplicateReference(String),
}

/// An assignment applies when its (year, term) matches and its level is the
/// "All" wildcard or equals the student's level.
pub fn assignment_applies(a: &FeeAssignment, ctx: &FeeContext) -> bool {
    a.academic_year == ctx.academic_year
        && a.term == ctx.term
        && (a.level == "All" || a.level == ctx.level)
}

fn payment_applies(p: &Payment, ctx: &FeeContext) -> bool {
    p.academic_year == ctx.academic_year && p.term == ctx.term
}

/// Resolve a student's position for one (year, term). Deterministic: the same
/// inputs always produce the same summary.
///
/// `payments` must already be restricted to the student; payments recorded
/// against other terms or years are excluded here even if unsettled.
pub fn resolve(assignments: &[FeeAssignment], payments: &[Payment], ctx: &FeeContext) -> FeeSummary {
    let total_fees: Decimal = assignments
        .iter()
        .filter(|a| assignment_applies(a, ctx))
        .map(|a| a.amount)
        .sum();

    let paid_amount: Decimal = payments
        .iter()
        .filter(|p| payment_applies(p, ctx))
        .map(|p| p.amount)
        .sum();

    let balance = if paid_amount >= total_fees {
        Decimal::ZERO
    } else {
        total_fees - paid_amount
    };

    let status = if paid_amount.is_zero() {
        if total_fees.is_zero() {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        }
    } else if paid_amount < total_fees {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Paid
    };

    let mut warnings = Vec::new();
    if total_fees.is_zero() && !paid_amount.is_zero() {
        warnings.push(IntegrityWarning::PaymentWithoutCharge { paid: paid_amount });
    }

    FeeSummary {
        total_fees,
        paid_amount,
        balance,
        status,
        warnings,
    }
}

/// Entry-time acceptance check for a new payment. A payment that would drive
/// the paid total above the assigned fees is rejected here, never clamped
/// after the fact.
pub fn check_payment(amount: Decimal, summary: &FeeSummary) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount);
    }
    if amount > summary.balance {
        return Err(LedgerError::Overpayment {
            amount,
            balance: summary.balance,
        });
    }
    Ok(())
}

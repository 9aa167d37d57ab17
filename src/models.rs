// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::Partial => "Partial",
            PaymentStatus::Paid => "Paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Unpaid" => Some(PaymentStatus::Unpaid),
            "Partial" => Some(PaymentStatus::Partial),
            "Paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub class: String,
    pub guardian_name: Option<String>,
    pub guardian_contact: Option<String>,
    pub guardian_email: Option<String>,
    pub academic_year: String, // e.g. "2025/2026"
    pub term: String,          // e.g. "Term 1"
}

/// A configured charge for a (year, term, level) tuple. Immutable once billed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeAssignment {
    pub id: i64,
    pub academic_year: String,
    pub term: String,
    pub fee_type: String, // e.g. "Tuition", "PTA", "Sports"
    pub amount: Decimal,
    pub level: String, // class level or "All"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub student_id: i64,
    pub reference: String, // unique, e.g. "PAY-1A2B3C4D"
    pub amount: Decimal,
    pub method: String, // Cash, Mobile Money, ...
    pub fee_type: String,
    pub term: String,
    pub academic_year: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalletAccount {
    pub balance: Decimal,
    pub sms_units: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    TopUp,
    SmsPurchase,
    SmsUsage,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::TopUp => "topup",
            TransactionKind::SmsPurchase => "sms_purchase",
            TransactionKind::SmsUsage => "sms_usage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "topup" => Some(TransactionKind::TopUp),
            "sms_purchase" => Some(TransactionKind::SmsPurchase),
            "sms_usage" => Some(TransactionKind::SmsUsage),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit row; every wallet mutation writes exactly one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: i64,
    pub date: String,
    pub kind: TransactionKind,
    pub amount_delta: Decimal,
    pub sms_units_delta: i64,
    pub resulting_balance: Decimal,
    pub resulting_sms_units: i64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub id: i64,
    pub code: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsLog {
    pub id: i64,
    pub date: String,
    pub recipient: String,
    pub message: String,
    pub status: String, // sent | failed
    pub units_used: i64,
}

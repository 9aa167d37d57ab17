// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::wallet::read_wallet;
use crate::models::{TransactionKind, WalletTransaction};
use crate::utils::{fetch_students, pretty_table, resolve_student};
use crate::wallet::reconciles;
use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();

    // 1) Payments with no matching fee assignment, and over-collected students
    for s in fetch_students(conn, None)? {
        let summary = resolve_student(conn, &s)?;
        for w in &summary.warnings {
            rows.push(vec!["payment_without_charge".into(), format!("{}: {}", s.name, w)]);
        }
        if summary.paid_amount > summary.total_fees && !summary.total_fees.is_zero() {
            rows.push(vec![
                "over_collected".into(),
                format!(
                    "{}: paid {} against fees of {}",
                    s.name, summary.paid_amount, summary.total_fees
                ),
            ]);
        }
    }

    // 2) Non-positive payment amounts (should be impossible through the CLI)
    {
        let mut stmt = conn.prepare("SELECT reference, amount FROM payments")?;
        let mut cur = stmt.query([])?;
        while let Some(r) = cur.next()? {
            let reference: String = r.get(0)?;
            let amount_s: String = r.get(1)?;
            let amount = amount_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid amount '{}' in payments", amount_s))?;
            if amount <= Decimal::ZERO {
                rows.push(vec![
                    "non_positive_payment".into(),
                    format!("{} amount {}", reference, amount),
                ]);
            }
        }
    }

    // 3) Wallet state vs. transaction ledger
    let account = read_wallet(conn)?;
    if account.balance < Decimal::ZERO || account.sms_units < 0 {
        rows.push(vec![
            "negative_wallet".into(),
            format!("balance {} units {}", account.balance, account.sms_units),
        ]);
    }
    let transactions = fetch_wallet_transactions(conn)?;
    if !reconciles(&transactions, &account) {
        rows.push(vec![
            "ledger_mismatch".into(),
            format!(
                "transaction deltas do not add up to balance {} / {} units",
                account.balance, account.sms_units
            ),
        ]);
    }

    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

fn fetch_wallet_transactions(conn: &Connection) -> Result<Vec<WalletTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, type, amount_delta, sms_units_delta, resulting_balance, resulting_sms_units, description
         FROM wallet_transactions ORDER BY id",
    )?;
    let mut cur = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(r) = cur.next()? {
        let kind_s: String = r.get(2)?;
        let amount_s: String = r.get(3)?;
        let balance_s: String = r.get(5)?;
        out.push(WalletTransaction {
            id: r.get(0)?,
            date: r.get(1)?,
            kind: TransactionKind::parse(&kind_s)
                .with_context(|| format!("Unknown transaction type '{}'", kind_s))?,
            amount_delta: amount_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid delta '{}' in wallet_transactions", amount_s))?,
            sms_units_delta: r.get(4)?,
            resulting_balance: balance_s.parse::<Decimal>().with_context(|| {
                format!("Invalid balance '{}' in wallet_transactions", balance_s)
            })?,
            resulting_sms_units: r.get(6)?,
            description: r.get(7)?,
        });
    }
    Ok(out)
}

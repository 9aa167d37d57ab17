// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::WalletAccount;
use crate::utils::{
    fmt_money, get_currency, maybe_print_json, parse_decimal, pretty_table, wallet_policy,
};
use crate::wallet::{self, LedgerEntry, WalletOp};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("topup", sub)) => topup(conn, sub)?,
        Some(("buy-sms", sub)) => buy_sms(conn, sub)?,
        Some(("status", sub)) => status(conn, sub)?,
        Some(("history", sub)) => history(conn, sub)?,
        _ => {}
    }
    Ok(())
}

pub fn read_wallet(conn: &Connection) -> Result<WalletAccount> {
    let (balance_s, sms_units): (String, i64) = conn.query_row(
        "SELECT balance, sms_units FROM wallet WHERE id=1",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    Ok(WalletAccount {
        balance: balance_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid balance '{}' in wallet", balance_s))?,
        sms_units,
    })
}

/// Run one engine operation and persist the new state plus its ledger entry
/// in a single transaction. State and history never diverge.
pub fn apply_and_persist(
    conn: &mut Connection,
    op: &WalletOp,
) -> Result<(WalletAccount, LedgerEntry)> {
    let policy = wallet_policy(conn)?;
    let tx = conn.transaction()?;
    let account = read_wallet(&tx)?;
    let (next, entry) = wallet::apply(&account, op, &policy)?;
    tx.execute(
        "UPDATE wallet SET balance=?1, sms_units=?2 WHERE id=1",
        params![next.balance.to_string(), next.sms_units],
    )?;
    tx.execute(
        "INSERT INTO wallet_transactions(type, amount_delta, sms_units_delta, resulting_balance, resulting_sms_units, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.kind.as_str(),
            entry.amount_delta.to_string(),
            entry.sms_units_delta,
            entry.resulting_balance.to_string(),
            entry.resulting_sms_units,
            entry.description
        ],
    )?;
    tx.commit()?;
    Ok((next, entry))
}

fn topup(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap().trim())?;
    let method = sub.get_one::<String>("method").unwrap().trim().to_string();
    let (next, _entry) = apply_and_persist(conn, &WalletOp::TopUp { amount, method })?;
    let ccy = get_currency(conn)?;
    println!(
        "Topped up {}; wallet balance is now {}",
        fmt_money(&amount, &ccy),
        fmt_money(&next.balance, &ccy)
    );
    Ok(())
}

fn buy_sms(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let units: i64 = sub
        .get_one::<String>("units")
        .unwrap()
        .trim()
        .parse()
        .context("Invalid unit count")?;
    let (next, entry) = apply_and_persist(conn, &WalletOp::PurchaseSms { units })?;
    let ccy = get_currency(conn)?;
    println!(
        "Purchased {} SMS units for {}; {} units available, balance {}",
        units,
        fmt_money(&-entry.amount_delta, &ccy),
        next.sms_units,
        fmt_money(&next.balance, &ccy)
    );
    Ok(())
}

fn status(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let account = read_wallet(conn)?;
    let policy = wallet_policy(conn)?;
    if !maybe_print_json(json_flag, jsonl_flag, &account)? {
        let ccy = get_currency(conn)?;
        println!("Balance:   {}", fmt_money(&account.balance, &ccy));
        println!("SMS units: {}", account.sms_units);
        println!(
            "Unit price {} (min top-up {}, min purchase {} units)",
            fmt_money(&policy.sms_unit_price, &ccy),
            fmt_money(&policy.min_topup, &ccy),
            policy.min_sms_purchase
        );
    }
    Ok(())
}

fn history(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let limit = *sub.get_one::<usize>("limit").unwrap_or(&50) as i64;
    let mut stmt = conn.prepare(
        "SELECT date, type, amount_delta, sms_units_delta, resulting_balance, resulting_sms_units, description
         FROM wallet_transactions ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |r| {
        Ok(vec![
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, i64>(3)?.to_string(),
            r.get::<_, String>(4)?,
            r.get::<_, i64>(5)?.to_string(),
            r.get::<_, String>(6)?,
        ])
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!(
            "{}",
            pretty_table(
                &["Date", "Type", "Amount", "Units", "Balance", "SMS", "Description"],
                data,
            )
        );
    }
    Ok(())
}

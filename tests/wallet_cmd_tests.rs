// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use feeclip::models::{TransactionKind, WalletTransaction};
use feeclip::wallet::reconciles;
use feeclip::{cli, commands::wallet};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE settings(key TEXT PRIMARY KEY, value TEXT NOT NULL);
        CREATE TABLE wallet(id INTEGER PRIMARY KEY CHECK(id=1), balance TEXT NOT NULL, sms_units INTEGER NOT NULL);
        INSERT INTO wallet(id, balance, sms_units) VALUES (1, '0', 0);
        CREATE TABLE wallet_transactions(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL DEFAULT (datetime('now')),
            type TEXT NOT NULL,
            amount_delta TEXT NOT NULL,
            sms_units_delta INTEGER NOT NULL,
            resulting_balance TEXT NOT NULL,
            resulting_sms_units INTEGER NOT NULL,
            description TEXT NOT NULL
        );
        "#,
    )
    .unwrap();
    conn
}

fn run_wallet(conn: &mut Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["feeclip", "wallet"];
    argv.extend_from_slice(args);
    let cli = cli::build_cli();
    let matches = cli.get_matches_from(argv);
    if let Some(("wallet", wallet_m)) = matches.subcommand() {
        wallet::handle(conn, wallet_m)
    } else {
        panic!("no wallet subcommand");
    }
}

fn transactions(conn: &Connection) -> Vec<WalletTransaction> {
    let mut stmt = conn
        .prepare(
            "SELECT id, date, type, amount_delta, sms_units_delta, resulting_balance, resulting_sms_units, description
             FROM wallet_transactions ORDER BY id",
        )
        .unwrap();
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, i64>(4)?,
                r.get::<_, String>(5)?,
                r.get::<_, i64>(6)?,
                r.get::<_, String>(7)?,
            ))
        })
        .unwrap();
    rows.map(|row| {
        let (id, date, kind, amount, units, balance, sms, description) = row.unwrap();
        WalletTransaction {
            id,
            date,
            kind: TransactionKind::parse(&kind).unwrap(),
            amount_delta: amount.parse().unwrap(),
            sms_units_delta: units,
            resulting_balance: balance.parse().unwrap(),
            resulting_sms_units: sms,
            description,
        }
    })
    .collect()
}

#[test]
fn topup_persists_state_and_transaction_together() {
    let mut conn = setup();
    run_wallet(&mut conn, &["topup", "--amount", "20.00", "--method", "Mobile Money"]).unwrap();

    let account = wallet::read_wallet(&conn).unwrap();
    assert_eq!(account.balance, Decimal::from_str_exact("20.00").unwrap());
    let txs = transactions(&conn);
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].kind, TransactionKind::TopUp);
    assert_eq!(txs[0].resulting_balance, account.balance);
}

#[test]
fn below_minimum_topup_leaves_no_trace() {
    let mut conn = setup();
    let err = run_wallet(&mut conn, &["topup", "--amount", "3.00", "--method", "Cash"]).unwrap_err();
    assert!(err.to_string().contains("below the minimum"));

    let account = wallet::read_wallet(&conn).unwrap();
    assert!(account.balance.is_zero());
    assert_eq!(account.sms_units, 0);
    assert!(transactions(&conn).is_empty());
}

#[test]
fn purchase_updates_both_sides_of_the_wallet() {
    let mut conn = setup();
    run_wallet(&mut conn, &["topup", "--amount", "20.00", "--method", "Cash"]).unwrap();
    run_wallet(&mut conn, &["buy-sms", "--units", "10"]).unwrap();

    let account = wallet::read_wallet(&conn).unwrap();
    assert_eq!(account.balance, Decimal::from_str_exact("19.00").unwrap());
    assert_eq!(account.sms_units, 10);

    let txs = transactions(&conn);
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[1].kind, TransactionKind::SmsPurchase);
    assert_eq!(txs[1].amount_delta, Decimal::from_str_exact("-1.00").unwrap());
    assert_eq!(txs[1].sms_units_delta, 10);
}

#[test]
fn purchase_beyond_funds_is_rejected() {
    let mut conn = setup();
    run_wallet(&mut conn, &["topup", "--amount", "5.00", "--method", "Cash"]).unwrap();
    let err = run_wallet(&mut conn, &["buy-sms", "--units", "100"]).unwrap_err();
    assert!(err.to_string().contains("Insufficient wallet balance"));

    let account = wallet::read_wallet(&conn).unwrap();
    assert_eq!(account.balance, Decimal::from_str_exact("5.00").unwrap());
    assert_eq!(account.sms_units, 0);
    assert_eq!(transactions(&conn).len(), 1);
}

#[test]
fn policy_overrides_come_from_settings() {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO settings(key, value) VALUES ('sms_unit_price', '0.20')",
        [],
    )
    .unwrap();
    run_wallet(&mut conn, &["topup", "--amount", "10.00", "--method", "Cash"]).unwrap();
    run_wallet(&mut conn, &["buy-sms", "--units", "10"]).unwrap();

    let account = wallet::read_wallet(&conn).unwrap();
    // 10 units at the configured 0.20
    assert_eq!(account.balance, Decimal::from_str_exact("8.00").unwrap());
    assert_eq!(account.sms_units, 10);
}

#[test]
fn history_reconciles_with_wallet_state() {
    let mut conn = setup();
    run_wallet(&mut conn, &["topup", "--amount", "50.00", "--method", "Bank"]).unwrap();
    run_wallet(&mut conn, &["buy-sms", "--units", "100"]).unwrap();
    run_wallet(&mut conn, &["topup", "--amount", "5.00", "--method", "Cash"]).unwrap();

    let account = wallet::read_wallet(&conn).unwrap();
    let txs = transactions(&conn);
    assert_eq!(txs.len(), 3);
    assert!(reconciles(&txs, &account));
}

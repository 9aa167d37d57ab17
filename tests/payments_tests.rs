// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use feeclip::{cli, commands::payments, utils};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;
        CREATE TABLE settings(key TEXT PRIMARY KEY, value TEXT NOT NULL);
        CREATE TABLE students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            class TEXT NOT NULL,
            guardian_name TEXT,
            guardian_contact TEXT,
            guardian_email TEXT,
            academic_year TEXT NOT NULL,
            term TEXT NOT NULL
        );
        CREATE TABLE fee_structures(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            academic_year TEXT NOT NULL,
            term TEXT NOT NULL,
            fee_type TEXT NOT NULL,
            amount TEXT NOT NULL,
            level TEXT NOT NULL DEFAULT 'All',
            UNIQUE(academic_year, term, fee_type, level)
        );
        CREATE TABLE payments(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            reference TEXT NOT NULL UNIQUE,
            amount TEXT NOT NULL,
            method TEXT NOT NULL,
            fee_type TEXT NOT NULL,
            term TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            date TEXT NOT NULL
        );
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
        CREATE TABLE sms_logs(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL DEFAULT (datetime('now')),
            recipient TEXT NOT NULL,
            message TEXT NOT NULL,
            status TEXT NOT NULL,
            units_used INTEGER NOT NULL DEFAULT 1
        );
        "#,
    )
    .unwrap();
    conn.execute(
        "INSERT INTO students(name, class, guardian_name, guardian_contact, academic_year, term)
         VALUES ('Ama Mensah', 'JHS 1', 'Kofi Mensah', '+233201234567', '2025/2026', 'Term 1')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO fee_structures(academic_year, term, fee_type, amount, level)
         VALUES ('2025/2026', 'Term 1', 'Tuition', '1000.00', 'All')",
        [],
    )
    .unwrap();
    conn
}

fn add_payment(conn: &mut Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["feeclip", "payment", "add"];
    argv.extend_from_slice(args);
    let cli = cli::build_cli();
    let matches = cli.get_matches_from(argv);
    if let Some(("payment", payment_m)) = matches.subcommand() {
        payments::handle(conn, payment_m)
    } else {
        panic!("no payment subcommand");
    }
}

#[test]
fn payments_accumulate_into_derived_balance() {
    let mut conn = setup();
    for (amount, reference) in [("300.00", "PAY-TEST0001"), ("400.00", "PAY-TEST0002")] {
        add_payment(
            &mut conn,
            &[
                "--student", "1",
                "--amount", amount,
                "--method", "Cash",
                "--fee-type", "Tuition",
                "--date", "2026-01-10",
                "--reference", reference,
            ],
        )
        .unwrap();
    }

    let student = utils::student_by_id(&conn, 1).unwrap();
    let summary = utils::resolve_student(&conn, &student).unwrap();
    assert_eq!(summary.paid_amount, Decimal::from_str_exact("700.00").unwrap());
    assert_eq!(summary.balance, Decimal::from_str_exact("300.00").unwrap());
    assert_eq!(summary.status.to_string(), "Partial");
}

#[test]
fn overpayment_is_rejected_at_entry() {
    let mut conn = setup();
    add_payment(
        &mut conn,
        &[
            "--student", "1",
            "--amount", "700.00",
            "--method", "Cash",
            "--fee-type", "Tuition",
            "--date", "2026-01-10",
        ],
    )
    .unwrap();

    let err = add_payment(
        &mut conn,
        &[
            "--student", "1",
            "--amount", "400.00",
            "--method", "Cash",
            "--fee-type", "Tuition",
            "--date", "2026-01-11",
        ],
    )
    .unwrap_err();
    assert!(err.to_string().contains("exceeds outstanding balance"));

    // the rejected payment never reached the ledger
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM payments", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn settling_the_balance_marks_paid() {
    let mut conn = setup();
    add_payment(
        &mut conn,
        &[
            "--student", "1",
            "--amount", "1000.00",
            "--method", "Bank",
            "--fee-type", "Tuition",
            "--date", "2026-01-10",
        ],
    )
    .unwrap();
    let student = utils::student_by_id(&conn, 1).unwrap();
    let summary = utils::resolve_student(&conn, &student).unwrap();
    assert_eq!(summary.status.to_string(), "Paid");
    assert!(summary.balance.is_zero());
}

#[test]
fn non_positive_amount_is_rejected() {
    let mut conn = setup();
    let err = add_payment(
        &mut conn,
        &[
            "--student", "1",
            "--amount", "0",
            "--method", "Cash",
            "--fee-type", "Tuition",
            "--date", "2026-01-10",
        ],
    )
    .unwrap_err();
    assert!(err.to_string().contains("greater than zero"));
}

#[test]
fn duplicate_reference_is_rejected() {
    let mut conn = setup();
    let args = [
        "--student", "1",
        "--amount", "100.00",
        "--method", "Cash",
        "--fee-type", "Tuition",
        "--date", "2026-01-10",
        "--reference", "PAY-DUP00001",
    ];
    add_payment(&mut conn, &args).unwrap();
    let err = add_payment(&mut conn, &args).unwrap_err();
    assert!(err.to_string().contains("already exists"));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM payments", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn list_limit_respected() {
    let mut conn = setup();
    for (i, date) in ["2026-01-05", "2026-01-06", "2026-01-07"].into_iter().enumerate() {
        let reference = format!("PAY-LIST{:04}", i);
        add_payment(
            &mut conn,
            &[
                "--student", "1",
                "--amount", "50.00",
                "--method", "Cash",
                "--fee-type", "Tuition",
                "--date", date,
                "--reference", reference.as_str(),
            ],
        )
        .unwrap();
    }

    let cli = cli::build_cli();
    let matches = cli.get_matches_from(["feeclip", "payment", "list", "--limit", "2"]);
    if let Some(("payment", payment_m)) = matches.subcommand() {
        if let Some(("list", list_m)) = payment_m.subcommand() {
            let rows = payments::query_rows(&conn, list_m).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].date, "2026-01-07");
        } else {
            panic!("no list subcommand");
        }
    } else {
        panic!("no payment subcommand");
    }
}

#[test]
fn payment_survives_failed_receipt_sms() {
    let mut conn = setup();
    // zero SMS units: the receipt cannot be sent, the payment must stand
    add_payment(
        &mut conn,
        &[
            "--student", "1",
            "--amount", "250.00",
            "--method", "Mobile Money",
            "--fee-type", "Tuition",
            "--date", "2026-01-12",
            "--sms",
        ],
    )
    .unwrap();

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM payments", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
    let log_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM sms_logs", [], |r| r.get(0))
        .unwrap();
    assert_eq!(log_count, 0);
    let units: i64 = conn
        .query_row("SELECT sms_units FROM wallet WHERE id=1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(units, 0);
}

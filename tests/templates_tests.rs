// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use feeclip::{cli, commands::templates, utils};
use rusqlite::Connection;
use std::collections::HashMap;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        r#"
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
            level TEXT NOT NULL DEFAULT 'All'
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
        CREATE TABLE templates(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            subject TEXT NOT NULL,
            body TEXT NOT NULL
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
    conn
}

fn run_template(conn: &Connection, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["feeclip", "template"];
    argv.extend_from_slice(args);
    let cli = cli::build_cli();
    let matches = cli.get_matches_from(argv);
    if let Some(("template", template_m)) = matches.subcommand() {
        templates::handle(conn, template_m)
    } else {
        panic!("no template subcommand");
    }
}

#[test]
fn placeholders_are_substituted() {
    let mut vars: HashMap<&str, String> = HashMap::new();
    vars.insert("student_name", "Ama Mensah".into());
    vars.insert("balance", "GHS 300.00".into());
    let out = utils::render_placeholders(
        "Dear guardian of {student_name}, {balance} is outstanding.",
        &vars,
    );
    assert_eq!(out, "Dear guardian of Ama Mensah, GHS 300.00 is outstanding.");
}

#[test]
fn unknown_placeholders_are_left_intact() {
    let vars: HashMap<&str, String> = HashMap::new();
    let out = utils::render_placeholders("Hello {nobody}", &vars);
    assert_eq!(out, "Hello {nobody}");
}

#[test]
fn add_rejects_unknown_placeholder() {
    let conn = setup();
    let err = run_template(
        &conn,
        &[
            "add",
            "--code", "oops",
            "--subject", "Fees",
            "--body", "Hello {guardain_name}",
        ],
    )
    .unwrap_err();
    assert!(err.to_string().contains("Unknown placeholder"));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM templates", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn add_and_render_round_trip() {
    let conn = setup();
    run_template(
        &conn,
        &[
            "add",
            "--code", "reminder",
            "--subject", "Fees for {student_name}",
            "--body", "Dear {guardian_name}, {balance} is due for {term}.",
        ],
    )
    .unwrap();
    // render prints; success is enough here, the substitution itself is
    // covered by the direct render_placeholders tests above
    run_template(&conn, &["render", "--code", "reminder", "--student", "1"]).unwrap();
}

#[test]
fn duplicate_code_is_rejected() {
    let conn = setup();
    let args = ["add", "--code", "dup", "--subject", "S", "--body", "B"];
    run_template(&conn, &args).unwrap();
    let err = run_template(&conn, &args).unwrap_err();
    assert!(err.to_string().contains("already exists"));
}

#[test]
fn rm_missing_template_errors() {
    let conn = setup();
    let err = run_template(&conn, &["rm", "--code", "ghost"]).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

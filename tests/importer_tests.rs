// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use feeclip::{cli, commands::importer};
use rusqlite::Connection;
use std::io::Write;
use tempfile::NamedTempFile;

fn base_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        r#"
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
        "#,
    )
    .unwrap();
    conn
}

fn run_import(conn: &mut Connection, path: &str) -> anyhow::Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches_from(["feeclip", "import", "students", "--path", path]);
    if let Some(("import", import_m)) = matches.subcommand() {
        importer::handle(conn, import_m)
    } else {
        panic!("no import subcommand");
    }
}

#[test]
fn importer_loads_and_trims_rows() {
    let mut conn = base_conn();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "name,class,guardian_name,guardian_contact,guardian_email,academic_year,term\n  Ama Mensah ,JHS 1, Kofi Mensah ,+233201234567,,2025/2026,Term 1\nKwame Boateng,JHS 2,,,,2025/2026,Term 1"
    )
    .unwrap();
    file.flush().unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let padded = format!("  {}  ", path);
    run_import(&mut conn, &padded).unwrap();

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2);

    let (name, guardian): (String, Option<String>) = conn
        .query_row(
            "SELECT name, guardian_name FROM students WHERE class='JHS 1'",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(name, "Ama Mensah");
    assert_eq!(guardian.as_deref(), Some("Kofi Mensah"));

    let empty_guardian: Option<String> = conn
        .query_row(
            "SELECT guardian_name FROM students WHERE class='JHS 2'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(empty_guardian, None);
}

#[test]
fn importer_rolls_back_on_invalid_year() {
    let mut conn = base_conn();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "name,class,guardian_name,guardian_contact,guardian_email,academic_year,term\nAma Mensah,JHS 1,,,,2025/2026,Term 1\nKwame Boateng,JHS 2,,,,2025-2026,Term 1"
    )
    .unwrap();
    file.flush().unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let err = run_import(&mut conn, &path).unwrap_err();
    assert!(err.to_string().contains("Invalid academic year"));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn importer_rejects_non_consecutive_years() {
    let mut conn = base_conn();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "name,class,guardian_name,guardian_contact,guardian_email,academic_year,term\nAma Mensah,JHS 1,,,,2025/2027,Term 1"
    )
    .unwrap();
    file.flush().unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let err = run_import(&mut conn, &path).unwrap_err();
    assert!(err.to_string().contains("Invalid academic year '2025/2027'"));
    let chain = format!("{:#}", err);
    assert!(chain.contains("consecutive"));
}

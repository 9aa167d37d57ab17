// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.alphavelocity", "Feeclip", "feeclip"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("feeclip.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS students(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        class TEXT NOT NULL,
        guardian_name TEXT,
        guardian_contact TEXT,
        guardian_email TEXT,
        academic_year TEXT NOT NULL,
        term TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS fee_structures(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        academic_year TEXT NOT NULL,
        term TEXT NOT NULL,
        fee_type TEXT NOT NULL,
        amount TEXT NOT NULL,
        level TEXT NOT NULL DEFAULT 'All',
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(academic_year, term, fee_type, level)
    );

    CREATE TABLE IF NOT EXISTS payments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id INTEGER NOT NULL,
        reference TEXT NOT NULL UNIQUE,
        amount TEXT NOT NULL,
        method TEXT NOT NULL,
        fee_type TEXT NOT NULL,
        term TEXT NOT NULL,
        academic_year TEXT NOT NULL,
        date TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(student_id) REFERENCES students(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_payments_student ON payments(student_id);
    CREATE INDEX IF NOT EXISTS idx_payments_date ON payments(date);

    -- singleton account row; mutated only together with a wallet_transactions append
    CREATE TABLE IF NOT EXISTS wallet(
        id INTEGER PRIMARY KEY CHECK(id = 1),
        balance TEXT NOT NULL,
        sms_units INTEGER NOT NULL
    );
    INSERT OR IGNORE INTO wallet(id, balance, sms_units) VALUES (1, '0', 0);

    CREATE TABLE IF NOT EXISTS wallet_transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL DEFAULT (datetime('now')),
        type TEXT NOT NULL CHECK(type IN ('topup','sms_purchase','sms_usage')),
        amount_delta TEXT NOT NULL,
        sms_units_delta INTEGER NOT NULL,
        resulting_balance TEXT NOT NULL,
        resulting_sms_units INTEGER NOT NULL,
        description TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS templates(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE,
        subject TEXT NOT NULL,
        body TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS sms_logs(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL DEFAULT (datetime('now')),
        recipient TEXT NOT NULL,
        message TEXT NOT NULL,
        status TEXT NOT NULL CHECK(status IN ('sent','failed')),
        units_used INTEGER NOT NULL DEFAULT 1
    );
    "#,
    )?;
    Ok(())
}

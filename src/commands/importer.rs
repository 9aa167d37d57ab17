// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::parse_academic_year;
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rusqlite::{params, Connection};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("students", sub)) => import_students(conn, sub),
        _ => Ok(()),
    }
}

// Columns: name, class, guardian_name, guardian_contact, guardian_email,
// academic_year, term. All rows import or none do.
fn import_students(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let tx = conn.transaction()?;
    let mut count = 0usize;
    for result in rdr.records() {
        let rec = result?;
        let name = rec.get(0).context("name missing")?.trim().to_string();
        let class = rec.get(1).context("class missing")?.trim().to_string();
        let g_name = rec
            .get(2)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
        let g_contact = rec
            .get(3)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
        let g_email = rec
            .get(4)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
        let year_raw = rec.get(5).context("academic_year missing")?.trim();
        let term = rec.get(6).context("term missing")?.trim().to_string();

        if name.is_empty() {
            return Err(anyhow::anyhow!("Row {}: empty student name", count + 1));
        }
        let year = parse_academic_year(year_raw)
            .with_context(|| format!("Invalid academic year '{}' for {}", year_raw, name))?;

        tx.execute(
            "INSERT INTO students(name, class, guardian_name, guardian_contact, guardian_email, academic_year, term)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![name, class, g_name, g_contact, g_email, year, term],
        )?;
        count += 1;
    }
    tx.commit()?;
    println!("Imported {} students from {}", count, path);
    Ok(())
}

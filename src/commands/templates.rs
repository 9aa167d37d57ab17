// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::MessageTemplate;
use crate::utils::{
    pretty_table, render_placeholders, resolve_student, student_for_ref, student_vars,
};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use rusqlite::{params, Connection};

const KNOWN_PLACEHOLDERS: &[&str] = &[
    "student_name",
    "guardian_name",
    "class",
    "term",
    "academic_year",
    "total_fees",
    "paid_amount",
    "balance",
    "status",
    "school_name",
];

/// Reject template bodies that reference placeholders we will never fill.
fn check_placeholders(body: &str) -> Result<()> {
    static PLACEHOLDER_RE: Lazy<regex::Regex> =
        Lazy::new(|| regex::Regex::new(r"\{([a-z_]+)\}").unwrap());
    for caps in PLACEHOLDER_RE.captures_iter(body) {
        let name = caps.get(1).unwrap().as_str();
        if !KNOWN_PLACEHOLDERS.contains(&name) {
            return Err(anyhow::anyhow!(
                "Unknown placeholder '{{{}}}' (known: {})",
                name,
                KNOWN_PLACEHOLDERS.join(", ")
            ));
        }
    }
    Ok(())
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", _)) => list(conn)?,
        Some(("rm", sub)) => rm(conn, sub)?,
        Some(("render", sub)) => render(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let code = sub.get_one::<String>("code").unwrap().trim().to_string();
    let subject = sub.get_one::<String>("subject").unwrap().trim().to_string();
    let body = sub.get_one::<String>("body").unwrap().to_string();
    check_placeholders(&body)?;
    conn.execute(
        "INSERT INTO templates(code, subject, body) VALUES (?1, ?2, ?3)",
        params![code, subject, body],
    )
    .with_context(|| format!("Template '{}' already exists", code))?;
    println!("Added template '{}'", code);
    Ok(())
}

fn list(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("SELECT id, code, subject, body FROM templates ORDER BY code")?;
    let rows = stmt.query_map([], |r| {
        Ok(MessageTemplate {
            id: r.get(0)?,
            code: r.get(1)?,
            subject: r.get(2)?,
            body: r.get(3)?,
        })
    })?;
    let mut data = Vec::new();
    for row in rows {
        let t = row?;
        data.push(vec![t.code, t.subject, t.body]);
    }
    println!("{}", pretty_table(&["Code", "Subject", "Body"], data));
    Ok(())
}

fn rm(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let code = sub.get_one::<String>("code").unwrap().trim();
    let n = conn.execute("DELETE FROM templates WHERE code=?1", params![code])?;
    if n == 0 {
        return Err(anyhow::anyhow!("Template '{}' not found", code));
    }
    println!("Removed template '{}'", code);
    Ok(())
}

fn render(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let code = sub.get_one::<String>("code").unwrap().trim();
    let student = student_for_ref(conn, sub.get_one::<String>("student").unwrap())?;
    let (subject, body): (String, String) = conn
        .query_row(
            "SELECT subject, body FROM templates WHERE code=?1",
            params![code],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .with_context(|| format!("Template '{}' not found", code))?;
    let summary = resolve_student(conn, &student)?;
    let vars = student_vars(conn, &student, &summary)?;
    println!("{}", render_placeholders(&subject, &vars));
    println!();
    println!("{}", render_placeholders(&body, &vars));
    Ok(())
}

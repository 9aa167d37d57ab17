// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::{assignment_applies, FeeContext};
use crate::utils::{
    fetch_assignments, fmt_money, get_currency, invalidate_summary_cache, maybe_print_json,
    parse_academic_year, parse_decimal, pretty_table,
};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rm", sub)) => rm(conn, sub)?,
        Some(("summary", sub)) => summary(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn set(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let year = parse_academic_year(sub.get_one::<String>("year").unwrap().trim())?;
    let term = sub.get_one::<String>("term").unwrap().trim().to_string();
    let fee_type = sub.get_one::<String>("fee-type").unwrap().trim().to_string();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap().trim())?;
    let level = sub.get_one::<String>("level").unwrap().trim().to_string();

    if amount < Decimal::ZERO {
        return Err(anyhow::anyhow!("Fee amount must not be negative"));
    }
    conn.execute(
        "INSERT INTO fee_structures(academic_year, term, fee_type, amount, level)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![year, term, fee_type, amount.to_string(), level],
    )
    .with_context(|| {
        format!(
            "Fee type '{}' already exists for {} {} ({})",
            fee_type, term, year, level
        )
    })?;
    invalidate_summary_cache();
    println!("Set {} = {} for {} {} ({})", fee_type, amount, term, year, level);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let mut sql = String::from(
        "SELECT id, academic_year, term, fee_type, amount, level FROM fee_structures WHERE 1=1",
    );
    let mut params_vec: Vec<String> = Vec::new();
    if let Some(year) = sub.get_one::<String>("year") {
        sql.push_str(" AND academic_year=?");
        params_vec.push(year.trim().into());
    }
    if let Some(term) = sub.get_one::<String>("term") {
        sql.push_str(" AND term=?");
        params_vec.push(term.trim().into());
    }
    sql.push_str(" ORDER BY academic_year DESC, term, fee_type");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = if params_vec.is_empty() {
        stmt.query([])?
    } else {
        let params: Vec<&dyn rusqlite::ToSql> = params_vec
            .iter()
            .map(|s| s as &dyn rusqlite::ToSql)
            .collect();
        stmt.query(rusqlite::params_from_iter(params))?
    };

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        data.push(vec![
            id.to_string(),
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
        ]);
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!(
            "{}",
            pretty_table(&["Id", "Year", "Term", "Fee", "Amount", "Level"], data)
        );
    }
    Ok(())
}

fn rm(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id: i64 = sub
        .get_one::<String>("id")
        .unwrap()
        .trim()
        .parse()
        .context("Invalid fee assignment id")?;
    let n = conn.execute("DELETE FROM fee_structures WHERE id=?1", params![id])?;
    if n == 0 {
        return Err(anyhow::anyhow!("Fee assignment #{} not found", id));
    }
    invalidate_summary_cache();
    println!("Removed fee assignment #{}", id);
    Ok(())
}

fn summary(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let year = sub.get_one::<String>("year").unwrap().trim().to_string();
    let term = sub.get_one::<String>("term").unwrap().trim().to_string();
    let level = sub.get_one::<String>("level").map(|s| s.trim().to_string());

    let assignments = fetch_assignments(conn, &year, &term)?;
    let mut total = Decimal::ZERO;
    let mut data = Vec::new();
    for a in &assignments {
        if let Some(ref lvl) = level {
            let ctx = FeeContext::new(&year, &term, lvl);
            if !assignment_applies(a, &ctx) {
                continue;
            }
        }
        total += a.amount;
        data.push(vec![
            a.fee_type.clone(),
            format!("{:.2}", a.amount),
            a.level.clone(),
        ]);
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!("{}", pretty_table(&["Fee", "Amount", "Level"], data));
        let ccy = get_currency(conn)?;
        println!("Total for {} {}: {}", term, year, fmt_money(&total, &ccy));
    }
    Ok(())
}

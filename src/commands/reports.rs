// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::PaymentStatus;
use crate::utils::{fetch_students, maybe_print_json, pretty_table, resolve_student};
use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("collection", sub)) => collection(conn, sub)?,
        Some(("outstanding", sub)) => outstanding(conn, sub)?,
        Some(("status-summary", sub)) => status_summary(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn collection(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let month = sub.get_one::<String>("month").map(|s| s.trim().to_string());

    use std::collections::BTreeMap;
    if let Some(month) = month {
        // One month, broken down by payment method
        let mut stmt = conn.prepare(
            "SELECT method, amount FROM payments WHERE substr(date,1,7)=?1 ORDER BY method",
        )?;
        let rows = stmt.query_map([&month], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })?;
        let mut by_method: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut total = Decimal::ZERO;
        for row in rows {
            let (method, amt_s) = row?;
            let amt = amt_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid amount '{}' in payments", amt_s))?;
            *by_method.entry(method).or_insert(Decimal::ZERO) += amt;
            total += amt;
        }
        let mut data: Vec<Vec<String>> = by_method
            .into_iter()
            .map(|(m, v)| vec![m, format!("{:.2}", v)])
            .collect();
        data.push(vec!["Total".into(), format!("{:.2}", total)]);
        if !maybe_print_json(json_flag, jsonl_flag, &data)? {
            println!("{}", pretty_table(&["Method", "Collected"], data));
        }
    } else {
        let mut stmt =
            conn.prepare("SELECT substr(date,1,7) AS month, amount FROM payments ORDER BY date")?;
        let rows = stmt.query_map([], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })?;
        let mut by_month: BTreeMap<String, Decimal> = BTreeMap::new();
        for row in rows {
            let (m, amt_s) = row?;
            let amt = amt_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid amount '{}' in payments", amt_s))?;
            *by_month.entry(m).or_insert(Decimal::ZERO) += amt;
        }
        let data: Vec<Vec<String>> = by_month
            .into_iter()
            .rev()
            .map(|(m, v)| vec![m, format!("{:.2}", v)])
            .collect();
        if !maybe_print_json(json_flag, jsonl_flag, &data)? {
            println!("{}", pretty_table(&["Month", "Collected"], data));
        }
    }
    Ok(())
}

fn outstanding(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let class = sub.get_one::<String>("class").map(|s| s.trim().to_string());

    let students = fetch_students(conn, class.as_deref())?;
    let mut items = Vec::new();
    for s in &students {
        let summary = resolve_student(conn, s)?;
        if summary.balance.is_zero() {
            continue;
        }
        items.push((s.name.clone(), s.class.clone(), summary));
    }
    items.sort_by(|a, b| b.2.balance.cmp(&a.2.balance));

    let data: Vec<Vec<String>> = items
        .iter()
        .map(|(name, class, sm)| {
            vec![
                name.clone(),
                class.clone(),
                format!("{:.2}", sm.total_fees),
                format!("{:.2}", sm.paid_amount),
                format!("{:.2}", sm.balance),
                sm.status.to_string(),
            ]
        })
        .collect();
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!(
            "{}",
            pretty_table(
                &["Student", "Class", "Fees", "Paid", "Outstanding", "Status"],
                data,
            )
        );
    }
    Ok(())
}

fn status_summary(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");

    use std::collections::BTreeMap;
    let students = fetch_students(conn, None)?;
    let mut counts: BTreeMap<String, (usize, usize, usize)> = BTreeMap::new();
    for s in &students {
        let summary = resolve_student(conn, s)?;
        let entry = counts.entry(s.class.clone()).or_insert((0, 0, 0));
        match summary.status {
            PaymentStatus::Paid => entry.0 += 1,
            PaymentStatus::Partial => entry.1 += 1,
            PaymentStatus::Unpaid => entry.2 += 1,
        }
    }
    let data: Vec<Vec<String>> = counts
        .into_iter()
        .map(|(class, (paid, partial, unpaid))| {
            vec![
                class,
                paid.to_string(),
                partial.to_string(),
                unpaid.to_string(),
            ]
        })
        .collect();
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        println!(
            "{}",
            pretty_table(&["Class", "Paid", "Partial", "Unpaid"], data)
        );
    }
    Ok(())
}

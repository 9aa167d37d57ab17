// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::{assignment_applies, FeeContext};
use crate::utils::{
    fetch_assignments, fetch_payments_for_student, fetch_students, fmt_money, get_currency,
    invalidate_summary_cache, maybe_print_json, parse_academic_year, pretty_table, resolve_student,
    student_for_ref,
};
use anyhow::Result;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        Some(("promote", sub)) => promote(conn, sub)?,
        Some(("rm", sub)) => rm(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim().to_string();
    let class = sub.get_one::<String>("class").unwrap().trim().to_string();
    let year = parse_academic_year(sub.get_one::<String>("year").unwrap().trim())?;
    let term = sub.get_one::<String>("term").unwrap().trim().to_string();
    let g_name = sub.get_one::<String>("guardian-name").map(|s| s.trim().to_string());
    let g_contact = sub
        .get_one::<String>("guardian-contact")
        .map(|s| s.trim().to_string());
    let g_email = sub
        .get_one::<String>("guardian-email")
        .map(|s| s.trim().to_string());

    conn.execute(
        "INSERT INTO students(name, class, guardian_name, guardian_contact, guardian_email, academic_year, term)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![name, class, g_name, g_contact, g_email, year, term],
    )?;
    println!("Added student '{}' ({}, {} {})", name, class, year, term);
    Ok(())
}

#[derive(Serialize)]
pub struct StudentRow {
    pub id: i64,
    pub name: String,
    pub class: String,
    pub total_fees: String,
    pub paid_amount: String,
    pub balance: String,
    pub status: String,
}

pub fn query_rows(conn: &Connection, class: Option<&str>) -> Result<Vec<StudentRow>> {
    let students = fetch_students(conn, class)?;
    let mut data = Vec::new();
    for s in students {
        let summary = resolve_student(conn, &s)?;
        data.push(StudentRow {
            id: s.id,
            name: s.name,
            class: s.class,
            total_fees: format!("{:.2}", summary.total_fees),
            paid_amount: format!("{:.2}", summary.paid_amount),
            balance: format!("{:.2}", summary.balance),
            status: summary.status.to_string(),
        });
    }
    Ok(data)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let class = sub.get_one::<String>("class").map(|s| s.trim().to_string());
    let data = query_rows(conn, class.as_deref())?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.name.clone(),
                    r.class.clone(),
                    r.total_fees.clone(),
                    r.paid_amount.clone(),
                    r.balance.clone(),
                    r.status.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Name", "Class", "Fees", "Paid", "Balance", "Status"],
                rows,
            )
        );
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let student = student_for_ref(conn, sub.get_one::<String>("student").unwrap())?;
    let summary = resolve_student(conn, &student)?;
    let ccy = get_currency(conn)?;

    println!(
        "{} ({}, {} {})",
        student.name, student.class, student.academic_year, student.term
    );
    if let Some(g) = &student.guardian_name {
        let contact = student.guardian_contact.as_deref().unwrap_or("-");
        println!("Guardian: {} ({})", g, contact);
    }

    // Per-fee-type breakdown, the way receipts itemize it
    let assignments = fetch_assignments(conn, &student.academic_year, &student.term)?;
    let payments = fetch_payments_for_student(conn, student.id)?;
    let ctx = FeeContext::new(&student.academic_year, &student.term, &student.class);
    let mut rows = Vec::new();
    for a in assignments.iter().filter(|a| assignment_applies(a, &ctx)) {
        let paid: Decimal = payments
            .iter()
            .filter(|p| {
                p.fee_type == a.fee_type
                    && p.academic_year == student.academic_year
                    && p.term == student.term
            })
            .map(|p| p.amount)
            .sum();
        let due = if paid >= a.amount {
            Decimal::ZERO
        } else {
            a.amount - paid
        };
        rows.push(vec![
            a.fee_type.clone(),
            format!("{:.2}", a.amount),
            format!("{:.2}", paid),
            format!("{:.2}", due),
        ]);
    }
    println!("{}", pretty_table(&["Fee", "Amount", "Paid", "Due"], rows));
    println!(
        "Total: {}  Paid: {}  Balance: {}  [{}]",
        fmt_money(&summary.total_fees, &ccy),
        fmt_money(&summary.paid_amount, &ccy),
        fmt_money(&summary.balance, &ccy),
        summary.status
    );
    for w in &summary.warnings {
        eprintln!("warning: {}", w);
    }
    Ok(())
}

// Past-term payments stay on record but stop counting toward the new term.
fn promote(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let student = student_for_ref(conn, sub.get_one::<String>("student").unwrap())?;
    let year = parse_academic_year(sub.get_one::<String>("year").unwrap().trim())?;
    let term = sub.get_one::<String>("term").unwrap().trim().to_string();
    conn.execute(
        "UPDATE students SET academic_year=?1, term=?2 WHERE id=?3",
        params![year, term, student.id],
    )?;
    invalidate_summary_cache();
    println!("Moved '{}' to {} {}", student.name, year, term);
    Ok(())
}

fn rm(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let student = student_for_ref(conn, sub.get_one::<String>("student").unwrap())?;
    conn.execute("DELETE FROM students WHERE id=?1", params![student.id])?;
    invalidate_summary_cache();
    println!("Removed student '{}'", student.name);
    Ok(())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::ledger::{check_payment, LedgerError};
use crate::utils::{
    fmt_money, get_currency, get_school_name, id_for_student, invalidate_summary_cache,
    maybe_print_json, new_reference, parse_date, parse_decimal, pretty_table, resolve_student,
    student_for_ref,
};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let student = student_for_ref(conn, sub.get_one::<String>("student").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap().trim())?;
    let method = sub.get_one::<String>("method").unwrap().trim().to_string();
    let fee_type = sub.get_one::<String>("fee-type").unwrap().trim().to_string();
    let date = match sub.get_one::<String>("date") {
        Some(d) => parse_date(d.trim())?,
        None => chrono::Utc::now().date_naive(),
    };
    let reference = match sub.get_one::<String>("reference") {
        Some(r) => r.trim().to_string(),
        None => new_reference("PAY"),
    };

    // Entry-time acceptance: reject bad amounts and overpayment before the
    // row exists; the ledger is never observed in an over-collected state.
    let summary = resolve_student(conn, &student)?;
    check_payment(amount, &summary)?;

    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM payments WHERE reference=?1",
            params![&reference],
            |r| r.get(0),
        )
        .optional()?;
    if exists.is_some() {
        return Err(LedgerError::DuplicateReference(reference).into());
    }

    conn.execute(
        "INSERT INTO payments(student_id, reference, amount, method, fee_type, term, academic_year, date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            student.id,
            reference,
            amount.to_string(),
            method,
            fee_type,
            student.term,
            student.academic_year,
            date.to_string()
        ],
    )?;
    invalidate_summary_cache();

    let after = resolve_student(conn, &student)?;
    let ccy = get_currency(conn)?;
    println!(
        "Recorded {} from '{}' ({}) ref {}; balance now {} [{}]",
        fmt_money(&amount, &ccy),
        student.name,
        fee_type,
        reference,
        fmt_money(&after.balance, &ccy),
        after.status
    );
    for w in &after.warnings {
        eprintln!("warning: {}", w);
    }

    // The receipt SMS is its own wallet transaction; running out of units
    // must not unwind the payment that is already committed above.
    if sub.get_flag("sms") {
        match send_receipt(conn, &student, &reference, amount) {
            Ok(()) => {}
            Err(e) => eprintln!("Payment recorded; receipt SMS not sent: {}", e),
        }
    }
    Ok(())
}

fn send_receipt(
    conn: &mut Connection,
    student: &crate::models::Student,
    reference: &str,
    amount: rust_decimal::Decimal,
) -> Result<()> {
    let contact = student
        .guardian_contact
        .clone()
        .ok_or_else(|| anyhow::anyhow!("student has no guardian contact"))?;
    let summary = resolve_student(conn, student)?;
    let ccy = get_currency(conn)?;
    let message = format!(
        "{}\nPayment Receipt\nStudent: {}\nAmount: {}\nBalance: {}\nRef: {}\nThank you!",
        get_school_name(conn)?,
        student.name,
        fmt_money(&amount, &ccy),
        fmt_money(&summary.balance, &ccy),
        reference
    );
    crate::commands::sms::send_one(
        conn,
        &contact,
        &message,
        &format!("Payment receipt sent to {}", contact),
    )
}

#[derive(Serialize)]
pub struct PaymentRow {
    pub date: String,
    pub reference: String,
    pub student: String,
    pub class: String,
    pub amount: String,
    pub method: String,
    pub fee_type: String,
    pub term: String,
    pub academic_year: String,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<PaymentRow>> {
    let mut sql = String::from(
        "SELECT p.date, p.reference, s.name, s.class, p.amount, p.method, p.fee_type, p.term, p.academic_year
         FROM payments p LEFT JOIN students s ON p.student_id=s.id WHERE 1=1",
    );
    let mut params_vec: Vec<String> = Vec::new();

    if let Some(student) = sub.get_one::<String>("student") {
        let id = match student.trim().parse::<i64>() {
            Ok(id) => id,
            Err(_) => id_for_student(conn, student.trim())?,
        };
        sql.push_str(" AND p.student_id=?");
        params_vec.push(id.to_string());
    }
    if let Some(month) = sub.get_one::<String>("month") {
        sql.push_str(" AND substr(p.date,1,7)=?");
        params_vec.push(month.trim().into());
    }
    if let Some(method) = sub.get_one::<String>("method") {
        sql.push_str(" AND p.method=?");
        params_vec.push(method.trim().into());
    }
    sql.push_str(" ORDER BY p.date DESC, p.id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

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
        let student: Option<String> = r.get(2)?;
        let class: Option<String> = r.get(3)?;
        data.push(PaymentRow {
            date: r.get(0)?,
            reference: r.get(1)?,
            student: student.unwrap_or_default(),
            class: class.unwrap_or_default(),
            amount: r.get(4)?,
            method: r.get(5)?,
            fee_type: r.get(6)?,
            term: r.get(7)?,
            academic_year: r.get(8)?,
        });
    }
    Ok(data)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.date.clone(),
                    r.reference.clone(),
                    r.student.clone(),
                    r.class.clone(),
                    r.amount.clone(),
                    r.method.clone(),
                    r.fee_type.clone(),
                    r.term.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Date", "Ref", "Student", "Class", "Amount", "Method", "Fee", "Term"],
                rows,
            )
        );
    }
    Ok(())
}

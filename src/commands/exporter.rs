// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("payments", sub)) => export_payments(conn, sub),
        Some(("students", sub)) => export_students(conn, sub),
        _ => Ok(()),
    }
}

fn export_payments(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().trim().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap().trim();

    let mut stmt = conn.prepare(
        "SELECT p.date, p.reference, s.name as student, s.class, p.amount, p.method, p.fee_type, p.term, p.academic_year
         FROM payments p
         LEFT JOIN students s ON p.student_id=s.id
         ORDER BY p.date, p.id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, Option<String>>(2)?,
            r.get::<_, Option<String>>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
            r.get::<_, String>(7)?,
            r.get::<_, String>(8)?,
        ))
    })?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "date", "reference", "student", "class", "amount", "method", "fee_type", "term",
                "academic_year",
            ])?;
            for row in rows {
                let (d, rf, st, cl, amt, me, ft, tm, yr) = row?;
                wtr.write_record([
                    d,
                    rf,
                    st.unwrap_or_default(),
                    cl.unwrap_or_default(),
                    amt,
                    me,
                    ft,
                    tm,
                    yr,
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let mut items = Vec::new();
            for row in rows {
                let (d, rf, st, cl, amt, me, ft, tm, yr) = row?;
                items.push(json!({
                    "date": d, "reference": rf, "student": st, "class": cl, "amount": amt,
                    "method": me, "fee_type": ft, "term": tm, "academic_year": yr
                }));
            }
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            return Err(anyhow::anyhow!("Unknown format: {} (use csv|json)", fmt));
        }
    }
    println!("Exported payments to {}", out);
    Ok(())
}

fn export_students(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().trim().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap().trim();

    let mut stmt = conn.prepare(
        "SELECT name, class, guardian_name, guardian_contact, guardian_email, academic_year, term
         FROM students ORDER BY class, name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, Option<String>>(2)?,
            r.get::<_, Option<String>>(3)?,
            r.get::<_, Option<String>>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, String>(6)?,
        ))
    })?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "name",
                "class",
                "guardian_name",
                "guardian_contact",
                "guardian_email",
                "academic_year",
                "term",
            ])?;
            for row in rows {
                let (n, c, gn, gc, ge, yr, tm) = row?;
                wtr.write_record([
                    n,
                    c,
                    gn.unwrap_or_default(),
                    gc.unwrap_or_default(),
                    ge.unwrap_or_default(),
                    yr,
                    tm,
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let mut items = Vec::new();
            for row in rows {
                let (n, c, gn, gc, ge, yr, tm) = row?;
                items.push(json!({
                    "name": n, "class": c, "guardian_name": gn, "guardian_contact": gc,
                    "guardian_email": ge, "academic_year": yr, "term": tm
                }));
            }
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            return Err(anyhow::anyhow!("Unknown format: {} (use csv|json)", fmt));
        }
    }
    println!("Exported students to {}", out);
    Ok(())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use once_cell::sync::Lazy;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::ledger::{self, FeeContext, FeeSummary};
use crate::models::{FeeAssignment, Payment, Student};
use crate::wallet::WalletPolicy;

const UA: &str = concat!(
    "feeclip/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/alphavelocity/feeclip)"
);

pub fn http_client() -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .user_agent(UA)
        .build()?;
    Ok(c)
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Academic years are written "YYYY/YYYY" with consecutive years.
pub fn parse_academic_year(s: &str) -> Result<String> {
    static YEAR_RE: Lazy<regex::Regex> =
        Lazy::new(|| regex::Regex::new(r"^(\d{4})/(\d{4})$").unwrap());
    let caps = YEAR_RE
        .captures(s)
        .with_context(|| format!("Invalid academic year '{}', expected YYYY/YYYY", s))?;
    let start: i32 = caps[1].parse()?;
    let end: i32 = caps[2].parse()?;
    if end != start + 1 {
        return Err(anyhow::anyhow!(
            "Invalid academic year '{}': years must be consecutive",
            s
        ));
    }
    Ok(s.to_string())
}

pub fn fmt_money(d: &Decimal, ccy: &str) -> String {
    format!("{} {}", ccy, d.round_dp(2))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

/// Receipt and transaction references, e.g. "PAY-1A2B3C4D".
pub fn new_reference(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, id[..8].to_uppercase())
}

pub fn id_for_student(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM students WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![name], |r| r.get(0))
        .with_context(|| format!("Student '{}' not found", name))?;
    Ok(id)
}

pub fn student_by_id(conn: &Connection, id: i64) -> Result<Student> {
    let mut stmt = conn.prepare(
        "SELECT id, name, class, guardian_name, guardian_contact, guardian_email, academic_year, term
         FROM students WHERE id=?1",
    )?;
    let s = stmt
        .query_row(params![id], |r| {
            Ok(Student {
                id: r.get(0)?,
                name: r.get(1)?,
                class: r.get(2)?,
                guardian_name: r.get(3)?,
                guardian_contact: r.get(4)?,
                guardian_email: r.get(5)?,
                academic_year: r.get(6)?,
                term: r.get(7)?,
            })
        })
        .with_context(|| format!("Student #{} not found", id))?;
    Ok(s)
}

/// Commands accept a student by numeric id or by exact name.
pub fn student_for_ref(conn: &Connection, sref: &str) -> Result<Student> {
    let sref = sref.trim();
    let id = match sref.parse::<i64>() {
        Ok(id) => id,
        Err(_) => id_for_student(conn, sref)?,
    };
    student_by_id(conn, id)
}

// Settings

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn get_currency(conn: &Connection) -> Result<String> {
    Ok(get_setting(conn, "currency")?.unwrap_or_else(|| "GHS".to_string()))
}

pub fn get_school_name(conn: &Connection) -> Result<String> {
    Ok(get_setting(conn, "school_name")?.unwrap_or_else(|| "School".to_string()))
}

pub fn get_sender_id(conn: &Connection) -> Result<String> {
    Ok(get_setting(conn, "sms_sender_id")?.unwrap_or_else(|| "Feeclip".to_string()))
}

pub fn wallet_policy(conn: &Connection) -> Result<WalletPolicy> {
    let mut policy = WalletPolicy::default();
    if let Some(v) = get_setting(conn, "min_topup")? {
        policy.min_topup = v
            .parse::<Decimal>()
            .with_context(|| format!("Invalid min_topup setting '{}'", v))?;
    }
    if let Some(v) = get_setting(conn, "min_sms_purchase")? {
        policy.min_sms_purchase = v
            .parse::<i64>()
            .with_context(|| format!("Invalid min_sms_purchase setting '{}'", v))?;
    }
    if let Some(v) = get_setting(conn, "sms_unit_price")? {
        policy.sms_unit_price = v
            .parse::<Decimal>()
            .with_context(|| format!("Invalid sms_unit_price setting '{}'", v))?;
    }
    Ok(policy)
}

// Row fetchers shared by commands and the resolver cache

pub fn fetch_assignments(conn: &Connection, year: &str, term: &str) -> Result<Vec<FeeAssignment>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, academic_year, term, fee_type, amount, level
         FROM fee_structures WHERE academic_year=?1 AND term=?2
         ORDER BY fee_type",
    )?;
    let mut rows = stmt.query(params![year, term])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let amount_s: String = r.get(4)?;
        out.push(FeeAssignment {
            id: r.get(0)?,
            academic_year: r.get(1)?,
            term: r.get(2)?,
            fee_type: r.get(3)?,
            amount: amount_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid amount '{}' in fee_structures", amount_s))?,
            level: r.get(5)?,
        });
    }
    Ok(out)
}

pub fn fetch_students(conn: &Connection, class: Option<&str>) -> Result<Vec<Student>> {
    let mut sql = String::from(
        "SELECT id, name, class, guardian_name, guardian_contact, guardian_email, academic_year, term
         FROM students",
    );
    if class.is_some() {
        sql.push_str(" WHERE class=?1");
    }
    sql.push_str(" ORDER BY class, name");
    let mut stmt = conn.prepare(&sql)?;
    let map_row = |r: &rusqlite::Row| -> rusqlite::Result<Student> {
        Ok(Student {
            id: r.get(0)?,
            name: r.get(1)?,
            class: r.get(2)?,
            guardian_name: r.get(3)?,
            guardian_contact: r.get(4)?,
            guardian_email: r.get(5)?,
            academic_year: r.get(6)?,
            term: r.get(7)?,
        })
    };
    let students = if let Some(c) = class {
        stmt.query_map(params![c], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
    } else {
        stmt.query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };
    Ok(students)
}

pub fn fetch_payments_for_student(conn: &Connection, student_id: i64) -> Result<Vec<Payment>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, student_id, reference, amount, method, fee_type, term, academic_year, date
         FROM payments WHERE student_id=?1 ORDER BY date, id",
    )?;
    let mut rows = stmt.query(params![student_id])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let amount_s: String = r.get(3)?;
        let date_s: String = r.get(8)?;
        out.push(Payment {
            id: r.get(0)?,
            student_id: r.get(1)?,
            reference: r.get(2)?,
            amount: amount_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid amount '{}' in payments", amount_s))?,
            method: r.get(4)?,
            fee_type: r.get(5)?,
            term: r.get(6)?,
            academic_year: r.get(7)?,
            date: parse_date(&date_s)
                .with_context(|| format!("Invalid payment date '{}'", date_s))?,
        });
    }
    Ok(out)
}

// Fee summary cache, keyed per (database, student, year, term). Entries are
// stamped with a process-wide generation counter plus SQLite's data_version
// so both local mutations and foreign-connection writes force a recompute.

type CacheKey = (String, i64, String, String);
static SUMMARY_CACHE: Lazy<Mutex<HashMap<CacheKey, (i64, i64, FeeSummary)>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
static SUMMARY_GENERATION: std::sync::atomic::AtomicI64 = std::sync::atomic::AtomicI64::new(0);

fn data_version(conn: &Connection) -> Result<i64> {
    let v: i64 = conn.query_row("PRAGMA data_version", [], |r| r.get(0))?;
    Ok(v)
}

/// Bump the generation after any Payment or FeeAssignment mutation so cached
/// summaries touching the changed rows are recomputed.
pub fn invalidate_summary_cache() {
    SUMMARY_GENERATION.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    SUMMARY_CACHE.lock().unwrap().clear();
}

fn compute_summary(conn: &Connection, student: &Student) -> Result<FeeSummary> {
    let assignments = fetch_assignments(conn, &student.academic_year, &student.term)?;
    let payments = fetch_payments_for_student(conn, student.id)?;
    let ctx = FeeContext::new(&student.academic_year, &student.term, &student.class);
    Ok(ledger::resolve(&assignments, &payments, &ctx))
}

/// Resolve a student's fee position, serving a cached summary when nothing
/// relevant changed since it was computed.
pub fn resolve_student(conn: &Connection, student: &Student) -> Result<FeeSummary> {
    let db = conn.path().unwrap_or_default().to_string();
    if db.is_empty() {
        // in-memory databases have no identifying path to key on
        return compute_summary(conn, student);
    }
    let key = (
        db,
        student.id,
        student.academic_year.clone(),
        student.term.clone(),
    );
    let stamp = (
        SUMMARY_GENERATION.load(std::sync::atomic::Ordering::SeqCst),
        data_version(conn)?,
    );
    if let Some((r#gen, dv, cached)) = SUMMARY_CACHE.lock().unwrap().get(&key) {
        if (*r#gen, *dv) == stamp {
            return Ok(cached.clone());
        }
    }
    let summary = compute_summary(conn, student)?;
    SUMMARY_CACHE
        .lock()
        .unwrap()
        .insert(key, (stamp.0, stamp.1, summary.clone()));
    Ok(summary)
}

/// Substitute `{placeholder}` tokens in a message body. Unknown placeholders
/// are left as-is so typos stay visible in previews.
pub fn render_placeholders(body: &str, vars: &HashMap<&str, String>) -> String {
    static PLACEHOLDER_RE: Lazy<regex::Regex> =
        Lazy::new(|| regex::Regex::new(r"\{([a-z_]+)\}").unwrap());
    PLACEHOLDER_RE
        .replace_all(body, |caps: &regex::Captures| {
            match vars.get(&caps[1]) {
                Some(v) => v.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// The standard placeholder set for student-facing messages.
pub fn student_vars(
    conn: &Connection,
    student: &Student,
    summary: &FeeSummary,
) -> Result<HashMap<&'static str, String>> {
    let ccy = get_currency(conn)?;
    let mut vars: HashMap<&'static str, String> = HashMap::new();
    vars.insert("student_name", student.name.clone());
    vars.insert(
        "guardian_name",
        student
            .guardian_name
            .clone()
            .unwrap_or_else(|| "Guardian".to_string()),
    );
    vars.insert("class", student.class.clone());
    vars.insert("term", student.term.clone());
    vars.insert("academic_year", student.academic_year.clone());
    vars.insert("total_fees", fmt_money(&summary.total_fees, &ccy));
    vars.insert("paid_amount", fmt_money(&summary.paid_amount, &ccy));
    vars.insert("balance", fmt_money(&summary.balance, &ccy));
    vars.insert("status", summary.status.to_string());
    vars.insert("school_name", get_school_name(conn)?);
    Ok(vars)
}

// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::wallet::{apply_and_persist, read_wallet};
use crate::models::{PaymentStatus, SmsLog};
use crate::utils::{
    fetch_students, get_sender_id, get_setting, http_client, maybe_print_json, pretty_table,
    render_placeholders, resolve_student, student_vars,
};
use crate::wallet::{WalletError, WalletOp};
use anyhow::Result;
use rusqlite::{params, Connection};
use serde_json::json;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("send", sub)) => send(conn, sub)?,
        Some(("bulk", sub)) => bulk(conn, sub)?,
        Some(("logs", sub)) => logs(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Hand the message to the configured gateway. With no gateway configured
/// the message is only logged locally and counts as delivered.
fn dispatch(conn: &Connection, to: &str, message: &str) -> Result<bool> {
    let url = match get_setting(conn, "sms_gateway_url")? {
        Some(u) => u,
        None => return Ok(true),
    };
    let client = http_client()?;
    let mut req = client.post(&url).json(&json!({
        "sender": get_sender_id(conn)?,
        "recipient": to,
        "message": message,
    }));
    if let Some(key) = get_setting(conn, "sms_gateway_api_key")? {
        req = req.header("api-key", key);
    }
    match req.send() {
        Ok(resp) => Ok(resp.status().is_success()),
        Err(_) => Ok(false),
    }
}

/// Send one message: check units, dispatch, then debit one unit and log in
/// the same breath. Units are only debited for messages the gateway took.
pub fn send_one(conn: &mut Connection, to: &str, message: &str, reason: &str) -> Result<()> {
    let account = read_wallet(conn)?;
    if account.sms_units < 1 {
        return Err(WalletError::InsufficientUnits {
            needed: 1,
            available: account.sms_units,
        }
        .into());
    }
    let delivered = dispatch(conn, to, message)?;
    if delivered {
        apply_and_persist(
            conn,
            &WalletOp::DebitSms {
                count: 1,
                reason: reason.to_string(),
            },
        )?;
    }
    conn.execute(
        "INSERT INTO sms_logs(recipient, message, status, units_used) VALUES (?1, ?2, ?3, ?4)",
        params![
            to,
            message,
            if delivered { "sent" } else { "failed" },
            if delivered { 1 } else { 0 }
        ],
    )?;
    if !delivered {
        return Err(anyhow::anyhow!("Gateway rejected SMS to {}", to));
    }
    Ok(())
}

fn send(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let to = sub.get_one::<String>("to").unwrap().trim().to_string();
    let message = sub.get_one::<String>("message").unwrap().trim().to_string();
    send_one(conn, &to, &message, &format!("SMS sent to {}", to))?;
    println!("Sent SMS to {}", to);
    Ok(())
}

fn bulk(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let message = sub.get_one::<String>("message").unwrap().to_string();
    let class = sub.get_one::<String>("class").map(|s| s.trim().to_string());
    let status_filter = match sub.get_one::<String>("status") {
        Some(s) => Some(
            PaymentStatus::parse(s.trim())
                .ok_or_else(|| anyhow::anyhow!("Invalid payment status '{}'", s.trim()))?,
        ),
        None => None,
    };

    let students = fetch_students(conn, class.as_deref())?;
    let mut sent = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;
    for student in &students {
        let summary = resolve_student(conn, student)?;
        if let Some(want) = status_filter {
            if summary.status != want {
                continue;
            }
        }
        let contact = match student.guardian_contact.clone() {
            Some(c) => c,
            None => {
                skipped += 1;
                continue;
            }
        };
        if read_wallet(conn)?.sms_units < 1 {
            eprintln!("Out of SMS units after {} message(s); stopping.", sent);
            break;
        }
        let vars = student_vars(conn, student, &summary)?;
        let body = render_placeholders(&message, &vars);
        match send_one(
            conn,
            &contact,
            &body,
            &format!("Bulk SMS to {}", student.name),
        ) {
            Ok(()) => sent += 1,
            Err(_) => failed += 1,
        }
    }
    println!(
        "Bulk SMS done: {} sent, {} failed, {} without contact",
        sent, failed, skipped
    );
    Ok(())
}

fn logs(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let limit = *sub.get_one::<usize>("limit").unwrap_or(&50) as i64;
    let mut stmt = conn.prepare(
        "SELECT id, date, recipient, message, status, units_used FROM sms_logs ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |r| {
        Ok(SmsLog {
            id: r.get(0)?,
            date: r.get(1)?,
            recipient: r.get(2)?,
            message: r.get(3)?,
            status: r.get(4)?,
            units_used: r.get(5)?,
        })
    })?;
    let mut logs = Vec::new();
    for row in rows {
        logs.push(row?);
    }
    if !maybe_print_json(json_flag, jsonl_flag, &logs)? {
        let data: Vec<Vec<String>> = logs
            .into_iter()
            .map(|l| {
                vec![
                    l.date,
                    l.recipient,
                    l.status,
                    l.units_used.to_string(),
                    l.message,
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Date", "Recipient", "Status", "Units", "Message"], data)
        );
    }
    Ok(())
}

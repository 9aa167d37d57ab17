// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{
    get_currency, get_school_name, get_sender_id, get_setting, parse_decimal, pretty_table,
    set_setting, wallet_policy,
};
use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set-school", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            set_setting(conn, "school_name", name)?;
            println!("School name set to '{}'", name);
        }
        Some(("set-currency", sub)) => {
            let ccy = sub.get_one::<String>("currency").unwrap().trim().to_uppercase();
            set_setting(conn, "currency", &ccy)?;
            println!("Currency set to {}", ccy);
        }
        Some(("set-sender", sub)) => {
            let sender = sub.get_one::<String>("sender").unwrap().trim();
            // GSM alphanumeric sender ids cap at 11 characters
            if sender.is_empty() || sender.len() > 11 {
                return Err(anyhow::anyhow!(
                    "Sender id must be 1-11 characters, got '{}'",
                    sender
                ));
            }
            set_setting(conn, "sms_sender_id", sender)?;
            println!("SMS sender id set to '{}'", sender);
        }
        Some(("set-sms-price", sub)) => {
            let price = parse_decimal(sub.get_one::<String>("price").unwrap().trim())?;
            if price <= Decimal::ZERO {
                return Err(anyhow::anyhow!("SMS unit price must be positive"));
            }
            set_setting(conn, "sms_unit_price", &price.to_string())?;
            println!("SMS unit price set to {}", price);
        }
        Some(("set-min-topup", sub)) => {
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap().trim())?;
            if amount <= Decimal::ZERO {
                return Err(anyhow::anyhow!("Minimum top-up must be positive"));
            }
            set_setting(conn, "min_topup", &amount.to_string())?;
            println!("Minimum top-up set to {}", amount);
        }
        Some(("set-min-purchase", sub)) => {
            let units: i64 = sub
                .get_one::<String>("units")
                .unwrap()
                .trim()
                .parse()
                .context("Invalid unit count")?;
            if units <= 0 {
                return Err(anyhow::anyhow!("Minimum purchase must be positive"));
            }
            set_setting(conn, "min_sms_purchase", &units.to_string())?;
            println!("Minimum SMS purchase set to {} units", units);
        }
        Some(("set-gateway", sub)) => {
            let url = sub.get_one::<String>("url").unwrap().trim();
            set_setting(conn, "sms_gateway_url", url)?;
            if let Some(key) = sub.get_one::<String>("api-key") {
                set_setting(conn, "sms_gateway_api_key", key.trim())?;
            }
            println!("SMS gateway set to {}", url);
        }
        Some(("show", _)) => {
            let policy = wallet_policy(conn)?;
            let rows = vec![
                vec!["school_name".into(), get_school_name(conn)?],
                vec!["currency".into(), get_currency(conn)?],
                vec!["sms_sender_id".into(), get_sender_id(conn)?],
                vec!["sms_unit_price".into(), policy.sms_unit_price.to_string()],
                vec!["min_topup".into(), policy.min_topup.to_string()],
                vec![
                    "min_sms_purchase".into(),
                    policy.min_sms_purchase.to_string(),
                ],
                vec![
                    "sms_gateway_url".into(),
                    get_setting(conn, "sms_gateway_url")?.unwrap_or_else(|| "(not set)".into()),
                ],
            ];
            println!("{}", pretty_table(&["Setting", "Value"], rows));
        }
        _ => {}
    }
    Ok(())
}

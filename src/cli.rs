// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{value_parser, Arg, ArgAction, Command};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

fn req(name: &'static str) -> Arg {
    Arg::new(name).long(name).required(true)
}

fn opt(name: &'static str) -> Arg {
    Arg::new(name).long(name)
}

pub fn build_cli() -> Command {
    Command::new("feeclip")
        .about("School fee tracking, payment receipts, SMS wallet, and reporting")
        .version(clap::crate_version!())
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("student")
                .about("Manage students")
                .subcommand(
                    Command::new("add")
                        .about("Register a student")
                        .arg(req("name"))
                        .arg(req("class"))
                        .arg(req("year").help("Academic year, e.g. 2025/2026"))
                        .arg(req("term").help("Term, e.g. Term 1"))
                        .arg(opt("guardian-name"))
                        .arg(opt("guardian-contact"))
                        .arg(opt("guardian-email")),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .about("List students with derived balances")
                        .arg(opt("class")),
                ))
                .subcommand(
                    Command::new("show")
                        .about("Show one student with fee breakdown")
                        .arg(req("student").help("Student id or exact name")),
                )
                .subcommand(
                    Command::new("promote")
                        .about("Move a student to a new academic year and term")
                        .arg(req("student"))
                        .arg(req("year"))
                        .arg(req("term")),
                )
                .subcommand(
                    Command::new("rm")
                        .about("Remove a student and their payments")
                        .arg(req("student")),
                ),
        )
        .subcommand(
            Command::new("fees")
                .about("Manage the fee structure")
                .subcommand(
                    Command::new("set")
                        .about("Create a fee assignment for a (year, term, level)")
                        .arg(req("year"))
                        .arg(req("term"))
                        .arg(req("fee-type"))
                        .arg(req("amount"))
                        .arg(opt("level").default_value("All")),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .about("List fee assignments")
                        .arg(opt("year"))
                        .arg(opt("term")),
                ))
                .subcommand(Command::new("rm").about("Delete a fee assignment").arg(req("id")))
                .subcommand(json_flags(
                    Command::new("summary")
                        .about("Total configured fees for a term")
                        .arg(req("year"))
                        .arg(req("term"))
                        .arg(opt("level")),
                )),
        )
        .subcommand(
            Command::new("payment")
                .about("Record and list payments")
                .subcommand(
                    Command::new("add")
                        .about("Record a payment against a student")
                        .arg(req("student").help("Student id or exact name"))
                        .arg(req("amount"))
                        .arg(req("method").help("Cash, Mobile Money, Bank, ..."))
                        .arg(req("fee-type"))
                        .arg(opt("date").help("YYYY-MM-DD, defaults to today"))
                        .arg(opt("reference").help("Receipt reference, generated when omitted"))
                        .arg(
                            Arg::new("sms")
                                .long("sms")
                                .action(ArgAction::SetTrue)
                                .help("Send an SMS receipt to the guardian after recording"),
                        ),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .about("List payments")
                        .arg(opt("student"))
                        .arg(opt("month").help("YYYY-MM"))
                        .arg(opt("method"))
                        .arg(
                            opt("limit")
                                .value_parser(value_parser!(usize))
                                .help("Most recent N payments"),
                        ),
                )),
        )
        .subcommand(
            Command::new("wallet")
                .about("Prepaid SMS wallet")
                .subcommand(
                    Command::new("topup")
                        .about("Top up the wallet balance")
                        .arg(req("amount"))
                        .arg(req("method")),
                )
                .subcommand(
                    Command::new("buy-sms")
                        .about("Purchase SMS units from the wallet balance")
                        .arg(req("units")),
                )
                .subcommand(json_flags(
                    Command::new("status").about("Current balance and SMS units"),
                ))
                .subcommand(json_flags(
                    Command::new("history")
                        .about("Wallet transaction history")
                        .arg(opt("limit").value_parser(value_parser!(usize))),
                )),
        )
        .subcommand(
            Command::new("sms")
                .about("Send notifications")
                .subcommand(
                    Command::new("send")
                        .about("Send one SMS")
                        .arg(req("to"))
                        .arg(req("message")),
                )
                .subcommand(
                    Command::new("bulk")
                        .about("Message guardians, filtered by status and class")
                        .arg(req("message").help("Body with {placeholders}"))
                        .arg(opt("status").help("Unpaid, Partial or Paid"))
                        .arg(opt("class")),
                )
                .subcommand(json_flags(
                    Command::new("logs")
                        .about("Sent-message history")
                        .arg(opt("limit").value_parser(value_parser!(usize))),
                )),
        )
        .subcommand(
            Command::new("template")
                .about("Reusable message templates")
                .subcommand(
                    Command::new("add")
                        .about("Create a template")
                        .arg(req("code"))
                        .arg(req("subject"))
                        .arg(req("body").help("Body with {placeholders}")),
                )
                .subcommand(Command::new("list").about("List templates"))
                .subcommand(Command::new("rm").about("Delete a template").arg(req("code")))
                .subcommand(
                    Command::new("render")
                        .about("Preview a template for a student")
                        .arg(req("code"))
                        .arg(req("student")),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Tabular reports")
                .subcommand(json_flags(
                    Command::new("collection")
                        .about("Amounts collected per month, with method breakdown")
                        .arg(opt("month").help("YYYY-MM")),
                ))
                .subcommand(json_flags(
                    Command::new("outstanding")
                        .about("Per-student outstanding balances")
                        .arg(opt("class")),
                ))
                .subcommand(json_flags(
                    Command::new("status-summary")
                        .about("Paid/Partial/Unpaid counts per class"),
                )),
        )
        .subcommand(
            Command::new("export")
                .about("Export data")
                .subcommand(
                    Command::new("payments")
                        .about("Export payments")
                        .arg(req("format").help("csv|json"))
                        .arg(req("out")),
                )
                .subcommand(
                    Command::new("students")
                        .about("Export students")
                        .arg(req("format").help("csv|json"))
                        .arg(req("out")),
                ),
        )
        .subcommand(
            Command::new("import").about("Import data").subcommand(
                Command::new("students")
                    .about("Import students from CSV")
                    .arg(req("path")),
            ),
        )
        .subcommand(Command::new("doctor").about("Data integrity checks"))
        .subcommand(
            Command::new("config")
                .about("School and wallet settings")
                .subcommand(Command::new("set-school").arg(req("name")))
                .subcommand(Command::new("set-currency").arg(req("currency")))
                .subcommand(Command::new("set-sender").arg(req("sender")))
                .subcommand(Command::new("set-sms-price").arg(req("price")))
                .subcommand(Command::new("set-min-topup").arg(req("amount")))
                .subcommand(Command::new("set-min-purchase").arg(req("units")))
                .subcommand(
                    Command::new("set-gateway")
                        .arg(req("url"))
                        .arg(opt("api-key")),
                )
                .subcommand(Command::new("show").about("Print current settings")),
        )
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, command};

fn value(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id).long(id).help(help)
}

fn required(id: &'static str, help: &'static str) -> Arg {
    value(id, help).required(true)
}

fn flag(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id).long(id).action(ArgAction::SetTrue).help(help)
}

fn json() -> Arg {
    flag("json", "Print JSON instead of a table")
}

fn output_flags() -> [Arg; 2] {
    [json(), flag("jsonl", "Print one JSON object per line")]
}

fn db_arg() -> Arg {
    Arg::new("db")
        .long("db")
        .value_name("PATH")
        .global(true)
        .help("SQLite database file (default: $BUDGETDESK_DB or the platform data dir)")
}

fn company_cmd() -> Command {
    Command::new("company")
        .about("Manage companies")
        .subcommand_required(true)
        .subcommand(Command::new("add").arg(required("name", "Company name")))
        .subcommand(Command::new("list").args(output_flags()))
        .subcommand(
            Command::new("rename")
                .arg(required("company", "Company id or name"))
                .arg(required("name", "New name")),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete companies; refused while entries reference them")
                .arg(required("company", "Company id or name").action(ArgAction::Append))
                .arg(json()),
        )
}

fn category_cmd() -> Command {
    Command::new("category")
        .about("Manage income and expense categories")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(required("name", "Category name"))
                .arg(required("type", "INCOME or EXPENSE")),
        )
        .subcommand(
            Command::new("list")
                .arg(value("type", "Only INCOME or EXPENSE"))
                .args(output_flags()),
        )
        .subcommand(
            Command::new("rename")
                .arg(required("category", "Category id or name"))
                .arg(required("name", "New name")),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete categories; refused while entries reference them")
                .arg(required("category", "Category id or name").action(ArgAction::Append))
                .arg(json()),
        )
}

fn entry_cmd() -> Command {
    Command::new("entry")
        .about("Record budget and actual amounts")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(required("company", "Company id or name"))
                .arg(required("category", "Category id or name"))
                .arg(required("month", "Month 1-12"))
                .arg(required("year", "Year"))
                .arg(value("budget", "Budgeted amount"))
                .arg(value("actual", "Actual amount"))
                .arg(value("description", "Free text"))
                .arg(value("repeat", "Create this many consecutive months")),
        )
        .subcommand(
            Command::new("list")
                .arg(value("type", "INCOME or EXPENSE"))
                .arg(value("company", "Company id or name"))
                .arg(value("category", "Category id or name"))
                .arg(value("year", "Year"))
                .arg(value("month", "Month 1-12"))
                .args(output_flags()),
        )
        .subcommand(
            Command::new("edit")
                .arg(required("id", "Entry id"))
                .arg(value("budget", "Budgeted amount"))
                .arg(value("actual", "Actual amount"))
                .arg(value("description", "Free text; empty clears it")),
        )
        .subcommand(
            Command::new("rm")
                .arg(required("id", "Entry id").action(ArgAction::Append))
                .arg(json()),
        )
        .subcommand(Command::new("dup").arg(required("id", "Entry id")))
        .subcommand(
            Command::new("master")
                .about("Companies and categories available for entries")
                .arg(json()),
        )
}

fn dashboard_cmd() -> Command {
    Command::new("dashboard")
        .about("Totals, monthly trend and top distributions for a year")
        .arg(value("company", "Company id or name"))
        .arg(value("category", "Category id or name"))
        .arg(value("month", "Month 1-12"))
        .arg(value("year", "Year (default: current)"))
        .arg(json())
}

fn cashflow_cmd() -> Command {
    Command::new("cashflow")
        .about("Monthly budget vs actual for income and expense")
        .arg(value("year", "Year (default: current)"))
        .arg(value("company", "Company id or name"))
        .args(output_flags())
}

fn report_cmd() -> Command {
    Command::new("report")
        .about("Yearly breakdowns by category and company")
        .arg(value("year", "Year (default: current)"))
        .arg(json())
}

fn customer_fields(cmd: Command) -> Command {
    cmd.arg(value("email", "Email"))
        .arg(value("phone", "Phone"))
        .arg(value("address", "Address"))
        .arg(value("industry", "Industry"))
        .arg(value("status", "ACTIVE, LEAD or INACTIVE"))
        .arg(value("notes", "Notes"))
        .arg(value("company", "Linked company id or name"))
}

fn customer_cmd() -> Command {
    Command::new("customer")
        .about("Manage CRM customers")
        .subcommand_required(true)
        .subcommand(customer_fields(
            Command::new("add").arg(required("name", "Customer name")),
        ))
        .subcommand(
            Command::new("list")
                .arg(value("status", "ACTIVE, LEAD or INACTIVE"))
                .arg(value("company", "Company id or name"))
                .arg(value("search", "Match name, email or phone"))
                .args(output_flags()),
        )
        .subcommand(
            Command::new("show")
                .arg(required("id", "Customer id"))
                .arg(json()),
        )
        .subcommand(customer_fields(
            Command::new("edit")
                .arg(required("id", "Customer id"))
                .arg(value("name", "Customer name"))
                .arg(
                    Arg::new("no_company")
                        .long("no-company")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("company")
                        .help("Detach from its company"),
                ),
        ))
        .subcommand(
            Command::new("rm")
                .about("Delete a customer with its contacts, deals and activities")
                .arg(required("id", "Customer id"))
                .arg(json()),
        )
}

fn contact_cmd() -> Command {
    Command::new("contact")
        .about("Manage customer contacts")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(required("customer", "Customer id"))
                .arg(required("name", "Contact name"))
                .arg(value("email", "Email"))
                .arg(value("phone", "Phone"))
                .arg(value("title", "Job title")),
        )
        .subcommand(
            Command::new("list")
                .arg(required("customer", "Customer id"))
                .args(output_flags()),
        )
        .subcommand(
            Command::new("edit")
                .arg(required("id", "Contact id"))
                .arg(value("name", "Contact name"))
                .arg(value("email", "Email"))
                .arg(value("phone", "Phone"))
                .arg(value("title", "Job title")),
        )
        .subcommand(
            Command::new("rm")
                .arg(required("id", "Contact id"))
                .arg(json()),
        )
}

fn deal_fields(cmd: Command) -> Command {
    cmd.arg(value("value", "Deal value in its currency"))
        .arg(
            Arg::new("value_try")
                .long("value-try")
                .value_name("AMOUNT")
                .help("Deal value in TRY"),
        )
        .arg(value("stage", "LEAD, QUALIFIED, PROPOSAL, NEGOTIATION, WON or LOST"))
        .arg(value("probability", "Win probability 0-100"))
        .arg(
            Arg::new("close_date")
                .long("close-date")
                .value_name("YYYY-MM-DD")
                .help("Expected close date"),
        )
        .arg(
            Arg::new("last_contact")
                .long("last-contact")
                .value_name("YYYY-MM-DD")
                .help("Last contact date"),
        )
        .arg(value("notes", "Notes"))
        .arg(
            Arg::new("sales_rep")
                .long("sales-rep")
                .value_name("NAME")
                .help("Sales representative"),
        )
        .arg(
            Arg::new("deal_company")
                .long("deal-company")
                .value_name("NAME")
                .help("Selling company"),
        )
        .arg(
            Arg::new("product_category")
                .long("product-category")
                .value_name("NAME")
                .help("Product category"),
        )
        .arg(
            Arg::new("product_sub_category")
                .long("product-sub-category")
                .value_name("NAME")
                .help("Product sub-category"),
        )
        .arg(value("currency", "Currency code (default TRY)"))
        .arg(value("source", "Lead source"))
        .arg(
            Arg::new("lead_type")
                .long("lead-type")
                .value_name("TYPE")
                .help("Lead type"),
        )
        .arg(value("tag", "Tag"))
}

fn deal_cmd() -> Command {
    Command::new("deal")
        .about("Manage the sales pipeline")
        .subcommand_required(true)
        .subcommand(deal_fields(
            Command::new("add")
                .arg(required("customer", "Customer id"))
                .arg(required("title", "Deal title"))
                .arg(flag("stale", "Mark as a stale lead")),
        ))
        .subcommand(
            Command::new("list")
                .arg(value("stage", "Pipeline stage"))
                .arg(value("customer", "Customer id"))
                .args(output_flags()),
        )
        .subcommand(
            Command::new("show")
                .arg(required("id", "Deal id"))
                .arg(json()),
        )
        .subcommand(deal_fields(
            Command::new("edit")
                .arg(required("id", "Deal id"))
                .arg(value("title", "Deal title"))
                .arg(value("customer", "Move to another customer id"))
                .arg(value("stale", "true or false")),
        ))
        .subcommand(
            Command::new("stage")
                .about("Move a deal to another stage; WON sets 100%, LOST sets 0%")
                .arg(required("id", "Deal id"))
                .arg(required("stage", "Target stage")),
        )
        .subcommand(
            Command::new("rm")
                .arg(required("id", "Deal id"))
                .arg(json()),
        )
}

fn activity_cmd() -> Command {
    Command::new("activity")
        .about("Log calls, meetings, emails, notes and tasks")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .arg(required("type", "CALL, MEETING, EMAIL, NOTE or TASK"))
                .arg(required("title", "Title"))
                .arg(value("description", "Details"))
                .arg(value("date", "YYYY-MM-DD [HH:MM] (default: now)"))
                .arg(value("customer", "Customer id"))
                .arg(value("deal", "Deal id")),
        )
        .subcommand(
            Command::new("list")
                .arg(value("type", "Activity type"))
                .arg(value("customer", "Customer id"))
                .arg(value("deal", "Deal id"))
                .arg(value("completed", "true or false"))
                .args(output_flags()),
        )
        .subcommand(
            Command::new("edit")
                .arg(required("id", "Activity id"))
                .arg(value("type", "Activity type"))
                .arg(value("title", "Title"))
                .arg(value("description", "Details; empty clears it"))
                .arg(value("date", "YYYY-MM-DD [HH:MM]"))
                .arg(value("completed", "true or false")),
        )
        .subcommand(Command::new("toggle").arg(required("id", "Activity id")))
        .subcommand(
            Command::new("rm")
                .arg(required("id", "Activity id"))
                .arg(json()),
        )
}

fn settings_cmd() -> Command {
    Command::new("settings")
        .about("Display preferences")
        .subcommand_required(true)
        .subcommand(
            Command::new("currency")
                .about("Set the display currency")
                .arg(Arg::new("code").required(true).help("Three-letter code, e.g. TRY")),
        )
        .subcommand(Command::new("show").arg(json()))
}

pub fn build_cli() -> Command {
    command!()
        .name("budgetdesk")
        .about("Budget tracking and a small CRM on a local SQLite file")
        .arg(db_arg())
        .subcommand(Command::new("init").about("Create the database if missing"))
        .subcommand(company_cmd())
        .subcommand(category_cmd())
        .subcommand(entry_cmd())
        .subcommand(dashboard_cmd())
        .subcommand(cashflow_cmd())
        .subcommand(report_cmd())
        .subcommand(customer_cmd())
        .subcommand(contact_cmd())
        .subcommand(deal_cmd())
        .subcommand(activity_cmd())
        .subcommand(Command::new("crm").about("Pipeline and customer overview").arg(json()))
        .subcommand(settings_cmd())
}

pub fn build_forecast_cli() -> Command {
    Command::new("budgetdesk-forecast")
        .version(clap::crate_version!())
        .about("Project next year's budget entries from historical CSV actuals")
        .arg(db_arg())
        .arg(value("expenses", "CSV of expense rows: date,category,company,amount"))
        .arg(value("income", "CSV of income rows: date,category,company,amount"))
        .arg(required("year", "Year to project"))
        .arg(
            Arg::new("model")
                .long("model")
                .value_name("MODEL")
                .default_value("trend")
                .help("trend (regression + seasonality) or uplift (previous year +10%)"),
        )
        .arg(flag("replace", "Delete the year's pure budget rows first"))
        .arg(
            Arg::new("dry_run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Print projections without writing"),
        )
        .arg(json())
}

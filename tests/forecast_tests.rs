// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use budgetdesk::commands::forecast::{
    DEFAULT_CATEGORY, DEFAULT_COMPANY, ForecastModel, ForecastOptions, read_rows, run_forecast,
};
use budgetdesk::commands::{categories, companies, entries};
use budgetdesk::models::{CategoryType, EntryFilter, NewEntry};
use budgetdesk::{cli, db};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::io::Write;
use tempfile::NamedTempFile;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn csv_file(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,category,company,amount\n{}", body).unwrap();
    file.flush().unwrap();
    file
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}

fn opts(model: ForecastModel, replace: bool, dry_run: bool) -> ForecastOptions {
    ForecastOptions {
        year: 2026,
        model,
        replace,
        dry_run,
    }
}

#[test]
fn reader_fills_defaults_and_skips_bad_rows() {
    let file = csv_file(
        "2025-01-05,Rent,Landlord,100.50\n\
         not-a-date,Rent,Landlord,10\n\
         2025-02-05,,,20\n\
         2025-03-05,Fuel,Shell,abc",
    );
    let rows = read_rows(file.path()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].amount, Decimal::new(10050, 2));
    assert_eq!(rows[1].category, DEFAULT_CATEGORY);
    assert_eq!(rows[1].company, DEFAULT_COMPANY);
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(read_rows(&dir.path().join("nope.csv")).is_err());
}

#[test]
fn dry_run_writes_nothing() {
    let mut conn = setup();
    let rows = read_rows(
        csv_file("2025-01-10,Rent,Landlord,100\n2025-02-10,Rent,Landlord,200").path(),
    )
    .unwrap();
    let o = opts(ForecastModel::Trend, false, true);
    let out = run_forecast(&mut conn, &o, &rows, &[]).unwrap();
    assert_eq!(out.len(), 12);
    assert_eq!(count(&conn, "entries"), 0);
    assert_eq!(count(&conn, "companies"), 0);
    assert_eq!(count(&conn, "categories"), 0);
}

#[test]
fn trend_run_creates_master_data_and_budget_rows() {
    let mut conn = setup();
    let existing = categories::create_category(&conn, "Sales", CategoryType::Income).unwrap();
    let expenses = read_rows(
        csv_file(
            "2025-01-10,Rent,Landlord,100\n\
             2025-02-10,Rent,Landlord,200\n\
             2025-03-10,Rent,Landlord,300",
        )
        .path(),
    )
    .unwrap();
    let income = read_rows(csv_file("2025-06-01,Sales,Client,500").path()).unwrap();

    let out = run_forecast(
        &mut conn,
        &opts(ForecastModel::Trend, false, false),
        &expenses,
        &income,
    )
    .unwrap();
    assert_eq!(out.len(), 24);
    assert_eq!(count(&conn, "entries"), 24);
    assert_eq!(count(&conn, "companies"), 2);
    assert_eq!(count(&conn, "categories"), 2);

    let sales = entries::list_entries(
        &conn,
        &EntryFilter {
            category_id: Some(existing),
            ..EntryFilter::default()
        },
    )
    .unwrap();
    assert_eq!(sales.len(), 12);
    assert!(sales.iter().all(|e| e.year == 2026));
    assert!(sales.iter().all(|e| e.actual_amount.is_zero()));
    assert!(sales.iter().all(|e| e.budget_amount == Decimal::from(550)));
    assert_eq!(sales[0].description.as_deref(), Some("2026 forecast (trend)"));

    let rent = entries::list_entries(
        &conn,
        &EntryFilter {
            kind: Some(CategoryType::Expense),
            ..EntryFilter::default()
        },
    )
    .unwrap();
    assert!(rent.iter().all(|e| e.company == "Landlord"));
    assert!(rent.iter().all(|e| e.budget_amount > Decimal::ZERO));
}

#[test]
fn replace_removes_only_pure_budget_rows() {
    let mut conn = setup();
    let co = companies::create_company(&conn, "Acme").unwrap();
    let cat = categories::create_category(&conn, "Rent", CategoryType::Expense).unwrap();
    for (budget, actual) in [(100, 0), (100, 90), (0, 0)] {
        entries::create_entry(
            &mut conn,
            &NewEntry {
                company_id: co,
                category_id: cat,
                month: 1,
                year: 2026,
                budget_amount: Decimal::from(budget),
                actual_amount: Decimal::from(actual),
                description: None,
                repeat_count: 1,
            },
        )
        .unwrap();
    }

    let rows = read_rows(csv_file("2025-04-01,Rent,Acme,40").path()).unwrap();
    let o = opts(ForecastModel::Uplift, true, false);
    let out = run_forecast(&mut conn, &o, &rows, &[]).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].budget, Decimal::from(44));
    assert_eq!(out[0].month, 4);
    // (100, 90) and (0, 0) survive, plus the new April row
    assert_eq!(count(&conn, "entries"), 3);
    assert_eq!(count(&conn, "companies"), 1);
}

#[test]
fn without_replace_existing_rows_stay() {
    let mut conn = setup();
    let rows = read_rows(csv_file("2025-04-01,Rent,Acme,40").path()).unwrap();
    let o = opts(ForecastModel::Uplift, false, false);
    run_forecast(&mut conn, &o, &rows, &[]).unwrap();
    run_forecast(&mut conn, &o, &rows, &[]).unwrap();
    assert_eq!(count(&conn, "entries"), 2);
}

#[test]
fn forecast_cli_parses_flags() {
    let m = cli::build_forecast_cli().get_matches_from([
        "budgetdesk-forecast",
        "--expenses",
        "out.csv",
        "--year",
        "2026",
        "--model",
        "uplift",
        "--replace",
        "--dry-run",
    ]);
    assert_eq!(m.get_one::<String>("expenses").unwrap(), "out.csv");
    assert_eq!(m.get_one::<String>("model").unwrap(), "uplift");
    assert!(m.get_flag("replace"));
    assert!(m.get_flag("dry_run"));
    assert!(m.get_one::<String>("income").is_none());
}

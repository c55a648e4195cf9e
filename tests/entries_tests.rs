// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use budgetdesk::commands::{categories, companies, entries};
use budgetdesk::error::DataError;
use budgetdesk::models::{CategoryType, EntryFilter, EntryUpdate, NewEntry};
use budgetdesk::{cli, db};
use rusqlite::Connection;
use rust_decimal::Decimal;

struct Fixture {
    conn: Connection,
    company: i64,
    rent: i64,
    sales: i64,
}

fn setup() -> Fixture {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let company = companies::create_company(&conn, "Acme").unwrap();
    let rent = categories::create_category(&conn, "Rent", CategoryType::Expense).unwrap();
    let sales = categories::create_category(&conn, "Sales", CategoryType::Income).unwrap();
    Fixture {
        conn,
        company,
        rent,
        sales,
    }
}

fn new_entry(f: &Fixture, month: i32, year: i32, repeat_count: u32) -> NewEntry {
    NewEntry {
        company_id: f.company,
        category_id: f.rent,
        month,
        year,
        budget_amount: Decimal::new(150000, 2),
        actual_amount: Decimal::ZERO,
        description: Some("Office".into()),
        repeat_count,
    }
}

#[test]
fn recurring_entries_roll_into_next_year() {
    let mut f = setup();
    let input = new_entry(&f, 11, 2025, 3);
    let ids = entries::create_entry(&mut f.conn, &input).unwrap();
    assert_eq!(ids.len(), 3);

    let periods: Vec<(i32, i32, String)> = ids
        .iter()
        .map(|&id| {
            let e = entries::get_entry(&f.conn, id).unwrap();
            (e.month, e.year, e.description.unwrap())
        })
        .collect();
    assert_eq!(
        periods,
        vec![
            (11, 2025, "Office (1/3)".to_string()),
            (12, 2025, "Office (2/3)".to_string()),
            (1, 2026, "Office (3/3)".to_string()),
        ]
    );
}

#[test]
fn recurring_batch_is_all_or_nothing() {
    let mut f = setup();
    let mut input = new_entry(&f, 1, 2025, 2);
    input.category_id = 999;
    assert!(matches!(
        entries::create_entry(&mut f.conn, &input),
        Err(DataError::NotFound { .. })
    ));
    let n: i64 = f
        .conn
        .query_row("SELECT COUNT(*) FROM entries", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 0);
}

#[test]
fn invalid_input_is_rejected_before_writing() {
    let mut f = setup();
    let mut input = new_entry(&f, 13, 2025, 1);
    assert!(matches!(
        entries::create_entry(&mut f.conn, &input),
        Err(DataError::InvalidInput(_))
    ));
    input.month = 1;
    input.budget_amount = Decimal::from(-5);
    assert!(entries::create_entry(&mut f.conn, &input).is_err());
    input.budget_amount = Decimal::ZERO;
    input.repeat_count = 0;
    assert!(entries::create_entry(&mut f.conn, &input).is_err());
}

#[test]
fn recurring_batch_past_the_last_year_writes_nothing() {
    let mut f = setup();
    let input = new_entry(&f, 12, 2200, 2);
    assert!(matches!(
        entries::create_entry(&mut f.conn, &input),
        Err(DataError::InvalidInput(_))
    ));
    assert!(
        entries::list_entries(&f.conn, &EntryFilter::default())
            .unwrap()
            .is_empty()
    );
}

#[test]
fn duplicate_entries_per_period_are_allowed() {
    let mut f = setup();
    let input = new_entry(&f, 5, 2025, 1);
    entries::create_entry(&mut f.conn, &input).unwrap();
    entries::create_entry(&mut f.conn, &input).unwrap();
    let filter = EntryFilter {
        year: Some(2025),
        month: Some(5),
        ..EntryFilter::default()
    };
    assert_eq!(entries::list_entries(&f.conn, &filter).unwrap().len(), 2);
}

#[test]
fn duplicate_copies_amounts_and_marks_description() {
    let mut f = setup();
    let input = new_entry(&f, 6, 2025, 1);
    let id = entries::create_entry(&mut f.conn, &input).unwrap()[0];
    let copy_id = entries::duplicate_entry(&f.conn, id).unwrap();
    let copy = entries::get_entry(&f.conn, copy_id).unwrap();
    assert_ne!(copy_id, id);
    assert_eq!(copy.budget_amount, Decimal::new(150000, 2));
    assert_eq!(copy.month, 6);
    assert_eq!(copy.description.as_deref(), Some("Office (copy)"));
}

#[test]
fn update_changes_only_given_fields() {
    let mut f = setup();
    let input = new_entry(&f, 2, 2025, 1);
    let id = entries::create_entry(&mut f.conn, &input).unwrap()[0];
    entries::update_entry(
        &f.conn,
        id,
        &EntryUpdate {
            actual_amount: Some(Decimal::new(149950, 2)),
            description: Some("  ".into()),
            ..EntryUpdate::default()
        },
    )
    .unwrap();
    let e = entries::get_entry(&f.conn, id).unwrap();
    assert_eq!(e.budget_amount, Decimal::new(150000, 2));
    assert_eq!(e.actual_amount, Decimal::new(149950, 2));
    assert_eq!(e.description, None);
    assert!(e.variance().favorable);
}

#[test]
fn bulk_entry_delete_with_missing_id_keeps_everything() {
    let mut f = setup();
    let input = new_entry(&f, 1, 2025, 2);
    let ids = entries::create_entry(&mut f.conn, &input).unwrap();
    assert!(entries::delete_entries(&mut f.conn, &[ids[0], 12345]).is_err());
    assert!(entries::get_entry(&f.conn, ids[0]).is_ok());
    entries::delete_entries(&mut f.conn, &ids).unwrap();
    assert!(matches!(
        entries::get_entry(&f.conn, ids[1]),
        Err(DataError::NotFound { .. })
    ));
}

#[test]
fn list_filters_by_type_and_orders_newest_first() {
    let mut f = setup();
    let january = new_entry(&f, 1, 2025, 1);
    let march = new_entry(&f, 3, 2025, 1);
    entries::create_entry(&mut f.conn, &january).unwrap();
    entries::create_entry(&mut f.conn, &march).unwrap();
    let mut income = new_entry(&f, 2, 2025, 1);
    income.category_id = f.sales;
    entries::create_entry(&mut f.conn, &income).unwrap();

    let expense = entries::list_entries(
        &f.conn,
        &EntryFilter {
            kind: Some(CategoryType::Expense),
            ..EntryFilter::default()
        },
    )
    .unwrap();
    assert_eq!(expense.len(), 2);
    assert_eq!(expense[0].month, 3);
    assert!(expense.iter().all(|e| e.category == "Rent"));
}

#[test]
fn cli_add_with_repeat_and_names() {
    let mut f = setup();
    let matches = cli::build_cli().get_matches_from([
        "budgetdesk",
        "entry",
        "add",
        "--company",
        " Acme ",
        "--category",
        "Rent",
        "--month",
        "12",
        "--year",
        "2025",
        "--budget",
        " 99.90 ",
        "--repeat",
        "2",
    ]);
    if let Some(("entry", sub)) = matches.subcommand() {
        entries::handle(&mut f.conn, sub).unwrap();
    } else {
        panic!("entry command not parsed");
    }
    let all = entries::list_entries(&f.conn, &EntryFilter::default()).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!((all[0].month, all[0].year), (1, 2026));
    assert_eq!(all[1].budget_amount, Decimal::new(9990, 2));
    assert_eq!(all[1].description, None);
}

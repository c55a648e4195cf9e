// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use budgetdesk::commands::dashboard::{self, DashboardFilter};
use budgetdesk::commands::{cashflow, categories, companies, entries, reports};
use budgetdesk::models::{CategoryType, NewEntry};
use budgetdesk::{cli, db};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn add(
    conn: &mut Connection,
    company: i64,
    category: i64,
    month: i32,
    year: i32,
    budget: i64,
    actual: i64,
) -> i64 {
    entries::create_entry(
        conn,
        &NewEntry {
            company_id: company,
            category_id: category,
            month,
            year,
            budget_amount: Decimal::from(budget),
            actual_amount: Decimal::from(actual),
            description: None,
            repeat_count: 1,
        },
    )
    .unwrap()[0]
}

#[test]
fn cashflow_month_matches_worked_example() {
    let mut conn = setup();
    let co = companies::create_company(&conn, "Acme").unwrap();
    let sales = categories::create_category(&conn, "Sales", CategoryType::Income).unwrap();
    let rent = categories::create_category(&conn, "Rent", CategoryType::Expense).unwrap();
    add(&mut conn, co, sales, 1, 2025, 100, 120);
    add(&mut conn, co, rent, 1, 2025, 50, 40);

    let months = cashflow::cashflow(&conn, 2025, None).unwrap();
    assert_eq!(months.len(), 12);
    let jan = &months[0];
    assert_eq!(jan.income_budget, Decimal::from(100));
    assert_eq!(jan.income_actual, Decimal::from(120));
    assert_eq!(jan.expense_budget, Decimal::from(50));
    assert_eq!(jan.expense_actual, Decimal::from(40));
    assert_eq!(jan.net_actual(), Decimal::from(80));
    assert_eq!(jan.net_budget(), Decimal::from(50));
    assert!(jan.income_variance().favorable);
    assert!(jan.expense_variance().favorable);
}

#[test]
fn cashflow_can_be_scoped_to_a_company() {
    let mut conn = setup();
    let a = companies::create_company(&conn, "A").unwrap();
    let b = companies::create_company(&conn, "B").unwrap();
    let rent = categories::create_category(&conn, "Rent", CategoryType::Expense).unwrap();
    add(&mut conn, a, rent, 4, 2025, 10, 10);
    add(&mut conn, b, rent, 4, 2025, 30, 35);
    let only_b = cashflow::cashflow(&conn, 2025, Some(b)).unwrap();
    assert_eq!(only_b[3].expense_actual, Decimal::from(35));
    assert!(!only_b[3].expense_variance().favorable);
}

#[test]
fn dashboard_trend_sums_equal_totals() {
    let mut conn = setup();
    let co = companies::create_company(&conn, "Acme").unwrap();
    let sales = categories::create_category(&conn, "Sales", CategoryType::Income).unwrap();
    let rent = categories::create_category(&conn, "Rent", CategoryType::Expense).unwrap();
    for month in 1..=12 {
        add(&mut conn, co, sales, month, 2025, 100, 90 + month as i64);
        add(&mut conn, co, rent, month, 2025, 40, 35);
    }
    add(&mut conn, co, rent, 6, 2024, 999, 999);

    let data = dashboard::dashboard(
        &conn,
        &DashboardFilter {
            year: Some(2025),
            ..DashboardFilter::default()
        },
    )
    .unwrap();
    let s = &data.summary;
    let income: Decimal = s.trend.iter().map(|p| p.income).sum();
    let expense: Decimal = s.trend.iter().map(|p| p.expense).sum();
    assert_eq!(income, s.income.actual);
    assert_eq!(expense, s.expense.actual);
    assert_eq!(s.expense.actual, Decimal::from(420));
    assert_eq!(data.recent_entries.len(), dashboard::RECENT_ENTRIES);
    assert!(
        data.recent_entries
            .windows(2)
            .all(|w| w[0].id > w[1].id)
    );
}

#[test]
fn dashboard_distributions_are_capped() {
    let mut conn = setup();
    for i in 1..=10 {
        let co = companies::create_company(&conn, &format!("Co{:02}", i)).unwrap();
        let cat =
            categories::create_category(&conn, &format!("Cat{:02}", i), CategoryType::Expense)
                .unwrap();
        add(&mut conn, co, cat, 2, 2025, i * 100, i * 10);
    }
    let data = dashboard::dashboard(
        &conn,
        &DashboardFilter {
            year: Some(2025),
            month: Some(2),
            ..DashboardFilter::default()
        },
    )
    .unwrap();
    let s = &data.summary;
    assert_eq!(s.expense_categories.len(), 5);
    assert_eq!(s.company_budgets.len(), 6);
    assert_eq!(s.category_budgets.len(), 8);
    assert_eq!(s.expense_categories[0].name, "Cat10");
    assert_eq!(s.company_budgets[0].name, "Co10");
    assert!(
        s.company_budgets
            .windows(2)
            .all(|w| w[0].value >= w[1].value)
    );
}

#[test]
fn report_keeps_same_named_categories_apart() {
    let mut conn = setup();
    let co = companies::create_company(&conn, "Acme").unwrap();
    let other_in = categories::create_category(&conn, "Other", CategoryType::Income).unwrap();
    let other_out = categories::create_category(&conn, "Other", CategoryType::Expense).unwrap();
    add(&mut conn, co, other_in, 1, 2025, 10, 30);
    add(&mut conn, co, other_out, 1, 2025, 20, 25);

    let r = reports::report(&conn, 2025).unwrap();
    assert_eq!(r.budget_vs_actual.len(), 2);
    assert_eq!(r.budget_vs_actual[0].kind, CategoryType::Income);
    assert_eq!(r.income_by_company[0].value, Decimal::from(30));
    assert_eq!(r.expense_by_category[0].value, Decimal::from(25));
    assert_eq!(r.monthly_trend[0].income, Decimal::from(30));
}

#[test]
fn cli_dashboard_accepts_filters() {
    let conn = setup();
    companies::create_company(&conn, "Acme").unwrap();
    let matches = cli::build_cli().get_matches_from([
        "budgetdesk",
        "dashboard",
        "--year",
        "2025",
        "--company",
        "Acme",
        "--json",
    ]);
    if let Some(("dashboard", sub)) = matches.subcommand() {
        dashboard::handle(&conn, sub).unwrap();
    } else {
        panic!("dashboard command not parsed");
    }
}

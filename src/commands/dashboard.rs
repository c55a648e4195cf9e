// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::entries::query_entries;
use crate::error::DataResult;
use crate::models::{
    BudgetTotals, CategoryType, EntryDetail, EntryFilter, NamedValue, TrendPoint, empty_trend,
    month_slot,
};
use crate::utils::{
    category_ref, check_month, check_year, company_ref, current_year, get_currency, fmt_money,
    maybe_print_json, month_label, parse_month, parse_year, pretty_table, ranked,
};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

pub const TOP_EXPENSE_CATEGORIES: usize = 5;
pub const TOP_COMPANY_BUDGETS: usize = 6;
pub const TOP_CATEGORY_BUDGETS: usize = 8;
pub const RECENT_ENTRIES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardFilter {
    pub company_id: Option<i64>,
    pub category_id: Option<i64>,
    pub month: Option<i32>,
    /// Defaults to the current year.
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub income: BudgetTotals,
    pub expense: BudgetTotals,
    pub trend: Vec<TrendPoint>,
    /// Top expense categories by actual spend.
    pub expense_categories: Vec<NamedValue>,
    /// Top companies by expense budget.
    pub company_budgets: Vec<NamedValue>,
    /// Top expense categories by budget.
    pub category_budgets: Vec<NamedValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardData {
    pub year: i32,
    #[serde(flatten)]
    pub summary: DashboardSummary,
    pub recent_entries: Vec<EntryDetail>,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let filter = DashboardFilter {
        company_id: m
            .get_one::<String>("company")
            .map(|s| company_ref(conn, s))
            .transpose()?,
        category_id: m
            .get_one::<String>("category")
            .map(|s| category_ref(conn, s))
            .transpose()?,
        month: m.get_one::<String>("month").map(|s| parse_month(s)).transpose()?,
        year: m.get_one::<String>("year").map(|s| parse_year(s)).transpose()?,
    };
    let data = dashboard(conn, &filter)?;
    if maybe_print_json(m.get_flag("json"), false, &data)? {
        return Ok(());
    }

    let ccy = get_currency(conn)?;
    let s = &data.summary;
    println!("Dashboard {}", data.year);
    println!(
        "{}",
        pretty_table(
            &["", "Budget", "Actual"],
            vec![
                vec![
                    "Income".into(),
                    fmt_money(&s.income.budget, &ccy),
                    fmt_money(&s.income.actual, &ccy),
                ],
                vec![
                    "Expense".into(),
                    fmt_money(&s.expense.budget, &ccy),
                    fmt_money(&s.expense.actual, &ccy),
                ],
            ],
        )
    );
    let trend_rows = s
        .trend
        .iter()
        .map(|p| {
            vec![
                month_label(p.month as i32),
                format!("{:.2}", p.income),
                format!("{:.2}", p.budget_income),
                format!("{:.2}", p.expense),
                format!("{:.2}", p.budget_expense),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Month", "Income", "Income budget", "Expense", "Expense budget"],
            trend_rows,
        )
    );
    for (title, items) in [
        ("Top expense categories", &s.expense_categories),
        ("Expense budget by company", &s.company_budgets),
        ("Expense budget by category", &s.category_budgets),
    ] {
        let rows = items
            .iter()
            .map(|nv| vec![nv.name.clone(), format!("{:.2}", nv.value)])
            .collect();
        println!("{}", pretty_table(&[title, "Amount"], rows));
    }
    let recent = data
        .recent_entries
        .iter()
        .map(|e| {
            vec![
                e.id.to_string(),
                format!("{} {}", month_label(e.month), e.year),
                e.company.clone(),
                e.category.clone(),
                format!("{:.2}", e.actual_amount),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["ID", "Period", "Company", "Category", "Actual"], recent)
    );
    Ok(())
}

pub fn dashboard(conn: &Connection, filter: &DashboardFilter) -> DataResult<DashboardData> {
    let year = check_year(filter.year.unwrap_or_else(current_year))?;
    if let Some(m) = filter.month {
        check_month(m)?;
    }
    let entry_filter = EntryFilter {
        kind: None,
        company_id: filter.company_id,
        category_id: filter.category_id,
        year: Some(year),
        month: filter.month,
    };
    let entries = query_entries(conn, &entry_filter, "e.id", None)?;
    let recent_entries = query_entries(conn, &entry_filter, "e.id DESC", Some(RECENT_ENTRIES))?;
    Ok(DashboardData {
        year,
        summary: summarize(&entries),
        recent_entries,
    })
}

/// Single pass over already-filtered entries. Months outside 1-12 are left
/// out of the trend but still counted everywhere else.
pub fn summarize(entries: &[EntryDetail]) -> DashboardSummary {
    let mut income = BudgetTotals::default();
    let mut expense = BudgetTotals::default();
    let mut trend = empty_trend();
    let mut spend_by_category: HashMap<String, Decimal> = HashMap::new();
    let mut budget_by_company: HashMap<String, Decimal> = HashMap::new();
    let mut budget_by_category: HashMap<String, Decimal> = HashMap::new();

    for e in entries {
        let slot = month_slot(e.month).map(|i| &mut trend[i]);
        match e.kind {
            CategoryType::Income => {
                income.budget += e.budget_amount;
                income.actual += e.actual_amount;
                if let Some(p) = slot {
                    p.income += e.actual_amount;
                    p.budget_income += e.budget_amount;
                }
            }
            CategoryType::Expense => {
                expense.budget += e.budget_amount;
                expense.actual += e.actual_amount;
                if let Some(p) = slot {
                    p.expense += e.actual_amount;
                    p.budget_expense += e.budget_amount;
                }
                *spend_by_category.entry(e.category.clone()).or_default() += e.actual_amount;
                *budget_by_company.entry(e.company.clone()).or_default() += e.budget_amount;
                *budget_by_category.entry(e.category.clone()).or_default() += e.budget_amount;
            }
        }
    }

    budget_by_company.retain(|_, v| *v > Decimal::ZERO);
    budget_by_category.retain(|_, v| *v > Decimal::ZERO);

    DashboardSummary {
        income,
        expense,
        trend,
        expense_categories: ranked(spend_by_category, Some(TOP_EXPENSE_CATEGORIES)),
        company_budgets: ranked(budget_by_company, Some(TOP_COMPANY_BUDGETS)),
        category_budgets: ranked(budget_by_category, Some(TOP_CATEGORY_BUDGETS)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        kind: CategoryType,
        month: i32,
        company: &str,
        category: &str,
        budget: i64,
        actual: i64,
    ) -> EntryDetail {
        EntryDetail {
            id: 0,
            company_id: 1,
            company: company.into(),
            category_id: 1,
            category: category.into(),
            kind,
            month,
            year: 2025,
            budget_amount: Decimal::from(budget),
            actual_amount: Decimal::from(actual),
            description: None,
        }
    }

    #[test]
    fn trend_sums_match_totals() {
        let entries = vec![
            entry(CategoryType::Income, 1, "A", "Sales", 100, 120),
            entry(CategoryType::Income, 3, "B", "Sales", 50, 40),
            entry(CategoryType::Expense, 3, "A", "Rent", 30, 30),
        ];
        let s = summarize(&entries);
        let trend_income: Decimal = s.trend.iter().map(|p| p.income).sum();
        let trend_expense: Decimal = s.trend.iter().map(|p| p.expense).sum();
        assert_eq!(trend_income, s.income.actual);
        assert_eq!(trend_expense, s.expense.actual);
        assert_eq!(s.trend.len(), 12);
        assert_eq!(s.trend[2].budget_income, Decimal::from(50));
    }

    #[test]
    fn out_of_range_month_only_counts_in_totals() {
        let entries = vec![entry(CategoryType::Expense, 13, "A", "Rent", 10, 7)];
        let s = summarize(&entries);
        assert_eq!(s.expense.actual, Decimal::from(7));
        assert!(s.trend.iter().all(|p| p.expense.is_zero()));
        assert_eq!(s.expense_categories[0].value, Decimal::from(7));
    }

    #[test]
    fn distributions_are_ranked_and_capped() {
        let entries: Vec<EntryDetail> = (1..=10)
            .map(|i| {
                entry(
                    CategoryType::Expense,
                    1,
                    &format!("Co{}", i),
                    &format!("Cat{}", i),
                    i * 10,
                    i,
                )
            })
            .collect();
        let s = summarize(&entries);
        assert_eq!(s.expense_categories.len(), TOP_EXPENSE_CATEGORIES);
        assert_eq!(s.company_budgets.len(), TOP_COMPANY_BUDGETS);
        assert_eq!(s.category_budgets.len(), TOP_CATEGORY_BUDGETS);
        assert_eq!(s.expense_categories[0].name, "Cat10");
        assert_eq!(s.company_budgets[0].value, Decimal::from(100));
        assert!(
            s.category_budgets
                .windows(2)
                .all(|w| w[0].value >= w[1].value)
        );
    }

    #[test]
    fn zero_budgets_are_dropped_from_budget_charts() {
        let entries = vec![
            entry(CategoryType::Expense, 2, "A", "Rent", 0, 5),
            entry(CategoryType::Income, 2, "B", "Sales", 100, 0),
        ];
        let s = summarize(&entries);
        assert!(s.company_budgets.is_empty());
        assert!(s.category_budgets.is_empty());
        assert_eq!(s.expense_categories.len(), 1);
    }
}

// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::entries::query_entries;
use crate::error::DataResult;
use crate::models::{
    BudgetTotals, CategoryType, EntryDetail, EntryFilter, NamedValue, TrendPoint, Variance,
    empty_trend, month_slot,
};
use crate::utils::{
    check_year, current_year, maybe_print_json, month_label, parse_year, pretty_table, ranked,
};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetVsActual {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryType,
    pub budget: Decimal,
    pub actual: Decimal,
}

impl BudgetVsActual {
    pub fn variance(&self) -> Variance {
        Variance::for_kind(self.kind, self.budget, self.actual)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    pub year: i32,
    pub monthly_trend: Vec<TrendPoint>,
    pub income_by_category: Vec<NamedValue>,
    pub expense_by_category: Vec<NamedValue>,
    pub income_by_company: Vec<NamedValue>,
    pub expense_by_company: Vec<NamedValue>,
    pub budget_vs_actual: Vec<BudgetVsActual>,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let year = match m.get_one::<String>("year") {
        Some(s) => parse_year(s)?,
        None => current_year(),
    };
    let data = report(conn, year)?;
    if maybe_print_json(m.get_flag("json"), false, &data)? {
        return Ok(());
    }

    println!("Report {}", data.year);
    let trend = data
        .monthly_trend
        .iter()
        .map(|p| {
            vec![
                month_label(p.month as i32),
                format!("{:.2}", p.income),
                format!("{:.2}", p.expense),
                format!("{:.2}", p.income - p.expense),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Month", "Income", "Expense", "Net"], trend)
    );
    for (title, items) in [
        ("Income by category", &data.income_by_category),
        ("Expense by category", &data.expense_by_category),
        ("Income by company", &data.income_by_company),
        ("Expense by company", &data.expense_by_company),
    ] {
        let rows = items
            .iter()
            .map(|nv| vec![nv.name.clone(), format!("{:.2}", nv.value)])
            .collect();
        println!("{}", pretty_table(&[title, "Actual"], rows));
    }
    let bva = data
        .budget_vs_actual
        .iter()
        .map(|r| {
            let v = r.variance();
            vec![
                r.name.clone(),
                r.kind.to_string(),
                format!("{:.2}", r.budget),
                format!("{:.2}", r.actual),
                crate::commands::entries::fmt_variance(&v),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Category", "Type", "Budget", "Actual", "Variance"], bva)
    );
    Ok(())
}

pub fn report(conn: &Connection, year: i32) -> DataResult<ReportData> {
    let filter = EntryFilter {
        year: Some(check_year(year)?),
        ..EntryFilter::default()
    };
    let entries = query_entries(conn, &filter, "e.id", None)?;
    Ok(fold_report(year, &entries))
}

/// Breakdowns use actual amounts; budget vs actual is keyed by category name
/// and type, summed across companies.
pub fn fold_report(year: i32, entries: &[EntryDetail]) -> ReportData {
    let mut trend = empty_trend();
    let mut income_by_category: HashMap<String, Decimal> = HashMap::new();
    let mut expense_by_category: HashMap<String, Decimal> = HashMap::new();
    let mut income_by_company: HashMap<String, Decimal> = HashMap::new();
    let mut expense_by_company: HashMap<String, Decimal> = HashMap::new();
    let mut bva: HashMap<(String, CategoryType), BudgetTotals> = HashMap::new();

    for e in entries {
        let slot = month_slot(e.month).map(|i| &mut trend[i]);
        let (by_category, by_company) = match e.kind {
            CategoryType::Income => {
                if let Some(p) = slot {
                    p.income += e.actual_amount;
                    p.budget_income += e.budget_amount;
                }
                (&mut income_by_category, &mut income_by_company)
            }
            CategoryType::Expense => {
                if let Some(p) = slot {
                    p.expense += e.actual_amount;
                    p.budget_expense += e.budget_amount;
                }
                (&mut expense_by_category, &mut expense_by_company)
            }
        };
        *by_category.entry(e.category.clone()).or_default() += e.actual_amount;
        *by_company.entry(e.company.clone()).or_default() += e.actual_amount;

        let totals = bva.entry((e.category.clone(), e.kind)).or_default();
        totals.budget += e.budget_amount;
        totals.actual += e.actual_amount;
    }

    let mut budget_vs_actual: Vec<BudgetVsActual> = bva
        .into_iter()
        .map(|((name, kind), t)| BudgetVsActual {
            name,
            kind,
            budget: t.budget,
            actual: t.actual,
        })
        .collect();
    budget_vs_actual.sort_by(|a, b| {
        b.actual
            .cmp(&a.actual)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.kind.cmp(&b.kind))
    });

    ReportData {
        year,
        monthly_trend: trend,
        income_by_category: ranked(income_by_category, None),
        expense_by_category: ranked(expense_by_category, None),
        income_by_company: ranked(income_by_company, None),
        expense_by_company: ranked(expense_by_company, None),
        budget_vs_actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        kind: CategoryType,
        company: &str,
        category: &str,
        budget: i64,
        actual: i64,
    ) -> EntryDetail {
        EntryDetail {
            id: 0,
            company_id: 0,
            company: company.into(),
            category_id: 0,
            category: category.into(),
            kind,
            month: 4,
            year: 2025,
            budget_amount: Decimal::from(budget),
            actual_amount: Decimal::from(actual),
            description: None,
        }
    }

    #[test]
    fn same_name_income_and_expense_stay_apart() {
        let entries = vec![
            entry(CategoryType::Income, "A", "Other", 10, 15),
            entry(CategoryType::Expense, "A", "Other", 20, 5),
            entry(CategoryType::Expense, "B", "Other", 20, 5),
        ];
        let r = fold_report(2025, &entries);
        assert_eq!(r.budget_vs_actual.len(), 2);
        assert_eq!(r.budget_vs_actual[0].kind, CategoryType::Income);
        assert_eq!(r.budget_vs_actual[0].actual, Decimal::from(15));
        assert_eq!(r.budget_vs_actual[1].budget, Decimal::from(40));
        assert_eq!(r.budget_vs_actual[1].actual, Decimal::from(10));
    }

    #[test]
    fn breakdowns_are_not_truncated() {
        let entries: Vec<EntryDetail> = (1..=15)
            .map(|i| entry(CategoryType::Expense, &format!("Co{}", i), &format!("Cat{}", i), 0, i))
            .collect();
        let r = fold_report(2025, &entries);
        assert_eq!(r.expense_by_category.len(), 15);
        assert_eq!(r.expense_by_company.len(), 15);
        assert_eq!(r.expense_by_category[0].value, Decimal::from(15));
        assert!(r.income_by_category.is_empty());
    }
}

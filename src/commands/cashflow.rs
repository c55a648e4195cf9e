// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::entries::{fmt_variance, query_entries};
use crate::error::DataResult;
use crate::models::{CategoryType, EntryDetail, EntryFilter, Variance, month_slot};
use crate::utils::{
    check_year, company_ref, current_year, maybe_print_json, month_label, parse_year,
    pretty_table,
};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CashflowMonth {
    pub month: u32,
    pub income_budget: Decimal,
    pub income_actual: Decimal,
    pub expense_budget: Decimal,
    pub expense_actual: Decimal,
}

impl CashflowMonth {
    pub fn net_budget(&self) -> Decimal {
        self.income_budget - self.expense_budget
    }

    pub fn net_actual(&self) -> Decimal {
        self.income_actual - self.expense_actual
    }

    pub fn income_variance(&self) -> Variance {
        Variance::for_kind(CategoryType::Income, self.income_budget, self.income_actual)
    }

    pub fn expense_variance(&self) -> Variance {
        Variance::for_kind(CategoryType::Expense, self.expense_budget, self.expense_actual)
    }
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let year = match m.get_one::<String>("year") {
        Some(s) => parse_year(s)?,
        None => current_year(),
    };
    let company_id = m
        .get_one::<String>("company")
        .map(|s| company_ref(conn, s))
        .transpose()?;
    let data = cashflow(conn, year, company_id)?;
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    let rows = data
        .iter()
        .map(|c| {
            vec![
                month_label(c.month as i32),
                format!("{:.2}", c.income_budget),
                format!("{:.2}", c.income_actual),
                fmt_variance(&c.income_variance()),
                format!("{:.2}", c.expense_budget),
                format!("{:.2}", c.expense_actual),
                fmt_variance(&c.expense_variance()),
                format!("{:.2}", c.net_budget()),
                format!("{:.2}", c.net_actual()),
            ]
        })
        .collect();
    println!("Cashflow {}", year);
    println!(
        "{}",
        pretty_table(
            &[
                "Month",
                "Income budget",
                "Income actual",
                "Income var",
                "Expense budget",
                "Expense actual",
                "Expense var",
                "Net budget",
                "Net actual",
            ],
            rows,
        )
    );
    Ok(())
}

pub fn cashflow(
    conn: &Connection,
    year: i32,
    company_id: Option<i64>,
) -> DataResult<Vec<CashflowMonth>> {
    let filter = EntryFilter {
        company_id,
        year: Some(check_year(year)?),
        ..EntryFilter::default()
    };
    let entries = query_entries(conn, &filter, "e.month, e.id", None)?;
    Ok(fold_cashflow(&entries))
}

/// Twelve months of budget and actual per side. Rows with an invalid month
/// are ignored.
pub fn fold_cashflow(entries: &[EntryDetail]) -> Vec<CashflowMonth> {
    let mut months: Vec<CashflowMonth> = (1..=12)
        .map(|month| CashflowMonth {
            month,
            ..CashflowMonth::default()
        })
        .collect();
    for e in entries {
        let Some(i) = month_slot(e.month) else {
            continue;
        };
        let slot = &mut months[i];
        match e.kind {
            CategoryType::Income => {
                slot.income_budget += e.budget_amount;
                slot.income_actual += e.actual_amount;
            }
            CategoryType::Expense => {
                slot.expense_budget += e.budget_amount;
                slot.expense_actual += e.actual_amount;
            }
        }
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variance_flags_follow_the_side() {
        let m = CashflowMonth {
            month: 3,
            income_budget: Decimal::from(1000),
            income_actual: Decimal::from(1200),
            expense_budget: Decimal::from(500),
            expense_actual: Decimal::from(450),
        };
        assert_eq!(m.income_variance().amount, Decimal::from(200));
        assert!(m.income_variance().favorable);
        assert_eq!(m.expense_variance().amount, Decimal::from(-50));
        assert!(m.expense_variance().favorable);
        assert_eq!(m.net_budget(), Decimal::from(500));
        assert_eq!(m.net_actual(), Decimal::from(750));
    }

    #[test]
    fn empty_input_still_yields_twelve_months() {
        let out = fold_cashflow(&[]);
        assert_eq!(out.len(), 12);
        assert_eq!(out[11].month, 12);
        assert!(out.iter().all(|m| m.net_actual().is_zero()));
    }
}

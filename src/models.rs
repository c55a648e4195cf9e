// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{DataError, DataResult};
use crate::utils::{check_amount, check_month, check_probability, check_year, require_name};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound for a recurring entry batch (ten years of months).
pub const MAX_REPEAT: u32 = 120;

// Enums persisted as their upper-case TEXT label.
macro_rules! text_enum {
    ($name:ident, $what:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DataError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(DataError::invalid(format!(
                        "Unknown {} '{}', expected one of {}",
                        $what,
                        s.trim(),
                        [$($text),+].join("|")
                    ))),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: DataError| FromSqlError::Other(e.to_string().into()))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryType {
    Income,
    Expense,
}

text_enum!(CategoryType, "category type", {
    Income => "INCOME",
    Expense => "EXPENSE",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    Active,
    Lead,
    Inactive,
}

text_enum!(CustomerStatus, "customer status", {
    Active => "ACTIVE",
    Lead => "LEAD",
    Inactive => "INACTIVE",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealStage {
    Lead,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

text_enum!(DealStage, "deal stage", {
    Lead => "LEAD",
    Qualified => "QUALIFIED",
    Proposal => "PROPOSAL",
    Negotiation => "NEGOTIATION",
    Won => "WON",
    Lost => "LOST",
});

impl DealStage {
    pub fn is_closed(&self) -> bool {
        matches!(self, DealStage::Won | DealStage::Lost)
    }

    /// Probability a stage pins a deal to. Only closed stages do.
    pub fn forced_probability(&self) -> Option<u8> {
        match self {
            DealStage::Won => Some(100),
            DealStage::Lost => Some(0),
            _ => None,
        }
    }

    /// Starting probability for a new deal created without one.
    pub fn suggested_probability(&self) -> u8 {
        match self {
            DealStage::Lead => 10,
            DealStage::Qualified => 25,
            DealStage::Proposal => 50,
            DealStage::Negotiation => 75,
            DealStage::Won => 100,
            DealStage::Lost => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Call,
    Meeting,
    Email,
    Note,
    Task,
}

text_enum!(ActivityType, "activity type", {
    Call => "CALL",
    Meeting => "MEETING",
    Email => "EMAIL",
    Note => "NOTE",
    Task => "TASK",
});

// ---- budget side ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryType,
}

#[derive(Debug, Clone, Serialize)]
pub struct MasterData {
    pub companies: Vec<Company>,
    pub categories: Vec<Category>,
}

/// An entry joined with its company and category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryDetail {
    pub id: i64,
    pub company_id: i64,
    pub company: String,
    pub category_id: i64,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: CategoryType,
    pub month: i32,
    pub year: i32,
    pub budget_amount: Decimal,
    pub actual_amount: Decimal,
    pub description: Option<String>,
}

impl EntryDetail {
    pub fn variance(&self) -> Variance {
        Variance::for_kind(self.kind, self.budget_amount, self.actual_amount)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub company_id: i64,
    pub category_id: i64,
    pub month: i32,
    pub year: i32,
    pub budget_amount: Decimal,
    pub actual_amount: Decimal,
    pub description: Option<String>,
    /// 1 for a single entry, N for a recurring batch.
    pub repeat_count: u32,
}

impl NewEntry {
    pub fn validate(&self) -> DataResult<()> {
        check_month(self.month)?;
        check_year(self.year)?;
        check_amount("budget", self.budget_amount)?;
        check_amount("actual", self.actual_amount)?;
        if self.repeat_count == 0 || self.repeat_count > MAX_REPEAT {
            return Err(DataError::invalid(format!(
                "Repeat count {} out of range 1..={}",
                self.repeat_count, MAX_REPEAT
            )));
        }
        let (_, last_year) = self.last_period();
        check_year(last_year)?;
        Ok(())
    }

    /// `(month, year)` of the final entry in the batch.
    pub fn last_period(&self) -> (i32, i32) {
        let offset = self.month - 1 + self.repeat_count.saturating_sub(1) as i32;
        (offset % 12 + 1, self.year + offset / 12)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryUpdate {
    pub budget_amount: Option<Decimal>,
    pub actual_amount: Option<Decimal>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    pub kind: Option<CategoryType>,
    pub company_id: Option<i64>,
    pub category_id: Option<i64>,
    pub year: Option<i32>,
    pub month: Option<i32>,
}

/// Signed `actual - budget` with the favorable flag for its category type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Variance {
    pub amount: Decimal,
    pub favorable: bool,
}

impl Variance {
    /// Income is favorable at or above budget, expense at or below it.
    pub fn for_kind(kind: CategoryType, budget: Decimal, actual: Decimal) -> Self {
        let amount = actual - budget;
        let favorable = match kind {
            CategoryType::Income => amount >= Decimal::ZERO,
            CategoryType::Expense => amount <= Decimal::ZERO,
        };
        Variance { amount, favorable }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BudgetTotals {
    pub budget: Decimal,
    pub actual: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedValue {
    pub name: String,
    pub value: Decimal,
}

/// One slot of a 12-month trend series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub month: u32,
    pub income: Decimal,
    pub expense: Decimal,
    pub budget_income: Decimal,
    pub budget_expense: Decimal,
}

/// Twelve empty trend points, January first.
pub fn empty_trend() -> Vec<TrendPoint> {
    (1..=12)
        .map(|month| TrendPoint {
            month,
            ..TrendPoint::default()
        })
        .collect()
}

/// Slot for a stored month, if it is a real month.
pub fn month_slot(month: i32) -> Option<usize> {
    if (1..=12).contains(&month) {
        Some((month - 1) as usize)
    } else {
        None
    }
}

// ---- CRM side ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub industry: Option<String>,
    pub status: CustomerStatus,
    pub notes: Option<String>,
    pub company_id: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub industry: Option<String>,
    pub status: CustomerStatus,
    pub notes: Option<String>,
    pub company_id: Option<i64>,
}

impl NewCustomer {
    pub fn named(name: &str) -> Self {
        NewCustomer {
            name: name.to_string(),
            email: None,
            phone: None,
            address: None,
            industry: None,
            status: CustomerStatus::Active,
            notes: None,
            company_id: None,
        }
    }

    pub fn validate(&self) -> DataResult<()> {
        require_name("customer name", &self.name)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub industry: Option<String>,
    pub status: Option<CustomerStatus>,
    pub notes: Option<String>,
    /// `Some(None)` detaches the customer from its company.
    pub company_id: Option<Option<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerFilter {
    pub status: Option<CustomerStatus>,
    pub company_id: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub customer_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
    pub customer_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deal {
    pub id: i64,
    pub title: String,
    pub value: Decimal,
    pub value_try: Decimal,
    pub stage: DealStage,
    pub probability: u8,
    pub expected_close_date: Option<NaiveDate>,
    pub last_contact_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub customer_id: i64,
    pub sales_rep: Option<String>,
    pub deal_company: Option<String>,
    pub product_category: Option<String>,
    pub product_sub_category: Option<String>,
    pub currency: String,
    pub source: Option<String>,
    pub lead_type: Option<String>,
    pub tag: Option<String>,
    pub is_stale: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewDeal {
    pub title: String,
    pub customer_id: i64,
    pub value: Decimal,
    pub value_try: Decimal,
    /// Defaults to LEAD.
    pub stage: Option<DealStage>,
    /// Defaults to the stage's suggested probability.
    pub probability: Option<u8>,
    pub expected_close_date: Option<NaiveDate>,
    pub last_contact_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub sales_rep: Option<String>,
    pub deal_company: Option<String>,
    pub product_category: Option<String>,
    pub product_sub_category: Option<String>,
    /// Defaults to TRY.
    pub currency: Option<String>,
    pub source: Option<String>,
    pub lead_type: Option<String>,
    pub tag: Option<String>,
    pub is_stale: bool,
}

impl NewDeal {
    pub fn validate(&self) -> DataResult<()> {
        require_name("deal title", &self.title)?;
        check_amount("value", self.value)?;
        check_amount("TRY value", self.value_try)?;
        if let Some(p) = self.probability {
            check_probability(p)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealUpdate {
    pub title: Option<String>,
    pub value: Option<Decimal>,
    pub value_try: Option<Decimal>,
    pub stage: Option<DealStage>,
    pub probability: Option<u8>,
    pub expected_close_date: Option<NaiveDate>,
    pub last_contact_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub customer_id: Option<i64>,
    pub sales_rep: Option<String>,
    pub deal_company: Option<String>,
    pub product_category: Option<String>,
    pub product_sub_category: Option<String>,
    pub currency: Option<String>,
    pub source: Option<String>,
    pub lead_type: Option<String>,
    pub tag: Option<String>,
    pub is_stale: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealFilter {
    pub stage: Option<DealStage>,
    pub customer_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDateTime,
    pub completed: bool,
    pub customer_id: Option<i64>,
    pub deal_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub kind: ActivityType,
    pub title: String,
    pub description: Option<String>,
    /// Defaults to now.
    pub date: Option<NaiveDateTime>,
    pub customer_id: Option<i64>,
    pub deal_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityUpdate {
    pub kind: Option<ActivityType>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityFilter {
    pub kind: Option<ActivityType>,
    pub customer_id: Option<i64>,
    pub deal_id: Option<i64>,
    pub completed: Option<bool>,
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Next-year budget projections from historical actuals.
//!
//! Two models are available: `trend` fits a least-squares line per category
//! and scales it by per-month seasonal indices, `uplift` repeats the previous
//! year's actuals plus ten percent.

use crate::error::{DataError, DataResult};
use crate::models::CategoryType;
use crate::utils::{check_year, parse_date, parse_decimal};
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use csv::ReaderBuilder;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_COMPANY: &str = "Unknown";
/// Growth applied by the uplift model and the flat-series fallback.
pub const UPLIFT_FACTOR: f64 = 1.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastModel {
    Trend,
    Uplift,
}

impl fmt::Display for ForecastModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ForecastModel::Trend => "trend",
            ForecastModel::Uplift => "uplift",
        })
    }
}

impl FromStr for ForecastModel {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trend" => Ok(ForecastModel::Trend),
            "uplift" => Ok(ForecastModel::Uplift),
            other => Err(DataError::invalid(format!(
                "Unknown forecast model '{}', expected trend|uplift",
                other
            ))),
        }
    }
}

/// One historical transaction read from CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub date: NaiveDate,
    pub category: String,
    pub company: String,
    pub amount: Decimal,
}

/// A month of a continuous series. `index` counts months from the first
/// observed one; `month_of_year` is 0 for January.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub index: i32,
    pub value: f64,
    pub month_of_year: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    pub slope: f64,
    pub intercept: f64,
}

impl Trend {
    pub fn at(&self, index: i32) -> f64 {
        self.slope * f64::from(index) + self.intercept
    }
}

/// A budget row to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    #[serde(rename = "type")]
    pub kind: CategoryType,
    pub category: String,
    pub company: String,
    pub month: i32,
    pub year: i32,
    pub budget: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOptions {
    pub year: i32,
    pub model: ForecastModel,
    /// Remove the year's pure budget rows (budget > 0, actual = 0) first.
    pub replace: bool,
    pub dry_run: bool,
}

/// Reads `date,category,company,amount` rows. Rows whose date or amount does
/// not parse are skipped with a warning.
pub fn read_rows(path: &Path) -> Result<Vec<SourceRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let rec = result.with_context(|| format!("Read {}", path.display()))?;
        let date_raw = rec.get(0).unwrap_or("").trim();
        let date = match parse_date(date_raw) {
            Ok(d) => d,
            Err(_) => {
                log::warn!(
                    "{}: skipping row {} with unreadable date '{}'",
                    path.display(),
                    line + 2,
                    date_raw
                );
                continue;
            }
        };
        let amount_raw = rec.get(3).unwrap_or("").trim();
        let amount = match parse_decimal(amount_raw) {
            Ok(a) => a,
            Err(_) => {
                log::warn!(
                    "{}: skipping row {} with unreadable amount '{}'",
                    path.display(),
                    line + 2,
                    amount_raw
                );
                continue;
            }
        };
        let category = rec.get(1).map(str::trim).filter(|s| !s.is_empty());
        let company = rec.get(2).map(str::trim).filter(|s| !s.is_empty());
        rows.push(SourceRow {
            date,
            category: category.unwrap_or(DEFAULT_CATEGORY).to_string(),
            company: company.unwrap_or(DEFAULT_COMPANY).to_string(),
            amount,
        });
    }
    log::info!("read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn month_key(d: NaiveDate) -> i32 {
    d.year() * 12 + d.month0() as i32
}

/// Monthly totals from the first to the last observed month, with gaps
/// filled by zero. Returns the key of the first month alongside the series.
pub fn monthly_series(rows: &[&SourceRow]) -> (i32, Vec<DataPoint>) {
    let mut totals: HashMap<i32, f64> = HashMap::new();
    for r in rows {
        *totals.entry(month_key(r.date)).or_default() += r.amount.to_f64().unwrap_or(0.0);
    }
    let (Some(&first), Some(&last)) = (totals.keys().min(), totals.keys().max()) else {
        return (0, Vec::new());
    };
    let points = (first..=last)
        .map(|key| DataPoint {
            index: key - first,
            value: totals.get(&key).copied().unwrap_or(0.0),
            month_of_year: key.rem_euclid(12) as usize,
        })
        .collect();
    (first, points)
}

/// Ordinary least squares over `(index, value)`. Fewer than two points give
/// the zero line, so the projection falls back to mean uplift. No spread in
/// the index gives a flat line at the mean.
pub fn linear_regression(points: &[DataPoint]) -> Trend {
    if points.len() < 2 {
        return Trend {
            slope: 0.0,
            intercept: 0.0,
        };
    }
    let n = points.len() as f64;
    let (mut sx, mut sy, mut sxy, mut sxx) = (0.0, 0.0, 0.0, 0.0);
    for p in points {
        let x = f64::from(p.index);
        sx += x;
        sy += p.value;
        sxy += x * p.value;
        sxx += x * x;
    }
    let denom = n * sxx - sx * sx;
    if denom.abs() < f64::EPSILON {
        return Trend {
            slope: 0.0,
            intercept: sy / n,
        };
    }
    let slope = (n * sxy - sx * sy) / denom;
    Trend {
        slope,
        intercept: (sy - slope * sx) / n,
    }
}

/// Mean actual-to-trend ratio per calendar month. Points where the trend is
/// not above 1 count as a neutral 1.0, as do months without any points.
pub fn seasonal_indices(points: &[DataPoint], trend: &Trend) -> [f64; 12] {
    let mut sums = [0.0f64; 12];
    let mut counts = [0u32; 12];
    for p in points {
        let t = trend.at(p.index);
        let ratio = if t > 1.0 { p.value / t } else { 1.0 };
        sums[p.month_of_year] += ratio;
        counts[p.month_of_year] += 1;
    }
    let mut out = [1.0f64; 12];
    for m in 0..12 {
        if counts[m] > 0 {
            out[m] = sums[m] / f64::from(counts[m]);
        }
    }
    out
}

fn to_money(v: f64) -> Decimal {
    Decimal::try_from(v).unwrap_or(Decimal::ZERO).round_dp(2)
}

/// Twelve monthly budgets for `year` from one category's history.
pub fn project_year(rows: &[&SourceRow], year: i32) -> [Decimal; 12] {
    let (first, points) = monthly_series(rows);
    let mut out = [Decimal::ZERO; 12];
    if points.is_empty() {
        return out;
    }
    let trend = linear_regression(&points);
    let indices = seasonal_indices(&points, &trend);
    let mean = points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64;
    let has_positive = points.iter().any(|p| p.value > 0.0);
    log::debug!(
        "trend slope {:.2} intercept {:.2} over {} months",
        trend.slope,
        trend.intercept,
        points.len()
    );

    for (m, slot) in out.iter_mut().enumerate() {
        let x = year * 12 + m as i32 - first;
        let mut v = (trend.at(x) * indices[m]).max(0.0);
        if v == 0.0 && has_positive {
            v = mean * UPLIFT_FACTOR;
        }
        *slot = to_money(v);
    }
    out
}

/// The company a category's history mentions most often; the earliest one
/// wins a tie.
fn top_company(rows: &[&SourceRow]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for r in rows {
        match counts.iter_mut().find(|(c, _)| *c == r.company) {
            Some((_, n)) => *n += 1,
            None => counts.push((r.company.as_str(), 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (c, n) in counts {
        if best.is_none_or(|(_, b)| n > b) {
            best = Some((c, n));
        }
    }
    best.map(|(c, _)| c.to_string())
        .unwrap_or_else(|| DEFAULT_COMPANY.to_string())
}

pub fn trend_projections(rows: &[SourceRow], kind: CategoryType, year: i32) -> Vec<Projection> {
    let mut by_category: BTreeMap<&str, Vec<&SourceRow>> = BTreeMap::new();
    for r in rows {
        by_category.entry(r.category.as_str()).or_default().push(r);
    }
    let mut out = Vec::new();
    for (category, mut group) in by_category {
        group.sort_by_key(|r| r.date);
        let company = top_company(&group);
        for (m, budget) in project_year(&group, year).into_iter().enumerate() {
            out.push(Projection {
                kind,
                category: category.to_string(),
                company: company.clone(),
                month: m as i32 + 1,
                year,
                budget,
            });
        }
    }
    out
}

pub fn uplift_projections(rows: &[SourceRow], kind: CategoryType, year: i32) -> Vec<Projection> {
    let factor = Decimal::new(110, 2);
    let mut grouped: BTreeMap<(u32, &str, &str), Decimal> = BTreeMap::new();
    for r in rows.iter().filter(|r| r.date.year() == year - 1) {
        *grouped
            .entry((r.date.month(), r.category.as_str(), r.company.as_str()))
            .or_default() += r.amount;
    }
    grouped
        .into_iter()
        .map(|((month, category, company), sum)| Projection {
            kind,
            category: category.to_string(),
            company: company.to_string(),
            month: month as i32,
            year,
            budget: (sum * factor).round_dp(2),
        })
        .collect()
}

pub fn project(rows: &[SourceRow], kind: CategoryType, opts: &ForecastOptions) -> Vec<Projection> {
    match opts.model {
        ForecastModel::Trend => trend_projections(rows, kind, opts.year),
        ForecastModel::Uplift => uplift_projections(rows, kind, opts.year),
    }
}

fn find_or_create_company(conn: &Connection, name: &str) -> DataResult<i64> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM companies WHERE name=?1", params![name], |r| {
            r.get(0)
        })
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute("INSERT INTO companies(name) VALUES (?1)", params![name])?;
    log::info!("created company '{}'", name);
    Ok(conn.last_insert_rowid())
}

fn find_or_create_category(conn: &Connection, name: &str, kind: CategoryType) -> DataResult<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM categories WHERE name=?1 AND type=?2",
            params![name, kind],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO categories(name, type) VALUES (?1, ?2)",
        params![name, kind],
    )?;
    log::info!("created {} category '{}'", kind, name);
    Ok(conn.last_insert_rowid())
}

/// Projects both sides and, unless `dry_run`, writes the budget rows in one
/// transaction. Returns what was (or would be) written.
pub fn run_forecast(
    conn: &mut Connection,
    opts: &ForecastOptions,
    expenses: &[SourceRow],
    income: &[SourceRow],
) -> DataResult<Vec<Projection>> {
    check_year(opts.year)?;
    let mut projections = project(expenses, CategoryType::Expense, opts);
    projections.extend(project(income, CategoryType::Income, opts));
    if opts.dry_run {
        return Ok(projections);
    }

    let tx = conn.transaction()?;
    if opts.replace {
        let removed = tx.execute(
            "DELETE FROM entries
             WHERE year=?1 AND CAST(budget_amount AS REAL) > 0 AND CAST(actual_amount AS REAL) = 0",
            params![opts.year],
        )?;
        log::info!("removed {} budget rows for {}", removed, opts.year);
    }

    let mut companies: HashMap<String, i64> = HashMap::new();
    let mut categories: HashMap<(String, CategoryType), i64> = HashMap::new();
    let description = format!("{} forecast ({})", opts.year, opts.model);
    for p in &projections {
        let company_id = match companies.get(&p.company) {
            Some(&id) => id,
            None => {
                let id = find_or_create_company(&tx, &p.company)?;
                companies.insert(p.company.clone(), id);
                id
            }
        };
        let key = (p.category.clone(), p.kind);
        let category_id = match categories.get(&key) {
            Some(&id) => id,
            None => {
                let id = find_or_create_category(&tx, &p.category, p.kind)?;
                categories.insert(key, id);
                id
            }
        };
        tx.execute(
            "INSERT INTO entries(company_id, category_id, month, year, budget_amount, actual_amount, description)
             VALUES (?1, ?2, ?3, ?4, ?5, '0', ?6)",
            params![
                company_id,
                category_id,
                p.month,
                p.year,
                p.budget.to_string(),
                description
            ],
        )?;
    }
    tx.commit()?;
    log::info!(
        "wrote {} {} projections for {}",
        projections.len(),
        opts.model,
        opts.year
    );
    Ok(projections)
}

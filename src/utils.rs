// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{ActionOutcome, DataError, DataResult};
use crate::models::NamedValue;
use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime, SubsecRound};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params, params_from_iter};
use rust_decimal::Decimal;
use std::collections::HashMap;

pub const MIN_YEAR: i32 = 1970;
pub const MAX_YEAR: i32 = 2200;
pub const DEFAULT_CURRENCY: &str = "TRY";

// ---- validation boundary: raw text in, typed values or InvalidInput out ----

pub fn check_month(month: i32) -> DataResult<i32> {
    if (1..=12).contains(&month) {
        Ok(month)
    } else {
        Err(DataError::invalid(format!(
            "Month {} out of range 1..=12",
            month
        )))
    }
}

pub fn check_year(year: i32) -> DataResult<i32> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(year)
    } else {
        Err(DataError::invalid(format!(
            "Year {} out of range {}..={}",
            year, MIN_YEAR, MAX_YEAR
        )))
    }
}

pub fn check_amount(field: &str, amount: Decimal) -> DataResult<Decimal> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DataError::invalid(format!(
            "{} amount must not be negative (got {})",
            field, amount
        )));
    }
    Ok(amount)
}

pub fn check_probability(p: u8) -> DataResult<u8> {
    if p > 100 {
        return Err(DataError::invalid(format!(
            "Probability {} out of range 0..=100",
            p
        )));
    }
    Ok(p)
}

pub fn require_name(field: &str, s: &str) -> DataResult<String> {
    let t = s.trim();
    if t.is_empty() {
        return Err(DataError::invalid(format!("{} must not be empty", field)));
    }
    Ok(t.to_string())
}

/// Trimmed text, with blanks collapsed to `None`.
pub fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

pub fn parse_id(s: &str) -> DataResult<i64> {
    match s.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(DataError::invalid(format!("Invalid id '{}'", s.trim()))),
    }
}

pub fn parse_month(s: &str) -> DataResult<i32> {
    let m = s
        .trim()
        .parse::<i32>()
        .map_err(|_| DataError::invalid(format!("Invalid month '{}', expected 1-12", s.trim())))?;
    check_month(m)
}

pub fn parse_year(s: &str) -> DataResult<i32> {
    let y = s
        .trim()
        .parse::<i32>()
        .map_err(|_| DataError::invalid(format!("Invalid year '{}'", s.trim())))?;
    check_year(y)
}

pub fn parse_decimal(s: &str) -> DataResult<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .map_err(|_| DataError::invalid(format!("Invalid decimal '{}'", s.trim())))
}

/// Non-negative money amount.
pub fn parse_amount(field: &str, s: &str) -> DataResult<Decimal> {
    check_amount(field, parse_decimal(s)?)
}

pub fn parse_probability(s: &str) -> DataResult<u8> {
    let p = s
        .trim()
        .trim_end_matches('%')
        .parse::<u8>()
        .map_err(|_| DataError::invalid(format!("Invalid probability '{}'", s.trim())))?;
    check_probability(p)
}

pub fn parse_repeat(s: &str) -> DataResult<u32> {
    s.trim()
        .parse::<u32>()
        .map_err(|_| DataError::invalid(format!("Invalid repeat count '{}'", s.trim())))
}

pub fn parse_date(s: &str) -> DataResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        DataError::invalid(format!("Invalid date '{}', expected YYYY-MM-DD", s.trim()))
    })
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]` or the `T`-separated form.
pub fn parse_datetime(s: &str) -> DataResult<NaiveDateTime> {
    let t = s.trim();
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Ok(dt);
        }
    }
    parse_date(t)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| {
            DataError::invalid(format!(
                "Invalid date/time '{}', expected YYYY-MM-DD [HH:MM]",
                t
            ))
        })
}

pub fn parse_bool(s: &str) -> DataResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        other => Err(DataError::invalid(format!("Invalid boolean '{}'", other))),
    }
}

pub fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

pub fn current_year() -> i32 {
    use chrono::Datelike;
    Local::now().year()
}

// ---- row helpers ----

/// Read a TEXT money column.
pub fn get_decimal(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = row.get(idx)?;
    s.trim().parse::<Decimal>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub fn ensure_exists(
    conn: &Connection,
    table: &str,
    entity: &'static str,
    id: i64,
) -> DataResult<()> {
    let found: Option<i64> = conn
        .query_row(
            &format!("SELECT id FROM {} WHERE id=?1", table),
            params![id],
            |r| r.get(0),
        )
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(DataError::not_found(entity, id)),
    }
}

/// Resolve a company given by id or by exact name.
pub fn company_ref(conn: &Connection, s: &str) -> DataResult<i64> {
    let key = s.trim();
    if let Ok(id) = key.parse::<i64>() {
        ensure_exists(conn, "companies", "Company", id)?;
        return Ok(id);
    }
    conn.query_row(
        "SELECT id FROM companies WHERE name=?1",
        params![key],
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| DataError::not_found("Company", format!("'{}'", key)))
}

/// Resolve a category given by id or by name. A name shared by an income and
/// an expense category must be given by id.
pub fn category_ref(conn: &Connection, s: &str) -> DataResult<i64> {
    let key = s.trim();
    if let Ok(id) = key.parse::<i64>() {
        ensure_exists(conn, "categories", "Category", id)?;
        return Ok(id);
    }
    let mut stmt = conn.prepare("SELECT id FROM categories WHERE name=?1")?;
    let ids = stmt
        .query_map(params![key], |r| r.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    match ids.as_slice() {
        [id] => Ok(*id),
        [] => Err(DataError::not_found("Category", format!("'{}'", key))),
        _ => Err(DataError::invalid(format!(
            "Category name '{}' is used for both income and expense, pass its id",
            key
        ))),
    }
}

/// Collects `col=?` assignments for a partial UPDATE.
#[derive(Default)]
pub struct UpdateSet {
    columns: Vec<&'static str>,
    values: Vec<Box<dyn ToSql>>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: ToSql + 'static>(&mut self, column: &'static str, value: T) -> &mut Self {
        self.columns.push(column);
        self.values.push(Box::new(value));
        self
    }

    pub fn set_opt<T: ToSql + 'static>(
        &mut self,
        column: &'static str,
        value: Option<T>,
    ) -> &mut Self {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Runs the UPDATE and returns the number of rows changed.
    pub fn execute(self, conn: &Connection, table: &str, id: i64) -> DataResult<usize> {
        if self.is_empty() {
            return Ok(0);
        }
        let assignments: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}=?{}", c, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id=?{}",
            table,
            assignments.join(", "),
            self.columns.len() + 1
        );
        let mut values = self.values;
        values.push(Box::new(id));
        Ok(conn.execute(&sql, params_from_iter(values.iter()))?)
    }
}

// ---- aggregation helpers ----

/// Sort a name->sum map descending by value (ties by name) and optionally
/// keep only the first `limit` items.
pub fn ranked(map: HashMap<String, Decimal>, limit: Option<usize>) -> Vec<NamedValue> {
    let mut items: Vec<NamedValue> = map
        .into_iter()
        .map(|(name, value)| NamedValue { name, value })
        .collect();
    items.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    if let Some(n) = limit {
        items.truncate(n);
    }
    items
}

// ---- presentation ----

pub fn fmt_money(d: &Decimal, ccy: &str) -> String {
    format!("{} {:.2}", ccy, d.round_dp(2))
}

pub fn month_label(month: i32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| chrono::Month::try_from(m).ok())
        .map(|m| m.name()[..3].to_string())
        .unwrap_or_else(|| month.to_string())
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

/// Render the outcome of a guarded write.
pub fn report_outcome(json_flag: bool, outcome: &ActionOutcome, done: &str) -> Result<()> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else if outcome.success {
        println!("{}", done);
    } else {
        eprintln!(
            "Error: {}",
            outcome.error.as_deref().unwrap_or("operation failed")
        );
    }
    Ok(())
}

// ---- settings ----

pub fn get_currency(conn: &Connection) -> DataResult<String> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key='currency'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
}

pub fn set_currency(conn: &Connection, ccy: &str) -> DataResult<()> {
    let ccy = ccy.trim().to_uppercase();
    if ccy.len() != 3 || !ccy.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DataError::invalid(format!(
            "Invalid currency code '{}', expected three letters",
            ccy
        )));
    }
    conn.execute(
        "INSERT INTO settings(key, value) VALUES('currency', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![ccy],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_month_bounds() {
        assert_eq!(parse_month(" 7 ").unwrap(), 7);
        assert!(parse_month("0").is_err());
        assert!(parse_month("13").is_err());
        assert!(parse_month("July").is_err());
    }

    #[test]
    fn parse_amount_rejects_negative() {
        assert_eq!(parse_amount("budget", "12.50").unwrap(), Decimal::new(1250, 2));
        assert!(matches!(
            parse_amount("budget", "-1"),
            Err(DataError::InvalidInput(_))
        ));
    }

    #[test]
    fn parse_probability_accepts_percent_sign() {
        assert_eq!(parse_probability("50%").unwrap(), 50);
        assert!(parse_probability("101").is_err());
    }

    #[test]
    fn parse_datetime_accepts_date_only() {
        let dt = parse_datetime("2025-03-04").unwrap();
        assert_eq!(dt.to_string(), "2025-03-04 00:00:00");
        let dt = parse_datetime("2025-03-04 09:30").unwrap();
        assert_eq!(dt.to_string(), "2025-03-04 09:30:00");
    }

    #[test]
    fn ranked_sorts_and_truncates() {
        let mut m = HashMap::new();
        m.insert("a".to_string(), Decimal::from(1));
        m.insert("b".to_string(), Decimal::from(3));
        m.insert("c".to_string(), Decimal::from(2));
        let out = ranked(m, Some(2));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "b");
        assert_eq!(out[1].name, "c");
    }

    #[test]
    fn month_label_falls_back_to_number() {
        assert_eq!(month_label(1), "Jan");
        assert_eq!(month_label(13), "13");
    }
}

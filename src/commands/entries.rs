// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{categories, companies};
use crate::error::{ActionOutcome, DataError, DataResult};
use crate::models::{
    CategoryType, EntryDetail, EntryFilter, EntryUpdate, MasterData, NewEntry, Variance,
};
use crate::utils::{
    category_ref, check_amount, company_ref, ensure_exists, maybe_print_json, month_label,
    non_empty, parse_amount, parse_id, parse_month, parse_repeat, parse_year, pretty_table,
    report_outcome, UpdateSet, get_decimal,
};
use anyhow::Result;
use rusqlite::{Connection, Row, ToSql, params, params_from_iter};
use rust_decimal::Decimal;

pub(crate) const ENTRY_SELECT: &str = "SELECT e.id, e.company_id, co.name, e.category_id, ca.name, ca.type, \
     e.month, e.year, e.budget_amount, e.actual_amount, e.description \
     FROM entries e \
     JOIN companies co ON co.id=e.company_id \
     JOIN categories ca ON ca.id=e.category_id";

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("edit", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let update = EntryUpdate {
                budget_amount: sub
                    .get_one::<String>("budget")
                    .map(|s| parse_amount("budget", s))
                    .transpose()?,
                actual_amount: sub
                    .get_one::<String>("actual")
                    .map(|s| parse_amount("actual", s))
                    .transpose()?,
                description: sub.get_one::<String>("description").cloned(),
            };
            update_entry(conn, id, &update)?;
            println!("Updated entry {}", id);
        }
        Some(("rm", sub)) => {
            let ids: DataResult<Vec<i64>> = sub
                .get_many::<String>("id")
                .unwrap()
                .map(|s| parse_id(s))
                .collect();
            let outcome: ActionOutcome = ids.and_then(|ids| delete_entries(conn, &ids)).into();
            report_outcome(sub.get_flag("json"), &outcome, "Removed entries")?;
        }
        Some(("dup", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let new_id = duplicate_entry(conn, id)?;
            println!("Duplicated entry {} as {}", id, new_id);
        }
        Some(("master", sub)) => {
            let data = master_data(conn)?;
            if !maybe_print_json(sub.get_flag("json"), false, &data)? {
                let rows = data
                    .companies
                    .into_iter()
                    .map(|c| vec![c.id.to_string(), c.name])
                    .collect();
                println!("{}", pretty_table(&["ID", "Company"], rows));
                let rows = data
                    .categories
                    .into_iter()
                    .map(|c| vec![c.id.to_string(), c.name, c.kind.to_string()])
                    .collect();
                println!("{}", pretty_table(&["ID", "Category", "Type"], rows));
            }
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let input = NewEntry {
        company_id: company_ref(conn, sub.get_one::<String>("company").unwrap())?,
        category_id: category_ref(conn, sub.get_one::<String>("category").unwrap())?,
        month: parse_month(sub.get_one::<String>("month").unwrap())?,
        year: parse_year(sub.get_one::<String>("year").unwrap())?,
        budget_amount: match sub.get_one::<String>("budget") {
            Some(s) => parse_amount("budget", s)?,
            None => Decimal::ZERO,
        },
        actual_amount: match sub.get_one::<String>("actual") {
            Some(s) => parse_amount("actual", s)?,
            None => Decimal::ZERO,
        },
        description: non_empty(sub.get_one::<String>("description").map(|s| s.as_str())),
        repeat_count: match sub.get_one::<String>("repeat") {
            Some(s) => parse_repeat(s)?,
            None => 1,
        },
    };
    let ids = create_entry(conn, &input)?;
    println!(
        "Recorded {} entr{} starting {}/{}",
        ids.len(),
        if ids.len() == 1 { "y" } else { "ies" },
        input.month,
        input.year
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let filter = EntryFilter {
        kind: sub
            .get_one::<String>("type")
            .map(|s| s.parse::<CategoryType>())
            .transpose()?,
        company_id: sub
            .get_one::<String>("company")
            .map(|s| company_ref(conn, s))
            .transpose()?,
        category_id: sub
            .get_one::<String>("category")
            .map(|s| category_ref(conn, s))
            .transpose()?,
        year: sub.get_one::<String>("year").map(|s| parse_year(s)).transpose()?,
        month: sub.get_one::<String>("month").map(|s| parse_month(s)).transpose()?,
    };
    let data = list_entries(conn, &filter)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .into_iter()
            .map(|e| {
                let v = e.variance();
                vec![
                    e.id.to_string(),
                    format!("{} {}", month_label(e.month), e.year),
                    e.company,
                    e.category,
                    e.kind.to_string(),
                    format!("{:.2}", e.budget_amount),
                    format!("{:.2}", e.actual_amount),
                    fmt_variance(&v),
                    e.description.unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &[
                    "ID", "Period", "Company", "Category", "Type", "Budget", "Actual",
                    "Variance", "Description",
                ],
                rows,
            )
        );
    }
    Ok(())
}

pub fn fmt_variance(v: &Variance) -> String {
    let sign = if v.amount > Decimal::ZERO { "+" } else { "" };
    format!(
        "{}{:.2} {}",
        sign,
        v.amount,
        if v.favorable { "(fav)" } else { "(unfav)" }
    )
}

pub(crate) fn entry_from_row(r: &Row<'_>) -> rusqlite::Result<EntryDetail> {
    Ok(EntryDetail {
        id: r.get(0)?,
        company_id: r.get(1)?,
        company: r.get(2)?,
        category_id: r.get(3)?,
        category: r.get(4)?,
        kind: r.get(5)?,
        month: r.get(6)?,
        year: r.get(7)?,
        budget_amount: get_decimal(r, 8)?,
        actual_amount: get_decimal(r, 9)?,
        description: r.get(10)?,
    })
}

/// Joined entries matching `filter`, in the given order.
pub(crate) fn query_entries(
    conn: &Connection,
    filter: &EntryFilter,
    order_by: &str,
    limit: Option<usize>,
) -> DataResult<Vec<EntryDetail>> {
    let mut sql = format!("{} WHERE 1=1", ENTRY_SELECT);
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(kind) = filter.kind {
        values.push(Box::new(kind));
        sql.push_str(&format!(" AND ca.type=?{}", values.len()));
    }
    if let Some(id) = filter.company_id {
        values.push(Box::new(id));
        sql.push_str(&format!(" AND e.company_id=?{}", values.len()));
    }
    if let Some(id) = filter.category_id {
        values.push(Box::new(id));
        sql.push_str(&format!(" AND e.category_id=?{}", values.len()));
    }
    if let Some(year) = filter.year {
        values.push(Box::new(year));
        sql.push_str(&format!(" AND e.year=?{}", values.len()));
    }
    if let Some(month) = filter.month {
        values.push(Box::new(month));
        sql.push_str(&format!(" AND e.month=?{}", values.len()));
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(order_by);
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {}", n));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), entry_from_row)?;
    let data = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    log::debug!("loaded {} entries", data.len());
    Ok(data)
}

pub fn list_entries(conn: &Connection, filter: &EntryFilter) -> DataResult<Vec<EntryDetail>> {
    query_entries(conn, filter, "e.year DESC, e.month DESC, e.id DESC", None)
}

pub fn get_entry(conn: &Connection, id: i64) -> DataResult<EntryDetail> {
    let sql = format!("{} WHERE e.id=?1", ENTRY_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params![id], entry_from_row)?;
    match rows.next() {
        Some(row) => Ok(row?),
        None => Err(DataError::not_found("Entry", id)),
    }
}

/// Creates one entry, or `repeat_count` entries for consecutive months. The
/// batch is committed as a whole or not at all.
pub fn create_entry(conn: &mut Connection, input: &NewEntry) -> DataResult<Vec<i64>> {
    input.validate()?;
    let tx = conn.transaction()?;
    ensure_exists(&tx, "companies", "Company", input.company_id)?;
    ensure_exists(&tx, "categories", "Category", input.category_id)?;

    let total = input.repeat_count;
    let recurring = total > 1;
    let description = non_empty(input.description.as_deref());
    let (mut month, mut year) = (input.month, input.year);
    let mut ids = Vec::with_capacity(total as usize);
    for i in 0..total {
        let desc = match &description {
            Some(d) if recurring => Some(format!("{} ({}/{})", d, i + 1, total)),
            other => other.clone(),
        };
        tx.execute(
            "INSERT INTO entries(company_id, category_id, month, year, budget_amount, actual_amount, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                input.company_id,
                input.category_id,
                month,
                year,
                input.budget_amount.to_string(),
                input.actual_amount.to_string(),
                desc
            ],
        )?;
        ids.push(tx.last_insert_rowid());
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
    tx.commit()?;
    log::info!(
        "created {} entries for company {} / category {}",
        ids.len(),
        input.company_id,
        input.category_id
    );
    Ok(ids)
}

pub fn update_entry(conn: &Connection, id: i64, update: &EntryUpdate) -> DataResult<()> {
    ensure_exists(conn, "entries", "Entry", id)?;
    let mut set = UpdateSet::new();
    if let Some(b) = update.budget_amount {
        set.set("budget_amount", check_amount("budget", b)?.to_string());
    }
    if let Some(a) = update.actual_amount {
        set.set("actual_amount", check_amount("actual", a)?.to_string());
    }
    if let Some(d) = &update.description {
        set.set("description", non_empty(Some(d.as_str())));
    }
    set.execute(conn, "entries", id)?;
    log::info!("updated entry {}", id);
    Ok(())
}

pub fn delete_entry(conn: &Connection, id: i64) -> DataResult<()> {
    match conn.execute("DELETE FROM entries WHERE id=?1", params![id])? {
        0 => Err(DataError::not_found("Entry", id)),
        _ => {
            log::info!("deleted entry {}", id);
            Ok(())
        }
    }
}

/// Deletes every listed entry, or none of them if one is missing.
pub fn delete_entries(conn: &mut Connection, ids: &[i64]) -> DataResult<()> {
    let tx = conn.transaction()?;
    for &id in ids {
        delete_entry(&tx, id)?;
    }
    tx.commit()?;
    Ok(())
}

/// Copies an entry into the same period. Returns the copy's id.
pub fn duplicate_entry(conn: &Connection, id: i64) -> DataResult<i64> {
    let src = get_entry(conn, id)?;
    let description = match src.description.as_deref() {
        Some(d) => format!("{} (copy)", d),
        None => "(copy)".to_string(),
    };
    conn.execute(
        "INSERT INTO entries(company_id, category_id, month, year, budget_amount, actual_amount, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            src.company_id,
            src.category_id,
            src.month,
            src.year,
            src.budget_amount.to_string(),
            src.actual_amount.to_string(),
            description
        ],
    )?;
    let new_id = conn.last_insert_rowid();
    log::info!("duplicated entry {} as {}", id, new_id);
    Ok(new_id)
}

/// Companies and categories for entry pickers.
pub fn master_data(conn: &Connection) -> DataResult<MasterData> {
    Ok(MasterData {
        companies: companies::list_companies(conn)?,
        categories: categories::list_categories(conn, None)?,
    })
}

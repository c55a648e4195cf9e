// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{ActionOutcome, DataError, DataResult, is_constraint_violation};
use crate::models::Company;
use crate::utils::{
    company_ref, ensure_exists, maybe_print_json, pretty_table, report_outcome, require_name,
};
use anyhow::Result;
use rusqlite::{Connection, params};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let id = create_company(conn, name)?;
            println!("Added company '{}' (id {})", name.trim(), id);
        }
        Some(("list", sub)) => {
            let data = list_companies(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|c| vec![c.id.to_string(), c.name])
                    .collect();
                println!("{}", pretty_table(&["ID", "Company"], rows));
            }
        }
        Some(("rename", sub)) => {
            let id = company_ref(conn, sub.get_one::<String>("company").unwrap())?;
            let name = sub.get_one::<String>("name").unwrap();
            rename_company(conn, id, name)?;
            println!("Renamed company {} to '{}'", id, name.trim());
        }
        Some(("rm", sub)) => {
            let refs: Vec<&String> = sub.get_many::<String>("company").unwrap().collect();
            let ids: DataResult<Vec<i64>> = refs.iter().map(|r| company_ref(conn, r)).collect();
            let outcome: ActionOutcome = ids.and_then(|ids| delete_companies(conn, &ids)).into();
            report_outcome(sub.get_flag("json"), &outcome, "Removed company")?;
        }
        _ => {}
    }
    Ok(())
}

pub fn create_company(conn: &Connection, name: &str) -> DataResult<i64> {
    let name = require_name("company name", name)?;
    match conn.execute("INSERT INTO companies(name) VALUES (?1)", params![name]) {
        Ok(_) => {
            let id = conn.last_insert_rowid();
            log::info!("created company {} '{}'", id, name);
            Ok(id)
        }
        Err(e) if is_constraint_violation(&e) => Err(DataError::ConstraintViolation(format!(
            "Company '{}' already exists",
            name
        ))),
        Err(e) => Err(e.into()),
    }
}

pub fn list_companies(conn: &Connection) -> DataResult<Vec<Company>> {
    let mut stmt = conn.prepare("SELECT id, name FROM companies ORDER BY name")?;
    let rows = stmt.query_map([], |r| {
        Ok(Company {
            id: r.get(0)?,
            name: r.get(1)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn rename_company(conn: &Connection, id: i64, name: &str) -> DataResult<()> {
    let name = require_name("company name", name)?;
    ensure_exists(conn, "companies", "Company", id)?;
    match conn.execute(
        "UPDATE companies SET name=?1 WHERE id=?2",
        params![name, id],
    ) {
        Ok(_) => Ok(()),
        Err(e) if is_constraint_violation(&e) => Err(DataError::ConstraintViolation(format!(
            "Company '{}' already exists",
            name
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Rejected while any entry still points at the company.
pub fn delete_company(conn: &Connection, id: i64) -> DataResult<()> {
    let referenced: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE company_id=?1",
        params![id],
        |r| r.get(0),
    )?;
    if referenced > 0 {
        log::warn!("refusing to delete company {}: {} entries", id, referenced);
        return Err(DataError::ConstraintViolation(format!(
            "Company {} still has {} entries and cannot be deleted",
            id, referenced
        )));
    }
    match conn.execute("DELETE FROM companies WHERE id=?1", params![id]) {
        Ok(0) => Err(DataError::not_found("Company", id)),
        Ok(_) => {
            log::info!("deleted company {}", id);
            Ok(())
        }
        Err(e) if is_constraint_violation(&e) => Err(DataError::ConstraintViolation(format!(
            "Company {} is still in use and cannot be deleted",
            id
        ))),
        Err(e) => Err(e.into()),
    }
}

/// All-or-nothing: one blocked company leaves every row in place.
pub fn delete_companies(conn: &mut Connection, ids: &[i64]) -> DataResult<()> {
    let tx = conn.transaction()?;
    for &id in ids {
        delete_company(&tx, id)?;
    }
    tx.commit()?;
    Ok(())
}

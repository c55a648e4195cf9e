// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{ActionOutcome, DataError, DataResult, is_constraint_violation};
use crate::models::{Category, CategoryType};
use crate::utils::{
    category_ref, ensure_exists, maybe_print_json, pretty_table, report_outcome, require_name,
};
use anyhow::Result;
use rusqlite::{Connection, params};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let kind: CategoryType = sub.get_one::<String>("type").unwrap().parse()?;
            let id = create_category(conn, name, kind)?;
            println!("Added {} category '{}' (id {})", kind, name.trim(), id);
        }
        Some(("list", sub)) => {
            let kind = sub
                .get_one::<String>("type")
                .map(|s| s.parse::<CategoryType>())
                .transpose()?;
            let data = list_categories(conn, kind)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|c| vec![c.id.to_string(), c.name, c.kind.to_string()])
                    .collect();
                println!("{}", pretty_table(&["ID", "Category", "Type"], rows));
            }
        }
        Some(("rename", sub)) => {
            let id = category_ref(conn, sub.get_one::<String>("category").unwrap())?;
            let name = sub.get_one::<String>("name").unwrap();
            rename_category(conn, id, name)?;
            println!("Renamed category {} to '{}'", id, name.trim());
        }
        Some(("rm", sub)) => {
            let refs: Vec<&String> = sub.get_many::<String>("category").unwrap().collect();
            let ids: DataResult<Vec<i64>> = refs.iter().map(|r| category_ref(conn, r)).collect();
            let outcome: ActionOutcome = ids.and_then(|ids| delete_categories(conn, &ids)).into();
            report_outcome(sub.get_flag("json"), &outcome, "Removed category")?;
        }
        _ => {}
    }
    Ok(())
}

pub fn create_category(conn: &Connection, name: &str, kind: CategoryType) -> DataResult<i64> {
    let name = require_name("category name", name)?;
    match conn.execute(
        "INSERT INTO categories(name, type) VALUES (?1, ?2)",
        params![name, kind],
    ) {
        Ok(_) => {
            let id = conn.last_insert_rowid();
            log::info!("created {} category {} '{}'", kind, id, name);
            Ok(id)
        }
        Err(e) if is_constraint_violation(&e) => Err(DataError::ConstraintViolation(format!(
            "{} category '{}' already exists",
            kind, name
        ))),
        Err(e) => Err(e.into()),
    }
}

pub fn list_categories(conn: &Connection, kind: Option<CategoryType>) -> DataResult<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, type FROM categories
         WHERE ?1 IS NULL OR type=?1
         ORDER BY type DESC, name",
    )?;
    let rows = stmt.query_map(params![kind], |r| {
        Ok(Category {
            id: r.get(0)?,
            name: r.get(1)?,
            kind: r.get(2)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn rename_category(conn: &Connection, id: i64, name: &str) -> DataResult<()> {
    let name = require_name("category name", name)?;
    ensure_exists(conn, "categories", "Category", id)?;
    match conn.execute(
        "UPDATE categories SET name=?1 WHERE id=?2",
        params![name, id],
    ) {
        Ok(_) => Ok(()),
        Err(e) if is_constraint_violation(&e) => Err(DataError::ConstraintViolation(format!(
            "Category '{}' already exists for this type",
            name
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Rejected while any entry still uses the category.
pub fn delete_category(conn: &Connection, id: i64) -> DataResult<()> {
    let referenced: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE category_id=?1",
        params![id],
        |r| r.get(0),
    )?;
    if referenced > 0 {
        log::warn!("refusing to delete category {}: {} entries", id, referenced);
        return Err(DataError::ConstraintViolation(format!(
            "Category {} still has {} entries and cannot be deleted",
            id, referenced
        )));
    }
    match conn.execute("DELETE FROM categories WHERE id=?1", params![id]) {
        Ok(0) => Err(DataError::not_found("Category", id)),
        Ok(_) => {
            log::info!("deleted category {}", id);
            Ok(())
        }
        Err(e) if is_constraint_violation(&e) => Err(DataError::ConstraintViolation(format!(
            "Category {} is still in use and cannot be deleted",
            id
        ))),
        Err(e) => Err(e.into()),
    }
}

pub fn delete_categories(conn: &mut Connection, ids: &[i64]) -> DataResult<()> {
    let tx = conn.transaction()?;
    for &id in ids {
        delete_category(&tx, id)?;
    }
    tx.commit()?;
    Ok(())
}

// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{ActionOutcome, DataError, DataResult};
use crate::models::{Contact, ContactUpdate, NewContact};
use crate::utils::{
    UpdateSet, ensure_exists, maybe_print_json, non_empty, parse_id, pretty_table, report_outcome,
    require_name,
};
use anyhow::Result;
use rusqlite::{Connection, Row, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let input = NewContact {
                name: sub.get_one::<String>("name").unwrap().clone(),
                email: sub.get_one::<String>("email").cloned(),
                phone: sub.get_one::<String>("phone").cloned(),
                title: sub.get_one::<String>("title").cloned(),
                customer_id: parse_id(sub.get_one::<String>("customer").unwrap())?,
            };
            let id = create_contact(conn, &input)?;
            println!(
                "Added contact '{}' to customer {} (id {})",
                input.name.trim(),
                input.customer_id,
                id
            );
        }
        Some(("list", sub)) => {
            let customer_id = parse_id(sub.get_one::<String>("customer").unwrap())?;
            let data = list_contacts(conn, customer_id)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|c| {
                        vec![
                            c.id.to_string(),
                            c.name,
                            c.title.unwrap_or_default(),
                            c.email.unwrap_or_default(),
                            c.phone.unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Contact", "Title", "Email", "Phone"], rows)
                );
            }
        }
        Some(("edit", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let update = ContactUpdate {
                name: sub.get_one::<String>("name").cloned(),
                email: sub.get_one::<String>("email").cloned(),
                phone: sub.get_one::<String>("phone").cloned(),
                title: sub.get_one::<String>("title").cloned(),
            };
            update_contact(conn, id, &update)?;
            println!("Updated contact {}", id);
        }
        Some(("rm", sub)) => {
            let outcome: ActionOutcome = parse_id(sub.get_one::<String>("id").unwrap())
                .and_then(|id| delete_contact(conn, id))
                .into();
            report_outcome(sub.get_flag("json"), &outcome, "Removed contact")?;
        }
        _ => {}
    }
    Ok(())
}

fn contact_from_row(r: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: r.get(0)?,
        name: r.get(1)?,
        email: r.get(2)?,
        phone: r.get(3)?,
        title: r.get(4)?,
        customer_id: r.get(5)?,
    })
}

pub fn create_contact(conn: &Connection, input: &NewContact) -> DataResult<i64> {
    let name = require_name("contact name", &input.name)?;
    ensure_exists(conn, "customers", "Customer", input.customer_id)?;
    conn.execute(
        "INSERT INTO contacts(name, email, phone, title, customer_id) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            name,
            non_empty(input.email.as_deref()),
            non_empty(input.phone.as_deref()),
            non_empty(input.title.as_deref()),
            input.customer_id
        ],
    )?;
    let id = conn.last_insert_rowid();
    log::info!("created contact {} for customer {}", id, input.customer_id);
    Ok(id)
}

pub fn list_contacts(conn: &Connection, customer_id: i64) -> DataResult<Vec<Contact>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, phone, title, customer_id FROM contacts
         WHERE customer_id=?1 ORDER BY name, id",
    )?;
    let rows = stmt.query_map(params![customer_id], contact_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn get_contact(conn: &Connection, id: i64) -> DataResult<Contact> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, phone, title, customer_id FROM contacts WHERE id=?1",
    )?;
    let mut rows = stmt.query_map(params![id], contact_from_row)?;
    match rows.next() {
        Some(row) => Ok(row?),
        None => Err(DataError::not_found("Contact", id)),
    }
}

pub fn update_contact(conn: &Connection, id: i64, update: &ContactUpdate) -> DataResult<()> {
    ensure_exists(conn, "contacts", "Contact", id)?;
    let mut set = UpdateSet::new();
    if let Some(name) = &update.name {
        set.set("name", require_name("contact name", name)?);
    }
    for (column, value) in [
        ("email", &update.email),
        ("phone", &update.phone),
        ("title", &update.title),
    ] {
        if let Some(v) = value {
            set.set(column, non_empty(Some(v.as_str())));
        }
    }
    set.execute(conn, "contacts", id)?;
    log::info!("updated contact {}", id);
    Ok(())
}

pub fn delete_contact(conn: &Connection, id: i64) -> DataResult<()> {
    match conn.execute("DELETE FROM contacts WHERE id=?1", params![id])? {
        0 => Err(DataError::not_found("Contact", id)),
        _ => {
            log::info!("deleted contact {}", id);
            Ok(())
        }
    }
}

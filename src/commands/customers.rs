// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::activities::{ActivityDetail, query_activities};
use crate::commands::contacts::list_contacts;
use crate::commands::deals::list_deals;
use crate::error::{ActionOutcome, DataError, DataResult};
use crate::models::{
    ActivityFilter, Contact, Customer, CustomerFilter, CustomerStatus, CustomerUpdate, Deal,
    DealFilter, NewCustomer,
};
use crate::utils::{
    UpdateSet, company_ref, ensure_exists, maybe_print_json, non_empty, now, parse_id,
    pretty_table, report_outcome, require_name,
};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params, params_from_iter};
use serde::Serialize;

/// Activities shown on a customer's detail view.
pub const DETAIL_ACTIVITIES: usize = 10;

pub(crate) const CUSTOMER_COLUMNS: &str = "c.id, c.name, c.email, c.phone, c.address, c.industry, \
     c.status, c.notes, c.company_id, c.created_at, c.updated_at";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSummary {
    #[serde(flatten)]
    pub customer: Customer,
    pub company: Option<String>,
    pub contact_count: i64,
    pub deal_count: i64,
    pub activity_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    pub company: Option<String>,
    pub contacts: Vec<Contact>,
    pub deals: Vec<Deal>,
    pub recent_activities: Vec<ActivityDetail>,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let input = NewCustomer {
                name: sub.get_one::<String>("name").unwrap().clone(),
                email: opt_text(sub, "email"),
                phone: opt_text(sub, "phone"),
                address: opt_text(sub, "address"),
                industry: opt_text(sub, "industry"),
                status: match sub.get_one::<String>("status") {
                    Some(s) => s.parse()?,
                    None => CustomerStatus::Active,
                },
                notes: opt_text(sub, "notes"),
                company_id: sub
                    .get_one::<String>("company")
                    .map(|s| company_ref(conn, s))
                    .transpose()?,
            };
            let id = create_customer(conn, &input)?;
            println!("Added customer '{}' (id {})", input.name.trim(), id);
        }
        Some(("list", sub)) => {
            let filter = CustomerFilter {
                status: sub
                    .get_one::<String>("status")
                    .map(|s| s.parse::<CustomerStatus>())
                    .transpose()?,
                company_id: sub
                    .get_one::<String>("company")
                    .map(|s| company_ref(conn, s))
                    .transpose()?,
                search: sub.get_one::<String>("search").cloned(),
            };
            let data = list_customers(conn, &filter)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|s| {
                        vec![
                            s.customer.id.to_string(),
                            s.customer.name,
                            s.customer.status.to_string(),
                            s.company.unwrap_or_default(),
                            s.customer.email.unwrap_or_default(),
                            s.customer.phone.unwrap_or_default(),
                            s.contact_count.to_string(),
                            s.deal_count.to_string(),
                            s.activity_count.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &[
                            "ID", "Name", "Status", "Company", "Email", "Phone", "Contacts",
                            "Deals", "Activities",
                        ],
                        rows,
                    )
                );
            }
        }
        Some(("show", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let detail = get_customer(conn, id)?;
            if !maybe_print_json(sub.get_flag("json"), false, &detail)? {
                print_detail(&detail);
            }
        }
        Some(("edit", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let company_id = if sub.get_flag("no_company") {
                Some(None)
            } else {
                sub.get_one::<String>("company")
                    .map(|s| company_ref(conn, s).map(Some))
                    .transpose()?
            };
            let update = CustomerUpdate {
                name: sub.get_one::<String>("name").cloned(),
                email: sub.get_one::<String>("email").cloned(),
                phone: sub.get_one::<String>("phone").cloned(),
                address: sub.get_one::<String>("address").cloned(),
                industry: sub.get_one::<String>("industry").cloned(),
                status: sub
                    .get_one::<String>("status")
                    .map(|s| s.parse::<CustomerStatus>())
                    .transpose()?,
                notes: sub.get_one::<String>("notes").cloned(),
                company_id,
            };
            update_customer(conn, id, &update)?;
            println!("Updated customer {}", id);
        }
        Some(("rm", sub)) => {
            let outcome: ActionOutcome = parse_id(sub.get_one::<String>("id").unwrap())
                .and_then(|id| delete_customer(conn, id))
                .into();
            report_outcome(sub.get_flag("json"), &outcome, "Removed customer")?;
        }
        _ => {}
    }
    Ok(())
}

fn opt_text(sub: &clap::ArgMatches, id: &str) -> Option<String> {
    non_empty(sub.get_one::<String>(id).map(|s| s.as_str()))
}

fn print_detail(d: &CustomerDetail) {
    let c = &d.customer;
    println!("{} (id {}, {})", c.name, c.id, c.status);
    for (label, value) in [
        ("Company", d.company.as_deref()),
        ("Email", c.email.as_deref()),
        ("Phone", c.phone.as_deref()),
        ("Address", c.address.as_deref()),
        ("Industry", c.industry.as_deref()),
        ("Notes", c.notes.as_deref()),
    ] {
        if let Some(v) = value {
            println!("  {}: {}", label, v);
        }
    }
    let contacts = d
        .contacts
        .iter()
        .map(|ct| {
            vec![
                ct.id.to_string(),
                ct.name.clone(),
                ct.title.clone().unwrap_or_default(),
                ct.email.clone().unwrap_or_default(),
                ct.phone.clone().unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["ID", "Contact", "Title", "Email", "Phone"], contacts)
    );
    let deals = d
        .deals
        .iter()
        .map(|dl| {
            vec![
                dl.id.to_string(),
                dl.title.clone(),
                dl.stage.to_string(),
                format!("{:.2} {}", dl.value, dl.currency),
                format!("{}%", dl.probability),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["ID", "Deal", "Stage", "Value", "Probability"], deals)
    );
    let acts = d
        .recent_activities
        .iter()
        .map(|a| {
            vec![
                a.activity.date.to_string(),
                a.activity.kind.to_string(),
                a.activity.title.clone(),
                if a.activity.completed { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "Type", "Activity", "Done"], acts)
    );
}

pub(crate) fn customer_from_row(r: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: r.get(0)?,
        name: r.get(1)?,
        email: r.get(2)?,
        phone: r.get(3)?,
        address: r.get(4)?,
        industry: r.get(5)?,
        status: r.get(6)?,
        notes: r.get(7)?,
        company_id: r.get(8)?,
        created_at: r.get(9)?,
        updated_at: r.get(10)?,
    })
}

pub fn create_customer(conn: &Connection, input: &NewCustomer) -> DataResult<i64> {
    input.validate()?;
    if let Some(company_id) = input.company_id {
        ensure_exists(conn, "companies", "Company", company_id)?;
    }
    let ts = now();
    conn.execute(
        "INSERT INTO customers(name, email, phone, address, industry, status, notes, company_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            input.name.trim(),
            non_empty(input.email.as_deref()),
            non_empty(input.phone.as_deref()),
            non_empty(input.address.as_deref()),
            non_empty(input.industry.as_deref()),
            input.status,
            non_empty(input.notes.as_deref()),
            input.company_id,
            ts
        ],
    )?;
    let id = conn.last_insert_rowid();
    log::info!("created customer {} '{}'", id, input.name.trim());
    Ok(id)
}

/// Escapes `%`, `_` and `\` so they match literally under `ESCAPE '\'`.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Customers with their contact, deal and activity counts, most recently
/// updated first.
pub fn list_customers(
    conn: &Connection,
    filter: &CustomerFilter,
) -> DataResult<Vec<CustomerSummary>> {
    let mut sql = format!(
        "SELECT {}, co.name,
           (SELECT COUNT(*) FROM contacts WHERE customer_id=c.id),
           (SELECT COUNT(*) FROM deals WHERE customer_id=c.id),
           (SELECT COUNT(*) FROM activities WHERE customer_id=c.id)
         FROM customers c
         LEFT JOIN companies co ON co.id=c.company_id
         WHERE 1=1",
        CUSTOMER_COLUMNS
    );
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(status) = filter.status {
        values.push(Box::new(status));
        sql.push_str(&format!(" AND c.status=?{}", values.len()));
    }
    if let Some(id) = filter.company_id {
        values.push(Box::new(id));
        sql.push_str(&format!(" AND c.company_id=?{}", values.len()));
    }
    if let Some(term) = non_empty(filter.search.as_deref()) {
        values.push(Box::new(format!("%{}%", escape_like(&term.to_lowercase()))));
        let n = values.len();
        sql.push_str(&format!(
            " AND (LOWER(c.name) LIKE ?{n} ESCAPE '\\' \
             OR LOWER(IFNULL(c.email,'')) LIKE ?{n} ESCAPE '\\' \
             OR LOWER(IFNULL(c.phone,'')) LIKE ?{n} ESCAPE '\\')"
        ));
    }
    sql.push_str(" ORDER BY c.updated_at DESC, c.id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), |r| {
        Ok(CustomerSummary {
            customer: customer_from_row(r)?,
            company: r.get(11)?,
            contact_count: r.get(12)?,
            deal_count: r.get(13)?,
            activity_count: r.get(14)?,
        })
    })?;
    let data = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    log::debug!("loaded {} customers", data.len());
    Ok(data)
}

pub fn get_customer(conn: &Connection, id: i64) -> DataResult<CustomerDetail> {
    let found = conn
        .query_row(
            &format!(
                "SELECT {}, co.name FROM customers c
                 LEFT JOIN companies co ON co.id=c.company_id
                 WHERE c.id=?1",
                CUSTOMER_COLUMNS
            ),
            params![id],
            |r| Ok((customer_from_row(r)?, r.get::<_, Option<String>>(11)?)),
        )
        .optional()?;
    let Some((customer, company)) = found else {
        return Err(DataError::not_found("Customer", id));
    };
    let deals = list_deals(
        conn,
        &DealFilter {
            customer_id: Some(id),
            ..DealFilter::default()
        },
    )?
    .into_iter()
    .map(|s| s.deal)
    .collect();
    let recent_activities = query_activities(
        conn,
        &ActivityFilter {
            customer_id: Some(id),
            ..ActivityFilter::default()
        },
        Some(DETAIL_ACTIVITIES),
    )?;
    Ok(CustomerDetail {
        customer,
        company,
        contacts: list_contacts(conn, id)?,
        deals,
        recent_activities,
    })
}

/// Blank text clears an optional field; a blank name is rejected.
pub fn update_customer(conn: &Connection, id: i64, update: &CustomerUpdate) -> DataResult<()> {
    ensure_exists(conn, "customers", "Customer", id)?;
    let mut set = UpdateSet::new();
    if let Some(name) = &update.name {
        set.set("name", require_name("customer name", name)?);
    }
    for (column, value) in [
        ("email", &update.email),
        ("phone", &update.phone),
        ("address", &update.address),
        ("industry", &update.industry),
        ("notes", &update.notes),
    ] {
        if let Some(v) = value {
            set.set(column, non_empty(Some(v.as_str())));
        }
    }
    set.set_opt("status", update.status);
    if let Some(company_id) = update.company_id {
        if let Some(cid) = company_id {
            ensure_exists(conn, "companies", "Company", cid)?;
        }
        set.set("company_id", company_id);
    }
    if set.is_empty() {
        return Ok(());
    }
    set.set("updated_at", now());
    set.execute(conn, "customers", id)?;
    log::info!("updated customer {}", id);
    Ok(())
}

/// Contacts, deals and activities go with the customer.
pub fn delete_customer(conn: &Connection, id: i64) -> DataResult<()> {
    match conn.execute("DELETE FROM customers WHERE id=?1", params![id])? {
        0 => Err(DataError::not_found("Customer", id)),
        _ => {
            log::info!("deleted customer {}", id);
            Ok(())
        }
    }
}

pub fn count_by_status(conn: &Connection) -> DataResult<Vec<(CustomerStatus, i64)>> {
    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM customers GROUP BY status")?;
    let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn recent_customers(conn: &Connection, limit: usize) -> DataResult<Vec<Customer>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM customers c ORDER BY c.created_at DESC, c.id DESC LIMIT ?1",
        CUSTOMER_COLUMNS
    ))?;
    let rows = stmt.query_map(params![limit as i64], customer_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

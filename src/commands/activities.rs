// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{ActionOutcome, DataError, DataResult};
use crate::models::{Activity, ActivityFilter, ActivityType, ActivityUpdate, NewActivity};
use crate::utils::{
    UpdateSet, ensure_exists, maybe_print_json, non_empty, now, parse_bool, parse_datetime,
    parse_id, pretty_table, report_outcome, require_name,
};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, ToSql, params, params_from_iter};
use serde::Serialize;

/// An activity with the names of what it is attached to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityDetail {
    #[serde(flatten)]
    pub activity: Activity,
    pub customer: Option<String>,
    pub deal: Option<String>,
}

const ACTIVITY_SELECT: &str = "SELECT a.id, a.type, a.title, a.description, a.date, a.completed, \
     a.customer_id, a.deal_id, cu.name, d.title \
     FROM activities a \
     LEFT JOIN customers cu ON cu.id=a.customer_id \
     LEFT JOIN deals d ON d.id=a.deal_id";

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let input = NewActivity {
                kind: sub.get_one::<String>("type").unwrap().parse()?,
                title: sub.get_one::<String>("title").unwrap().clone(),
                description: sub.get_one::<String>("description").cloned(),
                date: sub
                    .get_one::<String>("date")
                    .map(|s| parse_datetime(s))
                    .transpose()?,
                customer_id: sub
                    .get_one::<String>("customer")
                    .map(|s| parse_id(s))
                    .transpose()?,
                deal_id: sub
                    .get_one::<String>("deal")
                    .map(|s| parse_id(s))
                    .transpose()?,
            };
            let id = create_activity(conn, &input)?;
            println!("Logged {} '{}' (id {})", input.kind, input.title.trim(), id);
        }
        Some(("list", sub)) => {
            let filter = ActivityFilter {
                kind: sub
                    .get_one::<String>("type")
                    .map(|s| s.parse::<ActivityType>())
                    .transpose()?,
                customer_id: sub
                    .get_one::<String>("customer")
                    .map(|s| parse_id(s))
                    .transpose()?,
                deal_id: sub
                    .get_one::<String>("deal")
                    .map(|s| parse_id(s))
                    .transpose()?,
                completed: sub
                    .get_one::<String>("completed")
                    .map(|s| parse_bool(s))
                    .transpose()?,
            };
            let data = list_activities(conn, &filter)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|a| {
                        vec![
                            a.activity.id.to_string(),
                            a.activity.date.to_string(),
                            a.activity.kind.to_string(),
                            a.activity.title,
                            a.customer.unwrap_or_default(),
                            a.deal.unwrap_or_default(),
                            if a.activity.completed { "yes" } else { "no" }.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["ID", "Date", "Type", "Activity", "Customer", "Deal", "Done"],
                        rows,
                    )
                );
            }
        }
        Some(("edit", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let update = ActivityUpdate {
                kind: sub
                    .get_one::<String>("type")
                    .map(|s| s.parse::<ActivityType>())
                    .transpose()?,
                title: sub.get_one::<String>("title").cloned(),
                description: sub.get_one::<String>("description").cloned(),
                date: sub
                    .get_one::<String>("date")
                    .map(|s| parse_datetime(s))
                    .transpose()?,
                completed: sub
                    .get_one::<String>("completed")
                    .map(|s| parse_bool(s))
                    .transpose()?,
            };
            update_activity(conn, id, &update)?;
            println!("Updated activity {}", id);
        }
        Some(("toggle", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let done = toggle_activity(conn, id)?;
            println!(
                "Activity {} marked {}",
                id,
                if done { "completed" } else { "open" }
            );
        }
        Some(("rm", sub)) => {
            let outcome: ActionOutcome = parse_id(sub.get_one::<String>("id").unwrap())
                .and_then(|id| delete_activity(conn, id))
                .into();
            report_outcome(sub.get_flag("json"), &outcome, "Removed activity")?;
        }
        _ => {}
    }
    Ok(())
}

fn activity_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<ActivityDetail> {
    Ok(ActivityDetail {
        activity: Activity {
            id: r.get(0)?,
            kind: r.get(1)?,
            title: r.get(2)?,
            description: r.get(3)?,
            date: r.get(4)?,
            completed: r.get(5)?,
            customer_id: r.get(6)?,
            deal_id: r.get(7)?,
        },
        customer: r.get(8)?,
        deal: r.get(9)?,
    })
}

/// Activities matching `filter`, newest first.
pub(crate) fn query_activities(
    conn: &Connection,
    filter: &ActivityFilter,
    limit: Option<usize>,
) -> DataResult<Vec<ActivityDetail>> {
    let mut sql = format!("{} WHERE 1=1", ACTIVITY_SELECT);
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(kind) = filter.kind {
        values.push(Box::new(kind));
        sql.push_str(&format!(" AND a.type=?{}", values.len()));
    }
    if let Some(id) = filter.customer_id {
        values.push(Box::new(id));
        sql.push_str(&format!(" AND a.customer_id=?{}", values.len()));
    }
    if let Some(id) = filter.deal_id {
        values.push(Box::new(id));
        sql.push_str(&format!(" AND a.deal_id=?{}", values.len()));
    }
    if let Some(done) = filter.completed {
        values.push(Box::new(done));
        sql.push_str(&format!(" AND a.completed=?{}", values.len()));
    }
    sql.push_str(" ORDER BY a.date DESC, a.id DESC");
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {}", n));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), activity_from_row)?;
    let data = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    log::debug!("loaded {} activities", data.len());
    Ok(data)
}

pub fn list_activities(
    conn: &Connection,
    filter: &ActivityFilter,
) -> DataResult<Vec<ActivityDetail>> {
    query_activities(conn, filter, None)
}

pub fn recent_activities(conn: &Connection, limit: usize) -> DataResult<Vec<ActivityDetail>> {
    query_activities(conn, &ActivityFilter::default(), Some(limit))
}

pub fn get_activity(conn: &Connection, id: i64) -> DataResult<ActivityDetail> {
    conn.query_row(
        &format!("{} WHERE a.id=?1", ACTIVITY_SELECT),
        params![id],
        activity_from_row,
    )
    .optional()?
    .ok_or_else(|| DataError::not_found("Activity", id))
}

/// Date defaults to now. A linked customer or deal must exist.
pub fn create_activity(conn: &Connection, input: &NewActivity) -> DataResult<i64> {
    let title = require_name("activity title", &input.title)?;
    if let Some(id) = input.customer_id {
        ensure_exists(conn, "customers", "Customer", id)?;
    }
    if let Some(id) = input.deal_id {
        ensure_exists(conn, "deals", "Deal", id)?;
    }
    conn.execute(
        "INSERT INTO activities(type, title, description, date, completed, customer_id, deal_id)
         VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
        params![
            input.kind,
            title,
            non_empty(input.description.as_deref()),
            input.date.unwrap_or_else(now),
            input.customer_id,
            input.deal_id
        ],
    )?;
    let id = conn.last_insert_rowid();
    log::info!("created {} activity {}", input.kind, id);
    Ok(id)
}

pub fn update_activity(conn: &Connection, id: i64, update: &ActivityUpdate) -> DataResult<()> {
    ensure_exists(conn, "activities", "Activity", id)?;
    let mut set = UpdateSet::new();
    set.set_opt("type", update.kind);
    if let Some(title) = &update.title {
        set.set("title", require_name("activity title", title)?);
    }
    if let Some(d) = &update.description {
        set.set("description", non_empty(Some(d.as_str())));
    }
    set.set_opt("date", update.date);
    set.set_opt("completed", update.completed);
    set.execute(conn, "activities", id)?;
    log::info!("updated activity {}", id);
    Ok(())
}

/// Flips the completed flag and returns the new value.
pub fn toggle_activity(conn: &Connection, id: i64) -> DataResult<bool> {
    let changed = conn.execute(
        "UPDATE activities SET completed = 1 - completed WHERE id=?1",
        params![id],
    )?;
    if changed == 0 {
        return Err(DataError::not_found("Activity", id));
    }
    let done: bool = conn.query_row(
        "SELECT completed FROM activities WHERE id=?1",
        params![id],
        |r| r.get(0),
    )?;
    log::info!("activity {} completed={}", id, done);
    Ok(done)
}

pub fn delete_activity(conn: &Connection, id: i64) -> DataResult<()> {
    match conn.execute("DELETE FROM activities WHERE id=?1", params![id])? {
        0 => Err(DataError::not_found("Activity", id)),
        _ => {
            log::info!("deleted activity {}", id);
            Ok(())
        }
    }
}

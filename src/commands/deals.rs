// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::activities::{ActivityDetail, query_activities};
use crate::error::{ActionOutcome, DataError, DataResult};
use crate::models::{ActivityFilter, Deal, DealFilter, DealStage, DealUpdate, NewDeal};
use crate::utils::{
    DEFAULT_CURRENCY, UpdateSet, check_amount, check_probability, ensure_exists, get_decimal,
    maybe_print_json, non_empty, now, parse_amount, parse_bool, parse_date, parse_id,
    parse_probability, pretty_table, report_outcome, require_name,
};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params, params_from_iter};
use rust_decimal::Decimal;
use serde::Serialize;

const DEAL_COLUMNS: &str = "d.id, d.title, d.value, d.value_try, d.stage, d.probability, \
     d.expected_close_date, d.last_contact_date, d.notes, d.customer_id, d.sales_rep, \
     d.deal_company, d.product_category, d.product_sub_category, d.currency, d.source, \
     d.lead_type, d.tag, d.is_stale, d.created_at, d.updated_at";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealSummary {
    #[serde(flatten)]
    pub deal: Deal,
    pub customer: String,
    pub activity_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealDetail {
    #[serde(flatten)]
    pub deal: Deal,
    pub customer: String,
    pub activities: Vec<ActivityDetail>,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let input = NewDeal {
                title: sub.get_one::<String>("title").unwrap().clone(),
                customer_id: parse_id(sub.get_one::<String>("customer").unwrap())?,
                value: opt_amount(sub, "value")?.unwrap_or(Decimal::ZERO),
                value_try: opt_amount(sub, "value_try")?.unwrap_or(Decimal::ZERO),
                stage: sub
                    .get_one::<String>("stage")
                    .map(|s| s.parse::<DealStage>())
                    .transpose()?,
                probability: sub
                    .get_one::<String>("probability")
                    .map(|s| parse_probability(s))
                    .transpose()?,
                expected_close_date: opt_date(sub, "close_date")?,
                last_contact_date: opt_date(sub, "last_contact")?,
                notes: sub.get_one::<String>("notes").cloned(),
                sales_rep: sub.get_one::<String>("sales_rep").cloned(),
                deal_company: sub.get_one::<String>("deal_company").cloned(),
                product_category: sub.get_one::<String>("product_category").cloned(),
                product_sub_category: sub.get_one::<String>("product_sub_category").cloned(),
                currency: sub.get_one::<String>("currency").cloned(),
                source: sub.get_one::<String>("source").cloned(),
                lead_type: sub.get_one::<String>("lead_type").cloned(),
                tag: sub.get_one::<String>("tag").cloned(),
                is_stale: sub.get_flag("stale"),
            };
            let id = create_deal(conn, &input)?;
            println!("Added deal '{}' (id {})", input.title.trim(), id);
        }
        Some(("list", sub)) => {
            let filter = DealFilter {
                stage: sub
                    .get_one::<String>("stage")
                    .map(|s| s.parse::<DealStage>())
                    .transpose()?,
                customer_id: sub
                    .get_one::<String>("customer")
                    .map(|s| parse_id(s))
                    .transpose()?,
            };
            let data = list_deals(conn, &filter)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|s| {
                        vec![
                            s.deal.id.to_string(),
                            s.deal.title,
                            s.customer,
                            s.deal.stage.to_string(),
                            format!("{:.2} {}", s.deal.value, s.deal.currency),
                            format!("{}%", s.deal.probability),
                            s.deal
                                .expected_close_date
                                .map(|d| d.to_string())
                                .unwrap_or_default(),
                            s.activity_count.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &[
                            "ID", "Deal", "Customer", "Stage", "Value", "Prob", "Close",
                            "Activities",
                        ],
                        rows,
                    )
                );
            }
        }
        Some(("show", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let detail = get_deal(conn, id)?;
            if !maybe_print_json(sub.get_flag("json"), false, &detail)? {
                let d = &detail.deal;
                println!(
                    "{} (id {}) for {}: {} {:.2} {} at {}%",
                    d.title, d.id, detail.customer, d.stage, d.value, d.currency, d.probability
                );
                if let Some(n) = &d.notes {
                    println!("  Notes: {}", n);
                }
                let rows = detail
                    .activities
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
                    pretty_table(&["Date", "Type", "Activity", "Done"], rows)
                );
            }
        }
        Some(("edit", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let update = DealUpdate {
                title: sub.get_one::<String>("title").cloned(),
                value: opt_amount(sub, "value")?,
                value_try: opt_amount(sub, "value_try")?,
                stage: sub
                    .get_one::<String>("stage")
                    .map(|s| s.parse::<DealStage>())
                    .transpose()?,
                probability: sub
                    .get_one::<String>("probability")
                    .map(|s| parse_probability(s))
                    .transpose()?,
                expected_close_date: opt_date(sub, "close_date")?,
                last_contact_date: opt_date(sub, "last_contact")?,
                notes: sub.get_one::<String>("notes").cloned(),
                customer_id: sub
                    .get_one::<String>("customer")
                    .map(|s| parse_id(s))
                    .transpose()?,
                sales_rep: sub.get_one::<String>("sales_rep").cloned(),
                deal_company: sub.get_one::<String>("deal_company").cloned(),
                product_category: sub.get_one::<String>("product_category").cloned(),
                product_sub_category: sub.get_one::<String>("product_sub_category").cloned(),
                currency: sub.get_one::<String>("currency").cloned(),
                source: sub.get_one::<String>("source").cloned(),
                lead_type: sub.get_one::<String>("lead_type").cloned(),
                tag: sub.get_one::<String>("tag").cloned(),
                is_stale: sub
                    .get_one::<String>("stale")
                    .map(|s| parse_bool(s))
                    .transpose()?,
            };
            update_deal(conn, id, &update)?;
            println!("Updated deal {}", id);
        }
        Some(("stage", sub)) => {
            let id = parse_id(sub.get_one::<String>("id").unwrap())?;
            let stage: DealStage = sub.get_one::<String>("stage").unwrap().parse()?;
            update_deal_stage(conn, id, stage)?;
            println!("Deal {} moved to {}", id, stage);
        }
        Some(("rm", sub)) => {
            let outcome: ActionOutcome = parse_id(sub.get_one::<String>("id").unwrap())
                .and_then(|id| delete_deal(conn, id))
                .into();
            report_outcome(sub.get_flag("json"), &outcome, "Removed deal")?;
        }
        _ => {}
    }
    Ok(())
}

fn opt_amount(sub: &clap::ArgMatches, id: &str) -> Result<Option<Decimal>> {
    Ok(sub
        .get_one::<String>(id)
        .map(|s| parse_amount(id, s))
        .transpose()?)
}

fn opt_date(sub: &clap::ArgMatches, id: &str) -> Result<Option<chrono::NaiveDate>> {
    Ok(sub
        .get_one::<String>(id)
        .map(|s| parse_date(s))
        .transpose()?)
}

pub(crate) fn deal_from_row(r: &Row<'_>) -> rusqlite::Result<Deal> {
    Ok(Deal {
        id: r.get(0)?,
        title: r.get(1)?,
        value: get_decimal(r, 2)?,
        value_try: get_decimal(r, 3)?,
        stage: r.get(4)?,
        probability: r.get(5)?,
        expected_close_date: r.get(6)?,
        last_contact_date: r.get(7)?,
        notes: r.get(8)?,
        customer_id: r.get(9)?,
        sales_rep: r.get(10)?,
        deal_company: r.get(11)?,
        product_category: r.get(12)?,
        product_sub_category: r.get(13)?,
        currency: r.get(14)?,
        source: r.get(15)?,
        lead_type: r.get(16)?,
        tag: r.get(17)?,
        is_stale: r.get(18)?,
        created_at: r.get(19)?,
        updated_at: r.get(20)?,
    })
}

fn normalize_currency(ccy: Option<&str>) -> String {
    non_empty(ccy)
        .map(|c| c.to_uppercase())
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

/// Stage defaults to LEAD. Without an explicit probability the stage's
/// suggested one is used; WON and LOST always pin it.
pub fn create_deal(conn: &Connection, input: &NewDeal) -> DataResult<i64> {
    input.validate()?;
    ensure_exists(conn, "customers", "Customer", input.customer_id)?;
    let stage = input.stage.unwrap_or(DealStage::Lead);
    let probability = stage
        .forced_probability()
        .or(input.probability)
        .unwrap_or_else(|| stage.suggested_probability());
    let ts = now();
    conn.execute(
        "INSERT INTO deals(title, value, value_try, stage, probability, expected_close_date,
                           last_contact_date, notes, customer_id, sales_rep, deal_company,
                           product_category, product_sub_category, currency, source, lead_type,
                           tag, is_stale, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?19)",
        params![
            input.title.trim(),
            input.value.to_string(),
            input.value_try.to_string(),
            stage,
            probability,
            input.expected_close_date,
            input.last_contact_date,
            non_empty(input.notes.as_deref()),
            input.customer_id,
            non_empty(input.sales_rep.as_deref()),
            non_empty(input.deal_company.as_deref()),
            non_empty(input.product_category.as_deref()),
            non_empty(input.product_sub_category.as_deref()),
            normalize_currency(input.currency.as_deref()),
            non_empty(input.source.as_deref()),
            non_empty(input.lead_type.as_deref()),
            non_empty(input.tag.as_deref()),
            input.is_stale,
            ts
        ],
    )?;
    let id = conn.last_insert_rowid();
    log::info!("created deal {} '{}' at {} ({}%)", id, input.title.trim(), stage, probability);
    Ok(id)
}

/// Deals with customer name and activity count, most recently updated first.
pub fn list_deals(conn: &Connection, filter: &DealFilter) -> DataResult<Vec<DealSummary>> {
    let mut sql = format!(
        "SELECT {}, cu.name, (SELECT COUNT(*) FROM activities a WHERE a.deal_id=d.id)
         FROM deals d
         JOIN customers cu ON cu.id=d.customer_id
         WHERE 1=1",
        DEAL_COLUMNS
    );
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(stage) = filter.stage {
        values.push(Box::new(stage));
        sql.push_str(&format!(" AND d.stage=?{}", values.len()));
    }
    if let Some(id) = filter.customer_id {
        values.push(Box::new(id));
        sql.push_str(&format!(" AND d.customer_id=?{}", values.len()));
    }
    sql.push_str(" ORDER BY d.updated_at DESC, d.id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), |r| {
        Ok(DealSummary {
            deal: deal_from_row(r)?,
            customer: r.get(21)?,
            activity_count: r.get(22)?,
        })
    })?;
    let data = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    log::debug!("loaded {} deals", data.len());
    Ok(data)
}

/// Every deal, for pipeline statistics.
pub fn all_deals(conn: &Connection) -> DataResult<Vec<Deal>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM deals d ORDER BY d.id", DEAL_COLUMNS))?;
    let rows = stmt.query_map([], deal_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn get_deal(conn: &Connection, id: i64) -> DataResult<DealDetail> {
    let found = conn
        .query_row(
            &format!(
                "SELECT {}, cu.name FROM deals d
                 JOIN customers cu ON cu.id=d.customer_id
                 WHERE d.id=?1",
                DEAL_COLUMNS
            ),
            params![id],
            |r| Ok((deal_from_row(r)?, r.get::<_, String>(21)?)),
        )
        .optional()?;
    let Some((deal, customer)) = found else {
        return Err(DataError::not_found("Deal", id));
    };
    let activities = query_activities(
        conn,
        &ActivityFilter {
            deal_id: Some(id),
            ..ActivityFilter::default()
        },
        None,
    )?;
    Ok(DealDetail {
        deal,
        customer,
        activities,
    })
}

/// A stage change through here follows the same probability rule as
/// `update_deal_stage`. A WON or LOST deal keeps its pinned probability.
pub fn update_deal(conn: &Connection, id: i64, update: &DealUpdate) -> DataResult<()> {
    ensure_exists(conn, "deals", "Deal", id)?;
    let mut set = UpdateSet::new();
    if let Some(title) = &update.title {
        set.set("title", require_name("deal title", title)?);
    }
    if let Some(v) = update.value {
        set.set("value", check_amount("value", v)?.to_string());
    }
    if let Some(v) = update.value_try {
        set.set("value_try", check_amount("TRY value", v)?.to_string());
    }
    if let Some(customer_id) = update.customer_id {
        ensure_exists(conn, "customers", "Customer", customer_id)?;
        set.set("customer_id", customer_id);
    }
    let stage = match update.stage {
        Some(s) => s,
        None => conn.query_row(
            "SELECT stage FROM deals WHERE id=?1",
            params![id],
            |r| r.get::<_, DealStage>(0),
        )?,
    };
    let forced = stage.forced_probability();
    set.set_opt("stage", update.stage);
    if update.stage.is_some() || update.probability.is_some() {
        match (forced, update.probability) {
            (Some(p), _) => {
                set.set("probability", p);
            }
            (None, Some(p)) => {
                set.set("probability", check_probability(p)?);
            }
            (None, None) => {}
        }
    }
    set.set_opt("expected_close_date", update.expected_close_date);
    set.set_opt("last_contact_date", update.last_contact_date);
    for (column, value) in [
        ("notes", &update.notes),
        ("sales_rep", &update.sales_rep),
        ("deal_company", &update.deal_company),
        ("product_category", &update.product_category),
        ("product_sub_category", &update.product_sub_category),
        ("source", &update.source),
        ("lead_type", &update.lead_type),
        ("tag", &update.tag),
    ] {
        if let Some(v) = value {
            set.set(column, non_empty(Some(v.as_str())));
        }
    }
    if let Some(c) = &update.currency {
        set.set("currency", normalize_currency(Some(c.as_str())));
    }
    set.set_opt("is_stale", update.is_stale);
    if set.is_empty() {
        return Ok(());
    }
    set.set("updated_at", now());
    set.execute(conn, "deals", id)?;
    log::info!("updated deal {}", id);
    Ok(())
}

/// Moves a deal to `stage`. WON pins probability to 100 and LOST to 0;
/// other stages keep the current probability.
pub fn update_deal_stage(conn: &Connection, id: i64, stage: DealStage) -> DataResult<()> {
    let changed = match stage.forced_probability() {
        Some(p) => conn.execute(
            "UPDATE deals SET stage=?1, probability=?2, updated_at=?3 WHERE id=?4",
            params![stage, p, now(), id],
        )?,
        None => conn.execute(
            "UPDATE deals SET stage=?1, updated_at=?2 WHERE id=?3",
            params![stage, now(), id],
        )?,
    };
    if changed == 0 {
        return Err(DataError::not_found("Deal", id));
    }
    log::info!("deal {} moved to {}", id, stage);
    Ok(())
}

pub fn delete_deal(conn: &Connection, id: i64) -> DataResult<()> {
    match conn.execute("DELETE FROM deals WHERE id=?1", params![id])? {
        0 => Err(DataError::not_found("Deal", id)),
        _ => {
            log::info!("deleted deal {}", id);
            Ok(())
        }
    }
}
